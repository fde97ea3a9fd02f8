//! SQLite row conversion functions.
//!
//! Pure functions for converting between SQLite rows and domain types.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use uuid::Uuid;

use feedsync_core::feed::Post;
use feedsync_core::storage::RepositoryError;

/// Convert a SQLite row to a Post.
///
/// Expected columns: id, author_id, text, create_time
pub fn row_to_post(row: &Row) -> rusqlite::Result<Post> {
    let id: String = row.get(0)?;
    let author_id: String = row.get(1)?;
    let text: String = row.get(2)?;
    let create_time: i64 = row.get(3)?;

    Ok(Post {
        id: parse_uuid(&id)?,
        text,
        author_id,
        create_time: DateTime::from_timestamp_nanos(create_time),
    })
}

/// Encode a timestamp as nanoseconds since the Unix epoch.
pub fn timestamp_to_nanos(dt: &DateTime<Utc>) -> Result<i64, RepositoryError> {
    dt.timestamp_nanos_opt().ok_or_else(|| {
        RepositoryError::InvalidData(format!("Timestamp out of range: {}", dt.to_rfc3339()))
    })
}

/// Orders a pair of user ids the way the `friends` table stores them.
pub fn friend_pair<'a>(user_id: &'a str, friend_id: &'a str) -> (&'a str, &'a str) {
    if user_id < friend_id {
        (user_id, friend_id)
    } else {
        (friend_id, user_id)
    }
}

fn parse_uuid(s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_nanos_round_trip() {
        let dt = Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap();
        let nanos = timestamp_to_nanos(&dt).unwrap();
        assert_eq!(DateTime::from_timestamp_nanos(nanos), dt);
    }

    #[test]
    fn test_timestamp_out_of_range() {
        let dt = Utc.with_ymd_and_hms(2300, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            timestamp_to_nanos(&dt),
            Err(RepositoryError::InvalidData(_))
        ));
    }

    #[test]
    fn test_friend_pair_is_ordered() {
        assert_eq!(friend_pair("b", "a"), ("a", "b"));
        assert_eq!(friend_pair("a", "b"), ("a", "b"));
    }

    #[test]
    fn test_parse_uuid_invalid() {
        assert!(parse_uuid("not-a-uuid").is_err());
    }
}
