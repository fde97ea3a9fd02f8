//! SQLite repository implementation.
//!
//! Implements the repository traits from `feedsync_core::storage` using SQLite.

use async_trait::async_trait;
use tokio_rusqlite::Connection;
use uuid::Uuid;

use feedsync_core::feed::{FeedWindow, Post, UserId};
use feedsync_core::storage::{PostRepository, RepositoryError, Result, SocialGraph};

use super::conversions::{friend_pair, row_to_post, timestamp_to_nanos};
use super::error::map_tokio_rusqlite_error_with_id;
use super::schema;

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// SQLite-based repository implementation.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Creates a new repository with a file-based database.
    ///
    /// The database file will be created if it doesn't exist.
    /// Schema tables are created automatically.
    pub async fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Creates a new repository with an in-memory database.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    async fn init_schema(conn: &Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(schema::CREATE_TABLES)
                .map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))
    }
}

#[async_trait]
impl PostRepository for SqliteRepository {
    async fn create_post(&self, post: &Post) -> Result<()> {
        let id = post.id.to_string();
        let author_id = post.author_id.clone();
        let text = post.text.clone();
        let create_time = timestamp_to_nanos(&post.create_time)?;
        let post_id = id.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_POST,
                    rusqlite::params![id, author_id, text, create_time],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Post", post_id))
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
        let id_str = id.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(schema::SELECT_POST_BY_ID).map_err(wrap_err)?;
                match stmt.query_row([&id_str], row_to_post) {
                    Ok(post) => Ok(Some(post)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(wrap_err(e)),
                }
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Post", id.to_string()))
    }

    async fn feed_page(&self, user_id: &str, window: FeedWindow) -> Result<Vec<Post>> {
        let user = user_id.to_string();
        let limit = i64::try_from(window.limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(window.offset).unwrap_or(i64::MAX);

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(schema::SELECT_FEED_PAGE).map_err(wrap_err)?;
                let rows = stmt
                    .query_map(rusqlite::params![user, limit, offset], row_to_post)
                    .map_err(wrap_err)?;

                let mut posts = Vec::new();
                for row_result in rows {
                    posts.push(row_result.map_err(wrap_err)?);
                }
                Ok(posts)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Feed", user_id))
    }
}

#[async_trait]
impl SocialGraph for SqliteRepository {
    async fn friends_of(&self, user_id: &str) -> Result<Vec<UserId>> {
        let user = user_id.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(schema::SELECT_FRIENDS).map_err(wrap_err)?;
                let rows = stmt
                    .query_map([&user], |row| row.get::<_, String>(0))
                    .map_err(wrap_err)?;

                let mut friends = Vec::new();
                for row_result in rows {
                    friends.push(row_result.map_err(wrap_err)?);
                }
                Ok(friends)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "FriendLink", user_id))
    }

    async fn add_friend_link(&self, user_id: &str, friend_id: &str) -> Result<()> {
        if user_id == friend_id {
            return Err(RepositoryError::InvalidData(format!(
                "User {user_id} cannot befriend themselves"
            )));
        }

        let (a, b) = friend_pair(user_id, friend_id);
        let (user_a, user_b) = (a.to_string(), b.to_string());
        let link_id = format!("{user_id}:{friend_id}");

        self.conn
            .call(move |conn| {
                conn.execute(schema::INSERT_FRIEND_LINK, [&user_a, &user_b])
                    .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "FriendLink", link_id))
    }

    async fn remove_friend_link(&self, user_id: &str, friend_id: &str) -> Result<()> {
        let (a, b) = friend_pair(user_id, friend_id);
        let (user_a, user_b) = (a.to_string(), b.to_string());
        let link_id = format!("{user_id}:{friend_id}");

        self.conn
            .call(move |conn| {
                conn.execute(schema::DELETE_FRIEND_LINK, [&user_a, &user_b])
                    .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "FriendLink", link_id))
    }
}
