//! Pure validation functions for post input.

use super::PostError;

/// Maximum number of characters in a post.
pub const MAX_POST_LENGTH: usize = 4096;

/// Validates post text before it is persisted.
pub fn validate_post_text(text: &str) -> Result<(), PostError> {
    if text.trim().is_empty() {
        return Err(PostError::EmptyText);
    }
    let length = text.chars().count();
    if length > MAX_POST_LENGTH {
        return Err(PostError::TextTooLong {
            length,
            max: MAX_POST_LENGTH,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_regular_text() {
        assert!(validate_post_text("hello friends").is_ok());
    }

    #[test]
    fn test_rejects_empty_and_blank() {
        assert_eq!(validate_post_text(""), Err(PostError::EmptyText));
        assert_eq!(validate_post_text("   \n"), Err(PostError::EmptyText));
    }

    #[test]
    fn test_rejects_too_long() {
        let text = "a".repeat(MAX_POST_LENGTH + 1);
        assert_eq!(
            validate_post_text(&text),
            Err(PostError::TextTooLong {
                length: MAX_POST_LENGTH + 1,
                max: MAX_POST_LENGTH
            })
        );
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        let text = "é".repeat(MAX_POST_LENGTH);
        assert!(validate_post_text(&text).is_ok());
    }
}
