//! Pure functions for serializing/deserializing posts to/from cache and bus
//! bytes.
//!
//! JSON keeps cached values human-readable and matches the wire format pushed
//! to clients.

use crate::feed::{Post, PostView};
use thiserror::Error;

/// Errors that can occur during serialization/deserialization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// Failed to serialize a value to bytes.
    #[error("Failed to serialize: {0}")]
    SerializeFailed(String),
    /// Failed to deserialize bytes to a value.
    #[error("Failed to deserialize: {0}")]
    DeserializeFailed(String),
}

/// Result type for serialization operations.
pub type Result<T> = std::result::Result<T, SerializationError>;

/// Serializes a cached feed page to JSON bytes.
pub fn serialize_posts(posts: &[Post]) -> Result<Vec<u8>> {
    serde_json::to_vec(posts).map_err(|e| SerializationError::SerializeFailed(e.to_string()))
}

/// Deserializes JSON bytes to a cached feed page.
pub fn deserialize_posts(bytes: &[u8]) -> Result<Vec<Post>> {
    serde_json::from_slice(bytes).map_err(|e| SerializationError::DeserializeFailed(e.to_string()))
}

/// Serializes a post to the wire JSON pushed over real-time connections.
pub fn serialize_post_view(post: &Post) -> Result<Vec<u8>> {
    serde_json::to_vec(&PostView::from(post))
        .map_err(|e| SerializationError::SerializeFailed(e.to_string()))
}
