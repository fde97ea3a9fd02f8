use std::time::Duration;

use async_trait::async_trait;

use crate::feed::UserId;

use super::Result;

/// Trait for basic key-value cache operations.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns true if a live (non-expired) value exists for the key.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Gets a value from the cache by key.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Sets a value in the cache with an optional TTL.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    /// Deletes a value from the cache by key.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// FIFO of "this user's cached feed may be stale" signals.
///
/// Producers push at the tail without blocking; the single refresh worker
/// pops from the head. Duplicate ids are allowed.
#[async_trait]
pub trait InvalidationQueue: Send + Sync {
    /// Appends a signal at the tail.
    async fn push(&self, user_id: &str) -> Result<()>;

    /// Removes and returns the signal at the head, `None` when empty.
    async fn pop(&self) -> Result<Option<UserId>>;

    /// Number of pending signals.
    async fn len(&self) -> Result<usize>;
}
