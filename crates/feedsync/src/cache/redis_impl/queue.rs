//! Redis list-backed invalidation queue.

use async_trait::async_trait;
use redis::AsyncCommands;

use feedsync_core::cache::{InvalidationQueue, Result, REFRESH_QUEUE_KEY};
use feedsync_core::feed::UserId;

use super::error::map_redis_error;

/// Invalidation queue stored in a Redis list shared by all instances.
///
/// Signals are appended with RPUSH and taken from the head with LPOP. Each
/// push trims the list to `capacity`, dropping the oldest signals first.
pub struct RedisInvalidationQueue {
    conn: redis::aio::ConnectionManager,
    key: String,
    capacity: usize,
}

impl RedisInvalidationQueue {
    /// Connects to the shared `top_feed_queue` list.
    pub async fn new(url: &str, capacity: usize) -> Result<Self> {
        Self::with_key(url, REFRESH_QUEUE_KEY, capacity).await
    }

    /// Connects to a queue stored under a custom list key.
    pub async fn with_key(url: &str, key: impl Into<String>, capacity: usize) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        Ok(Self {
            conn,
            key: key.into(),
            capacity: capacity.max(1),
        })
    }
}

#[async_trait]
impl InvalidationQueue for RedisInvalidationQueue {
    async fn push(&self, user_id: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let keep_from = -(self.capacity as isize);
        let (length,): (usize,) = redis::pipe()
            .atomic()
            .rpush(&self.key, user_id)
            .ltrim(&self.key, keep_from, -1)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;

        if length > self.capacity {
            tracing::warn!(
                user_id = %user_id,
                capacity = self.capacity,
                dropped = length - self.capacity,
                "Invalidation queue full, dropped oldest signals"
            );
        }
        Ok(())
    }

    async fn pop(&self) -> Result<Option<UserId>> {
        let mut conn = self.conn.clone();
        conn.lpop(&self.key, None).await.map_err(map_redis_error)
    }

    async fn len(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        conn.llen(&self.key).await.map_err(map_redis_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    async fn get_test_queue(capacity: usize) -> Option<RedisInvalidationQueue> {
        let key = format!("test:refresh_queue:{}", Uuid::new_v4());
        RedisInvalidationQueue::with_key(&redis_url(), key, capacity)
            .await
            .ok()
    }

    #[tokio::test]
    async fn test_redis_queue_is_fifo() {
        let Some(queue) = get_test_queue(10).await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        queue.push("1").await.unwrap();
        queue.push("2").await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 2);

        assert_eq!(queue.pop().await.unwrap().as_deref(), Some("1"));
        assert_eq!(queue.pop().await.unwrap().as_deref(), Some("2"));
        assert_eq!(queue.pop().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_redis_queue_drops_oldest_when_full() {
        let Some(queue) = get_test_queue(2).await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        for user_id in ["a", "b", "c"] {
            queue.push(user_id).await.unwrap();
        }

        assert_eq!(queue.len().await.unwrap(), 2);
        assert_eq!(queue.pop().await.unwrap().as_deref(), Some("b"));
        assert_eq!(queue.pop().await.unwrap().as_deref(), Some("c"));
    }
}
