//! In-memory invalidation queue.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use feedsync_core::cache::{InvalidationQueue, Result};
use feedsync_core::feed::UserId;

/// Bounded FIFO of pending invalidation signals.
///
/// When full, pushing drops the oldest pending signal.
#[derive(Debug, Clone)]
pub struct MemoryInvalidationQueue {
    entries: Arc<Mutex<VecDeque<UserId>>>,
    capacity: usize,
}

impl MemoryInvalidationQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }
}

#[async_trait]
impl InvalidationQueue for MemoryInvalidationQueue {
    async fn push(&self, user_id: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if entries.len() >= self.capacity {
            if let Some(dropped) = entries.pop_front() {
                tracing::warn!(
                    user_id = %dropped,
                    capacity = self.capacity,
                    "Invalidation queue full, dropping oldest signal"
                );
            }
        }
        entries.push_back(user_id.to_string());
        Ok(())
    }

    async fn pop(&self) -> Result<Option<UserId>> {
        Ok(self.entries.lock().await.pop_front())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.lock().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = MemoryInvalidationQueue::new(10);
        queue.push("1").await.unwrap();
        queue.push("2").await.unwrap();
        queue.push("1").await.unwrap();

        assert_eq!(queue.len().await.unwrap(), 3);
        assert_eq!(queue.pop().await.unwrap().as_deref(), Some("1"));
        assert_eq!(queue.pop().await.unwrap().as_deref(), Some("2"));
        assert_eq!(queue.pop().await.unwrap().as_deref(), Some("1"));
        assert_eq!(queue.pop().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_full_queue_drops_oldest() {
        let queue = MemoryInvalidationQueue::new(2);
        queue.push("a").await.unwrap();
        queue.push("b").await.unwrap();
        queue.push("c").await.unwrap();

        assert_eq!(queue.len().await.unwrap(), 2);
        assert_eq!(queue.pop().await.unwrap().as_deref(), Some("b"));
        assert_eq!(queue.pop().await.unwrap().as_deref(), Some("c"));
    }
}
