//! Typed access to cached top-of-feed pages.

use std::sync::Arc;
use std::time::Duration;

use feedsync_core::cache::{
    deserialize_posts, serialize_posts, top_feed_key, Cache, CacheError, Result,
};
use feedsync_core::feed::Post;

/// Stores each user's first feed page under `TopFeed:{user_id}`.
///
/// An empty page is a legitimate cached value and is distinct from absence.
#[derive(Clone)]
pub struct TopFeedCache {
    cache: Arc<dyn Cache>,
    ttl: Option<Duration>,
}

impl TopFeedCache {
    pub fn new(cache: Arc<dyn Cache>, ttl: Option<Duration>) -> Self {
        Self { cache, ttl }
    }

    pub async fn exists(&self, user_id: &str) -> Result<bool> {
        self.cache.exists(&top_feed_key(user_id)).await
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<Vec<Post>>> {
        let Some(bytes) = self.cache.get(&top_feed_key(user_id)).await? else {
            return Ok(None);
        };
        deserialize_posts(&bytes)
            .map(Some)
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    pub async fn put(&self, user_id: &str, posts: &[Post]) -> Result<()> {
        let bytes = serialize_posts(posts).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.cache
            .set(&top_feed_key(user_id), &bytes, self.ttl)
            .await
    }

    pub async fn delete(&self, user_id: &str) -> Result<()> {
        self.cache.delete(&top_feed_key(user_id)).await
    }
}
