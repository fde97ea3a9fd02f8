//! Read path for paginated feeds with a cache-aside first page.

use std::sync::Arc;

use feedsync_core::feed::{FeedWindow, Post};
use feedsync_core::storage::{PostRepository, Result};

use crate::cache::TopFeedCache;

#[derive(Clone)]
pub struct FeedService {
    store: Arc<dyn PostRepository>,
    top_feed: TopFeedCache,
    top_window: FeedWindow,
}

impl FeedService {
    /// `top_window` must be the same window the refresh worker recomputes.
    pub fn new(store: Arc<dyn PostRepository>, top_feed: TopFeedCache, top_window: FeedWindow) -> Self {
        Self {
            store,
            top_feed,
            top_window,
        }
    }

    pub fn top_window(&self) -> FeedWindow {
        self.top_window
    }

    /// Returns one page of the user's feed.
    ///
    /// Only the top window is cached. A cache failure is logged and the
    /// durable store answers instead.
    pub async fn get_feed(&self, user_id: &str, window: FeedWindow) -> Result<Vec<Post>> {
        if window != self.top_window {
            return self.store.feed_page(user_id, window).await;
        }

        match self.top_feed.get(user_id).await {
            Ok(Some(posts)) => {
                tracing::trace!(user_id = %user_id, "Top feed cache hit");
                return Ok(posts);
            }
            Ok(None) => tracing::trace!(user_id = %user_id, "Top feed cache miss"),
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "Top feed cache read failed")
            }
        }

        let posts = self.store.feed_page(user_id, window).await?;
        if let Err(err) = self.top_feed.put(user_id, &posts).await {
            tracing::warn!(user_id = %user_id, error = %err, "Failed to cache top feed");
        }
        Ok(posts)
    }
}
