//! Fan-out of new posts to the author's friends over the message bus.

use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;

use feedsync_core::bus::MessageBus;
use feedsync_core::cache::serialize_post_view;
use feedsync_core::feed::{DistributionError, Post, UserId};
use feedsync_core::storage::SocialGraph;

/// Outcome of one fan-out attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FanoutReport {
    pub published: usize,
    pub failed: usize,
}

/// Publishes each new post once per friend of its author, using the
/// friend's id as routing key.
#[derive(Clone)]
pub struct FanoutPublisher {
    bus: Arc<dyn MessageBus>,
    graph: Arc<dyn SocialGraph>,
    exchange: String,
}

impl FanoutPublisher {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        graph: Arc<dyn SocialGraph>,
        exchange: impl Into<String>,
    ) -> Self {
        Self {
            bus,
            graph,
            exchange: exchange.into(),
        }
    }

    pub async fn declare_exchange(&self) -> Result<(), DistributionError> {
        self.bus.declare_topic_exchange(&self.exchange).await?;
        tracing::info!(exchange = %self.exchange, "Declared feed exchange");
        Ok(())
    }

    /// Resolves the author's friends and publishes the post to each of them.
    pub async fn publish_new_post(
        &self,
        author_id: &str,
        post: &Post,
    ) -> Result<FanoutReport, DistributionError> {
        let friends = self.graph.friends_of(author_id).await?;
        self.publish_to(&friends, post).await
    }

    /// Publishes the post to an already resolved set of friends.
    ///
    /// The payload is serialized once. A failed publish to one friend does
    /// not affect the others.
    pub async fn publish_to(
        &self,
        friends: &[UserId],
        post: &Post,
    ) -> Result<FanoutReport, DistributionError> {
        let payload = serialize_post_view(post)?;

        let results = join_all(friends.iter().map(|friend_id| {
            let payload = &payload;
            async move {
                let result = self.bus.publish(&self.exchange, friend_id, payload).await;
                if let Err(err) = &result {
                    tracing::warn!(
                        post_id = %post.id,
                        friend_id = %friend_id,
                        error = %err,
                        "Failed to publish post to friend"
                    );
                }
                result.is_ok()
            }
        }))
        .await;

        let published = results.iter().filter(|ok| **ok).count();
        let report = FanoutReport {
            published,
            failed: results.len() - published,
        };
        tracing::debug!(
            post_id = %post.id,
            published = report.published,
            failed = report.failed,
            "Fanned out post"
        );
        Ok(report)
    }
}
