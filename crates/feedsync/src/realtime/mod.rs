//! Real-time feed distribution.
//!
//! [`FeedDistributor`] is the entry point used by the HTTP layer. It ties
//! together the connection registry (live push to connected users), the
//! fan-out publisher (new posts onto the bus) and the refresh queue
//! (background maintenance of cached first pages).

mod connection;
mod fanout;
mod refresh;
mod registry;

use serde::Serialize;
use tokio::sync::broadcast;

use feedsync_core::feed::{DistributionError, Post};

pub use connection::Connection;
pub use fanout::{FanoutPublisher, FanoutReport};
pub use refresh::RefreshQueue;
pub use registry::{ConnectionRegistry, RegistryError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DistributorStats {
    pub subscribed_users: usize,
    pub open_connections: usize,
    pub pending_refreshes: usize,
}

#[derive(Clone)]
pub struct FeedDistributor {
    registry: ConnectionRegistry,
    fanout: FanoutPublisher,
    refresh: RefreshQueue,
}

impl FeedDistributor {
    pub fn new(
        registry: ConnectionRegistry,
        fanout: FanoutPublisher,
        refresh: RefreshQueue,
    ) -> Self {
        Self {
            registry,
            fanout,
            refresh,
        }
    }

    #[cfg(test)]
    pub fn refresh_queue(&self) -> &RefreshQueue {
        &self.refresh
    }

    /// Declares the bus topology. Called once at startup.
    pub async fn declare(&self) -> Result<(), DistributionError> {
        self.fanout.declare_exchange().await
    }

    /// Starts pushing feed updates to an authenticated connection.
    pub async fn on_connection_opened(
        &self,
        user_id: &str,
        connection: Connection,
    ) -> Result<(), RegistryError> {
        self.registry.register(user_id, connection).await
    }

    /// Distributes a freshly persisted post.
    ///
    /// Fan-out and invalidation of the friends' cached pages run
    /// concurrently, each resolving the author's friends. Only the fan-out's
    /// friend resolution is reported to the caller; everything else is
    /// logged.
    pub async fn on_post_created(
        &self,
        author_id: &str,
        post: &Post,
    ) -> Result<FanoutReport, DistributionError> {
        let (fanout, ()) = tokio::join!(
            self.fanout.publish_new_post(author_id, post),
            self.invalidate_for_friends_of(author_id),
        );

        match fanout {
            Ok(report) => {
                tracing::info!(
                    author_id = %author_id,
                    post_id = %post.id,
                    published = report.published,
                    failed = report.failed,
                    "Distributed new post"
                );
                Ok(report)
            }
            Err(err @ DistributionError::Dependency(_)) => Err(err),
            Err(err) => {
                tracing::error!(
                    author_id = %author_id,
                    post_id = %post.id,
                    error = %err,
                    "Failed to fan out new post"
                );
                Ok(FanoutReport::default())
            }
        }
    }

    /// Marks the user's own cached page as stale (on login, friend changes).
    pub async fn invalidate_for_user(&self, user_id: &str) {
        self.refresh.enqueue_invalidation(user_id).await;
    }

    /// Marks the cached page of every friend of the user as stale.
    pub async fn invalidate_for_friends_of(&self, user_id: &str) {
        if let Err(err) = self.refresh.enqueue_invalidation_for_friends(user_id).await {
            tracing::warn!(user_id = %user_id, error = %err, "Failed to invalidate friends' feeds");
        }
    }

    /// Runs the refresh worker until shutdown. Started once per process.
    pub async fn run_refresh_worker(&self, shutdown: broadcast::Receiver<()>) {
        self.refresh.run(shutdown).await
    }

    pub async fn stats(&self) -> DistributorStats {
        let registry = self.registry.stats().await;
        let pending_refreshes = self.refresh.pending().await.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Failed to read refresh queue length");
            0
        });
        DistributorStats {
            subscribed_users: registry.users,
            open_connections: registry.connections,
            pending_refreshes,
        }
    }
}
