//! Background refresh of cached top-of-feed pages.
//!
//! Write paths enqueue "this user's page may be stale" signals; a single
//! worker drains them and recomputes only pages that are currently cached.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use feedsync_core::cache::InvalidationQueue;
use feedsync_core::feed::{DistributionError, FeedWindow, UserId};
use feedsync_core::storage::{PostRepository, SocialGraph};

use crate::cache::TopFeedCache;

/// What a single drain step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The queue was empty.
    Idle,
    /// The user had no cached page, so nothing was read or written.
    NotCached(UserId),
    /// The cached page was replaced with a fresh read.
    Refreshed { user_id: UserId, posts: usize },
    /// Recomputing failed and the stale page was deleted.
    Evicted(UserId),
    /// The queue or cache could not be reached.
    Failed { user_id: Option<UserId> },
}

impl RefreshOutcome {
    /// True when the worker should sleep before the next step.
    fn should_back_off(&self) -> bool {
        matches!(self, Self::Idle | Self::Failed { user_id: None })
    }
}

#[derive(Clone)]
pub struct RefreshQueue {
    queue: Arc<dyn InvalidationQueue>,
    top_feed: TopFeedCache,
    feed_store: Arc<dyn PostRepository>,
    graph: Arc<dyn SocialGraph>,
    window: FeedWindow,
    poll_interval: Duration,
}

impl RefreshQueue {
    pub fn new(
        queue: Arc<dyn InvalidationQueue>,
        top_feed: TopFeedCache,
        feed_store: Arc<dyn PostRepository>,
        graph: Arc<dyn SocialGraph>,
        window: FeedWindow,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            top_feed,
            feed_store,
            graph,
            window,
            poll_interval,
        }
    }

    /// Appends a signal for one user. Failures are logged only.
    pub async fn enqueue_invalidation(&self, user_id: &str) {
        if let Err(err) = self.queue.push(user_id).await {
            tracing::warn!(user_id = %user_id, error = %err, "Failed to enqueue feed invalidation");
        }
    }

    /// Appends one signal per user.
    pub async fn enqueue_for(&self, user_ids: &[UserId]) {
        for user_id in user_ids {
            self.enqueue_invalidation(user_id).await;
        }
    }

    /// Resolves the author's friends and enqueues a signal for each.
    ///
    /// Returns the number of signals enqueued.
    pub async fn enqueue_invalidation_for_friends(
        &self,
        author_id: &str,
    ) -> Result<usize, DistributionError> {
        let friends = self.graph.friends_of(author_id).await?;
        self.enqueue_for(&friends).await;
        Ok(friends.len())
    }

    pub async fn pending(&self) -> Result<usize, DistributionError> {
        Ok(self.queue.len().await?)
    }

    /// Processes at most one signal.
    pub async fn drain_once(&self) -> RefreshOutcome {
        let user_id = match self.queue.pop().await {
            Ok(Some(user_id)) => user_id,
            Ok(None) => return RefreshOutcome::Idle,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to pop from refresh queue");
                return RefreshOutcome::Failed { user_id: None };
            }
        };

        match self.top_feed.exists(&user_id).await {
            Ok(false) => {
                tracing::trace!(user_id = %user_id, "Feed not cached, skipping refresh");
                RefreshOutcome::NotCached(user_id)
            }
            Ok(true) => self.refresh(user_id).await,
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "Failed to check cached feed");
                RefreshOutcome::Failed {
                    user_id: Some(user_id),
                }
            }
        }
    }

    async fn refresh(&self, user_id: UserId) -> RefreshOutcome {
        let result = match self.feed_store.feed_page(&user_id, self.window).await {
            Ok(posts) => self
                .top_feed
                .put(&user_id, &posts)
                .await
                .map(|()| posts.len())
                .map_err(DistributionError::from),
            Err(err) => Err(DistributionError::from(err)),
        };

        match result {
            Ok(posts) => {
                tracing::debug!(user_id = %user_id, posts, "Refreshed cached feed");
                RefreshOutcome::Refreshed { user_id, posts }
            }
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "Feed refresh failed, evicting cached page");
                match self.top_feed.delete(&user_id).await {
                    Ok(()) => RefreshOutcome::Evicted(user_id),
                    Err(err) => {
                        tracing::error!(user_id = %user_id, error = %err, "Failed to evict stale feed page");
                        RefreshOutcome::Failed {
                            user_id: Some(user_id),
                        }
                    }
                }
            }
        }
    }

    /// Drains the queue until shutdown is signalled.
    ///
    /// Sleeps for the poll interval whenever the queue is empty. A failing
    /// signal never stops the loop.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            limit = self.window.limit,
            "Feed refresh worker started"
        );

        loop {
            match shutdown.try_recv() {
                Err(broadcast::error::TryRecvError::Empty) => {}
                _ => break,
            }

            if self.drain_once().await.should_back_off() {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }

        tracing::info!("Feed refresh worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use feedsync_core::feed::Post;

    use crate::cache::{MemoryCache, MemoryInvalidationQueue};
    use crate::testing::{CountingFeedStore, FailingCache, FailingGraph};

    struct Fixture {
        store: CountingFeedStore,
        top_feed: TopFeedCache,
        queue: MemoryInvalidationQueue,
        refresh: RefreshQueue,
    }

    fn fixture() -> Fixture {
        let store = CountingFeedStore::new();
        let top_feed = TopFeedCache::new(Arc::new(MemoryCache::new(100)), None);
        let queue = MemoryInvalidationQueue::new(100);
        let refresh = RefreshQueue::new(
            Arc::new(queue.clone()),
            top_feed.clone(),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            FeedWindow::top(2),
            Duration::from_millis(5),
        );
        Fixture {
            store,
            top_feed,
            queue,
            refresh,
        }
    }

    fn post_at(author: &str, minute: u32) -> Post {
        Post::new(author, format!("post {minute}"))
            .with_create_time(Utc.with_ymd_and_hms(2024, 1, 1, 9, minute, 0).unwrap())
    }

    #[tokio::test]
    async fn test_empty_queue_is_idle() {
        let f = fixture();
        assert_eq!(f.refresh.drain_once().await, RefreshOutcome::Idle);
    }

    #[tokio::test]
    async fn test_uncached_user_is_not_read_or_cached() {
        let f = fixture();
        f.refresh.enqueue_invalidation("7").await;

        assert_eq!(
            f.refresh.drain_once().await,
            RefreshOutcome::NotCached("7".to_string())
        );
        assert_eq!(f.store.feed_reads(), 0);
        assert!(!f.top_feed.exists("7").await.unwrap());
    }

    #[tokio::test]
    async fn test_cached_user_gets_fresh_first_page() {
        let f = fixture();
        f.store.add_friend_link("1", "2").await.unwrap();
        f.top_feed.put("1", &[]).await.unwrap();

        let older = post_at("2", 1);
        let middle = post_at("2", 2);
        let newest = post_at("2", 3);
        for post in [&older, &middle, &newest] {
            f.store.create_post(post).await.unwrap();
        }

        f.refresh.enqueue_invalidation("1").await;
        assert_eq!(
            f.refresh.drain_once().await,
            RefreshOutcome::Refreshed {
                user_id: "1".to_string(),
                posts: 2,
            }
        );

        let expected = f.store.feed_page("1", FeedWindow::top(2)).await.unwrap();
        assert_eq!(expected, vec![newest, middle]);
        assert_eq!(f.top_feed.get("1").await.unwrap(), Some(expected));
    }

    #[tokio::test]
    async fn test_duplicate_signals_converge() {
        let single = fixture();
        let repeated = fixture();
        for f in [&single, &repeated] {
            f.store.add_friend_link("1", "2").await.unwrap();
            f.store.create_post(&post_at("2", 5)).await.unwrap();
            f.top_feed.put("1", &[]).await.unwrap();
        }

        single.refresh.enqueue_invalidation("1").await;
        for _ in 0..5 {
            repeated.refresh.enqueue_invalidation("1").await;
        }
        while single.refresh.drain_once().await != RefreshOutcome::Idle {}
        while repeated.refresh.drain_once().await != RefreshOutcome::Idle {}

        let one = single.top_feed.get("1").await.unwrap().unwrap();
        let many = repeated.top_feed.get("1").await.unwrap().unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(
            one.iter().map(|p| &p.text).collect::<Vec<_>>(),
            many.iter().map(|p| &p.text).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_failed_recompute_evicts_page() {
        let f = fixture();
        f.top_feed.put("1", &[post_at("2", 1)]).await.unwrap();
        f.store.fail_feed(true);

        f.refresh.enqueue_invalidation("1").await;
        assert_eq!(
            f.refresh.drain_once().await,
            RefreshOutcome::Evicted("1".to_string())
        );
        assert!(!f.top_feed.exists("1").await.unwrap());
    }

    #[tokio::test]
    async fn test_cache_failure_is_reported() {
        let store = CountingFeedStore::new();
        let queue = MemoryInvalidationQueue::new(10);
        let refresh = RefreshQueue::new(
            Arc::new(queue),
            TopFeedCache::new(Arc::new(FailingCache), None),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            FeedWindow::top(30),
            Duration::from_millis(5),
        );

        refresh.enqueue_invalidation("1").await;
        assert_eq!(
            refresh.drain_once().await,
            RefreshOutcome::Failed {
                user_id: Some("1".to_string())
            }
        );
        assert_eq!(store.feed_reads(), 0);
    }

    #[tokio::test]
    async fn test_enqueue_for_friends() {
        let f = fixture();
        f.store.add_friend_link("a", "b").await.unwrap();
        f.store.add_friend_link("a", "c").await.unwrap();

        assert_eq!(f.refresh.enqueue_invalidation_for_friends("a").await, Ok(2));
        assert_eq!(f.queue.len().await.unwrap(), 2);
        assert_eq!(f.refresh.pending().await, Ok(2));
    }

    #[tokio::test]
    async fn test_enqueue_for_friends_graph_failure() {
        let f = fixture();
        let refresh = RefreshQueue::new(
            Arc::new(f.queue.clone()),
            f.top_feed.clone(),
            Arc::new(f.store.clone()),
            Arc::new(FailingGraph),
            FeedWindow::top(30),
            Duration::from_millis(5),
        );

        assert!(matches!(
            refresh.enqueue_invalidation_for_friends("a").await,
            Err(DistributionError::Dependency(_))
        ));
        assert_eq!(f.queue.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_worker_survives_and_stops_on_shutdown() {
        let f = fixture();
        f.store.add_friend_link("1", "2").await.unwrap();
        f.store.create_post(&post_at("2", 1)).await.unwrap();
        f.top_feed.put("1", &[]).await.unwrap();

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let worker = {
            let refresh = f.refresh.clone();
            tokio::spawn(async move { refresh.run(shutdown_rx).await })
        };

        // An uncached user first, then a cached one behind it
        f.refresh.enqueue_invalidation("7").await;
        f.refresh.enqueue_invalidation("1").await;

        let mut refreshed = false;
        for _ in 0..100 {
            if f.top_feed.get("1").await.unwrap().is_some_and(|p| p.len() == 1) {
                refreshed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(refreshed);
        assert!(!f.top_feed.exists("7").await.unwrap());
        assert!(!worker.is_finished());

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), worker)
            .await
            .unwrap()
            .unwrap();
    }
}
