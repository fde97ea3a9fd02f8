//! Application state shared by all request handlers.
//!
//! Backends are picked at compile time through cargo features; each
//! feature combination has its own `AppState::new` below. Everything past
//! construction only sees the seams from `feedsync_core`.

use std::sync::Arc;

use tokio::sync::broadcast;

use feedsync_core::bus::MessageBus;
use feedsync_core::cache::{Cache, InvalidationQueue};
use feedsync_core::storage::{PostRepository, SocialGraph};

use crate::cache::TopFeedCache;
use crate::config::Config;
use crate::feed_service::FeedService;
use crate::realtime::{ConnectionRegistry, FanoutPublisher, FeedDistributor, RefreshQueue};

#[derive(Clone)]
pub struct AppState {
    /// Durable post storage.
    pub posts: Arc<dyn PostRepository>,
    /// Friend links.
    pub graph: Arc<dyn SocialGraph>,
    /// Feed read path (cache-aside over `posts`).
    pub feed: FeedService,
    /// Live push, fan-out and cache refresh.
    pub distributor: FeedDistributor,
    /// Outbound buffer size for each WebSocket connection.
    pub connection_buffer: usize,
    /// Shutdown signal for WebSocket connections and the refresh worker.
    pub shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    fn build(
        posts: Arc<dyn PostRepository>,
        graph: Arc<dyn SocialGraph>,
        cache: Arc<dyn Cache>,
        queue: Arc<dyn InvalidationQueue>,
        bus: Arc<dyn MessageBus>,
        config: &Config,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let top_feed = TopFeedCache::new(cache, config.cache_ttl());
        let window = config.top_feed_window();

        let registry = ConnectionRegistry::new(
            bus.clone(),
            config.feed_exchange.clone(),
            config.max_connections_per_user,
        );
        let fanout = FanoutPublisher::new(bus, graph.clone(), config.feed_exchange.clone());
        let refresh = RefreshQueue::new(
            queue,
            top_feed.clone(),
            posts.clone(),
            graph.clone(),
            window,
            config.refresh_poll_interval(),
        );

        Self {
            feed: FeedService::new(posts.clone(), top_feed, window),
            distributor: FeedDistributor::new(registry, fanout, refresh),
            posts,
            graph,
            connection_buffer: config.connection_buffer.max(1),
            shutdown_tx,
        }
    }

    /// Builds the state from one store that backs both posts and friends.
    fn with_store<S>(
        store: Arc<S>,
        cache: Arc<dyn Cache>,
        queue: Arc<dyn InvalidationQueue>,
        bus: Arc<dyn MessageBus>,
        config: &Config,
    ) -> Self
    where
        S: PostRepository + SocialGraph + 'static,
    {
        Self::build(store.clone(), store, cache, queue, bus, config)
    }

    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn signal_shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(all(feature = "sqlite", feature = "memory"))]
mod sqlite_memory {
    use super::*;
    use crate::cache::memory::{MemoryBus, MemoryCache, MemoryInvalidationQueue};
    use crate::storage::SqliteRepository;

    impl AppState {
        /// Creates AppState with SQLite storage and in-process cache, queue and bus.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let store = Arc::new(SqliteRepository::new(&config.sqlite_path).await?);
            Ok(Self::with_store(
                store,
                Arc::new(MemoryCache::new(config.cache_max_entries)),
                Arc::new(MemoryInvalidationQueue::new(config.refresh_queue_capacity)),
                Arc::new(MemoryBus::new()),
                config,
            ))
        }
    }
}

#[cfg(all(feature = "sqlite", feature = "redis"))]
mod sqlite_redis {
    use super::*;
    use crate::cache::{RedisBus, RedisCache, RedisInvalidationQueue};
    use crate::storage::SqliteRepository;

    impl AppState {
        /// Creates AppState with SQLite storage and Redis cache, queue and bus.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let store = Arc::new(SqliteRepository::new(&config.sqlite_path).await?);
            let cache = Arc::new(RedisCache::new(&config.redis_url).await?);
            let queue = Arc::new(
                RedisInvalidationQueue::new(&config.redis_url, config.refresh_queue_capacity)
                    .await?,
            );
            let bus = Arc::new(RedisBus::new(&config.redis_url).await?);
            Ok(Self::with_store(store, cache, queue, bus, config))
        }
    }
}

#[cfg(all(feature = "inmemory", feature = "memory"))]
mod inmemory_memory {
    use super::*;
    use crate::cache::memory::{MemoryBus, MemoryCache, MemoryInvalidationQueue};
    use crate::storage::InMemoryRepository;

    impl AppState {
        /// Creates AppState with everything in process. Nothing survives a restart.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            Ok(Self::with_store(
                Arc::new(InMemoryRepository::new()),
                Arc::new(MemoryCache::new(config.cache_max_entries)),
                Arc::new(MemoryInvalidationQueue::new(config.refresh_queue_capacity)),
                Arc::new(MemoryBus::new()),
                config,
            ))
        }
    }
}

#[cfg(all(feature = "inmemory", feature = "redis"))]
mod inmemory_redis {
    use super::*;
    use crate::cache::{RedisBus, RedisCache, RedisInvalidationQueue};
    use crate::storage::InMemoryRepository;

    impl AppState {
        /// Creates AppState with in-process storage and Redis cache, queue and bus.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let cache = Arc::new(RedisCache::new(&config.redis_url).await?);
            let queue = Arc::new(
                RedisInvalidationQueue::new(&config.redis_url, config.refresh_queue_capacity)
                    .await?,
            );
            let bus = Arc::new(RedisBus::new(&config.redis_url).await?);
            Ok(Self::with_store(
                Arc::new(InMemoryRepository::new()),
                cache,
                queue,
                bus,
                config,
            ))
        }
    }
}
