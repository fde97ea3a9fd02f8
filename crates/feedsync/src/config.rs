use std::{env, str::FromStr, time::Duration};

use feedsync_core::feed::{FeedWindow, DEFAULT_TOP_FEED_LIMIT};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// TTL of cached top-feed pages in seconds, 0 disables expiry (default: 3600)
    pub cache_ttl_seconds: u64,
    /// Maximum number of in-memory cache entries (default: 10,000)
    pub cache_max_entries: usize,
    /// Path to SQLite database file (default: "feedsync.db")
    #[cfg_attr(not(feature = "sqlite"), allow(dead_code))]
    pub sqlite_path: String,
    /// Redis connection URL (default: "redis://localhost:6379")
    #[cfg_attr(not(feature = "redis"), allow(dead_code))]
    pub redis_url: String,
    /// Page size of the cached first feed page (default: 30)
    pub top_feed_limit: usize,
    /// Idle sleep of the refresh worker in milliseconds (default: 50)
    pub refresh_poll_interval_ms: u64,
    /// Maximum pending invalidation signals, oldest dropped first (default: 100,000)
    pub refresh_queue_capacity: usize,
    /// Maximum simultaneous real-time connections per user (default: 16)
    pub max_connections_per_user: usize,
    /// Outbound message buffer per real-time connection (default: 64)
    pub connection_buffer: usize,
    /// Name of the topic exchange used for fan-out (default: "feed_ws_topic")
    pub feed_exchange: String,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CACHE_TTL_SECONDS` - Cached page TTL in seconds (default: 3600)
    /// - `CACHE_MAX_ENTRIES` - Maximum in-memory cache entries (default: 10,000)
    /// - `SQLITE_PATH` - SQLite database path (default: "feedsync.db")
    /// - `REDIS_URL` - Redis connection URL (default: "redis://localhost:6379")
    /// - `TOP_FEED_LIMIT` - Cached page size (default: 30)
    /// - `REFRESH_POLL_INTERVAL_MS` - Refresh worker idle sleep (default: 50)
    /// - `REFRESH_QUEUE_CAPACITY` - Pending invalidation bound (default: 100,000)
    /// - `MAX_CONNECTIONS_PER_USER` - Real-time connection bound (default: 16)
    /// - `CONNECTION_BUFFER` - Outbound buffer per connection (default: 64)
    /// - `FEED_EXCHANGE` - Fan-out exchange name (default: "feed_ws_topic")
    pub fn from_env() -> Self {
        Self {
            cache_ttl_seconds: env_or("CACHE_TTL_SECONDS", 3600),
            cache_max_entries: env_or("CACHE_MAX_ENTRIES", 10_000),
            sqlite_path: env::var("SQLITE_PATH").unwrap_or_else(|_| "feedsync.db".to_string()),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            top_feed_limit: env_or("TOP_FEED_LIMIT", DEFAULT_TOP_FEED_LIMIT),
            refresh_poll_interval_ms: env_or("REFRESH_POLL_INTERVAL_MS", 50),
            refresh_queue_capacity: env_or("REFRESH_QUEUE_CAPACITY", 100_000),
            max_connections_per_user: env_or("MAX_CONNECTIONS_PER_USER", 16),
            connection_buffer: env_or("CONNECTION_BUFFER", 64),
            feed_exchange: env::var("FEED_EXCHANGE")
                .unwrap_or_else(|_| "feed_ws_topic".to_string()),
        }
    }

    /// Get cache TTL as a Duration, `None` when expiry is disabled.
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_seconds > 0).then(|| Duration::from_secs(self.cache_ttl_seconds))
    }

    /// The cached feed window shared by the read path and the refresh worker.
    pub fn top_feed_window(&self) -> FeedWindow {
        FeedWindow::top(self.top_feed_limit.max(1))
    }

    pub fn refresh_poll_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_poll_interval_ms.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
