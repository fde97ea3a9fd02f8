//! Cache, refresh-queue and message-bus backends.
//!
//! Concrete implementations of the seams defined in `feedsync_core::cache`
//! and `feedsync_core::bus`, selected at compile time via feature flags.
//!
//! # Feature Flags
//!
//! - `memory` (default): single-process backends built on tokio primitives
//! - `redis`: Redis key-value cache, Redis list queue and Redis pub/sub bus
//!
//! These features are mutually exclusive - only one cache backend can be
//! enabled at a time. The memory backends are also compiled for tests so
//! the distribution paths can be exercised without a Redis server.

#[cfg(all(feature = "memory", feature = "redis"))]
compile_error!(
    "Features 'memory' and 'redis' are mutually exclusive. \
    Enable only one cache backend at a time."
);

#[cfg(not(any(feature = "memory", feature = "redis")))]
compile_error!(
    "No cache backend selected. Enable 'memory' or 'redis' feature. \
    Example: cargo build -p feedsync --features memory"
);

#[cfg(any(feature = "memory", test))]
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis_impl;

mod top_feed;

pub use top_feed::TopFeedCache;

#[cfg(any(feature = "memory", test))]
#[allow(unused_imports)]
pub use memory::{MemoryBus, MemoryCache, MemoryInvalidationQueue};

#[cfg(feature = "redis")]
#[allow(unused_imports)]
pub use redis_impl::{RedisBus, RedisCache, RedisInvalidationQueue};
