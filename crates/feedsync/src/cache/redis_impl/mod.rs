//! Redis backends for multi-instance deployments.
//!
//! The top-feed cache and the invalidation queue live in Redis keys shared
//! by every instance, and the message bus rides on Redis pub/sub so a post
//! created on one instance reaches connections held by another.

mod bus;
mod cache;
mod error;
mod queue;

pub use bus::RedisBus;
pub use cache::RedisCache;
pub use queue::RedisInvalidationQueue;
