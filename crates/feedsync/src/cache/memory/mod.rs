//! In-memory backends for single-instance deployments.
//!
//! Provides an LRU cache with TTL support, a bounded invalidation queue and
//! a topic-exchange message bus, all living inside the process.

mod bus;
mod cache;
mod queue;

pub use bus::MemoryBus;
pub use cache::MemoryCache;
pub use queue::MemoryInvalidationQueue;
