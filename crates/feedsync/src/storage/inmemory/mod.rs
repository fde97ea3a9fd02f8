//! In-memory storage backend.
//!
//! Stores posts and friend links in HashMaps wrapped in `Arc<RwLock<_>>`.
//! Useful for development and tests where persistence is not required.
//!
//! # Example
//!
//! ```rust,ignore
//! use feedsync::storage::inmemory::InMemoryRepository;
//!
//! let repo = InMemoryRepository::new();
//! ```

mod repository;

pub use repository::InMemoryRepository;
