//! Core types and seams for feedsync.
//!
//! Everything in this crate is pure: domain types, the traits that sit at the
//! external collaborator boundaries (cache, queue, message bus, durable
//! storage), error types and serialization helpers. All I/O lives in the
//! `feedsync` binary crate.

pub mod bus;
pub mod cache;
pub mod feed;
pub mod storage;
