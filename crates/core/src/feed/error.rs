use thiserror::Error;

use crate::bus::BusError;
use crate::cache::{CacheError, SerializationError};
use crate::storage::RepositoryError;

/// Errors from validating post input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PostError {
    #[error("Post text must not be empty")]
    EmptyText,
    #[error("Post text is {length} characters, maximum is {max}")]
    TextTooLong { length: usize, max: usize },
}

/// Errors raised by the real-time distribution paths.
///
/// Absence of a cached page is not represented here: the cache seam reports
/// it as `Ok(None)` / `Ok(false)` and callers treat it as a miss.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DistributionError {
    /// A store or the message bus is unreachable or failing.
    #[error("Dependency error: {0}")]
    Dependency(String),
    /// A payload could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<RepositoryError> for DistributionError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Serialization(msg) => Self::Serialization(msg),
            other => Self::Dependency(other.to_string()),
        }
    }
}

impl From<CacheError> for DistributionError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Serialization(msg) => Self::Serialization(msg),
            other => Self::Dependency(other.to_string()),
        }
    }
}

impl From<BusError> for DistributionError {
    fn from(err: BusError) -> Self {
        Self::Dependency(err.to_string())
    }
}

impl From<SerializationError> for DistributionError {
    fn from(err: SerializationError) -> Self {
        Self::Serialization(err.to_string())
    }
}
