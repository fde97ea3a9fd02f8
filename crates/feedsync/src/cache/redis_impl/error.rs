//! Redis error mapping to the cache and bus error types.

use feedsync_core::bus::BusError;
use feedsync_core::cache::CacheError;

fn is_connection_error(err: &redis::RedisError) -> bool {
    err.is_connection_refusal() || err.is_timeout() || err.is_connection_dropped()
}

/// Maps Redis errors to CacheError.
pub fn map_redis_error(err: redis::RedisError) -> CacheError {
    if is_connection_error(&err) {
        CacheError::ConnectionFailed(err.to_string())
    } else {
        CacheError::OperationFailed(err.to_string())
    }
}

/// Maps Redis errors to BusError.
pub fn map_redis_bus_error(err: redis::RedisError) -> BusError {
    if is_connection_error(&err) {
        BusError::ConnectionFailed(err.to_string())
    } else {
        BusError::OperationFailed(err.to_string())
    }
}
