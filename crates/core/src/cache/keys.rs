/// Prefix of the per-user cached top-of-feed key.
pub const TOP_FEED_KEY_PREFIX: &str = "TopFeed:";

/// Key of the list holding pending invalidation signals.
pub const REFRESH_QUEUE_KEY: &str = "top_feed_queue";

/// Returns the cache key for a user's cached first feed page.
pub fn top_feed_key(user_id: &str) -> String {
    format!("{TOP_FEED_KEY_PREFIX}{user_id}")
}

/// Returns the broker channel carrying messages for one routing key of an
/// exchange.
///
/// Backends without native exchanges (Redis pub/sub) route on this name.
pub fn bus_channel(exchange: &str, routing_key: &str) -> String {
    format!("{exchange}.{routing_key}")
}
