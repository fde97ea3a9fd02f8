mod error;
mod keys;
mod serialization;
mod traits;

pub use error::{CacheError, Result};
pub use keys::{bus_channel, top_feed_key, REFRESH_QUEUE_KEY, TOP_FEED_KEY_PREFIX};
pub use serialization::{
    deserialize_posts, serialize_post_view, serialize_posts, SerializationError,
};
pub use traits::{Cache, InvalidationQueue};
