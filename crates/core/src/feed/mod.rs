mod error;
mod operations;
mod types;
mod window;

pub use error::{DistributionError, PostError};
pub use operations::{validate_post_text, MAX_POST_LENGTH};
pub use types::{Post, PostView, UserId, CREATE_TIME_FORMAT};
pub use window::{FeedWindow, DEFAULT_TOP_FEED_LIMIT};
