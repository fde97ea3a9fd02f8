pub mod error;
pub mod feed;
pub mod feed_ws;
pub mod friends;
pub mod health;
pub mod posts;
pub mod session;

pub use error::AppError;
