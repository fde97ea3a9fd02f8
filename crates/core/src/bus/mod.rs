//! Message bus seam.
//!
//! The fan-out backbone is modelled on a broker with a single topic exchange
//! and per-user exclusive queues bound with the user id as routing key.

mod error;
mod traits;
mod types;

pub use error::{BusError, Result};
pub use traits::MessageBus;
pub use types::{Consumer, ConsumerTag, Delivery, QueueHandle, CONSUMER_BUFFER};
