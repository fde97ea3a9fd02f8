use std::fmt;

use tokio::sync::mpsc;
use uuid::Uuid;

/// Buffer size of a consumer's delivery channel.
pub const CONSUMER_BUFFER: usize = 256;

/// Handle to a queue declared on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueHandle {
    name: String,
}

impl QueueHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Generates a broker-style unique name for an exclusive queue.
    pub fn generated() -> Self {
        Self::new(format!("amq.gen-{}", Uuid::new_v4().simple()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Identifies an active consumer so it can be cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConsumerTag(String);

impl ConsumerTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn generated() -> Self {
        Self(format!("ctag-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsumerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message routed to a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub routing_key: String,
    pub payload: Vec<u8>,
}

/// An active consumer: its tag plus the stream of deliveries.
///
/// The stream ends once the consumer is cancelled.
#[derive(Debug)]
pub struct Consumer {
    pub tag: ConsumerTag,
    pub deliveries: mpsc::Receiver<Delivery>,
}
