use async_trait::async_trait;

use super::{Consumer, ConsumerTag, QueueHandle, Result};

/// A topic-exchange message broker.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Declares a durable topic exchange. Declaring twice is a no-op.
    async fn declare_topic_exchange(&self, exchange: &str) -> Result<()>;

    /// Publishes a payload to every queue bound to `routing_key` on `exchange`.
    ///
    /// Publishing to a routing key nobody is bound to succeeds and the message
    /// is dropped.
    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> Result<()>;

    /// Declares a server-named exclusive queue.
    async fn declare_exclusive_queue(&self) -> Result<QueueHandle>;

    /// Binds a queue to `routing_key` on `exchange`.
    async fn bind(&self, queue: &QueueHandle, routing_key: &str, exchange: &str) -> Result<()>;

    /// Starts consuming a queue.
    ///
    /// Once this returns, every message published to a routing key the queue
    /// is bound to reaches the returned consumer.
    async fn consume(&self, queue: &QueueHandle) -> Result<Consumer>;

    /// Cancels a consumer and deletes its exclusive queue with its bindings.
    ///
    /// The consumer's delivery stream ends. Cancelling an unknown tag is a
    /// no-op.
    async fn cancel(&self, consumer: &ConsumerTag) -> Result<()>;

    /// Deletes an exclusive queue with its bindings and any consumer on it.
    ///
    /// Used to release a queue whose setup failed before a consumer was
    /// handed out. Deleting an unknown queue is a no-op.
    async fn delete_queue(&self, queue: &QueueHandle) -> Result<()>;
}
