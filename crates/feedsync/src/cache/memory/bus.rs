//! In-memory topic-exchange message bus.
//!
//! Mirrors the broker model used across instances: exchanges are declared
//! up front, exclusive queues are bound by routing key, and each queue
//! buffers deliveries until its consumer drains them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use feedsync_core::bus::{
    BusError, Consumer, ConsumerTag, Delivery, MessageBus, QueueHandle, Result, CONSUMER_BUFFER,
};

#[derive(Debug)]
struct QueueState {
    /// `(exchange, routing_key)` pairs this queue receives.
    bindings: HashSet<(String, String)>,
    sender: mpsc::Sender<Delivery>,
    /// Taken by the first `consume` call.
    receiver: Option<mpsc::Receiver<Delivery>>,
}

#[derive(Debug, Default)]
struct BusState {
    exchanges: HashSet<String>,
    queues: HashMap<String, QueueState>,
    /// Consumer tag to queue name.
    consumers: HashMap<ConsumerTag, String>,
}

/// In-memory message bus.
#[derive(Debug, Clone, Default)]
pub struct MemoryBus {
    state: Arc<Mutex<BusState>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live queues.
    #[cfg(test)]
    pub async fn queue_count(&self) -> usize {
        self.state.lock().await.queues.len()
    }

    /// Number of active consumers.
    #[cfg(test)]
    pub async fn consumer_count(&self) -> usize {
        self.state.lock().await.consumers.len()
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn declare_topic_exchange(&self, exchange: &str) -> Result<()> {
        self.state
            .lock()
            .await
            .exchanges
            .insert(exchange.to_string());
        Ok(())
    }

    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> Result<()> {
        let targets: Vec<mpsc::Sender<Delivery>> = {
            let state = self.state.lock().await;
            if !state.exchanges.contains(exchange) {
                return Err(BusError::ExchangeNotFound(exchange.to_string()));
            }
            let binding = (exchange.to_string(), routing_key.to_string());
            state
                .queues
                .values()
                .filter(|queue| queue.bindings.contains(&binding))
                .map(|queue| queue.sender.clone())
                .collect()
        };

        for sender in targets {
            let delivery = Delivery {
                routing_key: routing_key.to_string(),
                payload: payload.to_vec(),
            };
            // A closed channel means the queue was deleted after we looked it up
            let _ = sender.send(delivery).await;
        }

        Ok(())
    }

    async fn declare_exclusive_queue(&self) -> Result<QueueHandle> {
        let handle = QueueHandle::generated();
        let (sender, receiver) = mpsc::channel(CONSUMER_BUFFER);
        self.state.lock().await.queues.insert(
            handle.name().to_string(),
            QueueState {
                bindings: HashSet::new(),
                sender,
                receiver: Some(receiver),
            },
        );
        Ok(handle)
    }

    async fn bind(&self, queue: &QueueHandle, routing_key: &str, exchange: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.exchanges.contains(exchange) {
            return Err(BusError::ExchangeNotFound(exchange.to_string()));
        }
        let queue_state = state
            .queues
            .get_mut(queue.name())
            .ok_or_else(|| BusError::QueueNotFound(queue.name().to_string()))?;
        queue_state
            .bindings
            .insert((exchange.to_string(), routing_key.to_string()));
        Ok(())
    }

    async fn consume(&self, queue: &QueueHandle) -> Result<Consumer> {
        let mut state = self.state.lock().await;
        let queue_state = state
            .queues
            .get_mut(queue.name())
            .ok_or_else(|| BusError::QueueNotFound(queue.name().to_string()))?;
        let deliveries = queue_state.receiver.take().ok_or_else(|| {
            BusError::OperationFailed(format!("queue {} already has a consumer", queue.name()))
        })?;

        let tag = ConsumerTag::generated();
        state
            .consumers
            .insert(tag.clone(), queue.name().to_string());
        Ok(Consumer { tag, deliveries })
    }

    async fn cancel(&self, consumer: &ConsumerTag) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(queue_name) = state.consumers.remove(consumer) {
            // Dropping the queue drops its sender, which ends the delivery stream
            state.queues.remove(&queue_name);
        }
        Ok(())
    }

    async fn delete_queue(&self, queue: &QueueHandle) -> Result<()> {
        let mut state = self.state.lock().await;
        state.queues.remove(queue.name());
        state.consumers.retain(|_, name| name != queue.name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXCHANGE: &str = "feed_ws_topic";

    async fn bound_consumer(bus: &MemoryBus, routing_key: &str) -> Consumer {
        let queue = bus.declare_exclusive_queue().await.unwrap();
        bus.bind(&queue, routing_key, EXCHANGE).await.unwrap();
        bus.consume(&queue).await.unwrap()
    }

    #[tokio::test]
    async fn test_publish_routes_by_key() {
        let bus = MemoryBus::new();
        bus.declare_topic_exchange(EXCHANGE).await.unwrap();
        let mut alice = bound_consumer(&bus, "alice").await;
        let mut bob = bound_consumer(&bus, "bob").await;

        bus.publish(EXCHANGE, "alice", b"hello").await.unwrap();

        let delivery = alice.deliveries.recv().await.unwrap();
        assert_eq!(delivery.routing_key, "alice");
        assert_eq!(delivery.payload, b"hello");
        assert!(bob.deliveries.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_without_exchange_fails() {
        let bus = MemoryBus::new();
        let result = bus.publish("missing", "alice", b"x").await;
        assert!(matches!(result, Err(BusError::ExchangeNotFound(_))));
    }

    #[tokio::test]
    async fn test_publish_unbound_key_is_dropped() {
        let bus = MemoryBus::new();
        bus.declare_topic_exchange(EXCHANGE).await.unwrap();
        assert!(bus.publish(EXCHANGE, "nobody", b"x").await.is_ok());
    }

    #[tokio::test]
    async fn test_queue_buffers_before_consume() {
        let bus = MemoryBus::new();
        bus.declare_topic_exchange(EXCHANGE).await.unwrap();
        let queue = bus.declare_exclusive_queue().await.unwrap();
        bus.bind(&queue, "carol", EXCHANGE).await.unwrap();

        bus.publish(EXCHANGE, "carol", b"early").await.unwrap();
        let mut consumer = bus.consume(&queue).await.unwrap();

        assert_eq!(consumer.deliveries.recv().await.unwrap().payload, b"early");
    }

    #[tokio::test]
    async fn test_second_consume_fails() {
        let bus = MemoryBus::new();
        let queue = bus.declare_exclusive_queue().await.unwrap();
        let _consumer = bus.consume(&queue).await.unwrap();
        assert!(matches!(
            bus.consume(&queue).await,
            Err(BusError::OperationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_ends_stream_and_deletes_queue() {
        let bus = MemoryBus::new();
        bus.declare_topic_exchange(EXCHANGE).await.unwrap();
        let mut consumer = bound_consumer(&bus, "dave").await;
        assert_eq!(bus.queue_count().await, 1);

        bus.cancel(&consumer.tag).await.unwrap();

        assert!(consumer.deliveries.recv().await.is_none());
        assert_eq!(bus.queue_count().await, 0);
        assert_eq!(bus.consumer_count().await, 0);
        // Published messages are no longer routed anywhere
        bus.publish(EXCHANGE, "dave", b"late").await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_unknown_tag_is_noop() {
        let bus = MemoryBus::new();
        assert!(bus.cancel(&ConsumerTag::new("nope")).await.is_ok());
    }

    #[tokio::test]
    async fn test_bind_unknown_queue_fails() {
        let bus = MemoryBus::new();
        bus.declare_topic_exchange(EXCHANGE).await.unwrap();
        let result = bus
            .bind(&QueueHandle::new("ghost"), "alice", EXCHANGE)
            .await;
        assert!(matches!(result, Err(BusError::QueueNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_queue_releases_unconsumed_queue() {
        let bus = MemoryBus::new();
        bus.declare_topic_exchange(EXCHANGE).await.unwrap();
        let queue = bus.declare_exclusive_queue().await.unwrap();
        bus.bind(&queue, "erin", EXCHANGE).await.unwrap();

        bus.delete_queue(&queue).await.unwrap();

        assert_eq!(bus.queue_count().await, 0);
        assert!(matches!(
            bus.consume(&queue).await,
            Err(BusError::QueueNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_queue_drops_its_consumer() {
        let bus = MemoryBus::new();
        bus.declare_topic_exchange(EXCHANGE).await.unwrap();
        let queue = bus.declare_exclusive_queue().await.unwrap();
        let mut consumer = bus.consume(&queue).await.unwrap();

        bus.delete_queue(&queue).await.unwrap();

        assert!(consumer.deliveries.recv().await.is_none());
        assert_eq!(bus.consumer_count().await, 0);
    }
}
