//! Redis pub/sub message bus.
//!
//! Redis has no exchanges or queues, so both are modelled locally: a
//! binding of `routing_key` on `exchange` is the channel
//! `"{exchange}.{routing_key}"`, and consuming a queue opens a dedicated
//! pub/sub connection subscribed to every bound channel.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::AsyncCommands;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use feedsync_core::bus::{
    BusError, Consumer, ConsumerTag, Delivery, MessageBus, QueueHandle, Result, CONSUMER_BUFFER,
};
use feedsync_core::cache::bus_channel;

use super::error::map_redis_bus_error;

#[derive(Default)]
struct BusState {
    exchanges: HashSet<String>,
    /// Queue name to `(exchange, routing_key)` bindings.
    queues: HashMap<String, Vec<(String, String)>>,
    /// Consumer tag to queue name and forwarding task.
    consumers: HashMap<ConsumerTag, (String, JoinHandle<()>)>,
}

/// Redis pub/sub backend for cross-instance fan-out.
pub struct RedisBus {
    client: redis::Client,
    conn: redis::aio::ConnectionManager,
    state: Arc<Mutex<BusState>>,
}

impl RedisBus {
    /// Creates a new Redis bus connection.
    ///
    /// # Errors
    ///
    /// Returns `BusError::ConnectionFailed` if the connection cannot be established.
    pub async fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_bus_error)?;
        let conn = redis::aio::ConnectionManager::new(client.clone())
            .await
            .map_err(map_redis_bus_error)?;
        Ok(Self {
            client,
            conn,
            state: Arc::new(Mutex::new(BusState::default())),
        })
    }
}

#[async_trait]
impl MessageBus for RedisBus {
    async fn declare_topic_exchange(&self, exchange: &str) -> Result<()> {
        self.state
            .lock()
            .await
            .exchanges
            .insert(exchange.to_string());
        Ok(())
    }

    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> Result<()> {
        if !self.state.lock().await.exchanges.contains(exchange) {
            return Err(BusError::ExchangeNotFound(exchange.to_string()));
        }

        let mut conn = self.conn.clone();
        conn.publish::<_, _, ()>(bus_channel(exchange, routing_key), payload)
            .await
            .map_err(|e| BusError::PublishFailed(e.to_string()))?;
        Ok(())
    }

    async fn declare_exclusive_queue(&self) -> Result<QueueHandle> {
        let handle = QueueHandle::generated();
        self.state
            .lock()
            .await
            .queues
            .insert(handle.name().to_string(), Vec::new());
        Ok(handle)
    }

    async fn bind(&self, queue: &QueueHandle, routing_key: &str, exchange: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.exchanges.contains(exchange) {
            return Err(BusError::ExchangeNotFound(exchange.to_string()));
        }
        let bindings = state
            .queues
            .get_mut(queue.name())
            .ok_or_else(|| BusError::QueueNotFound(queue.name().to_string()))?;
        bindings.push((exchange.to_string(), routing_key.to_string()));
        Ok(())
    }

    async fn consume(&self, queue: &QueueHandle) -> Result<Consumer> {
        let bindings = self
            .state
            .lock()
            .await
            .queues
            .get(queue.name())
            .cloned()
            .ok_or_else(|| BusError::QueueNotFound(queue.name().to_string()))?;

        // SUBSCRIBE is confirmed by the server before returning, so every
        // publish issued after this point reaches the stream.
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(map_redis_bus_error)?;
        for (exchange, routing_key) in &bindings {
            pubsub
                .subscribe(bus_channel(exchange, routing_key))
                .await
                .map_err(map_redis_bus_error)?;
        }

        let (tx, deliveries) = mpsc::channel(CONSUMER_BUFFER);
        let tag = ConsumerTag::generated();
        let task_tag = tag.clone();
        let prefixes: Vec<String> = bindings
            .iter()
            .map(|(exchange, _)| format!("{exchange}."))
            .collect();

        let task = tokio::spawn(async move {
            let mut stream = pubsub.into_on_message();
            while let Some(msg) = stream.next().await {
                let channel = msg.get_channel_name();
                let routing_key = prefixes
                    .iter()
                    .find_map(|prefix| channel.strip_prefix(prefix.as_str()))
                    .unwrap_or(channel)
                    .to_string();
                let delivery = Delivery {
                    routing_key,
                    payload: msg.get_payload_bytes().to_vec(),
                };
                if tx.send(delivery).await.is_err() {
                    break;
                }
            }
            tracing::debug!(consumer = %task_tag, "Redis subscription stream ended");
        });

        let mut state = self.state.lock().await;
        if !state.queues.contains_key(queue.name()) {
            // Deleted while we were subscribing
            task.abort();
            return Err(BusError::QueueNotFound(queue.name().to_string()));
        }
        state
            .consumers
            .insert(tag.clone(), (queue.name().to_string(), task));
        Ok(Consumer { tag, deliveries })
    }

    async fn cancel(&self, consumer: &ConsumerTag) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some((queue_name, task)) = state.consumers.remove(consumer) {
            // Aborting drops the pub/sub connection, which unsubscribes it
            task.abort();
            state.queues.remove(&queue_name);
        }
        Ok(())
    }

    async fn delete_queue(&self, queue: &QueueHandle) -> Result<()> {
        let mut state = self.state.lock().await;
        state.queues.remove(queue.name());
        state.consumers.retain(|_, (name, task)| {
            if name == queue.name() {
                task.abort();
                false
            } else {
                true
            }
        });
        Ok(())
    }
}
