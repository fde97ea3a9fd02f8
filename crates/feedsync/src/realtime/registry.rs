//! Connection registry and subscription bridge.
//!
//! Owns the live connections of every user and ties them to the user's bus
//! subscription: a user is subscribed exactly while they have at least one
//! registered connection. Every transition happens under a single lock, so
//! concurrent connects never create a second consumer and the last
//! disconnect always cancels the one that exists.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use feedsync_core::bus::{BusError, Consumer, ConsumerTag, MessageBus};
use feedsync_core::feed::UserId;

use super::connection::{Connection, ConnectionId};

/// Pause between resubscribe attempts while the bus is unavailable.
const RESUBSCRIBE_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Failed to subscribe: {0}")]
    Subscribe(#[from] BusError),
    #[error("User {user_id} already has {max} open connections")]
    TooManyConnections { user_id: UserId, max: usize },
}

/// Snapshot of registry occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub users: usize,
    pub connections: usize,
}

/// The active bus consumer of one user.
struct Subscription {
    tag: ConsumerTag,
    task: JoinHandle<()>,
}

struct UserEntry {
    /// Never empty while the entry is in the map.
    connections: Vec<Connection>,
    subscription: Subscription,
}

struct RegistryInner {
    bus: Arc<dyn MessageBus>,
    exchange: String,
    max_connections_per_user: usize,
    users: Mutex<HashMap<UserId, UserEntry>>,
}

/// Registry of live connections keyed by user id.
#[derive(Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RegistryInner>,
}

impl ConnectionRegistry {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        exchange: impl Into<String>,
        max_connections_per_user: usize,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                bus,
                exchange: exchange.into(),
                max_connections_per_user: max_connections_per_user.max(1),
                users: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Adds a connection for a user.
    ///
    /// On the user's first connection the bus subscription is established
    /// before the connection becomes visible, so a message published after
    /// this returns reaches it. A watcher task unregisters the connection
    /// once its transport closes.
    pub async fn register(&self, user_id: &str, connection: Connection) -> Result<(), RegistryError> {
        {
            let mut users = self.inner.users.lock().await;
            match users.get_mut(user_id) {
                Some(entry) => {
                    if entry.connections.len() >= self.inner.max_connections_per_user {
                        return Err(RegistryError::TooManyConnections {
                            user_id: user_id.to_string(),
                            max: self.inner.max_connections_per_user,
                        });
                    }
                    entry.connections.push(connection.clone());
                }
                None => {
                    let subscription = self.subscribe(user_id).await?;
                    tracing::info!(
                        user_id = %user_id,
                        consumer = %subscription.tag,
                        "Subscribed user to feed updates"
                    );
                    users.insert(
                        user_id.to_string(),
                        UserEntry {
                            connections: vec![connection.clone()],
                            subscription,
                        },
                    );
                }
            }
        }

        tracing::debug!(user_id = %user_id, connection_id = %connection.id(), "Connection registered");
        self.watch_close(user_id.to_string(), connection);
        Ok(())
    }

    /// Removes a connection, cancelling the user's subscription if it was
    /// the last one. Returns false if the connection was not registered.
    pub async fn unregister(&self, user_id: &str, connection_id: ConnectionId) -> bool {
        let mut users = self.inner.users.lock().await;
        let Entry::Occupied(mut occupied) = users.entry(user_id.to_string()) else {
            return false;
        };

        let connections = &mut occupied.get_mut().connections;
        let before = connections.len();
        connections.retain(|c| c.id() != connection_id);
        let removed = connections.len() != before;

        if removed {
            tracing::debug!(user_id = %user_id, connection_id = %connection_id, "Connection unregistered");
        }

        if occupied.get().connections.is_empty() {
            let entry = occupied.remove();
            entry.subscription.task.abort();
            if let Err(err) = self.inner.bus.cancel(&entry.subscription.tag).await {
                tracing::warn!(
                    user_id = %user_id,
                    consumer = %entry.subscription.tag,
                    error = %err,
                    "Failed to cancel feed consumer"
                );
            }
            tracing::info!(user_id = %user_id, "Unsubscribed user from feed updates");
        }

        removed
    }

    /// Writes a payload to every open connection of a user.
    ///
    /// Returns how many connections accepted it. A failed write is logged and
    /// does not stop delivery to the others; a user with no connections is a
    /// no-op.
    pub async fn deliver(&self, user_id: &str, payload: &str) -> usize {
        let users = self.inner.users.lock().await;
        let Some(entry) = users.get(user_id) else {
            tracing::trace!(user_id = %user_id, "No open connections, dropping delivery");
            return 0;
        };

        let mut delivered = 0;
        for connection in &entry.connections {
            match connection.send(payload.to_string()) {
                Ok(()) => delivered += 1,
                Err(err) => tracing::warn!(
                    user_id = %user_id,
                    connection_id = %connection.id(),
                    error = %err,
                    "Failed to push feed update"
                ),
            }
        }
        delivered
    }

    #[cfg(test)]
    pub async fn is_subscribed(&self, user_id: &str) -> bool {
        self.inner.users.lock().await.contains_key(user_id)
    }

    #[cfg(test)]
    pub async fn connection_count(&self, user_id: &str) -> usize {
        self.inner
            .users
            .lock()
            .await
            .get(user_id)
            .map_or(0, |entry| entry.connections.len())
    }

    pub async fn stats(&self) -> RegistryStats {
        let users = self.inner.users.lock().await;
        RegistryStats {
            users: users.len(),
            connections: users.values().map(|e| e.connections.len()).sum(),
        }
    }

    /// Starts the user's bus consumer and the task forwarding its deliveries.
    ///
    /// Called with the registry lock held.
    async fn subscribe(&self, user_id: &str) -> Result<Subscription, BusError> {
        let consumer = self.open_consumer(user_id).await?;
        let tag = consumer.tag.clone();
        let task = tokio::spawn(forward_deliveries(
            Arc::downgrade(&self.inner),
            user_id.to_string(),
            consumer,
        ));
        Ok(Subscription { tag, task })
    }

    /// Declares, binds and starts consuming a fresh exclusive queue.
    ///
    /// A queue whose bind or consume fails is deleted before returning.
    async fn open_consumer(&self, user_id: &str) -> Result<Consumer, BusError> {
        let bus = &self.inner.bus;
        let queue = bus.declare_exclusive_queue().await?;

        let consumer = match bus.bind(&queue, user_id, &self.inner.exchange).await {
            Ok(()) => bus.consume(&queue).await,
            Err(err) => Err(err),
        };

        if consumer.is_err() {
            if let Err(err) = bus.delete_queue(&queue).await {
                tracing::warn!(
                    user_id = %user_id,
                    queue = %queue.name(),
                    error = %err,
                    "Failed to delete feed queue after subscribe failure"
                );
            }
        }
        consumer
    }

    /// Replaces a consumer whose delivery stream ended without a cancel.
    ///
    /// Returns `Ok(None)` when `ended` is no longer the user's consumer,
    /// meaning the user went offline and nothing should be replaced.
    async fn resubscribe(
        &self,
        user_id: &str,
        ended: &ConsumerTag,
    ) -> Result<Option<Consumer>, BusError> {
        let mut users = self.inner.users.lock().await;
        let Some(entry) = users.get_mut(user_id) else {
            return Ok(None);
        };
        if entry.subscription.tag != *ended {
            return Ok(None);
        }

        // Releases whatever the broker still holds for the dead consumer
        if let Err(err) = self.inner.bus.cancel(ended).await {
            tracing::debug!(user_id = %user_id, consumer = %ended, error = %err, "Failed to cancel ended consumer");
        }

        let consumer = self.open_consumer(user_id).await?;
        entry.subscription.tag = consumer.tag.clone();
        Ok(Some(consumer))
    }

    fn watch_close(&self, user_id: UserId, connection: Connection) {
        let registry = self.clone();
        tokio::spawn(async move {
            connection.closed().await;
            registry.unregister(&user_id, connection.id()).await;
        });
    }
}

/// Forwards a user's deliveries to their connections until the user goes
/// offline. A stream that ends while the user is still connected is replaced
/// with a new consumer, retrying while the bus stays unavailable.
async fn forward_deliveries(registry: Weak<RegistryInner>, owner: UserId, mut consumer: Consumer) {
    loop {
        while let Some(delivery) = consumer.deliveries.recv().await {
            let Some(inner) = registry.upgrade() else {
                return;
            };
            match String::from_utf8(delivery.payload) {
                Ok(payload) => {
                    ConnectionRegistry { inner }.deliver(&owner, &payload).await;
                }
                Err(err) => tracing::warn!(
                    user_id = %owner,
                    error = %err,
                    "Dropping non UTF-8 feed message"
                ),
            }
        }

        let Some(inner) = registry.upgrade() else {
            return;
        };
        match (ConnectionRegistry { inner }).resubscribe(&owner, &consumer.tag).await {
            Ok(Some(next)) => {
                tracing::info!(
                    user_id = %owner,
                    consumer = %next.tag,
                    "Feed consumer stream ended, resubscribed"
                );
                consumer = next;
            }
            Ok(None) => {
                tracing::debug!(user_id = %owner, "Feed consumer stopped");
                return;
            }
            Err(err) => {
                tracing::warn!(user_id = %owner, error = %err, "Failed to resubscribe feed consumer");
                tokio::time::sleep(RESUBSCRIBE_BACKOFF).await;
            }
        }
    }
}
