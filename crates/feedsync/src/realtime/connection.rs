//! Handle to one live real-time connection.

use std::fmt;

use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique identifier of a registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    #[error("Outbound buffer is full")]
    Full,
    #[error("Connection is closed")]
    Closed,
}

/// The send half of a real-time connection.
///
/// The transport owns the matching receiver and writes every payload it
/// yields to the socket. Dropping that receiver is how the transport signals
/// that the connection closed.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    outbound: mpsc::Sender<String>,
}

impl Connection {
    pub fn new(outbound: mpsc::Sender<String>) -> Self {
        Self {
            id: ConnectionId::new(),
            outbound,
        }
    }

    /// Creates a connection together with the receiver its transport drains.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues a payload without waiting.
    pub fn send(&self, payload: String) -> Result<(), SendError> {
        self.outbound.try_send(payload).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Completes once the transport has dropped its receiver.
    pub async fn closed(&self) {
        self.outbound.closed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_reaches_receiver() {
        let (conn, mut rx) = Connection::channel(4);
        conn.send("hello".to_string()).unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_full_buffer_is_reported() {
        let (conn, _rx) = Connection::channel(1);
        conn.send("a".to_string()).unwrap();
        assert_eq!(conn.send("b".to_string()), Err(SendError::Full));
    }

    #[tokio::test]
    async fn test_dropped_receiver_closes_connection() {
        let (conn, rx) = Connection::channel(1);
        drop(rx);

        conn.closed().await;
        assert_eq!(conn.send("late".to_string()), Err(SendError::Closed));
    }

    #[test]
    fn test_ids_are_unique() {
        let (a, _ra) = Connection::channel(1);
        let (b, _rb) = Connection::channel(1);
        assert_ne!(a.id(), b.id());
    }
}
