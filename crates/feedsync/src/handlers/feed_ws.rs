//! WebSocket feed push (GET /api/feed/ws).
//!
//! Each socket gets a bounded outbound channel registered with the
//! distributor, which unregisters it once the socket loop drops the
//! receiving half. Frames from the client are read only to notice the close.

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};

use feedsync_core::feed::UserId;

use crate::{
    context::CurrentUser,
    realtime::{Connection, RegistryError},
    state::AppState,
};

pub async fn feed_ws(
    CurrentUser(user_id): CurrentUser,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, user_id, socket))
}

async fn handle_socket(state: AppState, user_id: UserId, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (connection, mut outbound) = Connection::channel(state.connection_buffer);
    let connection_id = connection.id();
    let mut shutdown = state.subscribe_shutdown();

    if let Err(err) = state.distributor.on_connection_opened(&user_id, connection).await {
        tracing::warn!(user_id = %user_id, error = %err, "Rejected feed connection");
        let code = match err {
            RegistryError::TooManyConnections { .. } => close_code::POLICY,
            RegistryError::Subscribe(_) => close_code::AGAIN,
        };
        let frame = CloseFrame {
            code,
            reason: err.to_string().into(),
        };
        let _ = sender.send(Message::Close(Some(frame))).await;
        return;
    }

    tracing::debug!(user_id = %user_id, connection_id = %connection_id, "Feed connection opened");

    loop {
        tokio::select! {
            payload = outbound.recv() => {
                let Some(payload) = payload else { break };
                if let Err(err) = sender.send(Message::Text(payload.into())).await {
                    tracing::debug!(user_id = %user_id, error = %err, "Feed socket write failed");
                    break;
                }
            }
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::debug!(user_id = %user_id, error = %err, "Feed socket read failed");
                        break;
                    }
                }
            }
            _ = shutdown.recv() => {
                let frame = CloseFrame {
                    code: close_code::AWAY,
                    reason: "server shutting down".into(),
                };
                let _ = sender.send(Message::Close(Some(frame))).await;
                break;
            }
        }
    }

    // The registry's close watcher unregisters once the receiver is gone
    drop(outbound);
    tracing::debug!(user_id = %user_id, connection_id = %connection_id, "Feed connection closed");
}
