//! WebSocket route handler.
//!
//! Handles the upgrade, the message loops, and cleanup. The `Session`
//! extractor runs before the upgrade, so a connection without a verifiable
//! identity is rejected before it is ever bound to a channel.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error};

use super::connection::ConnectionManager;
use super::messages::{msg_types, system, ClientMessage, ServerMessage};
use crate::server::session::Session;
use crate::server::state::GuardedConnectionManager;

/// Route handler for `GET /v1/ws`.
///
/// `Session` is extracted ahead of the upgrade, so a request without a
/// verifiable identity is turned away before any upgrade handling.
pub async fn ws_handler(
    session: Session,
    ws: WebSocketUpgrade,
    State(connection_manager): State<GuardedConnectionManager>,
) -> Response {
    debug!(
        "WebSocket upgrade for user {} ({})",
        session.user_id,
        session.role.as_str()
    );
    ws.on_upgrade(move |socket| handle_socket(socket, session.user_id, connection_manager))
}

async fn handle_socket(socket: WebSocket, user_id: usize, manager: Arc<ConnectionManager>) {
    let (connection_id, outgoing_rx) = manager.register(user_id).await;
    debug!("WebSocket connected: user {} connection {}", user_id, connection_id);

    let (ws_sink, ws_stream) = socket.split();

    let connected_msg = ServerMessage::new(
        msg_types::CONNECTED,
        system::Connected {
            connection_id,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        },
    );

    let outgoing_handle = tokio::spawn(forward_outgoing(ws_sink, outgoing_rx, connected_msg));

    process_incoming(ws_stream, user_id, connection_id, &manager).await;

    debug!(
        "WebSocket disconnected: user {} connection {}",
        user_id, connection_id
    );
    outgoing_handle.abort();
    manager.unregister(user_id, connection_id).await;
}

/// Forward messages from the outgoing channel to the socket.
async fn forward_outgoing(
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut outgoing_rx: mpsc::Receiver<ServerMessage>,
    initial_msg: ServerMessage,
) {
    if let Ok(json) = serde_json::to_string(&initial_msg) {
        if ws_sink.send(Message::Text(json.into())).await.is_err() {
            return;
        }
    }

    while let Some(msg) = outgoing_rx.recv().await {
        match serde_json::to_string(&msg) {
            Ok(json) => {
                if ws_sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                error!("Failed to serialize WebSocket message: {}", e);
            }
        }
    }
}

/// Process incoming messages until the socket closes.
async fn process_incoming(
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    user_id: usize,
    connection_id: usize,
    manager: &ConnectionManager,
) {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => {
                    handle_client_message(user_id, connection_id, msg, manager).await;
                }
                Err(e) => {
                    debug!("Failed to parse client message: {}", e);
                    let error_msg = ServerMessage::new(
                        msg_types::ERROR,
                        system::Error::new("parse_error", format!("Invalid message format: {}", e)),
                    );
                    let _ = manager
                        .send_to_connection(user_id, connection_id, error_msg)
                        .await;
                }
            },
            Ok(Message::Binary(_)) => {
                debug!("Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                // tungstenite answers protocol-level pings on its own
            }
            Ok(Message::Close(_)) => {
                debug!("Received close frame");
                break;
            }
            Err(e) => {
                debug!("WebSocket error: {}", e);
                break;
            }
        }
    }
}

async fn handle_client_message(
    user_id: usize,
    connection_id: usize,
    msg: ClientMessage,
    manager: &ConnectionManager,
) {
    match msg.msg_type.as_str() {
        msg_types::PING => {
            let pong = ServerMessage::new(msg_types::PONG, system::Pong);
            let _ = manager.send_to_connection(user_id, connection_id, pong).await;
        }
        other => {
            // The notification stream is one-directional; clients only ping
            debug!("Unknown message type: {}", other);
            let error_msg = ServerMessage::new(
                msg_types::ERROR,
                system::Error::new("unknown_type", format!("Unknown message type: {}", other)),
            );
            let _ = manager
                .send_to_connection(user_id, connection_id, error_msg)
                .await;
        }
    }
}
