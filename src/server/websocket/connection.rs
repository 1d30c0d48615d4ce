//! WebSocket connection manager.
//!
//! Tracks all active connections per user so the engine can fan a publish
//! out to every open session of a recipient. Owned by the serving process
//! and injected into the engine, never reached through global state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{mpsc, RwLock};

use super::messages::ServerMessage;

/// Error type for targeted send operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SendError {
    /// The target connection is not registered.
    NotConnected,
    /// The connection channel is closed (client went away).
    Disconnected,
}

/// Manages all active WebSocket connections, organized by user.
///
/// A user may hold several simultaneous connections (multiple open
/// sessions); each gets its own id and outgoing channel, and broadcasts
/// reach all of them.
pub struct ConnectionManager {
    /// user_id -> (connection_id -> outgoing sender)
    connections: RwLock<HashMap<usize, HashMap<usize, mpsc::Sender<ServerMessage>>>>,
    next_connection_id: AtomicUsize,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_connection_id: AtomicUsize::new(1),
        }
    }

    /// Register a new connection for a user.
    ///
    /// Returns the assigned connection id and a receiver for outgoing
    /// messages; the caller forwards messages from the receiver to the
    /// socket for the connection's lifetime.
    pub async fn register(&self, user_id: usize) -> (usize, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(32);
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);

        let mut conns = self.connections.write().await;
        conns.entry(user_id).or_default().insert(connection_id, tx);

        (connection_id, rx)
    }

    /// Unregister a connection (called on disconnect). Cleans up empty user
    /// entries.
    pub async fn unregister(&self, user_id: usize, connection_id: usize) {
        let mut conns = self.connections.write().await;
        if let Some(user_conns) = conns.get_mut(&user_id) {
            user_conns.remove(&connection_id);
            if user_conns.is_empty() {
                conns.remove(&user_id);
            }
        }
    }

    /// Send a message to one specific connection.
    pub async fn send_to_connection(
        &self,
        user_id: usize,
        connection_id: usize,
        message: ServerMessage,
    ) -> Result<(), SendError> {
        let conns = self.connections.read().await;
        if let Some(sender) = conns.get(&user_id).and_then(|c| c.get(&connection_id)) {
            return sender
                .send(message)
                .await
                .map_err(|_| SendError::Disconnected);
        }
        Err(SendError::NotConnected)
    }

    /// Send a message to every connection of a user. Fire-and-forget: a user
    /// with no connections receives nothing and that is not an error.
    ///
    /// Returns the connection ids that failed (already disconnected).
    pub async fn broadcast_to_user(&self, user_id: usize, message: ServerMessage) -> Vec<usize> {
        let conns = self.connections.read().await;
        let mut failed = Vec::new();

        if let Some(user_conns) = conns.get(&user_id) {
            for (connection_id, sender) in user_conns.iter() {
                if sender.send(message.clone()).await.is_err() {
                    failed.push(*connection_id);
                }
            }
        }

        failed
    }

    /// Number of live connections for a user.
    pub async fn connection_count(&self, user_id: usize) -> usize {
        let conns = self.connections.read().await;
        conns.get(&user_id).map(HashMap::len).unwrap_or(0)
    }

    /// Count of users with at least one live connection.
    pub async fn connected_user_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::websocket::messages::msg_types;

    #[test]
    fn send_error_variants_are_distinguishable() {
        assert_ne!(SendError::NotConnected, SendError::Disconnected);
    }

    #[tokio::test]
    async fn register_creates_valid_receiver() {
        let manager = ConnectionManager::new();
        let (connection_id, mut rx) = manager.register(1).await;

        manager
            .send_to_connection(1, connection_id, ServerMessage::empty("test"))
            .await
            .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.msg_type, "test");
    }

    #[tokio::test]
    async fn connection_ids_are_unique_across_users() {
        let manager = ConnectionManager::new();
        let (id_a, _rx_a) = manager.register(1).await;
        let (id_b, _rx_b) = manager.register(1).await;
        let (id_c, _rx_c) = manager.register(2).await;

        assert_ne!(id_a, id_b);
        assert_ne!(id_b, id_c);
        assert_ne!(id_a, id_c);
    }

    #[tokio::test]
    async fn unregister_removes_connection() {
        let manager = ConnectionManager::new();
        let (connection_id, _rx) = manager.register(1).await;

        assert_eq!(manager.connection_count(1).await, 1);
        manager.unregister(1, connection_id).await;
        assert_eq!(manager.connection_count(1).await, 0);
        assert_eq!(manager.connected_user_count().await, 0);
    }

    #[tokio::test]
    async fn send_to_unknown_connection_returns_not_connected() {
        let manager = ConnectionManager::new();

        let result = manager
            .send_to_connection(1, 99, ServerMessage::empty("test"))
            .await;

        assert_eq!(result, Err(SendError::NotConnected));
    }

    #[tokio::test]
    async fn broadcast_reaches_every_connection_of_the_user() {
        let manager = ConnectionManager::new();
        let (_id_a, mut rx_a) = manager.register(1).await;
        let (_id_b, mut rx_b) = manager.register(1).await;
        let (_id_c, mut rx_c) = manager.register(2).await;

        let failed = manager
            .broadcast_to_user(1, ServerMessage::empty(msg_types::NOTIFICATION_CREATED))
            .await;

        assert!(failed.is_empty());
        assert_eq!(rx_a.recv().await.unwrap().msg_type, msg_types::NOTIFICATION_CREATED);
        assert_eq!(rx_b.recv().await.unwrap().msg_type, msg_types::NOTIFICATION_CREATED);
        // Other users receive nothing
        assert!(rx_c.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_to_offline_user_is_a_silent_no_op() {
        let manager = ConnectionManager::new();

        let failed = manager
            .broadcast_to_user(42, ServerMessage::empty("test"))
            .await;

        assert!(failed.is_empty());
    }

    #[tokio::test]
    async fn broadcast_reports_dropped_connections() {
        let manager = ConnectionManager::new();
        let (_id_a, _rx_a) = manager.register(1).await;
        let (id_b, rx_b) = manager.register(1).await;
        drop(rx_b);

        let failed = manager
            .broadcast_to_user(1, ServerMessage::empty("test"))
            .await;

        assert_eq!(failed, vec![id_b]);
    }
}
