//! WebSocket message types.
//!
//! A generic envelope carries every message; feature payloads travel as
//! JSON values so new message kinds do not touch the envelope.

use serde::{Deserialize, Serialize};

/// Server -> Client message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerMessage {
    /// Message type identifier (e.g., "connected", "notification_created")
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Feature-specific payload (JSON value)
    pub payload: serde_json::Value,
}

impl ServerMessage {
    pub fn new(msg_type: impl Into<String>, payload: impl Serialize) -> Self {
        Self {
            msg_type: msg_type.into(),
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn empty(msg_type: impl Into<String>) -> Self {
        Self {
            msg_type: msg_type.into(),
            payload: serde_json::Value::Null,
        }
    }
}

/// Client -> Server message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Reserved message type constants.
pub mod msg_types {
    /// Sent by server on successful connection.
    pub const CONNECTED: &str = "connected";
    /// Client heartbeat request.
    pub const PING: &str = "ping";
    /// Server heartbeat response.
    pub const PONG: &str = "pong";
    /// Server error response.
    pub const ERROR: &str = "error";
    /// A newly published notification (server -> client).
    pub const NOTIFICATION_CREATED: &str = "notification_created";
}

/// System-level messages used by the WebSocket infrastructure itself.
pub mod system {
    use serde::{Deserialize, Serialize};

    /// Sent immediately after the connection is established.
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct Connected {
        pub connection_id: usize,
        pub server_version: String,
    }

    /// Heartbeat response (server -> client).
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct Pong;

    /// Sent when the server cannot process a client message.
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct Error {
        pub code: String,
        pub message: String,
    }

    impl Error {
        pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
            Self {
                code: code.into(),
                message: message.into(),
            }
        }
    }
}

/// Notification delivery payloads.
pub mod notifications {
    use crate::notifications::Notification;
    use serde::{Deserialize, Serialize};

    /// Payload for `notification_created` messages: the full materialized
    /// notification as persisted, ids and timestamp included.
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct NotificationCreatedMessage {
        pub notification: Notification,
    }
}
