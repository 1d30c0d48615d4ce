//! Real-time notification delivery over WebSocket.

pub mod connection;
pub mod handler;
pub mod messages;

pub use connection::ConnectionManager;
pub use handler::ws_handler;
