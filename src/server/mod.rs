pub mod config;
mod event_routes;
mod http_layers;
mod notification_routes;
pub mod server;
pub(crate) mod session;
pub mod state;
pub mod websocket;

pub use config::ServerConfig;
pub use http_layers::*;
#[allow(unused_imports)] // Used by main.rs
pub use server::run_server;
