use axum::extract::FromRef;

use crate::directory::JobDirectory;
use crate::notifications::{FullStore, NotificationEngine};
use std::sync::Arc;
use std::time::Instant;

use super::websocket::ConnectionManager;
use super::ServerConfig;

pub type GuardedStore = Arc<dyn FullStore>;
pub type GuardedEngine = Arc<NotificationEngine>;
pub type GuardedDirectory = Arc<dyn JobDirectory>;
pub type GuardedConnectionManager = Arc<ConnectionManager>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub store: GuardedStore,
    pub engine: GuardedEngine,
    pub directory: GuardedDirectory,
    pub ws_connection_manager: GuardedConnectionManager,
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedStore {
    fn from_ref(input: &ServerState) -> Self {
        input.store.clone()
    }
}

impl FromRef<ServerState> for GuardedEngine {
    fn from_ref(input: &ServerState) -> Self {
        input.engine.clone()
    }
}

impl FromRef<ServerState> for GuardedDirectory {
    fn from_ref(input: &ServerState) -> Self {
        input.directory.clone()
    }
}

impl FromRef<ServerState> for GuardedConnectionManager {
    fn from_ref(input: &ServerState) -> Self {
        input.ws_connection_manager.clone()
    }
}
