//! Shared helpers for integration tests.
#![allow(dead_code)] // Not every test binary uses every helper

use std::sync::Arc;

use joblink_server::notifications::NotificationEngine;
use joblink_server::server::websocket::ConnectionManager;
use joblink_server::SqliteStore;

/// A store over a fresh temp-file database. The tempdir is leaked for the
/// test's duration.
pub fn test_store() -> SqliteStore {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.into_path().join("notifications.db");
    SqliteStore::new(path).unwrap()
}

pub struct TestHarness {
    pub store: Arc<SqliteStore>,
    pub connections: Arc<ConnectionManager>,
    pub engine: Arc<NotificationEngine>,
}

pub fn test_harness() -> TestHarness {
    let store = Arc::new(test_store());
    let connections = Arc::new(ConnectionManager::new());
    let engine = Arc::new(NotificationEngine::new(store.clone(), connections.clone()));
    TestHarness {
        store,
        connections,
        engine,
    }
}
