use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::State,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::directory::JobDirectory;
use crate::notifications::{FullStore, NotificationEngine};

use super::event_routes::make_event_routes;
use super::notification_routes::make_notification_routes;
use super::session::Session;
use super::state::*;
use super::websocket::{ws_handler, ConnectionManager};
use super::{log_requests, RequestsLoggingLevel, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(_session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    Json(stats)
}

pub fn make_app(
    config: ServerConfig,
    store: Arc<dyn FullStore>,
    engine: Arc<NotificationEngine>,
    directory: Arc<dyn JobDirectory>,
    ws_connection_manager: Arc<ConnectionManager>,
) -> Router {
    let state = ServerState {
        config,
        start_time: Instant::now(),
        store,
        engine,
        directory,
        ws_connection_manager,
    };

    let notification_routes = make_notification_routes(state.clone());
    let event_routes = make_event_routes(state.clone());

    let app: Router = Router::new()
        .route("/", get(home))
        .route("/v1/ws", get(ws_handler))
        .with_state(state.clone())
        .nest("/v1/notifications", notification_routes)
        .nest("/v1/events", event_routes);

    app.layer(middleware::from_fn_with_state(state, log_requests))
}

#[allow(clippy::too_many_arguments)]
pub async fn run_server(
    store: Arc<dyn FullStore>,
    engine: Arc<NotificationEngine>,
    directory: Arc<dyn JobDirectory>,
    ws_connection_manager: Arc<ConnectionManager>,
    requests_logging_level: RequestsLoggingLevel,
    port: u16,
    jwt_secret: String,
) -> Result<()> {
    let config = ServerConfig {
        port,
        requests_logging_level,
        jwt_secret,
    };
    let app = make_app(config, store, engine, directory, ws_connection_manager);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    Ok(axum::serve(listener, app).await?)
}
