//! Domain-event hooks.
//!
//! The platform's request handlers react to domain events (an application
//! arriving, an inquiry being filed) by invoking these hooks; the engine
//! filters each candidate against the recipient's preferences, persists the
//! survivors and pushes them to live connections.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::notifications::{CandidateNotification, NotificationType, NotifyError};
use crate::preferences::AccountRole;

use super::session::Session;
use super::state::{GuardedDirectory, GuardedEngine, ServerState};

#[derive(Deserialize, Debug)]
struct PublishEventBody {
    user_id: usize,
    role: String,
    #[serde(rename = "type")]
    kind: String,
    title: String,
    message: String,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
    #[serde(default)]
    force: bool,
}

#[derive(Serialize)]
struct PublishedResponse {
    published: usize,
}

/// Generic single-candidate hook. Responds with the materialized
/// notification, or null when the recipient's preferences suppressed it;
/// suppression is not an error.
async fn publish_event(
    _session: Session,
    State(engine): State<GuardedEngine>,
    Json(body): Json<PublishEventBody>,
) -> Response {
    let Some(role) = AccountRole::from_str(&body.role) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let Some(kind) = NotificationType::from_str(&body.kind) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let mut candidate =
        CandidateNotification::new(body.user_id, role, kind, body.title, body.message);
    candidate.metadata = body.metadata;
    candidate.force = body.force;

    match engine.publish(candidate).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(NotifyError::MissingRole) => StatusCode::BAD_REQUEST.into_response(),
        Err(NotifyError::Storage(err)) => {
            error!("Failed to publish {} event: {}", body.kind, err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Deserialize, Debug)]
struct InquiryCreatedBody {
    inquiry_id: i64,
    subject: String,
}

#[derive(Deserialize, Debug)]
struct ReportCreatedBody {
    report_id: i64,
    subject: String,
}

async fn fan_out_to_admins(
    directory: &GuardedDirectory,
    engine: &GuardedEngine,
    kind: NotificationType,
    title: &str,
    message: String,
    metadata: serde_json::Value,
) -> Response {
    let admin_ids = match directory.admin_user_ids() {
        Ok(ids) => ids,
        Err(err) => {
            error!("Failed to list admin accounts: {}", err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let candidates =
        CandidateNotification::admin_fanout(&admin_ids, kind, title, message, metadata);
    match engine.publish_bulk(candidates).await {
        Ok(published) => Json(PublishedResponse { published }).into_response(),
        Err(err) => {
            error!("Failed to publish {} fan-out: {}", kind.as_str(), err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Moderation hook: a new inquiry needs every admin's attention.
async fn inquiry_created(
    _session: Session,
    State(directory): State<GuardedDirectory>,
    State(engine): State<GuardedEngine>,
    Json(body): Json<InquiryCreatedBody>,
) -> Response {
    fan_out_to_admins(
        &directory,
        &engine,
        NotificationType::AdminInquiryCreated,
        "New inquiry",
        format!("A new inquiry was filed: '{}'.", body.subject),
        serde_json::json!({ "inquiry_id": body.inquiry_id }),
    )
    .await
}

/// Moderation hook: a new report needs every admin's attention.
async fn report_created(
    _session: Session,
    State(directory): State<GuardedDirectory>,
    State(engine): State<GuardedEngine>,
    Json(body): Json<ReportCreatedBody>,
) -> Response {
    fan_out_to_admins(
        &directory,
        &engine,
        NotificationType::AdminReportCreated,
        "New report",
        format!("A new report was filed: '{}'.", body.subject),
        serde_json::json!({ "report_id": body.report_id }),
    )
    .await
}

pub fn make_event_routes(state: ServerState) -> Router {
    Router::new()
        .route("/publish", post(publish_event))
        .route("/inquiry-created", post(inquiry_created))
        .route("/report-created", post(report_created))
        .with_state(state)
}
