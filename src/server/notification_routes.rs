//! Notification and preference-settings API routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::error;

use crate::notifications::Notification;
use crate::preferences::{ensure_preferences, AccountRole, PreferenceCategory, PreferenceRecord};

use super::session::Session;
use super::state::{GuardedStore, ServerState};

#[derive(Deserialize, Debug)]
struct ListParams {
    #[serde(default)]
    unread_only: bool,
}

#[derive(Serialize)]
struct ListNotificationsResponse {
    total: usize,
    notifications: Vec<Notification>,
}

#[derive(Serialize)]
struct UpdatedResponse {
    updated: usize,
}

#[derive(Serialize)]
struct DeletedResponse {
    deleted: usize,
}

#[derive(Deserialize, Debug)]
struct SettingsParams {
    role: String,
}

#[derive(Serialize)]
struct SettingsResponse {
    all_notifications: bool,
    settings: BTreeMap<PreferenceCategory, bool>,
}

#[derive(Deserialize, Debug)]
struct UpdateSettingsBody {
    role: String,
    all_notifications: bool,
    settings: BTreeMap<PreferenceCategory, bool>,
}

async fn list_notifications(
    session: Session,
    State(store): State<GuardedStore>,
    Query(params): Query<ListParams>,
) -> Response {
    match store.list_notifications(session.user_id, params.unread_only) {
        Ok(notifications) => Json(ListNotificationsResponse {
            total: notifications.len(),
            notifications,
        })
        .into_response(),
        Err(err) => {
            error!("Failed to list notifications: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn mark_notification_read(
    session: Session,
    State(store): State<GuardedStore>,
    Path(id): Path<i64>,
) -> Response {
    match store.mark_notification_read(id, session.user_id) {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to mark notification {} read: {}", id, err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn mark_all_notifications_read(
    session: Session,
    State(store): State<GuardedStore>,
) -> Response {
    match store.mark_all_notifications_read(session.user_id) {
        Ok(updated) => Json(UpdatedResponse { updated }).into_response(),
        Err(err) => {
            error!("Failed to mark all notifications read: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn delete_notification(
    session: Session,
    State(store): State<GuardedStore>,
    Path(id): Path<i64>,
) -> Response {
    match store.delete_notification(id, session.user_id) {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to delete notification {}: {}", id, err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn delete_all_notifications(
    session: Session,
    State(store): State<GuardedStore>,
) -> Response {
    match store.delete_all_notifications(session.user_id) {
        Ok(deleted) => Json(DeletedResponse { deleted }).into_response(),
        Err(err) => {
            error!("Failed to delete notifications: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Deletion-trigger hook: an application was withdrawn, so the lifecycle
/// notifications referencing its job posting must not stay behind.
async fn delete_by_job_reference(
    _session: Session,
    State(store): State<GuardedStore>,
    Path(job_post_id): Path<i64>,
) -> Response {
    match store.delete_by_job_reference(job_post_id) {
        Ok(deleted) => Json(DeletedResponse { deleted }).into_response(),
        Err(err) => {
            error!(
                "Failed to delete notifications for job {}: {}",
                job_post_id, err
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Deletion-trigger hook for withdrawn inquiries and reports.
async fn delete_by_inquiry_or_report_reference(
    _session: Session,
    State(store): State<GuardedStore>,
    Path(target_id): Path<i64>,
) -> Response {
    match store.delete_by_inquiry_or_report_reference(target_id) {
        Ok(deleted) => Json(DeletedResponse { deleted }).into_response(),
        Err(err) => {
            error!(
                "Failed to delete notifications for inquiry/report {}: {}",
                target_id, err
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Settings read. Self-healing: a (user, role) pair read for the first time
/// gets its role defaults persisted before the response is built.
async fn get_settings(
    session: Session,
    State(store): State<GuardedStore>,
    Query(params): Query<SettingsParams>,
) -> Response {
    let Some(role) = AccountRole::from_str(&params.role) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let record = match store.get_preferences(session.user_id, role) {
        Ok(Some(record)) => record,
        Ok(None) => {
            let defaults = PreferenceRecord::defaults(session.user_id, role);
            if let Err(err) = store.upsert_preferences(&defaults) {
                error!("Failed to persist default preferences: {}", err);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
            defaults
        }
        Err(err) => {
            error!("Failed to read preferences: {}", err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    Json(SettingsResponse {
        all_notifications: record.all_notifications,
        settings: record.categories,
    })
    .into_response()
}

async fn update_settings(
    session: Session,
    State(store): State<GuardedStore>,
    Json(body): Json<UpdateSettingsBody>,
) -> Response {
    let Some(role) = AccountRole::from_str(&body.role) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let record = PreferenceRecord {
        user_id: session.user_id,
        role,
        all_notifications: body.all_notifications,
        categories: body.settings,
    };
    match store.upsert_preferences(&record) {
        Ok(()) => Json(SettingsResponse {
            all_notifications: record.all_notifications,
            settings: record.categories,
        })
        .into_response(),
        Err(err) => {
            error!("Failed to update preferences: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Bootstrap hook. The identity service calls this after a successful
/// authentication so a preference record exists before any delivery
/// filtering runs for the session's (user, role) pair. Idempotent.
async fn init_settings(session: Session, State(store): State<GuardedStore>) -> Response {
    match ensure_preferences(store.as_ref(), session.user_id, session.role) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => {
            error!("Failed to initialize preferences: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn make_notification_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/", delete(delete_all_notifications))
        .route("/read-all", put(mark_all_notifications_read))
        .route("/{id}/read", put(mark_notification_read))
        .route("/{id}", delete(delete_notification))
        .route("/by-job/{job_post_id}", delete(delete_by_job_reference))
        .route(
            "/by-inquiry-or-report/{id}",
            delete(delete_by_inquiry_or_report_reference),
        )
        .route("/settings", get(get_settings))
        .route("/settings", post(update_settings))
        .route("/settings/init", post(init_settings))
        .with_state(state)
}
