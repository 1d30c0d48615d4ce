//! Notification engine: preference filtering, persistence and live delivery.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::server::websocket::messages::notifications::NotificationCreatedMessage;
use crate::server::websocket::messages::{msg_types, ServerMessage};
use crate::server::websocket::ConnectionManager;

use super::models::{CandidateNotification, Notification};
use super::store::FullStore;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// Every notification must be attributable to a role-scoped preference
    /// check (or explicitly forced under a role); a candidate without a role
    /// is rejected before any side effect.
    #[error("notification candidate is missing a role")]
    MissingRole,
    /// The repository is unavailable. Propagated to the publishing caller;
    /// scheduler contexts catch and log it per offset instead of aborting.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Orchestrates a candidate's path from trigger to recipient: consult the
/// preference store, persist survivors, push each to the recipient's live
/// connections.
///
/// Persistence and delivery are two independent side effects; the repository
/// row is the source of truth and the websocket push is a best-effort hint.
/// The engine holds no mutable state of its own, so concurrent publishes,
/// including for the same user, need no extra locking.
pub struct NotificationEngine {
    store: Arc<dyn FullStore>,
    connections: Arc<ConnectionManager>,
}

impl NotificationEngine {
    pub fn new(store: Arc<dyn FullStore>, connections: Arc<ConnectionManager>) -> Self {
        Self { store, connections }
    }

    /// Publishes a single candidate.
    ///
    /// Returns Ok(None) when the recipient's preferences suppress the
    /// notification; suppression is a normal outcome, indistinguishable from
    /// success to the triggering caller. On delivery, exactly one row is
    /// written and at most one channel broadcast happens.
    pub async fn publish(
        &self,
        candidate: CandidateNotification,
    ) -> Result<Option<Notification>, NotifyError> {
        let role = candidate.role.ok_or(NotifyError::MissingRole)?;

        if !candidate.force && !self.store.is_allowed(candidate.user_id, role, candidate.kind)? {
            debug!(
                "Suppressed {} notification for user {} ({})",
                candidate.kind.as_str(),
                candidate.user_id,
                role.as_str()
            );
            return Ok(None);
        }

        let notification = self.store.insert_notification(&candidate)?;
        self.push_to_user(&notification).await;
        Ok(Some(notification))
    }

    /// Publishes a batch: drops candidates without a role, filters the rest
    /// per recipient, persists all survivors in one multi-row write and
    /// broadcasts one event per survivor. Returns the persisted count.
    ///
    /// The engine does not deduplicate; a caller generating the batch owns
    /// the uniqueness of its (user, type, target, offset) combinations.
    pub async fn publish_bulk(
        &self,
        candidates: Vec<CandidateNotification>,
    ) -> Result<usize, NotifyError> {
        let mut survivors = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let Some(role) = candidate.role else {
                debug!(
                    "Dropping roleless {} candidate for user {} from bulk publish",
                    candidate.kind.as_str(),
                    candidate.user_id
                );
                continue;
            };
            if candidate.force
                || self
                    .store
                    .is_allowed(candidate.user_id, role, candidate.kind)?
            {
                survivors.push(candidate);
            }
        }

        if survivors.is_empty() {
            return Ok(0);
        }

        let notifications = self.store.insert_notifications(&survivors)?;
        for notification in &notifications {
            self.push_to_user(notification).await;
        }
        Ok(notifications.len())
    }

    /// Best-effort fan-out to every live connection of the recipient. A
    /// disconnected user simply reads the repository on their next poll;
    /// failed sends never surface to the publishing caller.
    async fn push_to_user(&self, notification: &Notification) {
        let message = ServerMessage::new(
            msg_types::NOTIFICATION_CREATED,
            NotificationCreatedMessage {
                notification: notification.clone(),
            },
        );

        let failed = self
            .connections
            .broadcast_to_user(notification.user_id, message)
            .await;
        if !failed.is_empty() {
            debug!(
                "Failed to push notification {} to {} connections of user {}",
                notification.id,
                failed.len(),
                notification.user_id
            );
        }
    }
}
