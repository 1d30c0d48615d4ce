use anyhow::Result;

use crate::preferences::PreferenceStore;

use super::models::{CandidateNotification, Notification};

pub trait NotificationStore: Send + Sync {
    /// Persists one notification and returns it with its assigned id and
    /// creation timestamp.
    fn insert_notification(&self, candidate: &CandidateNotification) -> Result<Notification>;

    /// Persists a batch in a single transaction and returns the materialized
    /// rows in input order. Deadline scans can produce hundreds of candidates
    /// at once; one round-trip per row would dominate the scheduler's cost.
    fn insert_notifications(
        &self,
        candidates: &[CandidateNotification],
    ) -> Result<Vec<Notification>>;

    /// Returns a user's notifications, newest first.
    fn list_notifications(&self, user_id: usize, unread_only: bool) -> Result<Vec<Notification>>;

    /// Marks one notification read. Returns false if no row matched the
    /// (id, user) pair, so callers can distinguish "not yours" from done.
    fn mark_notification_read(&self, id: i64, user_id: usize) -> Result<bool>;

    /// Marks every unread notification read. Returns the number of rows
    /// actually flipped; already-read rows are untouched.
    fn mark_all_notifications_read(&self, user_id: usize) -> Result<usize>;

    /// Deletes one notification owned by the user. Returns false if no row
    /// matched.
    fn delete_notification(&self, id: i64, user_id: usize) -> Result<bool>;

    /// Deletes all of a user's notifications. Returns the deleted count.
    fn delete_all_notifications(&self, user_id: usize) -> Result<usize>;

    /// Removes application-lifecycle notifications tied to a job posting,
    /// invoked when an application is withdrawn. The job id lives in the
    /// metadata document, not a column.
    fn delete_by_job_reference(&self, job_post_id: i64) -> Result<usize>;

    /// Removes moderation-workflow notifications tied to a withdrawn
    /// inquiry or report.
    fn delete_by_inquiry_or_report_reference(&self, target_id: i64) -> Result<usize>;

    /// Deletes read notifications created before the cutoff (unix seconds).
    /// Returns the deleted count.
    fn prune_read_notifications(&self, cutoff: i64) -> Result<usize>;
}

/// Combined storage surface for everything the engine and routes need.
pub trait FullStore: NotificationStore + PreferenceStore {}

impl<T: NotificationStore + PreferenceStore> FullStore for T {}
