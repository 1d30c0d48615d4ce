//! Notification retention housekeeping.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::info;

use crate::background_jobs::{BackgroundJob, DailyTime, JobContext, JobError, JobSchedule};
use crate::notifications::NotificationStore;

/// Deletes read notifications older than the retention window. Unread rows
/// are kept indefinitely so an absent user still finds them on return.
pub struct NotificationRetentionJob {
    store: Arc<dyn NotificationStore>,
    retention_days: u64,
    run_at: DailyTime,
}

impl NotificationRetentionJob {
    pub fn new(store: Arc<dyn NotificationStore>, retention_days: u64, run_at: DailyTime) -> Self {
        Self {
            store,
            retention_days,
            run_at,
        }
    }
}

#[async_trait]
impl BackgroundJob for NotificationRetentionJob {
    fn id(&self) -> &'static str {
        "notification_retention"
    }

    fn description(&self) -> &'static str {
        "Delete read notifications older than the retention period"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::DailyAt(self.run_at)
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let cutoff = now - (self.retention_days as i64 * 24 * 60 * 60);

        let deleted = self
            .store
            .prune_read_notifications(cutoff)
            .map_err(|e| JobError::ExecutionFailed(e.to_string()))?;

        if deleted > 0 {
            info!(
                "Pruned {} read notifications older than {} days",
                deleted, self.retention_days
            );
        }
        Ok(())
    }
}
