//! Deadline alerts for companies about their own postings.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info};

use crate::background_jobs::{BackgroundJob, DailyTime, JobContext, JobError, JobSchedule};
use crate::directory::{CompanyJobDeadline, JobDirectory};
use crate::notifications::{CandidateNotification, NotificationEngine, NotificationType};
use crate::preferences::AccountRole;

use super::offsets::{local_today, DeadlineOffset, DEADLINE_OFFSETS};

/// Scans every job posting for deadlines crossing the D-7 / D-1 / D+1
/// windows and alerts the owning company account, one batch per window.
pub struct CompanyDeadlineAlertsJob {
    engine: Arc<NotificationEngine>,
    directory: Arc<dyn JobDirectory>,
    run_at: DailyTime,
}

impl CompanyDeadlineAlertsJob {
    pub fn new(
        engine: Arc<NotificationEngine>,
        directory: Arc<dyn JobDirectory>,
        run_at: DailyTime,
    ) -> Self {
        Self {
            engine,
            directory,
            run_at,
        }
    }
}

fn title_for(offset: &DeadlineOffset) -> &'static str {
    if offset.is_past() {
        "Job posting closed"
    } else {
        "Job posting closing soon"
    }
}

fn message_for(offset: &DeadlineOffset, row: &CompanyJobDeadline) -> String {
    match offset.label {
        "D-7" => format!(
            "[{}] '{}' closes in 7 days.",
            row.company_name, row.job_title
        ),
        "D-1" => format!("[{}] '{}' closes tomorrow.", row.company_name, row.job_title),
        _ => format!("[{}] '{}' has closed.", row.company_name, row.job_title),
    }
}

fn candidate_for(offset: &DeadlineOffset, row: &CompanyJobDeadline) -> CandidateNotification {
    CandidateNotification::new(
        row.company_user_id,
        AccountRole::Company,
        NotificationType::EmpJobDeadline,
        title_for(offset),
        message_for(offset, row),
    )
    .with_metadata(serde_json::json!({
        "job_post_id": row.job_post_id,
        "company_name": row.company_name,
        "job_title": row.job_title,
        "deadline": row.deadline.format("%Y-%m-%d").to_string(),
        "when": offset.label,
    }))
}

#[async_trait]
impl BackgroundJob for CompanyDeadlineAlertsJob {
    fn id(&self) -> &'static str {
        "company_deadline_alerts"
    }

    fn description(&self) -> &'static str {
        "Notify companies about their postings approaching or past their deadline"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::DailyAt(self.run_at)
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let today = local_today(Utc::now());

        for offset in DEADLINE_OFFSETS {
            if ctx.is_cancelled() {
                return Err(JobError::Cancelled);
            }

            let date = offset.target_date(today);
            let rows = match self.directory.company_jobs_with_deadline(date) {
                Ok(rows) => rows,
                Err(err) => {
                    error!(
                        "Company deadline query for {} ({}) failed: {}",
                        offset.label, date, err
                    );
                    continue;
                }
            };
            if rows.is_empty() {
                continue;
            }

            let candidates = rows
                .iter()
                .map(|row| candidate_for(offset, row))
                .collect::<Vec<_>>();
            match self.engine.publish_bulk(candidates).await {
                Ok(count) => {
                    info!(
                        "Company deadline {}: {} matches, {} notifications published",
                        offset.label,
                        rows.len(),
                        count
                    );
                }
                Err(err) => {
                    error!(
                        "Failed to publish company deadline batch for {}: {}",
                        offset.label, err
                    );
                }
            }
        }

        Ok(())
    }
}
