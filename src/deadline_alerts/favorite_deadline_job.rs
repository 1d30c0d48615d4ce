//! Deadline alerts for favorited jobs (personal accounts).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info};

use crate::background_jobs::{BackgroundJob, DailyTime, JobContext, JobError, JobSchedule};
use crate::directory::{FavoriteJobDeadline, JobDirectory};
use crate::notifications::{CandidateNotification, NotificationEngine, NotificationType};
use crate::preferences::AccountRole;

use super::offsets::{local_today, DeadlineOffset, DEADLINE_OFFSETS};

/// Scans favorited jobs for deadlines crossing the D-7 / D-1 / D+1 windows
/// and submits one batch per window.
///
/// Each window is handled independently: a failing domain query loses that
/// window's alerts for the day and nothing more.
pub struct FavoriteDeadlineAlertsJob {
    engine: Arc<NotificationEngine>,
    directory: Arc<dyn JobDirectory>,
    run_at: DailyTime,
}

impl FavoriteDeadlineAlertsJob {
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
        "Saved job closed"
    } else {
        "Saved job closing soon"
    }
}

fn message_for(offset: &DeadlineOffset, row: &FavoriteJobDeadline) -> String {
    match offset.label {
        "D-7" => format!(
            "[{}] '{}' closes in 7 days.",
            row.company_name, row.job_title
        ),
        "D-1" => format!("[{}] '{}' closes tomorrow.", row.company_name, row.job_title),
        _ => format!("[{}] '{}' has closed.", row.company_name, row.job_title),
    }
}

fn candidate_for(offset: &DeadlineOffset, row: &FavoriteJobDeadline) -> CandidateNotification {
    CandidateNotification::new(
        row.user_id,
        AccountRole::Member,
        NotificationType::FavoriteJobDeadline,
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
impl BackgroundJob for FavoriteDeadlineAlertsJob {
    fn id(&self) -> &'static str {
        "favorite_deadline_alerts"
    }

    fn description(&self) -> &'static str {
        "Notify members about favorited jobs approaching or past their deadline"
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
            let rows = match self.directory.favorite_jobs_with_deadline(date) {
                Ok(rows) => rows,
                Err(err) => {
                    error!(
                        "Favorite deadline query for {} ({}) failed: {}",
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
                        "Favorite deadline {}: {} matches, {} notifications published",
                        offset.label,
                        rows.len(),
                        count
                    );
                }
                Err(err) => {
                    error!(
                        "Failed to publish favorite deadline batch for {}: {}",
                        offset.label, err
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row() -> FavoriteJobDeadline {
        FavoriteJobDeadline {
            user_id: 1,
            job_post_id: 100,
            job_title: "Backend engineer".to_string(),
            company_name: "Acme".to_string(),
            deadline: NaiveDate::from_ymd_opt(2026, 3, 17).unwrap(),
        }
    }

    #[test]
    fn candidate_carries_offset_label_and_job_reference() {
        let candidate = candidate_for(&DEADLINE_OFFSETS[0], &row());

        assert_eq!(candidate.role, Some(AccountRole::Member));
        assert_eq!(candidate.kind, NotificationType::FavoriteJobDeadline);
        assert!(!candidate.force);

        let metadata = candidate.metadata.unwrap();
        assert_eq!(metadata["job_post_id"], 100);
        assert_eq!(metadata["when"], "D-7");
        assert_eq!(metadata["deadline"], "2026-03-17");
    }

    #[test]
    fn messages_follow_the_window() {
        let row = row();
        assert_eq!(
            message_for(&DEADLINE_OFFSETS[0], &row),
            "[Acme] 'Backend engineer' closes in 7 days."
        );
        assert_eq!(
            message_for(&DEADLINE_OFFSETS[1], &row),
            "[Acme] 'Backend engineer' closes tomorrow."
        );
        assert_eq!(
            message_for(&DEADLINE_OFFSETS[2], &row),
            "[Acme] 'Backend engineer' has closed."
        );
    }

    #[test]
    fn past_offset_switches_the_title() {
        assert_eq!(title_for(&DEADLINE_OFFSETS[1]), "Saved job closing soon");
        assert_eq!(title_for(&DEADLINE_OFFSETS[2]), "Saved job closed");
    }
}
