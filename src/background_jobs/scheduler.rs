use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::job::{platform_offset, BackgroundJob, JobContext, JobSchedule};

/// Runs registered jobs at their daily wall-clock times.
///
/// Trigger times are chosen so that runs do not overlap; the scheduler runs
/// due jobs sequentially and keeps no state between invocations beyond the
/// computed next-run instants.
pub struct JobScheduler {
    jobs: Vec<(Arc<dyn BackgroundJob>, DateTime<Utc>)>,
    shutdown_token: CancellationToken,
    job_context: JobContext,
}

impl JobScheduler {
    pub fn new(shutdown_token: CancellationToken) -> Self {
        let job_context = JobContext::new(shutdown_token.child_token());
        Self {
            jobs: Vec::new(),
            shutdown_token,
            job_context,
        }
    }

    pub fn register_job(&mut self, job: Arc<dyn BackgroundJob>) {
        info!("Registering job: {} - {}", job.id(), job.description());
        let next_run = next_occurrence(job.schedule(), Utc::now());
        self.jobs.push((job, next_run));
    }

    /// Main scheduler loop. Returns when the shutdown token fires.
    pub async fn run(mut self) {
        info!("Starting job scheduler with {} registered jobs", self.jobs.len());
        for (job, next_run) in &self.jobs {
            debug!("Job {} first due at {}", job.id(), next_run);
        }

        loop {
            let Some(sleep_duration) = self.time_until_next_job() else {
                info!("No jobs registered, scheduler idle until shutdown");
                self.shutdown_token.cancelled().await;
                break;
            };

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {
                    self.run_due_jobs().await;
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Scheduler received shutdown signal");
                    break;
                }
            }
        }

        info!("Job scheduler stopped");
    }

    fn time_until_next_job(&self) -> Option<std::time::Duration> {
        let now = Utc::now();
        self.jobs
            .iter()
            .map(|(_, next_run)| *next_run)
            .min()
            .map(|soonest| (soonest - now).to_std().unwrap_or_default())
    }

    async fn run_due_jobs(&mut self) {
        let now = Utc::now();
        for (job, next_run) in self.jobs.iter_mut() {
            if *next_run > now {
                continue;
            }
            *next_run = next_occurrence(job.schedule(), now);

            info!("Running job {}", job.id());
            let started = Instant::now();
            match job.execute(&self.job_context).await {
                Ok(()) => {
                    info!(
                        "Job {} finished in {}ms, next run at {}",
                        job.id(),
                        started.elapsed().as_millis(),
                        next_run
                    );
                }
                Err(err) => {
                    error!("Job {} failed: {}", job.id(), err);
                }
            }
        }
    }
}

/// The next instant, strictly after `now`, at which the schedule fires.
fn next_occurrence(schedule: JobSchedule, now: DateTime<Utc>) -> DateTime<Utc> {
    match schedule {
        JobSchedule::DailyAt(time) => {
            let tz = platform_offset();
            let local_now = now.with_timezone(&tz);
            let mut candidate_date = local_now.date_naive();

            let today_run = candidate_date
                .and_hms_opt(time.hour, time.minute, 0)
                .expect("valid wall-clock time");
            if tz
                .from_local_datetime(&today_run)
                .unwrap()
                .with_timezone(&Utc)
                <= now
            {
                candidate_date += ChronoDuration::days(1);
            }

            tz.from_local_datetime(
                &candidate_date
                    .and_hms_opt(time.hour, time.minute, 0)
                    .expect("valid wall-clock time"),
            )
            .unwrap()
            .with_timezone(&Utc)
        }
    }
}
