use async_trait::async_trait;
use chrono::FixedOffset;
use tokio_util::sync::CancellationToken;

/// The platform schedules its daily triggers in Korea Standard Time, which
/// has no daylight saving, so a fixed offset is sufficient.
pub fn platform_offset() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).unwrap()
}

/// A wall-clock time of day in the platform timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTime {
    pub hour: u32,
    pub minute: u32,
}

impl DailyTime {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }
}

impl std::str::FromStr for DailyTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hour, minute) = s
            .split_once(':')
            .ok_or_else(|| format!("Expected HH:MM, got '{}'", s))?;
        let hour: u32 = hour.parse().map_err(|_| format!("Invalid hour in '{}'", s))?;
        let minute: u32 = minute
            .parse()
            .map_err(|_| format!("Invalid minute in '{}'", s))?;
        if hour > 23 || minute > 59 {
            return Err(format!("Time out of range: '{}'", s));
        }
        Ok(Self { hour, minute })
    }
}

impl std::fmt::Display for DailyTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Schedule for when a job should run.
#[derive(Debug, Clone, Copy)]
pub enum JobSchedule {
    /// Run once a day at a fixed wall-clock time in the platform timezone.
    DailyAt(DailyTime),
}

/// Errors that can occur during job execution.
#[derive(Debug)]
pub enum JobError {
    ExecutionFailed(String),
    Cancelled,
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobError::ExecutionFailed(msg) => write!(f, "Execution failed: {}", msg),
            JobError::Cancelled => write!(f, "Job was cancelled"),
        }
    }
}

impl std::error::Error for JobError {}

/// Context provided to jobs during execution.
#[derive(Clone)]
pub struct JobContext {
    /// Token to check for shutdown requests. Long-running jobs should check
    /// it between units of work and return [`JobError::Cancelled`].
    pub cancellation_token: CancellationToken,
}

impl JobContext {
    pub fn new(cancellation_token: CancellationToken) -> Self {
        Self { cancellation_token }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}

/// Trait for background jobs.
///
/// A run is stateless: jobs recompute everything from the current date, so
/// a missed or repeated invocation never corrupts state, only skips or
/// re-derives that day's work.
#[async_trait]
pub trait BackgroundJob: Send + Sync {
    /// Unique identifier for this job.
    fn id(&self) -> &'static str;

    /// Description of what this job does.
    fn description(&self) -> &'static str;

    /// When this job should run.
    fn schedule(&self) -> JobSchedule;

    /// Execute the job.
    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError>;
}
