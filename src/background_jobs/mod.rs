//! Background job scheduling and execution.
//!
//! Provides the infrastructure for the time-triggered batch processes:
//! deadline alert scans and notification retention housekeeping.

mod job;
mod scheduler;

pub use job::{
    platform_offset, BackgroundJob, DailyTime, JobContext, JobError, JobSchedule,
};
pub use scheduler::JobScheduler;
