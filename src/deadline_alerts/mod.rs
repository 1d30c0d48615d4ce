//! Time-triggered deadline alert generation and notification housekeeping.

mod company_deadline_job;
mod favorite_deadline_job;
mod housekeeping_job;
mod offsets;

pub use company_deadline_job::CompanyDeadlineAlertsJob;
pub use favorite_deadline_job::FavoriteDeadlineAlertsJob;
pub use housekeeping_job::NotificationRetentionJob;
pub use offsets::{local_today, DeadlineOffset, DEADLINE_OFFSETS};
