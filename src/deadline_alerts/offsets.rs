use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::background_jobs::platform_offset;

/// A deadline proximity window, matched by exact date equality.
///
/// A scan asks "which deadlines fall exactly on today + days"; a user whose
/// deadline crossed an offset while a scan failed or never ran is not
/// retroactively notified. That trade-off is deliberate: these are
/// best-effort reminders, and the repository never becomes a replay log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineOffset {
    /// Semantic label embedded in notification metadata ("D-7", "D-1", "D+1").
    pub label: &'static str,
    /// Days between today and the matched deadline; negative looks back.
    pub days: i64,
}

impl DeadlineOffset {
    pub fn target_date(&self, today: NaiveDate) -> NaiveDate {
        today + Duration::days(self.days)
    }

    /// True for the offset that fires after the deadline has passed.
    pub fn is_past(&self) -> bool {
        self.days < 0
    }
}

/// The scanned windows: a week ahead, the day before, and the day after.
pub const DEADLINE_OFFSETS: &[DeadlineOffset] = &[
    DeadlineOffset { label: "D-7", days: 7 },
    DeadlineOffset { label: "D-1", days: 1 },
    DeadlineOffset { label: "D+1", days: -1 },
];

/// Today's date on the platform's wall clock.
pub fn local_today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&platform_offset()).date_naive()
}
