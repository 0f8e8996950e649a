//! Reminder configuration.

use chrono::NaiveTime;
use std::time::Duration;

/// Scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderConfig {
    /// UTC time of the daily sweep.
    ///
    /// Default: 03:30 (09:00 in Asia/Kolkata)
    pub daily_run_at: NaiveTime,

    /// Interval of the hourly sweep.
    ///
    /// Default: 1 hour
    pub hourly_interval: Duration,

    /// How far ahead the daily sweep looks for deadlines, in days.
    ///
    /// Default: 7
    pub lookahead_days: i64,

    /// Reminders dispatched in parallel within one event.
    ///
    /// Default: 4
    pub dispatch_concurrency: usize,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            daily_run_at: NaiveTime::from_hms_opt(3, 30, 0).unwrap_or(NaiveTime::MIN),
            hourly_interval: Duration::from_secs(3600),
            lookahead_days: 7,
            dispatch_concurrency: 4,
        }
    }
}

impl ReminderConfig {
    /// Set the daily sweep time.
    #[must_use]
    pub const fn with_daily_run_at(mut self, at: NaiveTime) -> Self {
        self.daily_run_at = at;
        self
    }

    /// Set the hourly sweep interval.
    #[must_use]
    pub const fn with_hourly_interval(mut self, interval: Duration) -> Self {
        self.hourly_interval = interval;
        self
    }

    /// Set dispatch concurrency (at least 1).
    #[must_use]
    pub fn with_dispatch_concurrency(mut self, concurrency: usize) -> Self {
        self.dispatch_concurrency = concurrency.max(1);
        self
    }
}
