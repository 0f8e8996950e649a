//! Reminder windows.
//!
//! | sweep  | remaining                 | class       |
//! |--------|---------------------------|-------------|
//! | daily  | ceil(days) ∈ {1, 3, 7}    | `Daily`     |
//! | hourly | ≤ 66 min                  | `OneHour`   |
//! | hourly | (23 h, 24 h 6 min]        | `FinalDay`  |
//! | hourly | ceil(days) ∈ 2..=7        | `Daily`     |
//!
//! The hourly bounds carry a 10% margin so a sweep that fires a little
//! late still lands inside the window.

use crate::class::ReminderClass;
use chrono::{DateTime, TimeDelta, Utc};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Days before a deadline on which the daily sweep sends.
pub const DAILY_MILESTONES: [i64; 3] = [1, 3, 7];

/// Upper bound of the one-hour window.
pub const ONE_HOUR_WINDOW: TimeDelta = TimeDelta::minutes(66);

/// Exclusive lower bound of the final-day window.
pub const FINAL_DAY_FROM: TimeDelta = TimeDelta::hours(23);

/// Inclusive upper bound of the final-day window.
pub const FINAL_DAY_UNTIL: TimeDelta = TimeDelta::minutes(24 * 60 + 6);

/// A reminder due now for some event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueReminder {
    /// Class to send.
    pub class: ReminderClass,
    /// Whole days left, rounded up.
    pub days_left: i64,
}

/// Whole days until `deadline`, rounded up. Zero or less once it passed.
#[must_use]
pub fn days_remaining(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = (deadline - now).num_milliseconds();
    if ms <= 0 {
        return 0;
    }
    (ms + DAY_MS - 1) / DAY_MS
}

/// Daily sweep: the reminder due for a deadline, if today is a milestone.
#[must_use]
pub fn daily_milestone(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Option<DueReminder> {
    if deadline < now {
        return None;
    }
    let days_left = days_remaining(deadline, now);
    DAILY_MILESTONES.contains(&days_left).then_some(DueReminder {
        class: ReminderClass::Daily,
        days_left,
    })
}

/// Hourly sweep: the reminder due for a future deadline, if any.
#[must_use]
pub fn classify_hourly(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Option<DueReminder> {
    if deadline <= now {
        return None;
    }
    let remaining = deadline - now;
    let days_left = days_remaining(deadline, now);

    let class = if remaining <= ONE_HOUR_WINDOW {
        ReminderClass::OneHour
    } else if remaining > FINAL_DAY_FROM && remaining <= FINAL_DAY_UNTIL {
        ReminderClass::FinalDay
    } else if (2..=7).contains(&days_left) {
        ReminderClass::Daily
    } else {
        return None;
    };
    Some(DueReminder { class, days_left })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_735_689_600, 0).unwrap()
    }

    #[test]
    fn test_days_remaining_rounds_up() {
        assert_eq!(days_remaining(now() + TimeDelta::hours(1), now()), 1);
        assert_eq!(days_remaining(now() + TimeDelta::hours(24), now()), 1);
        assert_eq!(days_remaining(now() + TimeDelta::hours(25), now()), 2);
        assert_eq!(days_remaining(now() - TimeDelta::hours(1), now()), 0);
    }

    #[test]
    fn test_daily_milestones() {
        let due = |d: TimeDelta| daily_milestone(now() + d, now()).map(|r| r.days_left);

        assert_eq!(due(TimeDelta::days(3)), Some(3));
        assert_eq!(due(TimeDelta::days(7)), Some(7));
        assert_eq!(due(TimeDelta::hours(5)), Some(1));
        assert_eq!(due(TimeDelta::days(2)), None);
        assert_eq!(due(TimeDelta::days(5)), None);
        assert_eq!(due(TimeDelta::days(8)), None);
        assert_eq!(due(-TimeDelta::hours(1)), None);
    }

    #[test]
    fn test_hourly_windows() {
        let class = |d: TimeDelta| classify_hourly(now() + d, now()).map(|r| r.class);

        assert_eq!(class(TimeDelta::minutes(45)), Some(ReminderClass::OneHour));
        assert_eq!(class(TimeDelta::minutes(66)), Some(ReminderClass::OneHour));
        assert_eq!(class(TimeDelta::minutes(67)), None);
        assert_eq!(class(TimeDelta::hours(12)), None);
        assert_eq!(class(TimeDelta::hours(23)), None);
        assert_eq!(class(TimeDelta::hours(24)), Some(ReminderClass::FinalDay));
        assert_eq!(class(TimeDelta::minutes(24 * 60 + 6)), Some(ReminderClass::FinalDay));
        assert_eq!(class(TimeDelta::hours(30)), Some(ReminderClass::Daily));
        assert_eq!(class(TimeDelta::days(7)), Some(ReminderClass::Daily));
        assert_eq!(class(TimeDelta::days(7) + TimeDelta::seconds(1)), None);
        assert_eq!(class(TimeDelta::zero()), None);
    }

    proptest! {
        #[test]
        fn prop_hourly_never_fires_for_past_deadlines(secs in 0i64..30 * 24 * 3600) {
            prop_assert!(classify_hourly(now() - TimeDelta::seconds(secs), now()).is_none());
        }

        #[test]
        fn prop_one_hour_iff_within_window(secs in 1i64..10 * 24 * 3600) {
            let remaining = TimeDelta::seconds(secs);
            let due = classify_hourly(now() + remaining, now());
            prop_assert_eq!(
                due.map(|r| r.class) == Some(ReminderClass::OneHour),
                remaining <= ONE_HOUR_WINDOW
            );
        }

        #[test]
        fn prop_daily_classes_are_within_a_week(secs in 1i64..30 * 24 * 3600) {
            if let Some(due) = classify_hourly(now() + TimeDelta::seconds(secs), now()) {
                prop_assert!(due.days_left >= 1 && due.days_left <= 7);
                if due.class == ReminderClass::Daily {
                    prop_assert!(due.days_left >= 2);
                }
            }
            if let Some(due) = daily_milestone(now() + TimeDelta::seconds(secs), now()) {
                prop_assert!(DAILY_MILESTONES.contains(&due.days_left));
                prop_assert_eq!(due.class, ReminderClass::Daily);
            }
        }
    }
}
