//! Reminder classes and ledger keys.

use airena_core::{EventId, IdentityId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a reminder; decides its message and key shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderClass {
    /// Days left in the final week. Keyed per calendar day.
    Daily,
    /// About 24 hours left.
    FinalDay,
    /// About one hour left.
    OneHour,
}

impl ReminderClass {
    /// Storage and key name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::FinalDay => "FINAL_DAY",
            Self::OneHour => "ONE_HOUR",
        }
    }

}

impl fmt::Display for ReminderClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one reminder: sent at most once per key.
///
/// `date` is set for [`ReminderClass::Daily`] only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReminderKey {
    /// Recipient identity.
    pub recipient: IdentityId,
    /// Event.
    pub event: EventId,
    /// Class.
    pub class: ReminderClass,
    /// Calendar date (UTC), daily class only.
    pub date: Option<NaiveDate>,
}

impl ReminderKey {
    /// Key for `class`, dated `today` when the class is daily.
    #[must_use]
    pub fn new(recipient: IdentityId, event: EventId, class: ReminderClass, today: NaiveDate) -> Self {
        Self {
            recipient,
            event,
            class,
            date: (class == ReminderClass::Daily).then_some(today),
        }
    }

    /// `REMINDER_<eventId>_<CLASS>[_<YYYY-MM-DD>]`.
    ///
    /// Unique per recipient, not globally.
    #[must_use]
    pub fn ledger_name(&self) -> String {
        match self.date {
            Some(date) => format!("REMINDER_{}_{}_{}", self.event, self.class, date.format("%Y-%m-%d")),
            None => format!("REMINDER_{}_{}", self.event, self.class),
        }
    }
}
