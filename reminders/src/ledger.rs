//! The reminder ledger: one entry per reminder ever sent.

use crate::class::ReminderKey;
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::future::Future;

/// A recorded reminder. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Dedup key.
    pub key: ReminderKey,
    /// Derived `REMINDER_...` name.
    pub name: String,
    /// Short description of what was sent.
    pub message: String,
    /// When the entry was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Create an entry for `key`.
    #[must_use]
    pub fn new(key: ReminderKey, message: String, recorded_at: DateTime<Utc>) -> Self {
        Self {
            name: key.ledger_name(),
            key,
            message,
            recorded_at,
        }
    }
}

/// Persisted dedup ledger.
///
/// Claiming is atomic: of any number of concurrent
/// [`ReminderLedger::record_if_absent`] calls for one key, exactly one
/// returns `true`.
pub trait ReminderLedger: Send + Sync {
    /// Insert `entry` unless its key exists. Returns whether it was inserted.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReminderError::Ledger`] if the write fails.
    fn record_if_absent(&self, entry: &LedgerEntry) -> impl Future<Output = Result<bool>> + Send;
}
