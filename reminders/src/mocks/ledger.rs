//! In-memory reminder ledger.

use crate::class::ReminderKey;
use crate::error::{ReminderError, Result};
use crate::ledger::{LedgerEntry, ReminderLedger};
use airena_core::IdentityId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Data {
    entries: HashMap<ReminderKey, LedgerEntry>,
    unavailable: bool,
}

/// Ledger backed by a `HashMap` under one lock. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReminderLedger {
    data: Arc<Mutex<Data>>,
}

impl InMemoryReminderLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> MutexGuard<'_, Data> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All entries.
    #[must_use]
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.data().entries.values().cloned().collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().entries.len()
    }

    /// Whether the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry names recorded for `recipient`, sorted.
    #[must_use]
    pub fn names_for(&self, recipient: IdentityId) -> Vec<String> {
        let mut names: Vec<String> = self
            .data()
            .entries
            .values()
            .filter(|e| e.key.recipient == recipient)
            .map(|e| e.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Make every ledger call fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.data().unavailable = unavailable;
    }
}

impl ReminderLedger for InMemoryReminderLedger {
    async fn record_if_absent(&self, entry: &LedgerEntry) -> Result<bool> {
        let mut data = self.data();
        if data.unavailable {
            return Err(ReminderError::Ledger("ledger unavailable".into()));
        }
        if data.entries.contains_key(&entry.key) {
            return Ok(false);
        }
        data.entries.insert(entry.key, entry.clone());
        Ok(true)
    }
}
