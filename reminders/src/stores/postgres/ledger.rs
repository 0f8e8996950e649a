//! PostgreSQL reminder ledger.
//!
//! The unique index on `(recipient, event, class, COALESCE(date, '-infinity'))`
//! makes [`ReminderLedger::record_if_absent`] a single
//! `INSERT ... ON CONFLICT DO NOTHING`.

use crate::error::{ReminderError, Result};
use crate::ledger::{LedgerEntry, ReminderLedger};
use sqlx::PgPool;

/// PostgreSQL reminder ledger.
#[derive(Debug, Clone)]
pub struct PostgresReminderLedger {
    pool: PgPool,
}

impl PostgresReminderLedger {
    /// Create a ledger over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the ledger migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        let mut migrator = sqlx::migrate!("./migrations");
        migrator.set_ignore_missing(true);
        migrator
            .run(&self.pool)
            .await
            .map_err(|e| ReminderError::Ledger(format!("Migration failed: {e}")))?;
        Ok(())
    }
}

impl ReminderLedger for PostgresReminderLedger {
    async fn record_if_absent(&self, entry: &LedgerEntry) -> Result<bool> {
        let inserted: Option<i64> = sqlx::query_scalar(
            r"
            INSERT INTO reminder_ledger
                (recipient_id, event_id, class, reminder_date, name, message, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT DO NOTHING
            RETURNING id
            ",
        )
        .bind(entry.key.recipient.0)
        .bind(entry.key.event.0)
        .bind(entry.key.class.as_str())
        .bind(entry.key.date)
        .bind(&entry.name)
        .bind(&entry.message)
        .bind(entry.recorded_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ReminderError::Ledger(format!("Failed to record reminder: {e}")))?;
        Ok(inserted.is_some())
    }
}
