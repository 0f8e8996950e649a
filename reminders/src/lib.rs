//! # AIrena Reminders
//!
//! Submission reminders for participants who have not submitted yet.
//!
//! ## Components
//!
//! - **[`window`]**: pure classification of a deadline into a reminder class
//! - **[`ReminderKey`]**: typed dedup key `(recipient, event, class, date?)`
//! - **[`ReminderLedger`]**: insert-if-absent store of sent reminders
//! - **[`EventDirectory`]**: read-only view of events and participants
//! - **[`ReminderScheduler`]**: the daily and hourly sweeps
//!
//! ## Example
//!
//! ```ignore
//! let scheduler = ReminderScheduler::new(directory, ledger, dispatcher, ReminderConfig::default(), clock);
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let handles = scheduler.spawn(&shutdown_rx);
//!
//! // Operational re-run, safe next to the scheduled one.
//! let report = scheduler.trigger(SweepKind::Hourly).await;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod class;
pub mod config;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod messages;
pub mod scheduler;
pub mod stores;
pub mod window;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use class::{ReminderClass, ReminderKey};
pub use config::ReminderConfig;
pub use directory::{EventDirectory, EventQuery, EventStatus, EventSummary, Participant};
pub use error::{ReminderError, Result};
pub use ledger::{LedgerEntry, ReminderLedger};
pub use scheduler::{ReminderScheduler, SweepKind, SweepReport};
pub use window::{DueReminder, classify_hourly, daily_milestone};
