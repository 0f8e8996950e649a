//! Error types for reminder sweeps.

use thiserror::Error;

/// Result type alias for reminder operations.
pub type Result<T> = std::result::Result<T, ReminderError>;

/// Errors raised by reminder storage and configuration.
///
/// Sweeps never return these; they log them and count the affected
/// participants as failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReminderError {
    /// Event or participation data could not be read.
    #[error("Event directory error: {0}")]
    Directory(String),

    /// The ledger could not be read or written.
    #[error("Reminder ledger error: {0}")]
    Ledger(String),

    /// Unknown sweep name.
    #[error("Unknown sweep: {0} (expected \"daily\" or \"hourly\")")]
    UnknownSweep(String),
}
