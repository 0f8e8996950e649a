//! PostgreSQL storage.

pub mod directory;
pub mod ledger;

pub use directory::PostgresEventDirectory;
pub use ledger::PostgresReminderLedger;
