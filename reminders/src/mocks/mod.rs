//! In-memory providers for tests.

pub mod directory;
pub mod ledger;

pub use directory::InMemoryEventDirectory;
pub use ledger::InMemoryReminderLedger;
