//! Storage implementations.
//!
//! - **PostgreSQL** (`postgres` feature): ledger table and event directory
//! - **In-memory**: see [`crate::mocks`]

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::{PostgresEventDirectory, PostgresReminderLedger};
