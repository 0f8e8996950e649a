//! Storage implementations.
//!
//! - **PostgreSQL** (`postgres` feature): the production identity store
//! - **In-memory**: see [`crate::mocks`]

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::PostgresIdentityRepository;
