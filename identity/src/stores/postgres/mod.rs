//! PostgreSQL storage.

pub mod identity;

pub use identity::PostgresIdentityRepository;
