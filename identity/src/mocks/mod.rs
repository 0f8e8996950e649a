//! In-memory providers for tests.

pub mod repository;

pub use repository::InMemoryIdentityRepository;
