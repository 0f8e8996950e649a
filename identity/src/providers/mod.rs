//! Provider traits for external dependencies.
//!
//! The identity services are generic over these traits so storage can be
//! swapped (PostgreSQL in production, in-memory in tests).

pub mod repository;

pub use repository::IdentityRepository;
