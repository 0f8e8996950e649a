//! Pure lifecycle rules.

pub mod lifecycle;

pub use lifecycle::LifecycleReducer;
