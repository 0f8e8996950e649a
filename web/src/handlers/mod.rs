//! HTTP request handlers, one module per area.

pub mod admin;
pub mod auth;
pub mod health;

pub use health::health_check;
