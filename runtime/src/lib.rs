//! # AIrena Runtime
//!
//! Execution primitives shared by the identity and reminder services.
//!
//! ## Core Components
//!
//! - **Retry**: bounded retries with a backoff policy and a retryability predicate
//! - **Schedule**: fire a job daily at a wall-clock time or on a fixed interval,
//!   until a shutdown signal arrives
//!
//! ## Example
//!
//! ```ignore
//! use airena_runtime::schedule::{Schedule, spawn_periodic};
//!
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let handle = spawn_periodic("hourly-sweep", Schedule::Every(Duration::from_secs(3600)),
//!     clock, shutdown_rx, move || { let s = scheduler.clone(); async move { s.run_hourly_sweep().await; } });
//!
//! shutdown_tx.send(true).ok();
//! handle.await.ok();
//! ```

/// Bounded retry with backoff
pub mod retry;

/// Periodic job scheduling
pub mod schedule;

pub use retry::{RetryPolicy, retry_with_predicate};
pub use schedule::{Schedule, spawn_periodic};
