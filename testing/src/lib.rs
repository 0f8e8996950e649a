//! # AIrena Testing
//!
//! Testing utilities shared by the service crates.
//!
//! ## Example
//!
//! ```ignore
//! use airena_testing::test_clock;
//!
//! #[tokio::test]
//! async fn test_code_expires() {
//!     let clock = test_clock();
//!     let service = OtcService::new(repo, mailer, config, Arc::new(clock.clone()));
//!
//!     service.issue(id, OtcPurpose::EmailVerification).await?;
//!     clock.advance(TimeDelta::minutes(11));
//!     assert!(!service.verify(id, "123456", OtcPurpose::EmailVerification).await?);
//! }
//! ```

use chrono::{DateTime, TimeDelta, Utc};
use airena_core::environment::Clock;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, TimeDelta, Utc};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Controllable clock for deterministic tests
    ///
    /// Returns the same time until moved with [`FixedClock::advance`] or
    /// [`FixedClock::set`]. Clones share the same time, so a test can keep one
    /// handle and move time under the services holding the others.
    ///
    /// # Example
    ///
    /// ```
    /// use airena_testing::mocks::FixedClock;
    /// use airena_core::environment::Clock;
    /// use chrono::{TimeDelta, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let handle = clock.clone();
    /// let before = clock.now();
    /// handle.advance(TimeDelta::minutes(5));
    /// assert_eq!(clock.now() - before, TimeDelta::minutes(5));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward (or backward, with a negative delta).
        pub fn advance(&self, delta: TimeDelta) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += delta;
        }

        /// Jump the clock to an absolute time.
        pub fn set(&self, to: DateTime<Utc>) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time = to;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + TimeDelta::days(20_089))
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
