//! # AIrena Core
//!
//! Shared building blocks for the AIrena identity and reminder services.
//!
//! ## Core Concepts
//!
//! - **Identifiers**: strongly typed ids (`IdentityId`, `EventId`) so an event id
//!   can never be passed where an identity id is expected
//! - **Role**: the closed set of account roles and their canonical form
//! - **Reducer**: pure function `(State, Action, Environment) → Effects`
//! - **Environment**: injected dependencies, most importantly the [`environment::Clock`]
//!
//! Lifecycle rules live in reducers that never touch I/O. Services own the
//! imperative shell: they load state, run the reducer and execute the returned
//! effects against storage and mail.

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

pub mod id;
pub mod role;

pub use id::{EventId, IdentityId};
pub use role::{Role, RoleParseError};

/// Reducer module - The core trait for lifecycle rules
pub mod reducer {
    use smallvec::SmallVec;

    /// Effects returned by a single reduction.
    ///
    /// Most transitions emit zero to two effects, so four inline slots avoid a
    /// heap allocation in practice.
    pub type Effects<E> = SmallVec<[E; 4]>;

    /// The Reducer trait - pure business rules
    ///
    /// A reducer validates an action against the current state, mutates the
    /// state in place and describes the side effects the caller must run.
    /// Rejected actions leave the state untouched and return the error.
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for LifecycleReducer {
    ///     type State = Lifecycle;
    ///     type Action = LifecycleAction;
    ///     type Environment = LifecycleEnvironment;
    ///     type Effect = LifecycleEffect;
    ///     type Error = IdentityError;
    ///
    ///     fn reduce(&self, state: &mut Lifecycle, action: LifecycleAction, env: &LifecycleEnvironment)
    ///         -> Result<Effects<LifecycleEffect>, IdentityError> {
    ///         // rules go here
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// The effect descriptions this reducer emits
        type Effect;

        /// The error returned when an action is not legal in the current state
        type Error;

        /// Reduce an action into state changes and effects
        ///
        /// # Errors
        ///
        /// Returns `Self::Error` when the action is not a legal transition.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<Effects<Self::Effect>, Self::Error>;
    }
}

/// Environment module - Dependency injection traits
///
/// All time-dependent logic reads the injected [`environment::Clock`] so that
/// expiry and scheduling rules are deterministic under test.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::environment::{Clock, SystemClock};

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
