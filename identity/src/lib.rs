//! # AIrena Identity
//!
//! Account lifecycle for AIrena: registration, one-time-code (OTC) gating,
//! administrator approval of hosts, and session issuance.
//!
//! ## Lifecycle
//!
//! ```text
//! register ──► UNVERIFIED ──verify OTC──► EMAIL_VERIFIED (active)
//!                                   └──► PENDING_APPROVAL (HOST) ──approve──► APPROVED
//!                                                               └──reject───► deleted
//! ```
//!
//! Login is always two steps: `login` checks the password and issues a
//! login-challenge OTC, `complete_login` spends that code and mints the
//! session. Codes sent for email verification never complete a login. A HOST
//! only gets a session once approved.
//!
//! ## Architecture
//!
//! The legal transitions live in a pure reducer ([`reducers::LifecycleReducer`]).
//! Services ([`IdentityStateMachine`], [`OtcService`], [`ApprovalGate`],
//! [`SessionIssuer`], [`IdentityAdmin`]) load state, run the reducer and
//! execute the returned effects against an [`IdentityRepository`] and the
//! mail dispatcher. Every state change that must not race is a single
//! conditional repository call.
//!
//! ## Example
//!
//! ```rust,ignore
//! let services = IdentityServices::new(repo, dispatcher, &config, clock);
//! let registration = services.machine.register(RegisterRequest { .. }).await?;
//!
//! let challenge = services.sessions.login("host@example.com", "password").await?;
//! let session = services.sessions.complete_login("host@example.com", "123456").await?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod actions;
pub mod admin;
pub mod approval;
pub mod config;
pub mod effects;
pub mod environment;
pub mod error;
pub mod links;
pub mod notices;
pub mod otc;
pub mod password;
pub mod providers;
pub mod reducers;
pub mod registration;
pub mod services;
pub mod session;
pub mod state;

// Storage implementations
pub mod stores;

// Test utilities
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-exports
pub use actions::LifecycleAction;
pub use admin::IdentityAdmin;
pub use approval::{ApprovalAuthority, ApprovalChannel, ApprovalGate, ApprovalReceipt, RejectionReceipt};
pub use config::{ApprovalLinkConfig, IdentityConfig, OtcConfig, PasswordPolicy, SessionConfig};
pub use effects::LifecycleEffect;
pub use environment::LifecycleEnvironment;
pub use error::{ErrorKind, IdentityError, Result};
pub use links::{ApprovalLinkSigner, LinkAction};
pub use otc::{OtcReceipt, OtcService, PreparedOtc};
pub use password::PasswordHasher;
pub use providers::IdentityRepository;
pub use registration::{IdentityStateMachine, RegisterRequest, Registration, VerificationOutcome};
pub use services::IdentityServices;
pub use session::{IssuedSession, LoginChallenge, SessionClaims, SessionIssuer, SessionSigner, SessionToken};
pub use state::{Identity, IdentityView, Lifecycle, LifecycleState, OtcPurpose, PendingOtc};
