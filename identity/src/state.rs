//! Identity records and their derived lifecycle state.

use airena_core::{IdentityId, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a one-time code may be spent on.
///
/// A code is only accepted by the operation it was issued for: a login
/// challenge cannot verify an email through the public route, and an email
/// verification code can never complete a login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OtcPurpose {
    /// Proves control of the email after registration, approval or a resend.
    EmailVerification,
    /// Second step of a login, issued only after the password matched.
    LoginChallenge,
}

impl OtcPurpose {
    /// Storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmailVerification => "EMAIL_VERIFICATION",
            Self::LoginChallenge => "LOGIN_CHALLENGE",
        }
    }

    /// Parse a storage name.
    #[must_use]
    pub fn from_storage(name: &str) -> Option<Self> {
        match name {
            "EMAIL_VERIFICATION" => Some(Self::EmailVerification),
            "LOGIN_CHALLENGE" => Some(Self::LoginChallenge),
            _ => None,
        }
    }
}

impl std::fmt::Display for OtcPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The hashed, expiring one-time code awaiting verification.
///
/// An identity holds at most one; issuing a new code replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOtc {
    /// One-way hash of the code.
    pub code_hash: String,
    /// What the code may be spent on.
    pub purpose: OtcPurpose,
    /// The code is rejected from this instant on.
    pub expires_at: DateTime<Utc>,
}

impl PendingOtc {
    /// Whether the code is expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Identifier.
    pub id: IdentityId,
    /// Normalized, unique email.
    pub email: String,
    /// PBKDF2 password hash.
    pub password_hash: String,
    /// Display name.
    pub name: String,
    /// Canonical role (never `Organizer`).
    pub role: Role,
    /// The owner proved control of the email.
    pub email_verified: bool,
    /// Pending one-time code.
    pub otc: Option<PendingOtc>,
    /// Mismatches against the pending code.
    pub otc_failed_attempts: u32,
    /// HOST approved by an administrator.
    pub host_approved: bool,
    /// When the HOST was approved.
    pub host_approved_at: Option<DateTime<Utc>>,
    /// When the HOST was surfaced for review.
    pub host_requested_at: Option<DateTime<Utc>>,
    /// Last session issued.
    pub last_login_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// A freshly registered, unverified identity.
    #[must_use]
    pub fn new(
        email: String,
        password_hash: String,
        name: String,
        role: Role,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: IdentityId::new(),
            email,
            password_hash,
            name,
            role: role.canonical(),
            email_verified: false,
            otc: None,
            otc_failed_attempts: 0,
            host_approved: false,
            host_approved_at: None,
            host_requested_at: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The flags the lifecycle reducer works on.
    #[must_use]
    pub const fn lifecycle(&self) -> Lifecycle {
        Lifecycle {
            role: Some(self.role),
            email_verified: self.email_verified,
            host_approved: self.host_approved,
            review_requested: self.host_requested_at.is_some(),
        }
    }

    /// Derived lifecycle state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        LifecycleState::derive(self.role, self.email_verified, self.host_approved)
    }

    /// Public projection, free of secrets.
    #[must_use]
    pub fn view(&self) -> IdentityView {
        IdentityView {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            state: self.state(),
            email_verified: self.email_verified,
            host_approved: self.host_approved,
            host_approved_at: self.host_approved_at,
            host_requested_at: self.host_requested_at,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
        }
    }
}

/// Lifecycle state derived from an identity's flags.
///
/// Rejection has no resting state: a rejected HOST is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    /// Registered, email not yet proven.
    Unverified,
    /// Email proven; active for every role except HOST.
    EmailVerified,
    /// HOST with a verified email awaiting an administrator.
    PendingApproval,
    /// HOST approved and verified.
    Approved,
}

impl LifecycleState {
    /// Derive the state from role and flags.
    #[must_use]
    pub const fn derive(role: Role, email_verified: bool, host_approved: bool) -> Self {
        if !email_verified {
            return Self::Unverified;
        }
        if role.is_host() {
            if host_approved {
                Self::Approved
            } else {
                Self::PendingApproval
            }
        } else {
            Self::EmailVerified
        }
    }

    /// Whether a session may be issued in this state.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::EmailVerified | Self::Approved)
    }
}

/// Reducer state: the lifecycle-relevant flags of one identity.
///
/// `role == None` means the identity does not exist (never registered, or
/// deleted by rejection).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lifecycle {
    /// Canonical role, `None` when the identity does not exist.
    pub role: Option<Role>,
    /// Email proven.
    pub email_verified: bool,
    /// HOST approved.
    pub host_approved: bool,
    /// HOST surfaced for administrator review.
    pub review_requested: bool,
}

impl Lifecycle {
    /// Derived state, `None` when the identity does not exist.
    #[must_use]
    pub fn state(&self) -> Option<LifecycleState> {
        self.role
            .map(|role| LifecycleState::derive(role, self.email_verified, self.host_approved))
    }
}

/// Public view of an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityView {
    /// Identifier.
    pub id: IdentityId,
    /// Email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role.
    pub role: Role,
    /// Derived lifecycle state.
    pub state: LifecycleState,
    /// Email proven.
    pub email_verified: bool,
    /// HOST approved.
    pub host_approved: bool,
    /// When the HOST was approved.
    pub host_approved_at: Option<DateTime<Utc>>,
    /// When the HOST was surfaced for review.
    pub host_requested_at: Option<DateTime<Utc>>,
    /// Last session issued.
    pub last_login_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}
