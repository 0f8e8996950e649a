//! Error types for identity operations.

use thiserror::Error;

/// Result type alias for identity operations.
pub type Result<T> = std::result::Result<T, IdentityError>;

/// Coarse category of an [`IdentityError`], mapped one-to-one onto transport
/// status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad credentials, invalid or expired OTC, session or link.
    Authentication,
    /// Authenticated but not allowed.
    Authorization,
    /// Unknown identity.
    NotFound,
    /// Duplicate registration.
    Conflict,
    /// Malformed input.
    Validation,
    /// Storage or other system failure.
    Internal,
}

/// Error taxonomy for the identity lifecycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    // ═══════════════════════════════════════════════════════════
    // Authentication Errors
    // ═══════════════════════════════════════════════════════════

    /// Unknown email or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No pending code, code expired, or code mismatch.
    #[error("Invalid or expired verification code")]
    InvalidOtc,

    /// Session credential is malformed, forged or expired.
    #[error("Invalid or expired session")]
    InvalidSession,

    /// Approval link is malformed, forged, expired or for another target.
    #[error("Invalid or expired approval link")]
    InvalidApprovalLink,

    // ═══════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════

    /// A non-admin attempted an admin action.
    #[error("Administrator privileges required")]
    AdminRequired,

    /// The ADMIN role was requested from a non-administrator email.
    #[error("The ADMIN role cannot be requested")]
    AdminRoleNotAssignable,

    /// Approval target is not a HOST.
    #[error("Identity is not a host")]
    NotAHost,

    /// Approval target was already approved.
    #[error("Host is already approved")]
    HostAlreadyApproved,

    /// Administrators cannot be deleted through identity management.
    #[error("Administrator accounts cannot be deleted")]
    AdminNotDeletable,

    /// HOST has not been approved yet; no session may be issued.
    #[error("Host account is pending administrator approval")]
    HostApprovalPending,

    // ═══════════════════════════════════════════════════════════
    // Lookup and Conflict Errors
    // ═══════════════════════════════════════════════════════════

    /// No identity with the given id or email.
    #[error("Identity not found")]
    IdentityNotFound,

    /// The email is already registered.
    #[error("Email is already registered")]
    EmailAlreadyRegistered,

    /// Request failed validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error (should not be exposed to users).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// The category this error belongs to.
    ///
    /// # Examples
    ///
    /// ```
    /// # use airena_identity::{ErrorKind, IdentityError};
    /// assert_eq!(IdentityError::InvalidOtc.kind(), ErrorKind::Authentication);
    /// assert_eq!(IdentityError::HostAlreadyApproved.kind(), ErrorKind::Authorization);
    /// ```
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCredentials
            | Self::InvalidOtc
            | Self::InvalidSession
            | Self::InvalidApprovalLink => ErrorKind::Authentication,
            Self::AdminRequired
            | Self::AdminRoleNotAssignable
            | Self::NotAHost
            | Self::HostAlreadyApproved
            | Self::AdminNotDeletable
            | Self::HostApprovalPending => ErrorKind::Authorization,
            Self::IdentityNotFound => ErrorKind::NotFound,
            Self::EmailAlreadyRegistered => ErrorKind::Conflict,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Database(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(IdentityError::InvalidCredentials.kind(), ErrorKind::Authentication);
        assert_eq!(IdentityError::NotAHost.kind(), ErrorKind::Authorization);
        assert_eq!(IdentityError::IdentityNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(IdentityError::EmailAlreadyRegistered.kind(), ErrorKind::Conflict);
        assert_eq!(IdentityError::Validation("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(IdentityError::Database("x".into()).kind(), ErrorKind::Internal);
    }
}
