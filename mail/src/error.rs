//! Delivery errors.

use thiserror::Error;

/// Outcome of a failed delivery attempt.
///
/// The variant decides the retry policy: only [`MailError::Transient`] is
/// retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailError {
    /// The recipient address is malformed. Never retried.
    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),

    /// The server refused the message for good (recipient rejected, mailbox
    /// unavailable). Never retried.
    #[error("Permanent delivery failure: {0}")]
    Permanent(String),

    /// Network trouble, timeouts, temporary server errors.
    #[error("Transient delivery failure: {0}")]
    Transient(String),
}

impl MailError {
    /// Whether another attempt may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_errors_are_retryable() {
        assert!(MailError::Transient("timeout".into()).is_retryable());
        assert!(!MailError::Permanent("550 mailbox unavailable".into()).is_retryable());
        assert!(!MailError::InvalidRecipient("nope".into()).is_retryable());
    }
}
