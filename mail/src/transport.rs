//! Transport contract.

use crate::error::MailError;
use std::future::Future;

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
}

impl OutboundEmail {
    /// Create a message.
    #[must_use]
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
        }
    }
}

/// Email transport.
///
/// One call is one delivery attempt. Retrying, validation and outcome
/// logging belong to [`crate::EmailDispatcher`].
pub trait Mailer: Send + Sync {
    /// Attempt to deliver `message` once.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Transient`] when a later attempt may succeed and
    /// [`MailError::Permanent`] or [`MailError::InvalidRecipient`] when it
    /// cannot.
    fn deliver(&self, message: &OutboundEmail) -> impl Future<Output = Result<(), MailError>> + Send;
}
