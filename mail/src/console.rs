//! Console mailer for development.

use crate::error::MailError;
use crate::transport::{Mailer, OutboundEmail};

/// Logs messages instead of sending them.
///
/// The full body is logged, one-time codes included. Development only.
#[derive(Clone, Debug, Default)]
pub struct ConsoleMailer;

impl ConsoleMailer {
    /// Create a new console mailer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Mailer for ConsoleMailer {
    async fn deliver(&self, message: &OutboundEmail) -> Result<(), MailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.html,
            "📧 Email (development mode, not sent)"
        );
        Ok(())
    }
}
