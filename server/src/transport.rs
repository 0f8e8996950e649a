//! Mail transport chosen at startup.

use airena_mail::{ConsoleMailer, MailError, Mailer, OutboundEmail, SmtpConfig, SmtpMailer};

/// SMTP when configured, console otherwise.
#[derive(Debug, Clone)]
pub enum Transport {
    /// Real delivery.
    Smtp(SmtpMailer),
    /// Development: log instead of sending.
    Console(ConsoleMailer),
}

impl Transport {
    /// Build the transport for `smtp`.
    ///
    /// # Errors
    ///
    /// Returns error when the SMTP settings are unusable.
    pub fn new(smtp: Option<SmtpConfig>) -> Result<Self, MailError> {
        match smtp {
            Some(config) => {
                tracing::info!(host = %config.host, port = config.port, "Using SMTP mailer");
                Ok(Self::Smtp(SmtpMailer::new(config)?))
            }
            None => {
                tracing::warn!("SMTP_HOST not set, emails are logged instead of sent");
                Ok(Self::Console(ConsoleMailer::new()))
            }
        }
    }
}

impl Mailer for Transport {
    async fn deliver(&self, message: &OutboundEmail) -> Result<(), MailError> {
        match self {
            Self::Smtp(mailer) => mailer.deliver(message).await,
            Self::Console(mailer) => mailer.deliver(message).await,
        }
    }
}
