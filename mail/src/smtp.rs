//! SMTP transport using Lettre.

use crate::error::MailError;
use crate::transport::{Mailer, OutboundEmail};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// SMTP connection settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP server address (e.g., "smtp.gmail.com").
    pub host: String,
    /// 465 selects implicit TLS, anything else STARTTLS.
    pub port: u16,
    /// Authentication username.
    pub username: String,
    /// Authentication password.
    pub password: String,
    /// Sender address.
    pub from_email: String,
    /// Sender display name.
    pub from_name: String,
}

/// SMTP mailer.
///
/// Lettre's SMTP transport is blocking, so each delivery runs on the
/// blocking pool.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer").field("from", &self.from).finish_non_exhaustive()
    }
}

impl SmtpMailer {
    /// Create an SMTP mailer.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Permanent`] when the relay or sender address is
    /// invalid.
    pub fn new(config: SmtpConfig) -> Result<Self, MailError> {
        let builder = if config.port == 465 {
            SmtpTransport::relay(&config.host)
        } else {
            SmtpTransport::starttls_relay(&config.host)
        }
        .map_err(|e| MailError::Permanent(format!("SMTP relay error: {e}")))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(config.username, config.password))
            .build();

        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse::<Mailbox>()
            .map_err(|e| MailError::Permanent(format!("Invalid from address: {e}")))?;

        Ok(Self { transport, from })
    }
}

impl Mailer for SmtpMailer {
    async fn deliver(&self, message: &OutboundEmail) -> Result<(), MailError> {
        let to = message
            .to
            .parse::<Mailbox>()
            .map_err(|e| MailError::InvalidRecipient(format!("{}: {e}", message.to)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(message.html.clone())
            .map_err(|e| MailError::Permanent(format!("Failed to build email: {e}")))?;

        let transport = self.transport.clone();

        tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(|e| MailError::Transient(format!("Email task failed: {e}")))?
            .map(|_| ())
            .map_err(|e| {
                if e.is_permanent() {
                    MailError::Permanent(e.to_string())
                } else {
                    MailError::Transient(e.to_string())
                }
            })
    }
}
