//! Validated, bounded-retry delivery with outcome logging.

use crate::address::is_valid_email;
use crate::error::MailError;
use crate::transport::{Mailer, OutboundEmail};
use airena_runtime::retry::{RetryPolicy, retry_with_predicate};
use std::sync::Arc;
use std::time::Duration;

/// How hard to try before giving up on a message.
///
/// Defaults: 2 attempts, 2 seconds apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Total attempts per message, including the first.
    pub max_attempts: usize,
    /// Fixed wait between attempts.
    pub backoff: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_secs(2),
        }
    }
}

impl DeliveryPolicy {
    /// Set the number of attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the wait between attempts.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_attempts, self.backoff)
    }
}

/// Delivers messages through a [`Mailer`] under a [`DeliveryPolicy`].
///
/// Every message ends in exactly one `SENT` or `FAILED` log line carrying
/// the recipient and subject.
pub struct EmailDispatcher<M> {
    mailer: Arc<M>,
    policy: DeliveryPolicy,
}

impl<M> Clone for EmailDispatcher<M> {
    fn clone(&self) -> Self {
        Self {
            mailer: Arc::clone(&self.mailer),
            policy: self.policy.clone(),
        }
    }
}

impl<M: Mailer> EmailDispatcher<M> {
    /// Create a dispatcher.
    #[must_use]
    pub const fn new(mailer: Arc<M>, policy: DeliveryPolicy) -> Self {
        Self { mailer, policy }
    }

    /// The underlying transport.
    #[must_use]
    pub fn mailer(&self) -> &M {
        &self.mailer
    }

    /// Deliver one message.
    ///
    /// Malformed recipients are rejected without touching the transport.
    ///
    /// # Errors
    ///
    /// Returns the final [`MailError`] when the message could not be
    /// delivered.
    #[tracing::instrument(skip_all, fields(recipient = %message.to, subject = %message.subject))]
    pub async fn send(&self, message: &OutboundEmail) -> Result<(), MailError> {
        if !is_valid_email(&message.to) {
            tracing::warn!(status = "FAILED", "Invalid recipient address, delivery not attempted");
            metrics::counter!("airena_email_deliveries_total", "outcome" => "failed").increment(1);
            return Err(MailError::InvalidRecipient(message.to.clone()));
        }

        let result = retry_with_predicate(
            &self.policy.retry_policy(),
            |attempt| {
                tracing::debug!(attempt, "Delivering email");
                self.mailer.deliver(message)
            },
            MailError::is_retryable,
        )
        .await;

        match &result {
            Ok(()) => {
                tracing::info!(status = "SENT", "Email delivered");
                metrics::counter!("airena_email_deliveries_total", "outcome" => "sent").increment(1);
            }
            Err(error) => {
                tracing::error!(status = "FAILED", %error, "Email delivery failed");
                metrics::counter!("airena_email_deliveries_total", "outcome" => "failed").increment(1);
            }
        }

        result
    }
}
