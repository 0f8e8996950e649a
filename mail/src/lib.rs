//! # AIrena Mail
//!
//! Outbound email for the identity and reminder services.
//!
//! ## Components
//!
//! - **[`Mailer`]**: the transport contract, `deliver(message) -> Result<(), MailError>`
//! - **[`EmailDispatcher`]**: validates the recipient, retries transient failures a
//!   bounded number of times with a fixed backoff, never retries permanent ones,
//!   and logs the final outcome against recipient and subject
//! - **Transports**: [`SmtpMailer`] (lettre), [`ConsoleMailer`] (development)
//! - **[`html`]**: escaping for user-provided text in message bodies
//!
//! ## Example
//!
//! ```ignore
//! use airena_mail::{DeliveryPolicy, EmailDispatcher, OutboundEmail, SmtpMailer};
//!
//! let mailer = SmtpMailer::new(smtp_config)?;
//! let dispatcher = EmailDispatcher::new(Arc::new(mailer), DeliveryPolicy::default());
//!
//! dispatcher
//!     .send(&OutboundEmail::new("host@example.com", "Hello", "<p>Hi</p>"))
//!     .await?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod address;
pub mod console;
pub mod dispatcher;
pub mod error;
pub mod html;
pub mod smtp;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use address::{is_valid_email, normalize_email};
pub use console::ConsoleMailer;
pub use dispatcher::{DeliveryPolicy, EmailDispatcher};
pub use error::MailError;
pub use smtp::{SmtpConfig, SmtpMailer};
pub use transport::{Mailer, OutboundEmail};
