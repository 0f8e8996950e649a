//! Recording mailer for tests.

use crate::error::MailError;
use crate::transport::{Mailer, OutboundEmail};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
struct Recorded {
    sent: Vec<OutboundEmail>,
    attempts: usize,
    scripted: VecDeque<MailError>,
    failing_recipients: HashMap<String, MailError>,
}

/// Mailer that records every delivered message.
///
/// Failures can be scripted per attempt ([`RecordingMailer::fail_next`]) or
/// per recipient ([`RecordingMailer::fail_recipient`]). Clones share state.
#[derive(Clone, Debug, Default)]
pub struct RecordingMailer {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingMailer {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Recorded) -> T) -> T {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut inner)
    }

    /// Fail the next delivery attempt (queued, FIFO).
    pub fn fail_next(&self, error: MailError) {
        self.with(|r| r.scripted.push_back(error));
    }

    /// Fail every attempt addressed to `to`.
    pub fn fail_recipient(&self, to: &str, error: MailError) {
        self.with(|r| r.failing_recipients.insert(to.to_string(), error));
    }

    /// Messages delivered so far.
    #[must_use]
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.with(|r| r.sent.clone())
    }

    /// Messages delivered to `to`.
    #[must_use]
    pub fn sent_to(&self, to: &str) -> Vec<OutboundEmail> {
        self.with(|r| r.sent.iter().filter(|m| m.to == to).cloned().collect())
    }

    /// The most recent message delivered to `to`.
    #[must_use]
    pub fn last_to(&self, to: &str) -> Option<OutboundEmail> {
        self.with(|r| r.sent.iter().rev().find(|m| m.to == to).cloned())
    }

    /// Delivery attempts, successful or not.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.with(|r| r.attempts)
    }

    /// Forget recorded messages and attempts. Scripted failures are kept.
    pub fn clear(&self) {
        self.with(|r| {
            r.sent.clear();
            r.attempts = 0;
        });
    }
}

impl Mailer for RecordingMailer {
    async fn deliver(&self, message: &OutboundEmail) -> Result<(), MailError> {
        self.with(|r| {
            r.attempts += 1;
            if let Some(error) = r.failing_recipients.get(&message.to) {
                return Err(error.clone());
            }
            if let Some(error) = r.scripted.pop_front() {
                return Err(error);
            }
            r.sent.push(message.clone());
            Ok(())
        })
    }
}
