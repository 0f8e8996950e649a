//! Application state shared across handlers.

use airena_identity::{IdentityRepository, IdentityServices};
use airena_mail::Mailer;
use airena_reminders::{EventDirectory, ReminderLedger, ReminderScheduler};

/// The storage and transport types an application runs on.
///
/// Implemented by a marker type in the binary (PostgreSQL) and in tests
/// (in-memory).
pub trait Backend: Send + Sync + 'static {
    /// Identity storage.
    type Identities: IdentityRepository + 'static;
    /// Email transport.
    type Mailer: Mailer + 'static;
    /// Event and participation lookups.
    type Events: EventDirectory + 'static;
    /// Reminder ledger.
    type Ledger: ReminderLedger + 'static;
}

/// Application state shared across all HTTP handlers.
pub struct AppState<B: Backend> {
    /// Identity lifecycle services.
    pub identity: IdentityServices<B::Identities, B::Mailer>,
    /// Reminder scheduler, for manual sweeps.
    pub reminders: ReminderScheduler<B::Events, B::Ledger, B::Mailer>,
}

impl<B: Backend> AppState<B> {
    /// Create the state.
    #[must_use]
    pub const fn new(
        identity: IdentityServices<B::Identities, B::Mailer>,
        reminders: ReminderScheduler<B::Events, B::Ledger, B::Mailer>,
    ) -> Self {
        Self { identity, reminders }
    }
}

impl<B: Backend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            reminders: self.reminders.clone(),
        }
    }
}
