//! Read access to events and their participants.
//!
//! Events, participations and submissions are owned elsewhere; the
//! scheduler only reads them through this contract.

use crate::error::Result;
use airena_core::{EventId, IdentityId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Event status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    /// Not started.
    Upcoming,
    /// Running.
    Live,
    /// Finished.
    Ended,
}

impl EventStatus {
    /// Storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upcoming => "UPCOMING",
            Self::Live => "LIVE",
            Self::Ended => "ENDED",
        }
    }
}

/// What a sweep needs to know about an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSummary {
    /// Identifier.
    pub id: EventId,
    /// Title shown in messages.
    pub title: String,
    /// Submission deadline.
    pub submission_deadline: DateTime<Utc>,
    /// Status.
    pub status: EventStatus,
    /// Organizer's display name.
    pub organizer_name: String,
}

/// A participant of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Participant identity.
    pub identity_id: IdentityId,
    /// Where reminders go.
    pub email: String,
    /// Display name.
    pub name: String,
    /// A non-draft submission exists for the participant or their team.
    pub has_submitted: bool,
}

/// Event selection for a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    /// Accepted statuses.
    pub statuses: Vec<EventStatus>,
    /// Deadline strictly after this instant.
    pub deadline_after: DateTime<Utc>,
    /// Deadline at or before this instant, when set.
    pub deadline_until: Option<DateTime<Utc>>,
}

impl EventQuery {
    /// Whether `event` is selected.
    #[must_use]
    pub fn matches(&self, event: &EventSummary) -> bool {
        self.statuses.contains(&event.status)
            && event.submission_deadline > self.deadline_after
            && self
                .deadline_until
                .is_none_or(|until| event.submission_deadline <= until)
    }
}

/// Event and participation lookups.
pub trait EventDirectory: Send + Sync {
    /// Events matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReminderError::Directory`] if the lookup fails.
    fn find_events(&self, query: &EventQuery) -> impl Future<Output = Result<Vec<EventSummary>>> + Send;

    /// Participants of `event` with their submission flag.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReminderError::Directory`] if the lookup fails.
    fn participants(&self, event: EventId) -> impl Future<Output = Result<Vec<Participant>>> + Send;
}
