//! In-memory event directory.

use crate::directory::{EventDirectory, EventQuery, EventSummary, Participant};
use crate::error::{ReminderError, Result};
use airena_core::{EventId, IdentityId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Data {
    events: Vec<EventSummary>,
    participants: HashMap<EventId, Vec<Participant>>,
    failing_events: HashSet<EventId>,
    fail_event_lookup: bool,
}

/// Event directory over in-memory lists. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventDirectory {
    data: Arc<Mutex<Data>>,
}

impl InMemoryEventDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> MutexGuard<'_, Data> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an event.
    pub fn add_event(&self, event: EventSummary) {
        self.data().events.push(event);
    }

    /// Add a participant to an event.
    pub fn add_participant(&self, event: EventId, participant: Participant) {
        self.data().participants.entry(event).or_default().push(participant);
    }

    /// Record a qualifying submission.
    pub fn mark_submitted(&self, event: EventId, identity: IdentityId) {
        if let Some(participants) = self.data().participants.get_mut(&event) {
            for participant in participants.iter_mut().filter(|p| p.identity_id == identity) {
                participant.has_submitted = true;
            }
        }
    }

    /// Make participant lookups for `event` fail.
    pub fn fail_participants(&self, event: EventId) {
        self.data().failing_events.insert(event);
    }

    /// Make event lookups fail.
    pub fn fail_event_lookup(&self) {
        self.data().fail_event_lookup = true;
    }
}

impl EventDirectory for InMemoryEventDirectory {
    async fn find_events(&self, query: &EventQuery) -> Result<Vec<EventSummary>> {
        let data = self.data();
        if data.fail_event_lookup {
            return Err(ReminderError::Directory("event lookup unavailable".into()));
        }
        Ok(data.events.iter().filter(|e| query.matches(e)).cloned().collect())
    }

    async fn participants(&self, event: EventId) -> Result<Vec<Participant>> {
        let data = self.data();
        if data.failing_events.contains(&event) {
            return Err(ReminderError::Directory(format!("participants of {event} unavailable")));
        }
        Ok(data.participants.get(&event).cloned().unwrap_or_default())
    }
}
