//! PostgreSQL event directory.
//!
//! Reads tables owned by the event service:
//!
//! - `events (id, title, submission_deadline, status, organizer_id)`
//! - `event_participants (event_id, identity_id)`
//! - `submissions (event_id, submitter_id, team_id, status)`
//! - `team_members (team_id, identity_id)`
//!
//! A participant has submitted when a non-draft submission exists under the
//! event for them or for a team they belong to.

use crate::directory::{EventDirectory, EventQuery, EventStatus, EventSummary, Participant};
use crate::error::{ReminderError, Result};
use airena_core::{EventId, IdentityId};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(sqlx::FromRow)]
struct EventRow {
    id: uuid::Uuid,
    title: String,
    submission_deadline: DateTime<Utc>,
    status: String,
    organizer_name: String,
}

#[derive(sqlx::FromRow)]
struct ParticipantRow {
    identity_id: uuid::Uuid,
    email: String,
    name: String,
    has_submitted: bool,
}

fn parse_status(status: &str) -> Option<EventStatus> {
    match status {
        "UPCOMING" => Some(EventStatus::Upcoming),
        "LIVE" => Some(EventStatus::Live),
        "ENDED" => Some(EventStatus::Ended),
        _ => None,
    }
}

/// Event directory over the event service's tables.
#[derive(Debug, Clone)]
pub struct PostgresEventDirectory {
    pool: PgPool,
}

impl PostgresEventDirectory {
    /// Create a directory over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl EventDirectory for PostgresEventDirectory {
    async fn find_events(&self, query: &EventQuery) -> Result<Vec<EventSummary>> {
        let statuses: Vec<String> = query.statuses.iter().map(|s| s.as_str().to_string()).collect();
        let rows = sqlx::query_as::<_, EventRow>(
            r"
            SELECT e.id, e.title, e.submission_deadline, e.status,
                   COALESCE(o.name, '') AS organizer_name
            FROM events e
            LEFT JOIN identities o ON o.id = e.organizer_id
            WHERE e.status = ANY($1)
              AND e.submission_deadline > $2
              AND ($3::timestamptz IS NULL OR e.submission_deadline <= $3)
            ORDER BY e.submission_deadline ASC
            ",
        )
        .bind(statuses)
        .bind(query.deadline_after)
        .bind(query.deadline_until)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ReminderError::Directory(format!("Failed to load events: {e}")))?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let Some(status) = parse_status(&row.status) else {
                    tracing::warn!(event_id = %row.id, status = %row.status, "Skipping event with unknown status");
                    return None;
                };
                Some(EventSummary {
                    id: EventId(row.id),
                    title: row.title,
                    submission_deadline: row.submission_deadline,
                    status,
                    organizer_name: row.organizer_name,
                })
            })
            .collect())
    }

    async fn participants(&self, event: EventId) -> Result<Vec<Participant>> {
        let rows = sqlx::query_as::<_, ParticipantRow>(
            r"
            SELECT i.id AS identity_id, i.email, i.name,
                   EXISTS (
                       SELECT 1 FROM submissions s
                       WHERE s.event_id = p.event_id
                         AND s.status <> 'DRAFT'
                         AND (
                             s.submitter_id = p.identity_id
                             OR s.team_id IN (
                                 SELECT tm.team_id FROM team_members tm
                                 WHERE tm.identity_id = p.identity_id
                             )
                         )
                   ) AS has_submitted
            FROM event_participants p
            JOIN identities i ON i.id = p.identity_id
            WHERE p.event_id = $1
            ",
        )
        .bind(event.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ReminderError::Directory(format!("Failed to load participants: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|row| Participant {
                identity_id: IdentityId(row.identity_id),
                email: row.email,
                name: row.name,
                has_submitted: row.has_submitted,
            })
            .collect())
    }
}
