//! The reminder scheduler.
//!
//! # Sweeps
//!
//! - **Daily**: UPCOMING or LIVE events with a deadline in the next 7 days,
//!   on the 7th, 3rd and last day before it
//! - **Hourly**: LIVE events with a future deadline, classified into
//!   one-hour, final-day or daily reminders
//!
//! # Delivery
//!
//! Each reminder is claimed in the ledger before it is sent. The claim is
//! an atomic insert-if-absent, so overlapping sweeps (scheduled and manual,
//! daily and hourly) never send the same key twice. A failed delivery
//! keeps its claim: reminders are sent at most once.
//!
//! A sweep never fails. Lookup and delivery errors are logged, counted in
//! the [`SweepReport`] and skipped.

use crate::class::ReminderKey;
use crate::config::ReminderConfig;
use crate::directory::{EventDirectory, EventQuery, EventStatus, EventSummary, Participant};
use crate::error::ReminderError;
use crate::ledger::{LedgerEntry, ReminderLedger};
use crate::messages;
use crate::window::{DueReminder, classify_hourly, daily_milestone};
use airena_core::environment::Clock;
use airena_mail::{EmailDispatcher, Mailer};
use airena_runtime::schedule::{Schedule, spawn_periodic};
use chrono::{DateTime, TimeDelta, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Which sweep to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepKind {
    /// Once a day, milestone days only.
    Daily,
    /// Every hour.
    Hourly,
}

impl SweepKind {
    /// Name used in logs and the trigger endpoint.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Hourly => "hourly",
        }
    }
}

impl fmt::Display for SweepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SweepKind {
    type Err = ReminderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "hourly" => Ok(Self::Hourly),
            _ => Err(ReminderError::UnknownSweep(s.to_string())),
        }
    }
}

/// What one sweep did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Which sweep.
    pub kind: SweepKind,
    /// Events with a reminder due.
    pub events_considered: usize,
    /// Reminders delivered.
    pub sent: usize,
    /// Reminders skipped because the ledger already had them.
    pub already_sent: usize,
    /// Participants skipped because they submitted.
    pub submitted: usize,
    /// Lookups or deliveries that failed.
    pub failed: usize,
}

impl SweepReport {
    const fn new(kind: SweepKind) -> Self {
        Self {
            kind,
            events_considered: 0,
            sent: 0,
            already_sent: 0,
            submitted: 0,
            failed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Sent,
    AlreadySent,
    Failed,
}

impl Outcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::AlreadySent => "already_sent",
            Self::Failed => "failed",
        }
    }
}

/// Sweeps events and sends at-most-once submission reminders.
pub struct ReminderScheduler<D, L, M> {
    directory: Arc<D>,
    ledger: Arc<L>,
    mail: EmailDispatcher<M>,
    config: ReminderConfig,
    clock: Arc<dyn Clock>,
}

impl<D, L, M> Clone for ReminderScheduler<D, L, M> {
    fn clone(&self) -> Self {
        Self {
            directory: Arc::clone(&self.directory),
            ledger: Arc::clone(&self.ledger),
            mail: self.mail.clone(),
            config: self.config.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<D, L, M> ReminderScheduler<D, L, M>
where
    D: EventDirectory + 'static,
    L: ReminderLedger + 'static,
    M: Mailer + 'static,
{
    /// Create a scheduler.
    #[must_use]
    pub fn new(
        directory: Arc<D>,
        ledger: Arc<L>,
        mail: EmailDispatcher<M>,
        config: ReminderConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            directory,
            ledger,
            mail,
            config,
            clock,
        }
    }

    /// Run one sweep now.
    ///
    /// Safe to call at any time, including while a scheduled sweep runs.
    pub async fn trigger(&self, kind: SweepKind) -> SweepReport {
        match kind {
            SweepKind::Daily => self.run_daily_sweep().await,
            SweepKind::Hourly => self.run_hourly_sweep().await,
        }
    }

    /// Daily sweep: milestone reminders 7, 3 and 1 days out.
    pub async fn run_daily_sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let query = EventQuery {
            statuses: vec![EventStatus::Upcoming, EventStatus::Live],
            deadline_after: now,
            deadline_until: Some(now + TimeDelta::days(self.config.lookahead_days)),
        };
        self.sweep(SweepKind::Daily, &query, now, daily_milestone).await
    }

    /// Hourly sweep: one-hour, final-day and daily reminders.
    pub async fn run_hourly_sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let query = EventQuery {
            statuses: vec![EventStatus::Live],
            deadline_after: now,
            deadline_until: None,
        };
        self.sweep(SweepKind::Hourly, &query, now, classify_hourly).await
    }

    async fn sweep(
        &self,
        kind: SweepKind,
        query: &EventQuery,
        now: DateTime<Utc>,
        due: fn(DateTime<Utc>, DateTime<Utc>) -> Option<DueReminder>,
    ) -> SweepReport {
        tracing::info!(sweep = %kind, "Reminder sweep started");
        let mut report = SweepReport::new(kind);

        let events = match self.directory.find_events(query).await {
            Ok(events) => events,
            Err(error) => {
                tracing::error!(sweep = %kind, %error, "Reminder sweep could not load events");
                report.failed += 1;
                return report;
            }
        };

        for event in &events {
            let Some(reminder) = due(event.submission_deadline, now) else {
                continue;
            };
            report.events_considered += 1;
            tracing::debug!(
                sweep = %kind,
                event_id = %event.id,
                class = %reminder.class,
                days_left = reminder.days_left,
                "Reminder due"
            );
            self.remind_participants(event, reminder, now, &mut report).await;
        }

        tracing::info!(
            sweep = %kind,
            events_considered = report.events_considered,
            sent = report.sent,
            already_sent = report.already_sent,
            submitted = report.submitted,
            failed = report.failed,
            "Reminder sweep finished"
        );
        report
    }

    async fn remind_participants(
        &self,
        event: &EventSummary,
        reminder: DueReminder,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) {
        let participants = match self.directory.participants(event.id).await {
            Ok(participants) => participants,
            Err(error) => {
                tracing::error!(event_id = %event.id, %error, "Could not load participants");
                report.failed += 1;
                return;
            }
        };

        let (submitted, pending): (Vec<Participant>, Vec<Participant>) =
            participants.into_iter().partition(|p| p.has_submitted);
        report.submitted += submitted.len();

        let dispatches: Vec<_> = pending
            .iter()
            .map(|participant| self.dispatch(event, reminder, participant, now))
            .collect();
        let outcomes: Vec<Outcome> = stream::iter(dispatches)
            .buffer_unordered(self.config.dispatch_concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                Outcome::Sent => report.sent += 1,
                Outcome::AlreadySent => report.already_sent += 1,
                Outcome::Failed => report.failed += 1,
            }
        }
    }

    /// Claim, then send one reminder.
    async fn dispatch(
        &self,
        event: &EventSummary,
        reminder: DueReminder,
        participant: &Participant,
        now: DateTime<Utc>,
    ) -> Outcome {
        let key = ReminderKey::new(participant.identity_id, event.id, reminder.class, now.date_naive());
        let entry = LedgerEntry::new(key, messages::ledger_message(event), now);

        let outcome = match self.ledger.record_if_absent(&entry).await {
            Ok(false) => Outcome::AlreadySent,
            Ok(true) => {
                let message = messages::reminder(reminder.class, event, participant, reminder.days_left);
                match self.mail.send(&message).await {
                    Ok(()) => Outcome::Sent,
                    Err(error) => {
                        tracing::warn!(
                            event_id = %event.id,
                            recipient = %participant.identity_id,
                            class = %reminder.class,
                            %error,
                            "Reminder not delivered"
                        );
                        Outcome::Failed
                    }
                }
            }
            Err(error) => {
                tracing::error!(event_id = %event.id, ledger = %entry.name, %error, "Could not claim reminder");
                Outcome::Failed
            }
        };

        tracing::debug!(
            event_id = %event.id,
            recipient = %participant.identity_id,
            class = %reminder.class,
            outcome = outcome.as_str(),
            "Reminder dispatched"
        );
        metrics::counter!(
            "airena_reminders_total",
            "class" => reminder.class.as_str(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
        outcome
    }

    /// Start both sweeps on their schedules until `shutdown` turns `true`.
    #[must_use]
    pub fn spawn(&self, shutdown: &watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let daily = self.clone();
        let hourly = self.clone();
        vec![
            spawn_periodic(
                "daily-reminder-sweep",
                Schedule::DailyAt(self.config.daily_run_at),
                Arc::clone(&self.clock),
                shutdown.clone(),
                move || {
                    let scheduler = daily.clone();
                    async move {
                        scheduler.run_daily_sweep().await;
                    }
                },
            ),
            spawn_periodic(
                "hourly-reminder-sweep",
                Schedule::Every(self.config.hourly_interval),
                Arc::clone(&self.clock),
                shutdown.clone(),
                move || {
                    let scheduler = hourly.clone();
                    async move {
                        scheduler.run_hourly_sweep().await;
                    }
                },
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_kind_parses_case_insensitively() {
        assert_eq!("daily".parse::<SweepKind>(), Ok(SweepKind::Daily));
        assert_eq!(" Hourly ".parse::<SweepKind>(), Ok(SweepKind::Hourly));
        assert!(matches!("weekly".parse::<SweepKind>(), Err(ReminderError::UnknownSweep(_))));
    }

    #[test]
    fn test_report_serializes_kind_in_lower_case() {
        let report = SweepReport::new(SweepKind::Hourly);
        let json = serde_json::to_value(report).unwrap_or_default();
        assert_eq!(json["kind"], "hourly");
        assert_eq!(json["sent"], 0);
    }
}
