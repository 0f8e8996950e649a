//! Reminder messages.

use crate::class::ReminderClass;
use crate::directory::{EventSummary, Participant};
use airena_mail::OutboundEmail;
use airena_mail::html::{escape, layout};

fn deadline(event: &EventSummary) -> String {
    event.submission_deadline.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Subject line for a reminder.
#[must_use]
pub fn subject(class: ReminderClass, event_title: &str, days_left: i64) -> String {
    match class {
        ReminderClass::Daily if days_left == 1 => format!("⏳ 1 day left to submit – {event_title}"),
        ReminderClass::Daily => format!("⏳ {days_left} days left to submit – {event_title}"),
        ReminderClass::FinalDay => format!("🚨 Last day to submit – {event_title}"),
        ReminderClass::OneHour => format!("⏰ 1 hour left! Submit now – {event_title}"),
    }
}

/// The reminder email for one participant.
#[must_use]
pub fn reminder(class: ReminderClass, event: &EventSummary, participant: &Participant, days_left: i64) -> OutboundEmail {
    let subject = subject(class, &event.title, days_left);
    let name = escape(&participant.name);
    let title = escape(&event.title);

    let body = match class {
        ReminderClass::Daily => format!(
            r"        <h2>Submission Reminder</h2>
        <p>Hi {name},</p>
        <p>You have <strong>{days}</strong> left to submit your project for <strong>{title}</strong>, organized by {organizer}.</p>
        <p><strong>Deadline:</strong> {deadline}</p>",
            days = if days_left == 1 { "1 day".to_string() } else { format!("{days_left} days") },
            organizer = escape(&event.organizer_name),
            deadline = deadline(event),
        ),
        ReminderClass::FinalDay => format!(
            r"        <h2>Final Day to Submit</h2>
        <p>Hi {name},</p>
        <p>Today is the last day to submit your project for <strong>{title}</strong>.</p>
        <p><strong>Deadline:</strong> {deadline}</p>",
            deadline = deadline(event),
        ),
        ReminderClass::OneHour => format!(
            r"        <h2>One Hour Left</h2>
        <p>Hi {name},</p>
        <p>Submissions for <strong>{title}</strong> close in about an hour. Submit now so you don't miss out.</p>"
        ),
    };

    OutboundEmail::new(&participant.email, subject.as_str(), layout(&subject, &body))
}

/// Ledger description of a reminder.
#[must_use]
pub fn ledger_message(event: &EventSummary) -> String {
    format!("Submission reminder for {}", event.title)
}
