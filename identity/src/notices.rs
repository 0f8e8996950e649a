//! Messages sent by the identity services.

use crate::state::Identity;
use airena_mail::OutboundEmail;
use airena_mail::html::{escape, layout};
use chrono::{DateTime, Utc};

/// Subject of the one-time-code message.
pub const OTC_SUBJECT: &str = "Verify Your Email - AIrena";
/// Subject of the host review request sent to administrators.
pub const HOST_REQUEST_SUBJECT: &str = "New Host Approval Request - AIrena";
/// Subject of the approval notice.
pub const HOST_APPROVED_SUBJECT: &str = "Host Account Approved - Welcome to AIrena! 🎉";
/// Subject of the rejection notice.
pub const HOST_REJECTED_SUBJECT: &str = "Host Account Request Update - AIrena";

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// The one-time code.
#[must_use]
pub fn otc(to: &str, code: &str, valid_minutes: i64) -> OutboundEmail {
    let body = format!(
        r#"        <h2>Email Verification Required</h2>
        <p>Your verification code:</p>
        <p style="font-size: 32px; font-weight: bold; letter-spacing: 8px; font-family: monospace;">{code}</p>
        <p>This code expires in {valid_minutes} minutes. Never share it with anyone.</p>
        <p>If you didn't request this, you can ignore this email.</p>"#
    );
    OutboundEmail::new(to, OTC_SUBJECT, layout(OTC_SUBJECT, &body))
}

/// Review request for one administrator, with signed approve/reject links.
#[must_use]
pub fn host_request(
    admin: &str,
    host: &Identity,
    requested_at: DateTime<Utc>,
    approve_url: &str,
    reject_url: &str,
) -> OutboundEmail {
    let body = format!(
        r#"        <h2>New Host Approval Request</h2>
        <p>A user has requested host privileges.</p>
        <p><strong>Name:</strong> {name}<br>
           <strong>Email:</strong> {email}<br>
           <strong>Requested at:</strong> {requested}</p>
        <p>
            <a href="{approve}" style="background-color: #059669; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px;">Approve</a>
            &nbsp;
            <a href="{reject}" style="background-color: #dc2626; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px;">Reject</a>
        </p>
        <p style="color: #666; font-size: 14px;">These links expire. You can also review the request from the admin dashboard.</p>"#,
        name = escape(&host.name),
        email = escape(&host.email),
        requested = timestamp(requested_at),
        approve = escape(approve_url),
        reject = escape(reject_url),
    );
    OutboundEmail::new(admin, HOST_REQUEST_SUBJECT, layout(HOST_REQUEST_SUBJECT, &body))
}

/// Approval notice. The host must verify the new code sent alongside it.
#[must_use]
pub fn host_approved(host: &Identity, approved_at: DateTime<Utc>) -> OutboundEmail {
    let body = format!(
        r"        <h2>Host Account Approved!</h2>
        <p>Hi <strong>{name}</strong>,</p>
        <p>Your host account was approved on {approved}. Verify the code we just sent you and you can start creating hackathons.</p>",
        name = escape(&host.name),
        approved = timestamp(approved_at),
    );
    OutboundEmail::new(&host.email, HOST_APPROVED_SUBJECT, layout(HOST_APPROVED_SUBJECT, &body))
}

/// Rejection notice. The account is deleted right after.
#[must_use]
pub fn host_rejected(host: &Identity, rejected_at: DateTime<Utc>) -> OutboundEmail {
    let body = format!(
        r"        <h2>Host Account Request Update</h2>
        <p>Hi <strong>{name}</strong>,</p>
        <p>We are unable to approve your host account request at this time (reviewed {reviewed}).</p>
        <p>Your registration has been removed. You are welcome to register again, as a participant or to apply as a host in the future.</p>",
        name = escape(&host.name),
        reviewed = timestamp(rejected_at),
    );
    OutboundEmail::new(&host.email, HOST_REJECTED_SUBJECT, layout(HOST_REJECTED_SUBJECT, &body))
}
