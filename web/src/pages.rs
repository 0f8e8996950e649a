//! HTML result pages for approval links opened from email.

use airena_identity::{ApprovalReceipt, IdentityView, RejectionReceipt};
use airena_mail::html::{escape, layout};
use chrono::{DateTime, Utc};

fn details(identity: &IdentityView, status: &str, extra: &str) -> String {
    format!(
        r#"        <div style="background: #f5f5f5; padding: 16px; border-radius: 8px; margin: 20px 0;">
            <p><strong>Name:</strong> {name}</p>
            <p><strong>Email:</strong> {email}</p>
            <p><strong>Status:</strong> {status}</p>
{extra}        </div>
"#,
        name = escape(&identity.name),
        email = escape(&identity.email),
    )
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Page shown after a host was approved from a link.
#[must_use]
pub fn approved(receipt: &ApprovalReceipt) -> String {
    let extra = format!(
        "            <p><strong>Approved At:</strong> {}</p>\n",
        timestamp(receipt.approved_at)
    );
    let body = format!(
        "        <h2>✅ Host Approved Successfully!</h2>\n{}        <p>The host has been notified by email and asked to verify their address.</p>\n",
        details(&receipt.identity, "Approved", &extra)
    );
    layout("Host Approved - AIrena", &body)
}

/// Page shown after a host request was rejected from a link.
#[must_use]
pub fn rejected(receipt: &RejectionReceipt) -> String {
    let body = format!(
        "        <h2>❌ Host Request Rejected</h2>\n{}        <p>The user has been notified by email about the decision.</p>\n",
        details(
            &receipt.identity,
            "Rejected",
            "            <p><strong>Action:</strong> User account removed</p>\n"
        )
    );
    layout("Host Rejected - AIrena", &body)
}

/// Page shown when a link action failed.
#[must_use]
pub fn failure(message: &str) -> String {
    let body = format!(
        "        <h2>❌ Error</h2>\n        <p>{}</p>\n        <p>Please try again or contact support if the issue persists.</p>\n",
        escape(message)
    );
    layout("Error - AIrena", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_page_escapes_message() {
        let page = failure("<script>x</script>");
        assert!(page.contains("&lt;script&gt;x&lt;/script&gt;"));
        assert!(!page.contains("<script>"));
    }
}
