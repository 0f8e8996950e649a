//! Email address checks.

/// Canonical form used for storage and lookups: trimmed, lower-cased.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate email format.
///
/// A syntactic check only: one `@`, a non-empty local part of
/// `[A-Za-z0-9._+-]`, and a dotted domain of `[A-Za-z0-9.-]` with no empty
/// labels.
///
/// # Examples
///
/// ```
/// use airena_mail::is_valid_email;
///
/// assert!(is_valid_email("user@example.com"));
/// assert!(is_valid_email("user+tag@example.co.uk"));
/// assert!(!is_valid_email("invalid"));
/// assert!(!is_valid_email("@example.com"));
/// assert!(!is_valid_email("user@"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    let valid_local_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | '_');
    let valid_domain_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-');

    if !local.chars().all(valid_local_char) || !domain.chars().all(valid_domain_char) {
        return false;
    }

    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}
