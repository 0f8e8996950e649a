//! Lifecycle environment.

use airena_mail::normalize_email;

/// Policy inputs for the lifecycle reducer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleEnvironment {
    admin_emails: Vec<String>,
}

impl LifecycleEnvironment {
    /// Create an environment from the configured administrator emails.
    #[must_use]
    pub fn new(admin_emails: &[String]) -> Self {
        Self {
            admin_emails: admin_emails.iter().map(|e| normalize_email(e)).collect(),
        }
    }

    /// Whether `email` is a configured administrator address.
    #[must_use]
    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = normalize_email(email);
        self.admin_emails.iter().any(|admin| *admin == email)
    }

    /// Configured administrator addresses.
    #[must_use]
    pub fn admin_emails(&self) -> &[String] {
        &self.admin_emails
    }
}
