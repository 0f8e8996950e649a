//! Identity configuration.
//!
//! Values are provided by the application; secrets have no defaults.

use chrono::TimeDelta;

/// One-time-code settings.
#[derive(Debug, Clone)]
pub struct OtcConfig {
    /// Key for the one-way code hash.
    pub secret: String,

    /// Code lifetime.
    ///
    /// Default: 10 minutes
    pub ttl: TimeDelta,

    /// Mismatches allowed before the pending code is discarded.
    ///
    /// Default: `None` (unlimited)
    pub max_failed_attempts: Option<u32>,
}

impl OtcConfig {
    /// Create OTC configuration with default lifetime and no attempt limit.
    #[must_use]
    pub const fn new(secret: String) -> Self {
        Self {
            secret,
            ttl: TimeDelta::minutes(10),
            max_failed_attempts: None,
        }
    }

    /// Set code lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }

    /// Discard the pending code after `attempts` mismatches.
    #[must_use]
    pub const fn with_max_failed_attempts(mut self, attempts: u32) -> Self {
        self.max_failed_attempts = Some(attempts);
        self
    }
}

/// Session credential settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HS256 signing key. Keys shorter than 32 characters are accepted with
    /// a warning.
    pub secret: String,

    /// Session lifetime.
    ///
    /// Default: 7 days
    pub ttl: TimeDelta,
}

impl SessionConfig {
    /// Create session configuration with the default lifetime.
    #[must_use]
    pub const fn new(secret: String) -> Self {
        Self {
            secret,
            ttl: TimeDelta::days(7),
        }
    }

    /// Set session lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Signed approval link settings.
#[derive(Debug, Clone)]
pub struct ApprovalLinkConfig {
    /// Public base URL of the API (e.g., "https://api.example.com").
    ///
    /// Links are formatted as `{base_url}/api/v1/admin/hosts/{id}/{action}?token={token}`.
    pub public_base_url: String,

    /// HS256 signing key for link tokens.
    pub secret: String,

    /// Link lifetime.
    ///
    /// Default: 72 hours
    pub ttl: TimeDelta,
}

impl ApprovalLinkConfig {
    /// Create link configuration with the default lifetime.
    #[must_use]
    pub const fn new(public_base_url: String, secret: String) -> Self {
        Self {
            public_base_url,
            secret,
            ttl: TimeDelta::hours(72),
        }
    }

    /// Set link lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Password rules and hashing cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Minimum length in characters.
    ///
    /// Default: 8
    pub min_length: usize,

    /// PBKDF2 iterations.
    ///
    /// Default: 100,000
    pub iterations: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            iterations: 100_000,
        }
    }
}

impl PasswordPolicy {
    /// Set PBKDF2 iterations.
    #[must_use]
    pub const fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }
}

/// Complete identity configuration.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Administrator emails: forced to ADMIN at registration and notified of
    /// host review requests.
    pub admin_emails: Vec<String>,

    /// One-time codes.
    pub otc: OtcConfig,

    /// Session credentials.
    pub session: SessionConfig,

    /// Approval links.
    pub links: ApprovalLinkConfig,

    /// Passwords.
    pub password: PasswordPolicy,
}

impl IdentityConfig {
    /// Create configuration where one secret keys sessions, codes and links.
    ///
    /// Use the `with_*` methods to separate them.
    #[must_use]
    pub fn new(secret: String, public_base_url: String) -> Self {
        Self {
            admin_emails: Vec::new(),
            otc: OtcConfig::new(secret.clone()),
            session: SessionConfig::new(secret.clone()),
            links: ApprovalLinkConfig::new(public_base_url, secret),
            password: PasswordPolicy::default(),
        }
    }

    /// Set administrator emails (normalized on the way in).
    #[must_use]
    pub fn with_admin_emails<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.admin_emails = emails
            .into_iter()
            .map(|e| airena_mail::normalize_email(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    /// Replace OTC settings.
    #[must_use]
    pub fn with_otc(mut self, otc: OtcConfig) -> Self {
        self.otc = otc;
        self
    }

    /// Replace session settings.
    #[must_use]
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Replace approval link settings.
    #[must_use]
    pub fn with_links(mut self, links: ApprovalLinkConfig) -> Self {
        self.links = links;
        self
    }

    /// Replace password policy.
    #[must_use]
    pub const fn with_password_policy(mut self, password: PasswordPolicy) -> Self {
        self.password = password;
        self
    }
}
