//! Server configuration loaded from environment variables.
//!
//! `DATABASE_URL` and `JWT_SECRET` are required. Unparseable optional values
//! fall back to their defaults.

use airena_identity::{ApprovalLinkConfig, IdentityConfig, OtcConfig, SessionConfig};
use airena_mail::SmtpConfig;
use airena_reminders::ReminderConfig;
use anyhow::{Context, Result};
use chrono::{NaiveTime, TimeDelta};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Pool size.
    pub database_max_connections: u32,
    /// Browser origin allowed by CORS.
    pub cors_origin: String,
    /// Prometheus listener, when metrics are enabled.
    pub metrics_addr: Option<SocketAddr>,
    /// Password for bootstrapping the configured administrators.
    pub admin_password: Option<String>,
    /// SMTP settings; `None` selects the console mailer.
    pub smtp: Option<SmtpConfig>,
    /// Identity services.
    pub identity: IdentityConfig,
    /// Reminder scheduler.
    pub reminders: ReminderConfig,
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(name: &str) -> Option<T> {
    let raw = var(name)?;
    let value = raw.trim().parse().ok();
    if value.is_none() {
        tracing::warn!(variable = name, "Ignoring unparseable value");
    }
    value
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns error when `DATABASE_URL` or `JWT_SECRET` is missing.
    pub fn from_env() -> Result<Self> {
        let database_url = var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = var("JWT_SECRET").context("JWT_SECRET must be set")?;

        let port = parsed("PORT").unwrap_or(3001);
        let public_base_url =
            var("PUBLIC_BASE_URL").unwrap_or_else(|| format!("http://localhost:{port}"));
        let link_secret = var("APPROVAL_LINK_SECRET").unwrap_or_else(|| jwt_secret.clone());

        let mut otc = OtcConfig::new(jwt_secret.clone());
        if let Some(minutes) = parsed("OTC_TTL_MINUTES") {
            otc = otc.with_ttl(TimeDelta::minutes(minutes));
        }
        if let Some(attempts) = parsed("OTC_MAX_ATTEMPTS") {
            otc = otc.with_max_failed_attempts(attempts);
        }

        let mut session = SessionConfig::new(jwt_secret.clone());
        if let Some(days) = parsed("SESSION_TTL_DAYS") {
            session = session.with_ttl(TimeDelta::days(days));
        }

        let admin_emails: Vec<String> = var("ADMIN_EMAILS")
            .map(|list| list.split(',').map(str::to_string).collect())
            .unwrap_or_default();

        let identity = IdentityConfig::new(jwt_secret, public_base_url.clone())
            .with_admin_emails(admin_emails)
            .with_otc(otc)
            .with_session(session)
            .with_links(ApprovalLinkConfig::new(public_base_url, link_secret));

        let mut reminders = ReminderConfig::default();
        if let Some(at) = var("REMINDER_DAILY_AT").and_then(|s| NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()) {
            reminders = reminders.with_daily_run_at(at);
        }
        if let Some(concurrency) = parsed("REMINDER_CONCURRENCY") {
            reminders = reminders.with_dispatch_concurrency(concurrency);
        }

        let smtp = var("SMTP_HOST").map(|host| SmtpConfig {
            host,
            port: parsed("SMTP_PORT").unwrap_or(587),
            username: var("SMTP_USERNAME").unwrap_or_default(),
            password: var("SMTP_PASSWORD").unwrap_or_default(),
            from_email: var("MAIL_FROM").unwrap_or_else(|| "noreply@airena.dev".to_string()),
            from_name: var("MAIL_FROM_NAME").unwrap_or_else(|| "AIrena".to_string()),
        });

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url,
            database_max_connections: parsed("DATABASE_MAX_CONNECTIONS").unwrap_or(10),
            cors_origin: var("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string()),
            metrics_addr: parsed("METRICS_ADDR"),
            admin_password: var("ADMIN_PASSWORD"),
            smtp,
            identity,
            reminders,
        })
    }

    /// `host:port` to bind.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
