//! Shared fixtures for identity integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use airena_core::environment::Clock;
use airena_core::{IdentityId, Role};
use airena_identity::mocks::InMemoryIdentityRepository;
use airena_identity::notices::OTC_SUBJECT;
use airena_identity::{
    ApprovalAuthority, IdentityConfig, IdentityServices, PasswordPolicy, RegisterRequest, Registration,
};
use airena_mail::mocks::RecordingMailer;
use airena_mail::{DeliveryPolicy, EmailDispatcher};
use airena_testing::{FixedClock, test_clock};
use std::sync::Arc;
use std::time::Duration;

pub const ADMIN: &str = "admin@airena.dev";
pub const PASSWORD: &str = "correct-horse";

pub struct Harness {
    pub repo: Arc<InMemoryIdentityRepository>,
    pub mailer: RecordingMailer,
    pub clock: FixedClock,
    pub services: IdentityServices<InMemoryIdentityRepository, RecordingMailer>,
}

pub fn config() -> IdentityConfig {
    IdentityConfig::new("k".repeat(32), "https://api.airena.dev".to_string())
        .with_admin_emails([ADMIN])
        .with_password_policy(PasswordPolicy::default().with_iterations(1_000))
}

pub fn harness() -> Harness {
    harness_with(config())
}

pub fn harness_with(config: IdentityConfig) -> Harness {
    let repo = Arc::new(InMemoryIdentityRepository::new());
    let mailer = RecordingMailer::new();
    let clock = test_clock();
    let dispatcher = EmailDispatcher::new(
        Arc::new(mailer.clone()),
        DeliveryPolicy::default().with_backoff(Duration::ZERO),
    );
    let services = IdentityServices::new(Arc::clone(&repo), dispatcher, &config, Arc::new(clock.clone()));
    Harness {
        repo,
        mailer,
        clock,
        services,
    }
}

impl Harness {
    pub async fn register(&self, email: &str, role: Option<&str>) -> Registration {
        self.services
            .machine
            .register(RegisterRequest {
                email: email.to_string(),
                password: PASSWORD.to_string(),
                name: "Test User".to_string(),
                role: role.map(str::to_string),
            })
            .await
            .unwrap()
    }

    /// The most recent verification code emailed to `email`.
    pub fn latest_code(&self, email: &str) -> String {
        let message = self
            .mailer
            .sent_to(email)
            .into_iter()
            .rev()
            .find(|m| m.subject == OTC_SUBJECT)
            .expect("no verification code sent");
        extract_code(&message.html).expect("no code in message")
    }

    /// Register and verify a HOST; it ends up pending approval.
    pub async fn pending_host(&self, email: &str) -> IdentityId {
        let registration = self.register(email, Some("HOST")).await;
        let code = self.latest_code(email);
        self.services
            .machine
            .verify_email(registration.identity.id, &code)
            .await
            .unwrap();
        registration.identity.id
    }

    /// A session token for the bootstrap administrator.
    pub async fn admin_token(&self) -> String {
        self.services
            .machine
            .ensure_admin(ADMIN, PASSWORD, "Admin")
            .await
            .unwrap();
        let admin = self.repo_find(ADMIN).await;
        assert_eq!(admin.role, Role::Admin);
        self.services.session_signer.mint(&admin).unwrap().access_token
    }

    pub async fn admin(&self) -> ApprovalAuthority {
        let token = self.admin_token().await;
        ApprovalAuthority::from_admin_session(&self.services.session_signer, &token).unwrap()
    }

    pub async fn repo_find(&self, email: &str) -> airena_identity::Identity {
        use airena_identity::IdentityRepository;
        self.repo.find_by_email(email).await.unwrap().unwrap()
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }
}

/// Store a verified HOST already surfaced for review, bypassing the flows.
pub fn host_awaiting_review(repo: &InMemoryIdentityRepository, email: &str) -> IdentityId {
    let now = test_clock().now();
    let mut host = airena_identity::Identity::new(email.into(), "h".into(), "Host".into(), Role::Host, now);
    host.email_verified = true;
    host.host_requested_at = Some(now);
    let id = host.id;
    repo.put(host);
    id
}

/// First `>dddddd<` run in an HTML body.
pub fn extract_code(html: &str) -> Option<String> {
    let bytes = html.as_bytes();
    bytes.windows(8).find_map(|w| {
        (w[0] == b'>' && w[7] == b'<' && w[1..7].iter().all(u8::is_ascii_digit))
            .then(|| String::from_utf8_lossy(&w[1..7]).into_owned())
    })
}

/// The token of the `action` link in a host review request.
pub fn link_token(html: &str, action: &str) -> Option<String> {
    let marker = format!("/{action}?token=");
    let start = html.find(&marker)? + marker.len();
    let rest = &html[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

/// A six-digit code that differs from `code`.
pub fn wrong_code(code: &str) -> &'static str {
    if code == "100000" { "100001" } else { "100000" }
}
