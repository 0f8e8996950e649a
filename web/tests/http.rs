//! Routes end to end over in-memory storage.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use airena_identity::mocks::InMemoryIdentityRepository;
use airena_identity::notices::{HOST_REQUEST_SUBJECT, OTC_SUBJECT};
use airena_identity::{IdentityConfig, IdentityServices, PasswordPolicy};
use airena_mail::mocks::RecordingMailer;
use airena_mail::{DeliveryPolicy, EmailDispatcher};
use airena_reminders::mocks::{InMemoryEventDirectory, InMemoryReminderLedger};
use airena_reminders::{ReminderConfig, ReminderScheduler};
use airena_testing::test_clock;
use airena_web::{AppState, Backend, CORRELATION_ID_HEADER, router};
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const ADMIN: &str = "admin@airena.dev";
const PASSWORD: &str = "correct-horse";

struct InMemory;

impl Backend for InMemory {
    type Identities = InMemoryIdentityRepository;
    type Mailer = RecordingMailer;
    type Events = InMemoryEventDirectory;
    type Ledger = InMemoryReminderLedger;
}

struct App {
    router: Router,
    mailer: RecordingMailer,
    services: IdentityServices<InMemoryIdentityRepository, RecordingMailer>,
}

struct Reply {
    status: StatusCode,
    body: String,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("JSON body")
    }
}

fn app() -> App {
    let config = IdentityConfig::new("k".repeat(32), "https://api.airena.dev".to_string())
        .with_admin_emails([ADMIN])
        .with_password_policy(PasswordPolicy::default().with_iterations(1_000));
    let mailer = RecordingMailer::new();
    let clock = Arc::new(test_clock());
    let dispatcher = EmailDispatcher::new(
        Arc::new(mailer.clone()),
        DeliveryPolicy::default().with_backoff(Duration::ZERO),
    );
    let services = IdentityServices::new(
        Arc::new(InMemoryIdentityRepository::new()),
        dispatcher.clone(),
        &config,
        clock.clone(),
    );
    let reminders = ReminderScheduler::new(
        Arc::new(InMemoryEventDirectory::new()),
        Arc::new(InMemoryReminderLedger::new()),
        dispatcher,
        ReminderConfig::default(),
        clock,
    );
    let state = AppState::<InMemory>::new(services.clone(), reminders);
    App {
        router: router(state),
        mailer,
        services,
    }
}

impl App {
    async fn call(&self, method: Method, uri: &str, body: Option<Value>, bearer: Option<&str>) -> Reply {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        Reply {
            status,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }

    async fn post(&self, uri: &str, body: Value) -> Reply {
        self.call(Method::POST, uri, Some(body), None).await
    }

    fn latest_code(&self, email: &str) -> String {
        let message = self
            .mailer
            .sent_to(email)
            .into_iter()
            .rev()
            .find(|m| m.subject == OTC_SUBJECT)
            .expect("no verification code sent");
        extract_code(&message.html).expect("no code in message")
    }

    async fn register(&self, email: &str, role: &str) -> Value {
        let reply = self
            .post(
                "/api/v1/auth/register",
                json!({ "email": email, "password": PASSWORD, "name": "Grace", "role": role }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        reply.json()
    }

    async fn login(&self, email: &str) -> Reply {
        let reply = self
            .post("/api/v1/auth/login", json!({ "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        let code = self.latest_code(email);
        self.post("/api/v1/auth/login/complete", json!({ "email": email, "code": code }))
            .await
    }

    async fn admin_token(&self) -> String {
        self.services
            .machine
            .ensure_admin(ADMIN, PASSWORD, "Admin")
            .await
            .unwrap();
        let reply = self.login(ADMIN).await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        reply.json()["access_token"].as_str().unwrap().to_string()
    }

    /// Register and verify a HOST; returns its id.
    async fn pending_host(&self, email: &str) -> String {
        let registered = self.register(email, "HOST").await;
        let code = self.latest_code(email);
        let reply = self
            .post("/api/v1/auth/verify-email", json!({ "email": email, "code": code }))
            .await;
        assert_eq!(reply.json()["state"], "PENDING_APPROVAL");
        registered["identity"]["id"].as_str().unwrap().to_string()
    }

    fn link_token(&self, action: &str) -> String {
        let message = self
            .mailer
            .sent_to(ADMIN)
            .into_iter()
            .rev()
            .find(|m| m.subject == HOST_REQUEST_SUBJECT)
            .expect("no host request sent");
        let marker = format!("/{action}?token=");
        let start = message.html.find(&marker).unwrap() + marker.len();
        let rest = &message.html[start..];
        rest[..rest.find('"').unwrap()].to_string()
    }
}

fn extract_code(html: &str) -> Option<String> {
    let bytes = html.as_bytes();
    bytes.windows(8).find_map(|w| {
        (w[0] == b'>' && w[7] == b'<' && w[1..7].iter().all(u8::is_ascii_digit))
            .then(|| String::from_utf8_lossy(&w[1..7]).into_owned())
    })
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let reply = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "ok");
}

#[tokio::test]
async fn test_responses_carry_a_correlation_id() {
    let app = app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert!(response.headers().contains_key(CORRELATION_ID_HEADER));
}

#[tokio::test]
async fn test_login_is_always_two_steps() {
    let app = app();
    app.register("alice@example.com", "PARTICIPANT").await;

    let first = app
        .post(
            "/api/v1/auth/login",
            json!({ "email": "alice@example.com", "password": PASSWORD }),
        )
        .await;
    let body = first.json();
    assert_eq!(body["status"], "OTC_REQUIRED");
    assert!(body.get("access_token").is_none());

    let code = app.latest_code("alice@example.com");
    let session = app
        .post(
            "/api/v1/auth/login/complete",
            json!({ "email": "alice@example.com", "code": code }),
        )
        .await;
    assert_eq!(session.status, StatusCode::OK, "{}", session.body);
    let session = session.json();
    assert_eq!(session["token_type"], "Bearer");

    let me = app
        .call(Method::GET, "/api/v1/auth/me", None, session["access_token"].as_str())
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json()["email"], "alice@example.com");
    assert_eq!(me.json()["email_verified"], true);
}

#[tokio::test]
async fn test_error_statuses() {
    let app = app();
    app.register("alice@example.com", "PARTICIPANT").await;

    let duplicate = app
        .post(
            "/api/v1/auth/register",
            json!({ "email": "Alice@Example.com", "password": PASSWORD, "name": "A" }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.json()["code"], "CONFLICT");

    let wrong_password = app
        .post(
            "/api/v1/auth/login",
            json!({ "email": "alice@example.com", "password": "nope-nope" }),
        )
        .await;
    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);

    let short_password = app
        .post(
            "/api/v1/auth/register",
            json!({ "email": "bob@example.com", "password": "short", "name": "B" }),
        )
        .await;
    assert_eq!(short_password.status, StatusCode::UNPROCESSABLE_ENTITY);

    let unknown = app
        .post("/api/v1/auth/otc", json!({ "email": "nobody@example.com" }))
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let no_token = app.call(Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(no_token.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_send_otc_is_accepted() {
    let app = app();
    app.register("alice@example.com", "PARTICIPANT").await;

    let reply = app
        .post("/api/v1/auth/otc", json!({ "email": "alice@example.com" }))
        .await;

    assert_eq!(reply.status, StatusCode::ACCEPTED);
    assert_eq!(reply.json()["delivered"], true);
}

#[tokio::test]
async fn test_pending_host_cannot_complete_login() {
    let app = app();
    app.pending_host("host@example.com").await;

    let reply = app.login("host@example.com").await;

    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_approve_by_link_renders_a_page_once() {
    let app = app();
    let id = app.pending_host("host@example.com").await;
    let token = app.link_token("approve");
    let uri = format!("/api/v1/admin/hosts/{id}/approve?token={token}");

    let first = app.call(Method::GET, &uri, None, None).await;
    let second = app.call(Method::GET, &uri, None, None).await;

    assert_eq!(first.status, StatusCode::OK);
    assert!(first.body.contains("Host Approved Successfully"));
    assert_eq!(second.status, StatusCode::FORBIDDEN);
    assert!(second.body.contains("<!DOCTYPE html>"));
}

#[tokio::test]
async fn test_link_is_bound_to_its_action() {
    let app = app();
    let id = app.pending_host("host@example.com").await;
    let approve_token = app.link_token("approve");

    let reply = app
        .call(
            Method::GET,
            &format!("/api/v1/admin/hosts/{id}/reject?token={approve_token}"),
            None,
            None,
        )
        .await;

    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    let pending = app
        .call(Method::GET, "/api/v1/admin/host-requests", None, Some(&app.admin_token().await))
        .await;
    assert_eq!(pending.json().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_reject_by_link_deletes_the_host() {
    let app = app();
    let id = app.pending_host("host@example.com").await;
    let token = app.link_token("reject");

    let reply = app
        .call(
            Method::GET,
            &format!("/api/v1/admin/hosts/{id}/reject?token={token}"),
            None,
            None,
        )
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("Host Request Rejected"));
    let login = app
        .post(
            "/api/v1/auth/login",
            json!({ "email": "host@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(login.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_channel_requires_an_admin() {
    let app = app();
    let id = app.pending_host("host@example.com").await;
    app.register("alice@example.com", "PARTICIPANT").await;
    let participant = app.login("alice@example.com").await.json()["access_token"]
        .as_str()
        .unwrap()
        .to_string();
    let uri = format!("/api/v1/admin/hosts/{id}/approve");

    let anonymous = app.call(Method::POST, &uri, None, None).await;
    let not_admin = app.call(Method::POST, &uri, None, Some(&participant)).await;
    let admin = app.call(Method::POST, &uri, None, Some(&app.admin_token().await)).await;

    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(not_admin.status, StatusCode::FORBIDDEN);
    assert_eq!(admin.status, StatusCode::OK, "{}", admin.body);
    let receipt = admin.json();
    assert_eq!(receipt["channel"], "admin_session");
    assert_eq!(receipt["identity"]["host_approved"], true);
}

#[tokio::test]
async fn test_host_requests_lists_pending_hosts_for_admins() {
    let app = app();
    let id = app.pending_host("host@example.com").await;
    let token = app.admin_token().await;

    let reply = app
        .call(Method::GET, "/api/v1/admin/host-requests", None, Some(&token))
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()[0]["id"], id);
}

#[tokio::test]
async fn test_manual_sweep() {
    let app = app();
    let token = app.admin_token().await;

    let hourly = app
        .call(Method::POST, "/api/v1/admin/reminders/run?sweep=hourly", None, Some(&token))
        .await;
    let weekly = app
        .call(Method::POST, "/api/v1/admin/reminders/run?sweep=weekly", None, Some(&token))
        .await;
    let anonymous = app
        .call(Method::POST, "/api/v1/admin/reminders/run?sweep=daily", None, None)
        .await;

    assert_eq!(hourly.status, StatusCode::OK);
    assert_eq!(hourly.json()["kind"], "hourly");
    assert_eq!(weekly.status, StatusCode::BAD_REQUEST);
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_resent_verification_code_cannot_complete_login() {
    let app = app();
    app.register("alice@example.com", "PARTICIPANT").await;
    app.post("/api/v1/auth/otc", json!({ "email": "alice@example.com" }))
        .await;
    let code = app.latest_code("alice@example.com");

    let reply = app
        .post(
            "/api/v1/auth/login/complete",
            json!({ "email": "alice@example.com", "code": code }),
        )
        .await;

    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert!(reply.json().get("access_token").is_none());
}

#[tokio::test]
async fn test_admin_lists_identities_by_role() {
    let app = app();
    let host = app.pending_host("host@example.com").await;
    app.register("alice@example.com", "PARTICIPANT").await;
    let participant = app.login("alice@example.com").await.json()["access_token"]
        .as_str()
        .unwrap()
        .to_string();
    let token = app.admin_token().await;

    let hosts = app.call(Method::GET, "/api/v1/admin/hosts", None, Some(&token)).await;
    let participants = app
        .call(Method::GET, "/api/v1/admin/participants", None, Some(&token))
        .await;
    let refused = app
        .call(Method::GET, "/api/v1/admin/participants", None, Some(&participant))
        .await;

    assert_eq!(hosts.status, StatusCode::OK);
    let hosts = hosts.json();
    assert_eq!(hosts.as_array().unwrap().len(), 1);
    assert_eq!(hosts[0]["id"], host);
    let participants = participants.json();
    assert_eq!(participants.as_array().unwrap().len(), 1);
    assert_eq!(participants[0]["email"], "alice@example.com");
    assert_eq!(refused.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_deletes_non_admin_identities() {
    let app = app();
    let alice = app.register("alice@example.com", "PARTICIPANT").await["identity"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    let token = app.admin_token().await;
    let admin_id = app
        .call(Method::GET, "/api/v1/auth/me", None, Some(&token))
        .await
        .json()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let deleted = app
        .call(Method::POST, &format!("/api/v1/admin/users/{alice}/delete"), None, Some(&token))
        .await;
    let again = app
        .call(Method::POST, &format!("/api/v1/admin/users/{alice}/delete"), None, Some(&token))
        .await;
    let admin = app
        .call(Method::POST, &format!("/api/v1/admin/users/{admin_id}/delete"), None, Some(&token))
        .await;

    assert_eq!(deleted.status, StatusCode::OK, "{}", deleted.body);
    assert_eq!(deleted.json()["message"], "User deleted successfully");
    assert_eq!(deleted.json()["identity"]["id"], alice);
    assert_eq!(again.status, StatusCode::NOT_FOUND);
    assert_eq!(admin.status, StatusCode::FORBIDDEN);

    let login = app
        .post(
            "/api/v1/auth/login",
            json!({ "email": "alice@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(login.status, StatusCode::UNAUTHORIZED);
}
