//! Registration and email verification.

#![allow(clippy::unwrap_used)]

mod common;

use airena_core::Role;
use airena_identity::notices::HOST_REQUEST_SUBJECT;
use airena_identity::{
    ApprovalAuthority, ErrorKind, IdentityError, LifecycleState, LinkAction, OtcPurpose, RegisterRequest,
};
use airena_mail::MailError;
use common::{ADMIN, PASSWORD, harness, link_token};

const EMAIL: OtcPurpose = OtcPurpose::EmailVerification;

fn request(email: &str, password: &str, role: Option<&str>) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: password.to_string(),
        name: "Someone".to_string(),
        role: role.map(str::to_string),
    }
}

#[tokio::test]
async fn test_participant_registers_unverified_and_activates_on_verification() {
    let h = harness();

    let registration = h.register("  P@Example.com ", None).await;

    assert_eq!(registration.identity.email, "p@example.com");
    assert_eq!(registration.identity.role, Role::Participant);
    assert_eq!(registration.identity.state, LifecycleState::Unverified);
    assert!(registration.otc.delivered);

    let code = h.latest_code("p@example.com");
    let outcome = h
        .services
        .machine
        .verify_email(registration.identity.id, &code)
        .await
        .unwrap();

    assert_eq!(outcome.state, LifecycleState::EmailVerified);
    assert!(outcome.state.is_active());
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let h = harness();
    h.register("p@example.com", None).await;

    let err = h
        .services
        .machine
        .register(request("P@EXAMPLE.COM", PASSWORD, None))
        .await
        .unwrap_err();

    assert_eq!(err, IdentityError::EmailAlreadyRegistered);
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_admin_email_is_forced_to_admin() {
    let h = harness();

    let registration = h.register(ADMIN, Some("PARTICIPANT")).await;

    assert_eq!(registration.identity.role, Role::Admin);
}

#[tokio::test]
async fn test_admin_role_cannot_be_requested() {
    let h = harness();

    let err = h
        .services
        .machine
        .register(request("eve@example.com", PASSWORD, Some("admin")))
        .await
        .unwrap_err();

    assert_eq!(err, IdentityError::AdminRoleNotAssignable);
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert!(h.repo.is_empty());
}

#[tokio::test]
async fn test_organizer_is_stored_as_host() {
    let h = harness();

    let registration = h.register("org@example.com", Some("organizer")).await;

    assert_eq!(registration.identity.role, Role::Host);
    assert!(!registration.identity.host_approved);
}

#[tokio::test]
async fn test_invalid_input_is_rejected() {
    let h = harness();
    let machine = &h.services.machine;

    for bad in [
        request("not-an-email", PASSWORD, None),
        request("p@example.com", "short", None),
        request("p@example.com", PASSWORD, Some("superuser")),
    ] {
        let err = machine.register(bad).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{err}");
    }
    assert!(h.repo.is_empty());
}

#[tokio::test]
async fn test_wrong_code_does_not_verify() {
    let h = harness();
    let id = h.register("p@example.com", None).await.identity.id;
    let code = h.latest_code("p@example.com");

    let err = h
        .services
        .machine
        .verify_email(id, common::wrong_code(&code))
        .await
        .unwrap_err();

    assert_eq!(err, IdentityError::InvalidOtc);
    assert_eq!(err.kind(), ErrorKind::Authentication);
}

#[tokio::test]
async fn test_host_verification_requests_review_once() {
    let h = harness();
    let id = h.pending_host("host@example.com").await;

    let host = h.repo.get(id).unwrap();
    assert_eq!(host.state(), LifecycleState::PendingApproval);
    assert_eq!(host.host_requested_at, Some(h.now()));

    let requests = h.mailer.sent_to(ADMIN);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].subject, HOST_REQUEST_SUBJECT);
    assert!(requests[0].html.contains("host@example.com"));

    // Verifying again does not notify again.
    h.services.otc.issue(id, EMAIL).await.unwrap();
    let code = h.latest_code("host@example.com");
    let outcome = h.services.machine.verify_email(id, &code).await.unwrap();
    assert_eq!(outcome.state, LifecycleState::PendingApproval);
    assert_eq!(h.mailer.sent_to(ADMIN).len(), 1);
}

#[tokio::test]
async fn test_review_request_links_authorize_their_action() {
    let h = harness();
    let id = h.pending_host("host@example.com").await;
    let html = &h.mailer.sent_to(ADMIN)[0].html;
    let signer = &h.services.link_signer;

    let approve = link_token(html, "approve").unwrap();
    let reject = link_token(html, "reject").unwrap();

    assert!(ApprovalAuthority::from_signed_link(signer, &approve, id, LinkAction::Approve).is_ok());
    assert!(ApprovalAuthority::from_signed_link(signer, &reject, id, LinkAction::Reject).is_ok());
    assert!(ApprovalAuthority::from_signed_link(signer, &approve, id, LinkAction::Reject).is_err());
}

#[tokio::test]
async fn test_mail_failure_does_not_fail_registration() {
    let h = harness();
    h.mailer
        .fail_recipient("p@example.com", MailError::Permanent("mailbox unavailable".into()));

    let registration = h.register("p@example.com", None).await;

    assert!(!registration.otc.delivered);
    assert!(h.repo.get(registration.identity.id).unwrap().otc.is_some());
}

#[tokio::test]
async fn test_send_otc_by_address() {
    let h = harness();
    h.register("p@example.com", None).await;

    let receipt = h.services.machine.send_otc("P@example.com").await.unwrap();
    assert!(receipt.delivered);

    let code = h.latest_code("p@example.com");
    let outcome = h
        .services
        .machine
        .verify_email_by_address("p@example.com", &code)
        .await
        .unwrap();
    assert_eq!(outcome.state, LifecycleState::EmailVerified);

    let err = h.services.machine.send_otc("nobody@example.com").await.unwrap_err();
    assert_eq!(err, IdentityError::IdentityNotFound);
}

#[tokio::test]
async fn test_ensure_admin_is_idempotent() {
    let h = harness();
    let machine = &h.services.machine;

    assert!(machine.ensure_admin(ADMIN, PASSWORD, "Admin").await.unwrap());
    assert!(!machine.ensure_admin(ADMIN, PASSWORD, "Admin").await.unwrap());

    let admin = h.repo_find(ADMIN).await;
    assert!(admin.email_verified);
    assert_eq!(admin.state(), LifecycleState::EmailVerified);

    let err = machine
        .ensure_admin("p@example.com", PASSWORD, "P")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
