//! Auth routes: registration, two-step login, OTC delivery and email
//! verification.

use crate::error::AppError;
use crate::extractors::BearerToken;
use crate::state::{AppState, Backend};
use airena_identity::{IdentityView, LifecycleState, RegisterRequest};
use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `POST /auth/login` body.
#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    /// Email.
    pub email: String,
    /// Password.
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Body carrying an email and a one-time code.
#[derive(Clone, Deserialize)]
pub struct CodeRequest {
    /// Email.
    pub email: String,
    /// The six-digit code.
    pub code: String,
}

/// `POST /auth/otc` body.
#[derive(Debug, Clone, Deserialize)]
pub struct SendOtcRequest {
    /// Email.
    pub email: String,
}

/// Registration result.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// The new identity.
    pub identity: IdentityView,
    /// When the emailed code expires.
    pub otc_expires_at: DateTime<Utc>,
    /// Next step for the user.
    pub message: &'static str,
}

/// Login result. Never a session.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Always `OTC_REQUIRED`.
    pub status: &'static str,
    /// Where the code went.
    pub email: String,
    /// When the code expires.
    pub otc_expires_at: DateTime<Utc>,
}

/// Issued session.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Signed session credential.
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: &'static str,
    /// Credential expiry.
    pub expires_at: DateTime<Utc>,
    /// The logged-in identity.
    pub identity: IdentityView,
}

/// Code delivery result.
#[derive(Debug, Serialize)]
pub struct OtcResponse {
    /// When the code expires.
    pub otc_expires_at: DateTime<Utc>,
    /// Whether the email went out.
    pub delivered: bool,
}

/// Email verification result.
#[derive(Debug, Serialize)]
pub struct VerifyEmailResponse {
    /// Lifecycle state after verification.
    pub state: LifecycleState,
    /// The identity.
    pub identity: IdentityView,
    /// Next step for the user.
    pub message: &'static str,
}

/// `POST /auth/register`
///
/// # Errors
///
/// Validation, conflict and role errors from registration.
pub async fn register<B: Backend>(
    State(state): State<AppState<B>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let registration = state.identity.machine.register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            identity: registration.identity,
            otc_expires_at: registration.otc.expires_at,
            message: "Registration successful. Check your email for the verification code.",
        }),
    ))
}

/// `POST /auth/login`
///
/// # Errors
///
/// 401 on unknown email or wrong password.
pub async fn login<B: Backend>(
    State(state): State<AppState<B>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let challenge = state
        .identity
        .sessions
        .login(&request.email, &request.password)
        .await?;
    Ok(Json(LoginResponse {
        status: "OTC_REQUIRED",
        email: challenge.email,
        otc_expires_at: challenge.otc_expires_at,
    }))
}

/// `POST /auth/login/complete`
///
/// # Errors
///
/// 401 on a bad code; 403 for a host awaiting approval.
pub async fn complete_login<B: Backend>(
    State(state): State<AppState<B>>,
    Json(request): Json<CodeRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let issued = state
        .identity
        .sessions
        .complete_login(&request.email, &request.code)
        .await?;
    Ok(Json(SessionResponse {
        access_token: issued.token.access_token,
        token_type: "Bearer",
        expires_at: issued.token.expires_at,
        identity: issued.identity,
    }))
}

/// `POST /auth/otc`
///
/// # Errors
///
/// 404 for an unknown email.
pub async fn send_otc<B: Backend>(
    State(state): State<AppState<B>>,
    Json(request): Json<SendOtcRequest>,
) -> Result<(StatusCode, Json<OtcResponse>), AppError> {
    let receipt = state.identity.machine.send_otc(&request.email).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(OtcResponse {
            otc_expires_at: receipt.expires_at,
            delivered: receipt.delivered,
        }),
    ))
}

/// `POST /auth/verify-email`
///
/// # Errors
///
/// 401 on a bad code.
pub async fn verify_email<B: Backend>(
    State(state): State<AppState<B>>,
    Json(request): Json<CodeRequest>,
) -> Result<Json<VerifyEmailResponse>, AppError> {
    let outcome = state
        .identity
        .machine
        .verify_email_by_address(&request.email, &request.code)
        .await?;
    let message = match outcome.state {
        LifecycleState::PendingApproval => {
            "Email verified. Your host account has been sent to an administrator for approval."
        }
        _ => "Email verified.",
    };
    Ok(Json(VerifyEmailResponse {
        state: outcome.state,
        identity: outcome.identity,
        message,
    }))
}

/// `GET /auth/me`
///
/// # Errors
///
/// 401 for a missing, forged or expired token.
pub async fn me<B: Backend>(
    State(state): State<AppState<B>>,
    token: BearerToken,
) -> Result<Json<IdentityView>, AppError> {
    let identity = state.identity.sessions.current(&token.0).await?;
    Ok(Json(identity.view()))
}
