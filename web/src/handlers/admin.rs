//! Admin routes.
//!
//! Host decisions have two entry points on the same path. With a `token`
//! query parameter the signed-link adapter runs and an HTML page comes
//! back; without one an administrator bearer session is required and the
//! receipt comes back as JSON. Both end in [`airena_identity::ApprovalGate`].

use crate::error::AppError;
use crate::extractors::{BearerToken, CorrelationId};
use crate::pages;
use crate::state::{AppState, Backend};
use airena_core::{IdentityId, Role};
use airena_identity::{ApprovalAuthority, IdentityError, IdentityView, LinkAction};
use airena_reminders::{SweepKind, SweepReport};
use axum::{
    Json,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Query of the host decision routes.
#[derive(Debug, Default, Deserialize)]
pub struct DecisionQuery {
    /// Signed link token; selects the link adapter when present.
    pub token: Option<String>,
}

/// Query of the manual sweep route.
#[derive(Debug, Deserialize)]
pub struct SweepQuery {
    /// `daily` or `hourly`.
    pub sweep: String,
}

fn admin_authority<B: Backend>(state: &AppState<B>, token: &BearerToken) -> Result<ApprovalAuthority, AppError> {
    Ok(ApprovalAuthority::from_admin_session(
        &state.identity.session_signer,
        &token.0,
    )?)
}

/// `GET /admin/host-requests`
///
/// # Errors
///
/// 401/403 unless the caller is an administrator.
pub async fn host_requests<B: Backend>(
    State(state): State<AppState<B>>,
    token: BearerToken,
) -> Result<Json<Vec<IdentityView>>, AppError> {
    admin_authority(&state, &token)?;
    Ok(Json(state.identity.approvals.pending_requests().await?))
}

/// Reply of the identity deletion route.
#[derive(Debug, Serialize)]
pub struct DeletionReply {
    /// Human readable outcome.
    pub message: &'static str,
    /// The deleted identity.
    pub identity: IdentityView,
}

/// `GET /admin/hosts`
///
/// # Errors
///
/// 401/403 unless the caller is an administrator.
pub async fn hosts<B: Backend>(
    State(state): State<AppState<B>>,
    token: BearerToken,
) -> Result<Json<Vec<IdentityView>>, AppError> {
    let authority = admin_authority(&state, &token)?;
    Ok(Json(state.identity.admin.list(&authority, Role::Host).await?))
}

/// `GET /admin/participants`
///
/// # Errors
///
/// 401/403 unless the caller is an administrator.
pub async fn participants<B: Backend>(
    State(state): State<AppState<B>>,
    token: BearerToken,
) -> Result<Json<Vec<IdentityView>>, AppError> {
    let authority = admin_authority(&state, &token)?;
    Ok(Json(state.identity.admin.list(&authority, Role::Participant).await?))
}

/// `POST /admin/users/:id/delete`
///
/// # Errors
///
/// 401/403 unless the caller is an administrator, 404 for an unknown id and
/// 403 when the target is an administrator.
pub async fn delete_user<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<IdentityId>,
    token: BearerToken,
    correlation_id: CorrelationId,
) -> Result<Json<DeletionReply>, AppError> {
    let authority = admin_authority(&state, &token)?;
    tracing::info!(identity_id = %id, %correlation_id, "Identity deletion requested");
    let identity = state.identity.admin.delete(&authority, id).await?;
    Ok(Json(DeletionReply {
        message: "User deleted successfully",
        identity,
    }))
}

/// `GET|POST /admin/hosts/:id/approve`
pub async fn approve<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<IdentityId>,
    Query(query): Query<DecisionQuery>,
    token: Option<BearerToken>,
    correlation_id: CorrelationId,
) -> Response {
    decide(&state, id, LinkAction::Approve, query.token, token, correlation_id).await
}

/// `GET|POST /admin/hosts/:id/reject`
pub async fn reject<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<IdentityId>,
    Query(query): Query<DecisionQuery>,
    token: Option<BearerToken>,
    correlation_id: CorrelationId,
) -> Response {
    decide(&state, id, LinkAction::Reject, query.token, token, correlation_id).await
}

async fn decide<B: Backend>(
    state: &AppState<B>,
    id: IdentityId,
    action: LinkAction,
    link_token: Option<String>,
    bearer: Option<BearerToken>,
    correlation_id: CorrelationId,
) -> Response {
    tracing::info!(identity_id = %id, %action, %correlation_id, link = link_token.is_some(), "Host decision requested");

    match link_token {
        Some(link_token) => match decide_by_link(state, id, action, &link_token).await {
            Ok(page) => Html(page).into_response(),
            Err(err) => {
                let err = AppError::from(err);
                err.log();
                (err.status(), Html(pages::failure(err.message()))).into_response()
            }
        },
        None => match decide_by_session(state, id, action, bearer).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        },
    }
}

async fn decide_by_link<B: Backend>(
    state: &AppState<B>,
    id: IdentityId,
    action: LinkAction,
    link_token: &str,
) -> Result<String, IdentityError> {
    let authority = ApprovalAuthority::from_signed_link(&state.identity.link_signer, link_token, id, action)?;
    let gate = &state.identity.approvals;
    match action {
        LinkAction::Approve => Ok(pages::approved(&gate.approve(&authority, id).await?)),
        LinkAction::Reject => Ok(pages::rejected(&gate.reject(&authority, id).await?)),
    }
}

async fn decide_by_session<B: Backend>(
    state: &AppState<B>,
    id: IdentityId,
    action: LinkAction,
    bearer: Option<BearerToken>,
) -> Result<Response, AppError> {
    let bearer = bearer.ok_or_else(|| AppError::unauthorized("Authentication required"))?;
    let authority = admin_authority(state, &bearer)?;
    let gate = &state.identity.approvals;
    Ok(match action {
        LinkAction::Approve => Json(gate.approve(&authority, id).await?).into_response(),
        LinkAction::Reject => Json(gate.reject(&authority, id).await?).into_response(),
    })
}

/// `POST /admin/reminders/run?sweep=daily|hourly`
///
/// # Errors
///
/// 401/403 unless the caller is an administrator; 400 for an unknown sweep.
pub async fn run_reminders<B: Backend>(
    State(state): State<AppState<B>>,
    Query(query): Query<SweepQuery>,
    token: BearerToken,
) -> Result<Json<SweepReport>, AppError> {
    admin_authority(&state, &token)?;
    let kind: SweepKind = query.sweep.parse()?;
    tracing::info!(sweep = %kind, "Manual reminder sweep triggered");
    Ok(Json(state.reminders.trigger(kind).await))
}
