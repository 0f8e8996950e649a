//! Route table.

use crate::handlers::{admin, auth, health_check};
use crate::middleware::correlation_id_layer;
use crate::state::{AppState, Backend};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// All routes: `/health` plus the `/api/v1` API.
pub fn router<B: Backend>(state: AppState<B>) -> Router {
    let api = Router::new()
        .route("/auth/register", post(auth::register::<B>))
        .route("/auth/login", post(auth::login::<B>))
        .route("/auth/login/complete", post(auth::complete_login::<B>))
        .route("/auth/otc", post(auth::send_otc::<B>))
        .route("/auth/verify-email", post(auth::verify_email::<B>))
        .route("/auth/me", get(auth::me::<B>))
        .route("/admin/host-requests", get(admin::host_requests::<B>))
        .route("/admin/hosts", get(admin::hosts::<B>))
        .route("/admin/participants", get(admin::participants::<B>))
        .route("/admin/users/:id/delete", post(admin::delete_user::<B>))
        .route(
            "/admin/hosts/:id/approve",
            get(admin::approve::<B>).post(admin::approve::<B>),
        )
        .route(
            "/admin/hosts/:id/reject",
            get(admin::reject::<B>).post(admin::reject::<B>),
        )
        .route("/admin/reminders/run", post(admin::run_reminders::<B>));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
}

/// CORS for one browser origin, with credentials.
///
/// An unparseable origin disables cross-origin access.
#[must_use]
pub fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);
    match HeaderValue::from_str(origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin, "Ignoring invalid CORS origin");
            layer
        }
    }
}
