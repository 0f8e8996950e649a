//! Liveness endpoint.

use axum::http::StatusCode;

/// `GET /health`
///
/// Does not check dependencies.
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}
