//! HTTP surface for AIrena.
//!
//! Handlers are thin: they parse the request, call one identity or
//! reminder service and map the result. Domain errors become HTTP errors
//! through [`AppError`].
//!
//! # Routes
//!
//! | route | auth |
//! |---|---|
//! | `POST /api/v1/auth/register`, `/login`, `/login/complete`, `/otc`, `/verify-email` | none |
//! | `GET /api/v1/auth/me` | bearer |
//! | `GET /api/v1/admin/host-requests` | admin bearer |
//! | `GET\|POST /api/v1/admin/hosts/:id/{approve,reject}` | admin bearer, or `?token=` signed link |
//! | `POST /api/v1/admin/reminders/run?sweep=daily\|hourly` | admin bearer |
//! | `GET /health` | none |
//!
//! # Example
//!
//! ```ignore
//! let state = AppState::<PostgresBackend>::new(identity, scheduler);
//! let app = airena_web::router(state).layer(airena_web::cors_layer("http://localhost:3000"));
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod pages;
pub mod router;
pub mod state;

pub use error::AppError;
pub use extractors::{BearerToken, CorrelationId};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use router::{cors_layer, router};
pub use state::{AppState, Backend};
