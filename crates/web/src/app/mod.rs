//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection, view-model activation, SSE
//! - `routes/`: HTTP routes + handlers (HTML screens, JSON API, system)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses
//! - `templates.rs`: HTML templates

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;
pub mod templates;

pub use services::{AppServices, StartupError, build_services};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let session_state = middleware::SessionState {
        default_user: services.default_user().clone(),
    };

    // Screen and API routes carry the services and a session context.
    let screens = routes::router().layer(
        ServiceBuilder::new()
            .layer(Extension(services))
            .layer(axum::middleware::from_fn_with_state(
                session_state,
                middleware::session_middleware,
            )),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(screens)
}
