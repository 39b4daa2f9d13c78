use axum::{Router, routing::get};

pub mod inventory;
pub mod pages;
pub mod system;
pub mod tech;

use nightstocker_core::TireId;

use crate::view_model::ViewModelError;

/// Router for every session-scoped endpoint: HTML screens plus the JSON API.
pub fn router() -> Router {
    Router::new()
        .merge(pages::router())
        .nest("/api", api_router())
}

fn api_router() -> Router {
    Router::new()
        .route("/session", get(system::session))
        .nest("/inventory", inventory::router())
        .nest("/tech", tech::router())
        .route("/pull-logs", get(tech::pull_logs))
}

/// Tire id from a path segment.
pub(crate) fn parse_tire_id(raw: &str) -> Result<TireId, ViewModelError> {
    Ok(raw.parse::<TireId>()?)
}
