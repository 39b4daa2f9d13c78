//! JSON API for the Tech screen: gated pulls, restock and the pull log.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;

use nightstocker_inventory::StockChange;

use crate::app::dto::PullRequest;
use crate::app::routes::parse_tire_id;
use crate::app::{errors, services::AppServices};
use crate::prompt::FormPrompter;
use crate::tech::PullOutcome;

pub fn router() -> Router {
    Router::new()
        .route("/:id/pull", post(pull_tire))
        .route("/:id/restock", post(restock_tire))
}

/// POST /api/tech/:id/pull - pull one tire as the technician in `tech_id`
pub async fn pull_tire(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Option<Json<PullRequest>>,
) -> Response {
    let id = match parse_tire_id(&id) {
        Ok(id) => id,
        Err(e) => return errors::view_model_error_to_response(e),
    };
    let answer = body.and_then(|Json(b)| b.tech_id);
    let prompter = FormPrompter::new().with_answer(answer);
    let inventory = services.inventory_state().inventory;

    match services.tech().pull(&inventory, &id, &prompter).await {
        Ok(PullOutcome::Rejected { rejection }) => errors::rejection_to_response(&rejection),
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => errors::view_model_error_to_response(e),
    }
}

/// POST /api/tech/:id/restock - add one tire, no technician required
pub async fn restock_tire(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_tire_id(&id) {
        Ok(id) => id,
        Err(e) => return errors::view_model_error_to_response(e),
    };
    match services
        .inventory()
        .adjust_quantity(&id, StockChange::Restock.delta())
        .await
    {
        Ok(Some(quantity)) => Json(json!({ "id": id.as_str(), "quantity": quantity })).into_response(),
        Ok(None) => errors::json_error(
            axum::http::StatusCode::NOT_FOUND,
            "not_found",
            format!("tire {id} is not in the inventory"),
        ),
        Err(e) => errors::view_model_error_to_response(e),
    }
}

/// GET /api/pull-logs - every pull, newest first
pub async fn pull_logs(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.tech().pull_logs().await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => errors::view_model_error_to_response(e),
    }
}
