//! JSON API over the inventory view-model.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response, sse::Event as SseEvent},
    routing::{get, post},
};
use serde_json::json;

use crate::app::dto::{self, AddTireRequest, AdjustQuantityRequest, DeleteTireRequest};
use crate::app::routes::parse_tire_id;
use crate::app::{errors, services::{self, AppServices}};
use crate::prompt::FormPrompter;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_inventory).post(add_tire))
        .route("/stream", get(stream))
        .route("/:id/adjust", post(adjust_quantity))
        .route("/:id/delete", post(delete_tire))
}

/// GET /api/inventory - current list, stats and load state
pub async fn list_inventory(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(dto::inventory_to_json(&services.inventory_state()))
}

/// POST /api/inventory - add a tire type
pub async fn add_tire(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<AddTireRequest>,
) -> Response {
    match services
        .inventory()
        .add(&body.name, &body.size, body.quantity)
        .await
    {
        Ok(id) => (StatusCode::CREATED, Json(json!({ "id": id.as_str() }))).into_response(),
        Err(e) => errors::view_model_error_to_response(e),
    }
}

/// POST /api/inventory/:id/adjust - add `delta` to the quantity, clamped at zero
pub async fn adjust_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<AdjustQuantityRequest>,
) -> Response {
    let id = match parse_tire_id(&id) {
        Ok(id) => id,
        Err(e) => return errors::view_model_error_to_response(e),
    };
    match services.inventory().adjust_quantity(&id, body.delta).await {
        Ok(Some(quantity)) => Json(json!({ "id": id.as_str(), "quantity": quantity })).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("tire {id} is not in the inventory"),
        ),
        Err(e) => errors::view_model_error_to_response(e),
    }
}

/// POST /api/inventory/:id/delete - delete a tire type once confirmed
pub async fn delete_tire(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Option<Json<DeleteTireRequest>>,
) -> Response {
    let id = match parse_tire_id(&id) {
        Ok(id) => id,
        Err(e) => return errors::view_model_error_to_response(e),
    };
    let confirmed = body.map(|Json(b)| b.confirm).unwrap_or(false);
    let prompter = FormPrompter::new().with_confirmation(confirmed);

    match services.inventory().delete(&id, &prompter).await {
        Ok(deleted) => Json(json!({ "id": id.as_str(), "deleted": deleted })).into_response(),
        Err(e) => errors::view_model_error_to_response(e),
    }
}

/// GET /api/inventory/stream - SSE of inventory states
pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Sse<impl tokio_stream::Stream<Item = Result<SseEvent, std::convert::Infallible>>> {
    services::inventory_sse_stream(services)
}
