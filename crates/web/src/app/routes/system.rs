use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::context::SessionContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /api/session - identity attached to this request
pub async fn session(Extension(session): Extension<SessionContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": session.user_id().as_str(),
    }))
}
