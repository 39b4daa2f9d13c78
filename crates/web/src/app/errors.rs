use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use nightstocker_core::DomainError;
use nightstocker_inventory::PullRejection;
use nightstocker_store::StoreError;

use crate::view_model::ViewModelError;

/// Status code and machine-readable code for an operation failure.
pub fn classify(err: &ViewModelError) -> (StatusCode, &'static str) {
    match err {
        ViewModelError::Domain(e) => match e {
            DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            DomainError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid_id"),
            DomainError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            DomainError::Unauthorized(_) => (StatusCode::FORBIDDEN, "unauthorized"),
            DomainError::InvariantViolation(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation")
            }
        },
        ViewModelError::Store(e) => match e {
            StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            StoreError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            StoreError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
            StoreError::InvalidWrite(_) | StoreError::Backend(_) | StoreError::Decode(_) => {
                (StatusCode::BAD_GATEWAY, "store_error")
            }
        },
        ViewModelError::Rejected(r) => rejection_status(r),
        ViewModelError::Contended { .. } => (StatusCode::CONFLICT, "conflict"),
    }
}

pub fn rejection_status(rejection: &PullRejection) -> (StatusCode, &'static str) {
    match rejection {
        PullRejection::UnknownTechnician { .. } => (StatusCode::FORBIDDEN, "invalid_tech_id"),
        PullRejection::OutOfStock { .. } => (StatusCode::CONFLICT, "out_of_stock"),
        PullRejection::UnknownTire { .. } => (StatusCode::NOT_FOUND, "unknown_tire"),
    }
}

pub fn view_model_error_to_response(err: ViewModelError) -> axum::response::Response {
    let (status, code) = classify(&err);
    let message = match &err {
        // Validation messages are meant for the user as-is.
        ViewModelError::Domain(DomainError::Validation(msg)) => msg.clone(),
        other => other.to_string(),
    };
    json_error(status, code, message)
}

pub fn rejection_to_response(rejection: &PullRejection) -> axum::response::Response {
    let (status, code) = rejection_status(rejection);
    json_error(status, code, rejection.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
