use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use nightstocker_core::UserId;

use crate::context::SessionContext;

/// Header carrying the caller's identity.
pub const USER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct SessionState {
    pub default_user: UserId,
}

/// Attach a `SessionContext` to every request.
///
/// Uses the `X-User-Id` header when present and non-blank, else the
/// configured default user. Identity is not verified.
pub async fn session_middleware(
    State(state): State<SessionState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let user = extract_user(req.headers()).unwrap_or_else(|| state.default_user.clone());
    req.extensions_mut().insert(SessionContext::new(user));
    next.run(req).await
}

fn extract_user(headers: &HeaderMap) -> Option<UserId> {
    let value = headers.get(USER_HEADER)?.to_str().ok()?;
    UserId::new(value).ok()
}
