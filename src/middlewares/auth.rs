use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::{types::app_state::AppState, utils::app_error::AppError};

/// Accepts the shared key either bare or as a bearer token.
fn is_authorized(headers: &HeaderMap, auth_key: &str) -> bool {
    match headers.get("authorization").and_then(|h| h.to_str().ok()) {
        Some(value) => value == auth_key || value.strip_prefix("Bearer ") == Some(auth_key),
        None => false,
    }
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match state.auth_key {
        Some(ref auth_key) if !is_authorized(&headers, auth_key) => {
            Err(AppError::new(StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
        _ => Ok(next.run(request).await),
    }
}
