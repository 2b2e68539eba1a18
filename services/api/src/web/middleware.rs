//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::web::session::session_token_from_headers;
use crate::web::state::AppState;

/// The authenticated user id, inserted into request extensions by
/// [`require_auth`].
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub i64);

/// Middleware that validates the session cookie and extracts the user id.
///
/// If valid, inserts a [`CurrentUser`] into request extensions for handlers
/// to use. If invalid, missing or expired, returns 401 Unauthorized before
/// any handler logic runs.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token =
        session_token_from_headers(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    let user_id = state
        .sessions
        .validate(token)
        .await
        .ok_or(StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(CurrentUser(user_id));

    Ok(next.run(req).await)
}
