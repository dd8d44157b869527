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
use tracing::{error, warn};

use crate::web::auth::session_id_from_headers;
use crate::web::state::{AppState, Viewer};
use career_quest_core::ports::PortError;

/// Middleware that validates the auth session cookie and resolves the user.
///
/// If valid, inserts the `SessionUser` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // 1. Parse session ID from the cookie header
    let auth_session_id = session_id_from_headers(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    // 2. Validate auth session in database, get the user
    let user = state
        .db
        .validate_auth_session(&auth_session_id)
        .await
        .map_err(|e| {
            match e {
                PortError::Unauthorized => warn!("Rejected unknown or expired auth session"),
                e => error!("Failed to validate auth session: {:?}", e),
            }
            StatusCode::UNAUTHORIZED
        })?;

    // 3. Insert the user into request extensions and continue
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Like `require_auth`, but lets anonymous visitors through as `Viewer(None)`.
pub async fn resolve_viewer(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let user = match session_id_from_headers(req.headers()) {
        Some(id) => match state.db.validate_auth_session(&id).await {
            Ok(user) => Some(user),
            Err(PortError::Unauthorized) => None,
            Err(e) => {
                error!("Failed to validate auth session: {:?}", e);
                None
            }
        },
        None => None,
    };

    req.extensions_mut().insert(Viewer(user));
    next.run(req).await
}
