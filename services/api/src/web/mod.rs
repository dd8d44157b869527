pub mod account;
pub mod auth;
pub mod catalog;
pub mod lessons;
pub mod middleware;
pub mod quiz;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use career_quest_core::ports::PortError;
use std::sync::Arc;
use tracing::error;

pub use middleware::{require_auth, resolve_viewer};
use state::AppState;

/// The error half of every handler result: a status code and a message for the client.
pub type HandlerError = (StatusCode, String);

/// Maps a port failure to a response. Internal details are logged, never returned.
pub(crate) fn port_failure(context: &'static str) -> impl Fn(PortError) -> HandlerError {
    move |e| match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Unexpected(detail) => {
            error!("{}: {}", context, detail);
            (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
        }
    }
}

/// Builds every API route with its auth layer. CORS, tracing and docs are added by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/courses", get(catalog::list_courses_handler));

    // Routes anonymous visitors may view with reduced detail
    let viewer_routes = Router::new()
        .route("/courses/{id}", get(catalog::course_outline_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            resolve_viewer,
        ));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route("/courses/{id}/completion", get(catalog::course_completion_handler))
        .route("/lessons/{id}", get(lessons::get_lesson_handler))
        .route("/lessons/{id}/run", post(lessons::run_code_handler))
        .route("/lessons/{id}/validate", post(lessons::validate_code_handler))
        .route(
            "/lessons/{id}/quiz",
            get(quiz::get_quiz_handler).post(quiz::submit_quiz_handler),
        )
        .route(
            "/account",
            get(account::get_account_handler).put(account::update_account_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(viewer_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .with_state(app_state)
}
