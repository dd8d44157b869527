//! services/api/src/web/account.rs
//!
//! The learner's own profile and overall progress.

use axum::{extract::State, http::StatusCode, Extension, Json};
use career_quest_core::domain::{ProfileChanges, SessionUser, User};
use career_quest_core::learning::percent;
use career_quest_core::validation::{password_strength, validate_profile_update};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::{auth::hash_password, port_failure, state::AppState, HandlerError};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ProgressStats {
    pub total_lessons: i64,
    pub completed_lessons: i64,
    pub completed_quizzes: i64,
    pub progress_percent: u32,
    pub quiz_percent: u32,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub member_since: DateTime<Utc>,
    pub stats: ProgressStats,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateAccountRequest {
    pub name: String,
    pub email: String,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UpdateAccountResponse {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_strength: Option<String>,
    pub message: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /account - Profile and catalog-wide progress
#[utoipa::path(
    get,
    path = "/account",
    responses(
        (status = 200, description = "Account profile", body = AccountResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn get_account_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
) -> Result<Json<AccountResponse>, HandlerError> {
    let (user, totals): (User, _) = futures::try_join!(
        state.db.get_user_by_id(session.user_id),
        state.db.get_progress_totals(session.user_id),
    )
    .map_err(port_failure("Failed to load account"))?;

    Ok(Json(AccountResponse {
        user_id: user.user_id,
        name: user.name,
        email: user.email,
        is_admin: user.is_admin,
        member_since: user.created_at,
        stats: ProgressStats {
            total_lessons: totals.total_lessons,
            completed_lessons: totals.code_completed,
            completed_quizzes: totals.quiz_completed,
            progress_percent: percent(totals.code_completed, totals.total_lessons),
            quiz_percent: percent(totals.quiz_completed, totals.total_lessons),
        },
    }))
}

/// PUT /account - Update name, email and optionally the password
#[utoipa::path(
    put,
    path = "/account",
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Profile updated", body = UpdateAccountResponse),
        (status = 400, description = "Invalid profile form"),
        (status = 401, description = "Not logged in"),
        (status = 409, description = "Email used by another account")
    )
)]
pub async fn update_account_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
    Json(req): Json<UpdateAccountRequest>,
) -> Result<Json<UpdateAccountResponse>, HandlerError> {
    let update = validate_profile_update(
        &req.name,
        &req.email,
        req.new_password.as_deref(),
        req.confirm_password.as_deref(),
    )
    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let hashed_password = update.new_password.as_deref().map(hash_password).transpose()?;
    let strength = update
        .new_password
        .as_deref()
        .map(|p| password_strength(p).label().to_string());

    let user = state
        .db
        .update_user_profile(
            session.user_id,
            ProfileChanges {
                name: update.name,
                email: update.email,
                hashed_password,
            },
        )
        .await
        .map_err(port_failure("Failed to update profile"))?;
    info!("User {} updated their profile", user.user_id);

    Ok(Json(UpdateAccountResponse {
        user_id: user.user_id,
        name: user.name,
        email: user.email,
        password_strength: strength,
        message: "Profile updated successfully!".to_string(),
    }))
}
