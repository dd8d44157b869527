//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, logout and the current session.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use career_quest_core::domain::{AuthSession, NewUser, SessionUser};
use career_quest_core::validation::{password_strength, validate_registration};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::{port_failure, state::AppState, HandlerError};

const SESSION_COOKIE: &str = "session";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    /// Advisory strength label for the password just chosen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_strength: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub name: String,
    pub is_admin: bool,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Extracts the auth session ID from the `Cookie` header.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn session_cookie(value: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, value, max_age_secs
    )
}

/// Hashes a password with Argon2 and a fresh salt.
pub(crate) fn hash_password(password: &str) -> Result<String, HandlerError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password".to_string())
        })
}

fn verify_password(password: &str, hashed: &str) -> Result<bool, HandlerError> {
    let parsed_hash = PasswordHash::new(hashed).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Creates an auth session for `user_id` and returns the matching `Set-Cookie` value.
async fn open_session(state: &AppState, user_id: Uuid) -> Result<String, HandlerError> {
    let ttl = Duration::days(state.config.session_ttl_days);
    let session = AuthSession {
        id: Uuid::new_v4().to_string(),
        user_id,
        expires_at: Utc::now() + ttl,
    };

    state
        .db
        .create_auth_session(&session.id, session.user_id, session.expires_at)
        .await
        .map_err(port_failure("Failed to create session"))?;

    Ok(session_cookie(&session.id, ttl.num_seconds()))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid registration form"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    // 1. Validate the form
    let registration = validate_registration(&req.name, &req.email, &req.password)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    // 2. Hash the password and create the user
    let hashed_password = hash_password(&req.password)?;
    let user = state
        .db
        .create_user(NewUser {
            name: registration.name,
            email: registration.email,
            hashed_password,
            is_admin: false,
        })
        .await
        .map_err(port_failure("Failed to create user"))?;
    info!("Registered user {}", user.user_id);

    // 3. Log the new user in
    let cookie = open_session(&state, user.user_id).await?;

    let response = AuthResponse {
        user_id: user.user_id,
        name: user.name,
        email: user.email,
        is_admin: user.is_admin,
        password_strength: Some(password_strength(&req.password).label().to_string()),
    };

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(response),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let rejected = || (StatusCode::UNAUTHORIZED, "Incorrect email or password.".to_string());

    // 1. Get user by email
    let user_creds = state
        .db
        .get_user_by_email(req.email.trim())
        .await
        .map_err(|e| {
            warn!("Login failed for unknown email: {}", e);
            rejected()
        })?;

    // 2. Verify password
    if !verify_password(&req.password, &user_creds.hashed_password)? {
        warn!("Login failed for user {}", user_creds.user_id);
        return Err(rejected());
    }

    // 3. Open an auth session
    let cookie = open_session(&state, user_creds.user_id).await?;
    info!("User {} logged in", user_creds.user_id);

    let response = AuthResponse {
        user_id: user_creds.user_id,
        name: user_creds.name,
        email: user_creds.email,
        is_admin: user_creds.is_admin,
        password_strength: None,
    };

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(response),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HandlerError> {
    // 1. Extract session cookie
    let auth_session_id = session_id_from_headers(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    // 2. Delete auth session from database
    state
        .db
        .delete_auth_session(&auth_session_id)
        .await
        .map_err(port_failure("Failed to logout"))?;

    // 3. Clear cookie
    Ok((StatusCode::OK, [(header::SET_COOKIE, session_cookie("", 0))]))
}

/// GET /auth/me - The user behind the current session
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current session user", body = MeResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn me_handler(Extension(user): Extension<SessionUser>) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: user.user_id,
        name: user.name,
        is_admin: user.is_admin,
    })
}
