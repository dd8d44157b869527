//! services/api/src/web/rest.rs
//!
//! Contains the liveness endpoint and the master definition for the OpenAPI
//! specification.

use crate::web::{account, auth, catalog, lessons, quiz};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        catalog::list_courses_handler,
        catalog::course_outline_handler,
        catalog::course_completion_handler,
        lessons::get_lesson_handler,
        lessons::run_code_handler,
        lessons::validate_code_handler,
        quiz::get_quiz_handler,
        quiz::submit_quiz_handler,
        account::get_account_handler,
        account::update_account_handler,
    ),
    components(
        schemas(
            HealthResponse,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            auth::MeResponse,
            catalog::CourseSummary,
            catalog::CourseOutlineResponse,
            catalog::OutlineModuleView,
            catalog::OutlineLessonView,
            catalog::CourseCompletionResponse,
            lessons::LessonResponse,
            lessons::CodeSubmission,
            lessons::CodeResponse,
            quiz::QuizResponse,
            quiz::QuizQuestionView,
            quiz::QuizChoice,
            quiz::QuizSubmission,
            quiz::QuizResultResponse,
            account::AccountResponse,
            account::ProgressStats,
            account::UpdateAccountRequest,
            account::UpdateAccountResponse,
        )
    ),
    tags(
        (name = "Career Quest API", description = "Courses, code challenges, quizzes and learner progress.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Health
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
