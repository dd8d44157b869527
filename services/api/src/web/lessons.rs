//! services/api/src/web/lessons.rs
//!
//! The lesson page and its code challenge: scratch runs and graded submissions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use career_quest_core::domain::{CourseLessonRow, LessonContext, SessionUser};
use career_quest_core::learning::{fully_completed_at, is_lesson_unlocked, outputs_match};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::{port_failure, state::AppState, HandlerError};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LessonResponse {
    pub lesson_id: Uuid,
    pub lesson_title: String,
    pub instructions: String,
    pub starter_code: String,
    pub lesson_type: String,
    pub module_title: String,
    pub course_id: Uuid,
    pub course_title: String,
    pub is_unlocked: bool,
    pub is_completed: bool,
    pub quiz_completed: bool,
    pub has_quiz: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct CodeSubmission {
    pub code: String,
}

/// Result of a run or a graded submission.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct CodeResponse {
    pub success: bool,
    pub output: String,
    /// Present only when a graded submission did not match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    pub message: String,
}

//=========================================================================================
// Gating
//=========================================================================================

/// Loads a lesson the user is allowed to attempt, with the user's row for it.
///
/// 404 when the lesson does not exist, 403 while its predecessor is unfinished.
pub(crate) async fn load_unlocked_lesson(
    state: &AppState,
    user: &SessionUser,
    lesson_id: Uuid,
) -> Result<(LessonContext, CourseLessonRow), HandlerError> {
    let context = state
        .db
        .get_lesson_context(lesson_id)
        .await
        .map_err(port_failure("Failed to load lesson"))?;
    let rows = state
        .db
        .get_course_lessons(context.course_id, Some(user.user_id))
        .await
        .map_err(port_failure("Failed to load course lessons"))?;

    match is_lesson_unlocked(&rows, lesson_id) {
        Some(true) => {}
        Some(false) => {
            return Err((
                StatusCode::FORBIDDEN,
                "This lesson is locked. Complete the previous lesson first.".to_string(),
            ))
        }
        None => return Err((StatusCode::NOT_FOUND, "Lesson not found.".to_string())),
    }

    let row = rows
        .into_iter()
        .find(|r| r.lesson_id == lesson_id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Lesson not found.".to_string()))?;
    Ok((context, row))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /lessons/{id} - Lesson content and the caller's progress on it
#[utoipa::path(
    get,
    path = "/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    responses(
        (status = 200, description = "Lesson", body = LessonResponse),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Lesson locked"),
        (status = 404, description = "Lesson not found")
    )
)]
pub async fn get_lesson_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(lesson_id): Path<Uuid>,
) -> Result<Json<LessonResponse>, HandlerError> {
    let (context, row) = load_unlocked_lesson(&state, &user, lesson_id).await?;
    let lesson = context.lesson;

    Ok(Json(LessonResponse {
        lesson_id: lesson.id,
        lesson_title: lesson.lesson_title,
        instructions: lesson.instructions,
        starter_code: lesson.starter_code,
        lesson_type: lesson.lesson_type,
        module_title: context.module_title,
        course_id: context.course_id,
        course_title: context.course_title,
        is_unlocked: true,
        is_completed: row.is_completed,
        quiz_completed: row.quiz_completed,
        has_quiz: row.has_quiz,
    }))
}

/// POST /lessons/{id}/run - Run code without grading it
#[utoipa::path(
    post,
    path = "/lessons/{id}/run",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    request_body = CodeSubmission,
    responses(
        (status = 200, description = "Program output", body = CodeResponse),
        (status = 403, description = "Lesson locked"),
        (status = 404, description = "Lesson not found")
    )
)]
pub async fn run_code_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(lesson_id): Path<Uuid>,
    Json(req): Json<CodeSubmission>,
) -> Result<Json<CodeResponse>, HandlerError> {
    load_unlocked_lesson(&state, &user, lesson_id).await?;

    let run = state
        .runner
        .run(&req.code)
        .await
        .map_err(port_failure("Failed to run code"))?;

    let (success, message) = if run.timed_out {
        (false, "Execution timed out.")
    } else if run.truncated {
        (true, "Output was cut off at the size limit.")
    } else {
        (true, "Run complete.")
    };

    Ok(Json(CodeResponse {
        success,
        output: run.output,
        expected: None,
        message: message.to_string(),
    }))
}

/// POST /lessons/{id}/validate - Grade a submission against the expected output
#[utoipa::path(
    post,
    path = "/lessons/{id}/validate",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    request_body = CodeSubmission,
    responses(
        (status = 200, description = "Grading result", body = CodeResponse),
        (status = 403, description = "Lesson locked"),
        (status = 404, description = "Lesson not found")
    )
)]
pub async fn validate_code_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(lesson_id): Path<Uuid>,
    Json(req): Json<CodeSubmission>,
) -> Result<Json<CodeResponse>, HandlerError> {
    let (context, row) = load_unlocked_lesson(&state, &user, lesson_id).await?;
    let expected = context.lesson.expected_output.trim().to_string();

    let run = state
        .runner
        .run(&req.code)
        .await
        .map_err(port_failure("Failed to run code"))?;

    let failure = |output: String, message: &str| CodeResponse {
        success: false,
        output,
        expected: Some(expected.clone()),
        message: message.to_string(),
    };

    if run.timed_out {
        return Ok(Json(failure(run.output, "Execution timed out.")));
    }
    if run.truncated {
        return Ok(Json(failure(run.output, "Output exceeded the size limit.")));
    }
    if !outputs_match(&run.output, &expected) {
        return Ok(Json(failure(run.output, "Incorrect. Check the output.")));
    }

    let completed_at = fully_completed_at(true, row.quiz_completed, row.has_quiz, Utc::now());
    state
        .db
        .mark_code_completed(user.user_id, lesson_id, completed_at)
        .await
        .map_err(port_failure("Failed to save progress"))?;
    info!("User {} passed the code challenge of lesson {}", user.user_id, lesson_id);

    Ok(Json(CodeResponse {
        success: true,
        output: run.output,
        expected: None,
        message: "Correct!".to_string(),
    }))
}
