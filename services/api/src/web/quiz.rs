//! services/api/src/web/quiz.rs
//!
//! The assessment quiz that follows a lesson's code challenge.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use career_quest_core::domain::{CourseLessonRow, QuizOption, QuizQuestion, SessionUser};
use career_quest_core::learning::{fully_completed_at, grade_quiz};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::{lessons::load_unlocked_lesson, port_failure, state::AppState, HandlerError};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct QuizChoice {
    pub letter: String,
    pub text: String,
}

/// A question as shown to the learner, without its answer.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct QuizQuestionView {
    pub id: Uuid,
    pub question: String,
    pub choices: Vec<QuizChoice>,
}

impl From<QuizQuestion> for QuizQuestionView {
    fn from(q: QuizQuestion) -> Self {
        let choices = [
            (QuizOption::A, q.option_a),
            (QuizOption::B, q.option_b),
            (QuizOption::C, q.option_c),
            (QuizOption::D, q.option_d),
        ]
        .into_iter()
        .map(|(letter, text)| QuizChoice {
            letter: letter.to_string(),
            text,
        })
        .collect();
        Self {
            id: q.id,
            question: q.question,
            choices,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct QuizResponse {
    pub lesson_id: Uuid,
    pub quiz_completed: bool,
    pub questions: Vec<QuizQuestionView>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct QuizSubmission {
    /// Question ID to chosen letter (`A`-`D`). Keys that are not question IDs are ignored.
    #[schema(value_type = Object)]
    pub answers: HashMap<String, String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct QuizResultResponse {
    pub success: bool,
    pub score: usize,
    pub total_questions: usize,
    pub message: String,
}

//=========================================================================================
// Gating
//=========================================================================================

/// The quiz opens once the lesson's code challenge has passed.
fn require_code_completed(row: &CourseLessonRow) -> Result<(), HandlerError> {
    if row.is_completed {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            "Please complete the code editor challenge above to unlock the assessment quiz."
                .to_string(),
        ))
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /lessons/{id}/quiz - The lesson's questions
#[utoipa::path(
    get,
    path = "/lessons/{id}/quiz",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    responses(
        (status = 200, description = "Quiz questions without answers", body = QuizResponse),
        (status = 403, description = "Lesson or quiz locked"),
        (status = 404, description = "Lesson not found")
    )
)]
pub async fn get_quiz_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(lesson_id): Path<Uuid>,
) -> Result<Json<QuizResponse>, HandlerError> {
    let (_, row) = load_unlocked_lesson(&state, &user, lesson_id).await?;
    require_code_completed(&row)?;

    let questions = state
        .db
        .get_quiz_questions(lesson_id)
        .await
        .map_err(port_failure("Failed to load quiz"))?;

    Ok(Json(QuizResponse {
        lesson_id,
        quiz_completed: row.quiz_completed,
        questions: questions.into_iter().map(QuizQuestionView::from).collect(),
    }))
}

/// POST /lessons/{id}/quiz - Grade the learner's answers
///
/// The quiz only counts as passed with every answer correct.
#[utoipa::path(
    post,
    path = "/lessons/{id}/quiz",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    request_body = QuizSubmission,
    responses(
        (status = 200, description = "Grading result", body = QuizResultResponse),
        (status = 403, description = "Lesson or quiz locked"),
        (status = 404, description = "Lesson not found")
    )
)]
pub async fn submit_quiz_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(lesson_id): Path<Uuid>,
    Json(req): Json<QuizSubmission>,
) -> Result<Json<QuizResultResponse>, HandlerError> {
    let (_, row) = load_unlocked_lesson(&state, &user, lesson_id).await?;
    require_code_completed(&row)?;

    let questions = state
        .db
        .get_quiz_questions(lesson_id)
        .await
        .map_err(port_failure("Failed to load quiz"))?;
    if questions.is_empty() {
        return Ok(Json(QuizResultResponse {
            success: false,
            score: 0,
            total_questions: 0,
            message: "No quiz questions found.".to_string(),
        }));
    }

    // Unreadable keys and letters are simply wrong answers.
    let answers: HashMap<Uuid, QuizOption> = req
        .answers
        .into_iter()
        .filter_map(|(id, letter)| {
            let id = Uuid::parse_str(id.trim()).ok()?;
            letter.parse().ok().map(|option| (id, option))
        })
        .collect();
    let grade = grade_quiz(&questions, &answers);

    let message = if grade.passed {
        let completed_at = fully_completed_at(row.is_completed, true, true, Utc::now());
        state
            .db
            .mark_quiz_completed(user.user_id, lesson_id, completed_at)
            .await
            .map_err(port_failure("Failed to save progress"))?;
        info!("User {} passed the quiz of lesson {}", user.user_id, lesson_id);
        "Quiz passed!"
    } else {
        "Failed. Try again for 100%."
    };

    Ok(Json(QuizResultResponse {
        success: grade.passed,
        score: grade.score,
        total_questions: grade.total_questions,
        message: message.to_string(),
    }))
}
