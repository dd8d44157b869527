//! services/api/src/web/catalog.rs
//!
//! Course listing, the per-user course outline and course completion records.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use career_quest_core::domain::{Course, SessionUser};
use career_quest_core::learning::{build_course_outline, course_completion, CourseOutline};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::{
    port_failure,
    state::{AppState, Viewer},
    HandlerError,
};

//=========================================================================================
// Response Types
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CourseSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub icon_class: Option<String>,
}

impl From<Course> for CourseSummary {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            icon_class: course.icon_class,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct OutlineLessonView {
    pub lesson_id: Uuid,
    pub lesson_title: String,
    pub is_completed: bool,
    pub quiz_completed: bool,
    pub is_unlocked: bool,
    /// One of `completed`, `ready`, `locked`.
    pub status: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct OutlineModuleView {
    pub module_id: Uuid,
    pub module_title: String,
    pub total_lessons: i64,
    pub completed_lessons: i64,
    pub percent: u32,
    pub lessons: Vec<OutlineLessonView>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CourseOutlineResponse {
    pub course: CourseSummary,
    pub modules: Vec<OutlineModuleView>,
    pub total_lessons: i64,
    pub fully_completed_lessons: i64,
    pub progress_percent: u32,
    pub is_course_completed: bool,
}

impl CourseOutlineResponse {
    fn new(course: Course, outline: CourseOutline) -> Self {
        let modules = outline
            .modules
            .into_iter()
            .map(|m| OutlineModuleView {
                module_id: m.module_id,
                module_title: m.module_title,
                total_lessons: m.total_lessons,
                completed_lessons: m.completed_lessons,
                percent: m.percent,
                lessons: m
                    .lessons
                    .into_iter()
                    .map(|l| OutlineLessonView {
                        lesson_id: l.lesson_id,
                        lesson_title: l.lesson_title,
                        is_completed: l.is_completed,
                        quiz_completed: l.quiz_completed,
                        is_unlocked: l.is_unlocked,
                        status: l.status.as_str().to_string(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            course: course.into(),
            modules,
            total_lessons: outline.total_lessons,
            fully_completed_lessons: outline.fully_completed_lessons,
            progress_percent: outline.progress_percent,
            is_course_completed: outline.is_course_completed,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CourseCompletionResponse {
    pub course_id: Uuid,
    pub course_title: String,
    pub user_name: String,
    pub completed_on: NaiveDate,
}

/// Retired courses are hidden as if they did not exist.
fn require_active(course: &Course) -> Result<(), HandlerError> {
    if course.is_active {
        Ok(())
    } else {
        Err((StatusCode::NOT_FOUND, "Course not found.".to_string()))
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /courses - Active courses
#[utoipa::path(
    get,
    path = "/courses",
    responses(
        (status = 200, description = "Active courses in catalog order", body = [CourseSummary]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_courses_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CourseSummary>>, HandlerError> {
    let courses = state
        .db
        .list_active_courses()
        .await
        .map_err(port_failure("Failed to load courses"))?;
    Ok(Json(courses.into_iter().map(CourseSummary::from).collect()))
}

/// GET /courses/{id} - Modules and lessons with the viewer's progress
///
/// Anonymous visitors see the structure with every lesson locked.
#[utoipa::path(
    get,
    path = "/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course outline", body = CourseOutlineResponse),
        (status = 404, description = "Course not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn course_outline_handler(
    State(state): State<Arc<AppState>>,
    Extension(Viewer(viewer)): Extension<Viewer>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<CourseOutlineResponse>, HandlerError> {
    let course = state
        .db
        .get_course_by_id(course_id)
        .await
        .map_err(port_failure("Failed to load course"))?;
    require_active(&course)?;

    let user_id = viewer.as_ref().map(|u| u.user_id);
    let rows = state
        .db
        .get_course_lessons(course_id, user_id)
        .await
        .map_err(port_failure("Failed to load course lessons"))?;

    let mut outline = build_course_outline(&rows);
    if viewer.is_none() {
        outline.lock_all();
    }

    Ok(Json(CourseOutlineResponse::new(course, outline)))
}

/// GET /courses/{id}/completion - Completion record for a finished course
#[utoipa::path(
    get,
    path = "/courses/{id}/completion",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course completed", body = CourseCompletionResponse),
        (status = 403, description = "Course not completed yet"),
        (status = 404, description = "Course not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn course_completion_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<CourseCompletionResponse>, HandlerError> {
    let course = state
        .db
        .get_course_by_id(course_id)
        .await
        .map_err(port_failure("Failed to load course"))?;
    require_active(&course)?;
    let rows = state
        .db
        .get_course_lessons(course_id, Some(user.user_id))
        .await
        .map_err(port_failure("Failed to load course lessons"))?;

    let completion = course_completion(&course, &user.name, &rows, Utc::now().date_naive())
        .ok_or_else(|| {
            (
                StatusCode::FORBIDDEN,
                "Finish every lesson and quiz in this course first.".to_string(),
            )
        })?;

    Ok(Json(CourseCompletionResponse {
        course_id: completion.course_id,
        course_title: completion.course_title,
        user_name: completion.user_name,
        completed_on: completion.completed_on,
    }))
}
