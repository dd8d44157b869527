//! crates/career_quest_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or
//! the interpreter that runs code challenges.

use crate::domain::{
    Course, CourseLessonRow, LessonContext, NewUser, ProfileChanges,
    ProgressTotals, QuizQuestion, RunOutput, SessionUser, User, UserCredentials,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, processes).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    /// Fails with `Conflict` when the email is already registered.
    async fn create_user(&self, new_user: NewUser) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    /// Fails with `Conflict` when the email belongs to another account.
    async fn update_user_profile(&self, user_id: Uuid, changes: ProfileChanges)
        -> PortResult<User>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a session token to its user. Expired sessions are `Unauthorized`.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<SessionUser>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Catalog ---
    async fn list_active_courses(&self) -> PortResult<Vec<Course>>;

    async fn get_course_by_id(&self, course_id: Uuid) -> PortResult<Course>;

    /// Every lesson of the course ordered by `(module_order, lesson_order)`,
    /// joined with `user_id`'s progress. `None` yields all-false progress.
    async fn get_course_lessons(
        &self,
        course_id: Uuid,
        user_id: Option<Uuid>,
    ) -> PortResult<Vec<CourseLessonRow>>;

    async fn get_lesson_context(&self, lesson_id: Uuid) -> PortResult<LessonContext>;

    // --- Quizzes ---
    async fn get_quiz_questions(&self, lesson_id: Uuid) -> PortResult<Vec<QuizQuestion>>;

    // --- Progress ---
    /// Upserts the code flag. `completed_at` is recorded only if no completion
    /// date exists yet.
    async fn mark_code_completed(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        completed_at: Option<DateTime<Utc>>,
    ) -> PortResult<()>;

    /// Upserts the quiz flag, with the same `completed_at` rule.
    async fn mark_quiz_completed(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        completed_at: Option<DateTime<Utc>>,
    ) -> PortResult<()>;

    /// Counts over the lessons of active courses only.
    async fn get_progress_totals(&self, user_id: Uuid) -> PortResult<ProgressTotals>;
}

#[async_trait]
pub trait CodeRunner: Send + Sync {
    /// Executes a submission and captures what it printed.
    async fn run(&self, code: &str) -> PortResult<RunOutput>;
}
