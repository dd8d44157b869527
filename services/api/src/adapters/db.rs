//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use career_quest_core::domain::{
    Course, CourseLessonRow, Lesson, LessonContext, NewUser, ProfileChanges,
    ProgressTotals, QuizOption, QuizQuestion, SessionUser, User, UserCredentials,
};
use career_quest_core::ports::{DatabaseService, PortError, PortResult};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Maps a row-level failure, turning `RowNotFound` into `NotFound`.
fn not_found_or_unexpected(what: String) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => PortError::Unexpected(e.to_string()),
    }
}

/// Maps a write failure, turning unique-key violations into `Conflict`.
fn conflict_or_unexpected(what: &'static str) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            PortError::Conflict(what.to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    email: String,
    is_admin: bool,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.id,
            name: self.name,
            email: self.email,
            is_admin: self.is_admin,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    is_admin: bool,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.id,
            name: self.name,
            email: self.email,
            hashed_password: self.password_hash,
            is_admin: self.is_admin,
        }
    }
}

#[derive(FromRow)]
struct SessionUserRecord {
    id: Uuid,
    name: String,
    is_admin: bool,
    expires_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct CourseRecord {
    id: Uuid,
    title: String,
    description: String,
    icon_class: Option<String>,
    is_active: bool,
    user_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}
impl CourseRecord {
    fn to_domain(self) -> Course {
        Course {
            id: self.id,
            title: self.title,
            description: self.description,
            icon_class: self.icon_class,
            is_active: self.is_active,
            created_by: self.user_id,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CourseLessonRecord {
    module_id: Uuid,
    module_title: String,
    lesson_id: Uuid,
    lesson_title: String,
    is_completed: bool,
    quiz_completed: bool,
    has_quiz: bool,
    completion_date: Option<DateTime<Utc>>,
}
impl CourseLessonRecord {
    fn to_domain(self) -> CourseLessonRow {
        CourseLessonRow {
            module_id: self.module_id,
            module_title: self.module_title,
            lesson_id: self.lesson_id,
            lesson_title: self.lesson_title,
            is_completed: self.is_completed,
            quiz_completed: self.quiz_completed,
            has_quiz: self.has_quiz,
            completion_date: self.completion_date,
        }
    }
}

#[derive(FromRow)]
struct LessonContextRecord {
    id: Uuid,
    module_id: Uuid,
    lesson_title: String,
    instructions: String,
    starter_code: String,
    expected_output: String,
    lesson_type: String,
    lesson_order: i32,
    module_title: String,
    course_id: Uuid,
    course_title: String,
}
impl LessonContextRecord {
    fn to_domain(self) -> LessonContext {
        LessonContext {
            lesson: Lesson {
                id: self.id,
                module_id: self.module_id,
                lesson_title: self.lesson_title,
                instructions: self.instructions,
                starter_code: self.starter_code,
                expected_output: self.expected_output,
                lesson_type: self.lesson_type,
                lesson_order: self.lesson_order,
            },
            module_title: self.module_title,
            course_id: self.course_id,
            course_title: self.course_title,
        }
    }
}

#[derive(FromRow)]
struct QuizRecord {
    id: Uuid,
    lesson_id: Uuid,
    question: String,
    option_a: String,
    option_b: String,
    option_c: String,
    option_d: String,
    correct_option: String,
}
impl QuizRecord {
    fn to_domain(self) -> PortResult<QuizQuestion> {
        let correct_option = self.correct_option.parse::<QuizOption>().map_err(|e| {
            PortError::Unexpected(format!("Quiz {} has a bad correct_option: {}", self.id, e))
        })?;
        Ok(QuizQuestion {
            id: self.id,
            lesson_id: self.lesson_id,
            question: self.question,
            option_a: self.option_a,
            option_b: self.option_b,
            option_c: self.option_c,
            option_d: self.option_d,
            correct_option,
        })
    }
}

#[derive(FromRow)]
struct TotalsRecord {
    total_lessons: i64,
    code_completed: i64,
    quiz_completed: i64,
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

const USER_COLUMNS: &str = "id, name, email, is_admin, created_at";

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, name, email, password_hash, is_admin) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.hashed_password)
        .bind(new_user.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_or_unexpected("This email is already registered."))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, name, email, password_hash, is_admin FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("User {} not found", email)))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn update_user_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET name = $1, email = $2, password_hash = COALESCE($3, password_hash) \
             WHERE id = $4 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(changes.hashed_password.as_deref())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            e => conflict_or_unexpected("This email is already in use by another account.")(e),
        })?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<SessionUser> {
        let record = sqlx::query_as::<_, SessionUserRecord>(
            "SELECT u.id, u.name, u.is_admin, s.expires_at \
             FROM auth_sessions s JOIN users u ON u.id = s.user_id \
             WHERE s.id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)?;

        if record.expires_at <= Utc::now() {
            self.delete_auth_session(session_id).await?;
            return Err(PortError::Unauthorized);
        }

        Ok(SessionUser {
            user_id: record.id,
            name: record.name,
            is_admin: record.is_admin,
        })
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_active_courses(&self) -> PortResult<Vec<Course>> {
        let records = sqlx::query_as::<_, CourseRecord>(
            "SELECT id, title, description, icon_class, is_active, user_id, created_at \
             FROM courses WHERE is_active = TRUE ORDER BY created_at ASC, title ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_course_by_id(&self, course_id: Uuid) -> PortResult<Course> {
        let record = sqlx::query_as::<_, CourseRecord>(
            "SELECT id, title, description, icon_class, is_active, user_id, created_at \
             FROM courses WHERE id = $1",
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("Course {} not found", course_id)))?;
        Ok(record.to_domain())
    }

    async fn get_course_lessons(
        &self,
        course_id: Uuid,
        user_id: Option<Uuid>,
    ) -> PortResult<Vec<CourseLessonRow>> {
        let records = sqlx::query_as::<_, CourseLessonRecord>(
            "SELECT m.id AS module_id, m.module_title, l.id AS lesson_id, l.lesson_title, \
                    COALESCE(up.is_completed, FALSE) AS is_completed, \
                    COALESCE(up.quiz_completed, FALSE) AS quiz_completed, \
                    EXISTS (SELECT 1 FROM quizzes q WHERE q.lesson_id = l.id) AS has_quiz, \
                    up.completion_date \
             FROM modules m \
             JOIN lessons l ON l.module_id = m.id \
             LEFT JOIN user_progress up ON up.lesson_id = l.id AND up.user_id = $2 \
             WHERE m.course_id = $1 \
             ORDER BY m.module_order ASC, l.lesson_order ASC",
        )
        .bind(course_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_lesson_context(&self, lesson_id: Uuid) -> PortResult<LessonContext> {
        let record = sqlx::query_as::<_, LessonContextRecord>(
            "SELECT l.id, l.module_id, l.lesson_title, l.instructions, l.starter_code, \
                    l.expected_output, l.lesson_type, l.lesson_order, \
                    m.module_title, c.id AS course_id, c.title AS course_title \
             FROM lessons l \
             JOIN modules m ON l.module_id = m.id \
             JOIN courses c ON m.course_id = c.id \
             WHERE l.id = $1",
        )
        .bind(lesson_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected("Lesson not found.".to_string()))?;
        Ok(record.to_domain())
    }

    async fn get_quiz_questions(&self, lesson_id: Uuid) -> PortResult<Vec<QuizQuestion>> {
        let records = sqlx::query_as::<_, QuizRecord>(
            "SELECT id, lesson_id, question, option_a, option_b, option_c, option_d, correct_option \
             FROM quizzes WHERE lesson_id = $1 ORDER BY question ASC, id ASC",
        )
        .bind(lesson_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn mark_code_completed(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        completed_at: Option<DateTime<Utc>>,
    ) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO user_progress (user_id, lesson_id, is_completed, completion_date) \
             VALUES ($1, $2, TRUE, $3) \
             ON CONFLICT (user_id, lesson_id) DO UPDATE SET \
                is_completed = TRUE, \
                completion_date = COALESCE(user_progress.completion_date, EXCLUDED.completion_date)",
        )
        .bind(user_id)
        .bind(lesson_id)
        .bind(completed_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn mark_quiz_completed(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        completed_at: Option<DateTime<Utc>>,
    ) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO user_progress (user_id, lesson_id, quiz_completed, completion_date) \
             VALUES ($1, $2, TRUE, $3) \
             ON CONFLICT (user_id, lesson_id) DO UPDATE SET \
                quiz_completed = TRUE, \
                completion_date = COALESCE(user_progress.completion_date, EXCLUDED.completion_date)",
        )
        .bind(user_id)
        .bind(lesson_id)
        .bind(completed_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_progress_totals(&self, user_id: Uuid) -> PortResult<ProgressTotals> {
        let record = sqlx::query_as::<_, TotalsRecord>(
            "WITH active_lessons AS ( \
                SELECT l.id FROM lessons l \
                JOIN modules m ON m.id = l.module_id \
                JOIN courses c ON c.id = m.course_id \
                WHERE c.is_active \
             ) \
             SELECT (SELECT COUNT(*) FROM active_lessons) AS total_lessons, \
                    COUNT(*) FILTER (WHERE up.is_completed) AS code_completed, \
                    COUNT(*) FILTER (WHERE up.quiz_completed) AS quiz_completed \
             FROM user_progress up JOIN active_lessons a ON a.id = up.lesson_id \
             WHERE up.user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(ProgressTotals {
            total_lessons: record.total_lessons,
            code_completed: record.code_completed,
            quiz_completed: record.quiz_completed,
        })
    }
}
