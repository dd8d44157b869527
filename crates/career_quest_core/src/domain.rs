//! crates/career_quest_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Users & Auth
//=========================================================================================

/// Represents a learner or administrator account.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub hashed_password: String,
    pub is_admin: bool,
}

/// Fields required to insert a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub hashed_password: String,
    pub is_admin: bool,
}

/// A profile edit. `hashed_password` is `None` when the password is kept.
#[derive(Debug, Clone)]
pub struct ProfileChanges {
    pub name: String,
    pub email: String,
    pub hashed_password: Option<String>,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// What a valid auth cookie resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub name: String,
    pub is_admin: bool,
}

//=========================================================================================
// Catalog
//=========================================================================================

#[derive(Debug, Clone)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub icon_class: Option<String>,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A single lesson, including the code challenge it carries.
#[derive(Debug, Clone)]
pub struct Lesson {
    pub id: Uuid,
    pub module_id: Uuid,
    pub lesson_title: String,
    pub instructions: String,
    pub starter_code: String,
    pub expected_output: String,
    pub lesson_type: String,
    pub lesson_order: i32,
}

/// A lesson together with the module and course it belongs to.
#[derive(Debug, Clone)]
pub struct LessonContext {
    pub lesson: Lesson,
    pub module_title: String,
    pub course_id: Uuid,
    pub course_title: String,
}

/// One row of a course's ordered lesson listing, joined with one user's progress.
///
/// Rows must be ordered by `(module_order, lesson_order)`.
#[derive(Debug, Clone)]
pub struct CourseLessonRow {
    pub module_id: Uuid,
    pub module_title: String,
    pub lesson_id: Uuid,
    pub lesson_title: String,
    pub is_completed: bool,
    pub quiz_completed: bool,
    pub has_quiz: bool,
    pub completion_date: Option<DateTime<Utc>>,
}

//=========================================================================================
// Quizzes
//=========================================================================================

/// One of the four multiple-choice letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuizOption {
    A,
    B,
    C,
    D,
}

impl QuizOption {
    pub fn as_letter(&self) -> &'static str {
        match self {
            QuizOption::A => "A",
            QuizOption::B => "B",
            QuizOption::C => "C",
            QuizOption::D => "D",
        }
    }
}

impl fmt::Display for QuizOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_letter())
    }
}

impl FromStr for QuizOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(QuizOption::A),
            "B" => Ok(QuizOption::B),
            "C" => Ok(QuizOption::C),
            "D" => Ok(QuizOption::D),
            other => Err(format!("'{}' is not a quiz option", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuizQuestion {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_option: QuizOption,
}

//=========================================================================================
// Progress
//=========================================================================================

/// Catalog-wide counters for the account page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressTotals {
    pub total_lessons: i64,
    pub code_completed: i64,
    pub quiz_completed: i64,
}

/// The data a completion certificate would carry.
#[derive(Debug, Clone)]
pub struct CourseCompletion {
    pub course_id: Uuid,
    pub course_title: String,
    pub user_name: String,
    pub completed_on: NaiveDate,
}

//=========================================================================================
// Code execution
//=========================================================================================

/// What came back from running a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    /// stdout followed by stderr, lossily decoded.
    pub output: String,
    pub timed_out: bool,
    pub truncated: bool,
}
