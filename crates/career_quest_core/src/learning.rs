//! crates/career_quest_core/src/learning.rs
//!
//! The learning rules: progress percentages, sequential lesson unlocking,
//! quiz grading and code-challenge output comparison. Everything here is pure
//! so the web layer only has to fetch rows and hand them over.

use crate::domain::{Course, CourseCompletion, CourseLessonRow, QuizOption, QuizQuestion};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use uuid::Uuid;

//=========================================================================================
// Percentages & completion
//=========================================================================================

/// `completed / total * 100`, rounded half away from zero. Zero when there is nothing to complete.
pub fn percent(completed: i64, total: i64) -> u32 {
    if total <= 0 {
        return 0;
    }
    let completed = completed.clamp(0, total);
    ((200 * completed + total) / (2 * total)) as u32
}

/// A lesson counts as done once its code challenge passed and, if it has a quiz, the quiz passed too.
pub fn lesson_fully_completed(is_completed: bool, quiz_completed: bool, has_quiz: bool) -> bool {
    is_completed && (quiz_completed || !has_quiz)
}

/// The timestamp to record for a lesson whose flags are now as given.
pub fn fully_completed_at(
    is_completed: bool,
    quiz_completed: bool,
    has_quiz: bool,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    lesson_fully_completed(is_completed, quiz_completed, has_quiz).then_some(now)
}

//=========================================================================================
// Course outline & unlock gating
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonStatus {
    Completed,
    Ready,
    Locked,
}

impl LessonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonStatus::Completed => "completed",
            LessonStatus::Ready => "ready",
            LessonStatus::Locked => "locked",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutlineLesson {
    pub lesson_id: Uuid,
    pub lesson_title: String,
    pub is_completed: bool,
    pub quiz_completed: bool,
    pub is_unlocked: bool,
    pub status: LessonStatus,
}

#[derive(Debug, Clone)]
pub struct OutlineModule {
    pub module_id: Uuid,
    pub module_title: String,
    pub lessons: Vec<OutlineLesson>,
    pub total_lessons: i64,
    /// Lessons whose code challenge passed.
    pub completed_lessons: i64,
    pub percent: u32,
}

#[derive(Debug, Clone, Default)]
pub struct CourseOutline {
    pub modules: Vec<OutlineModule>,
    pub total_lessons: i64,
    pub fully_completed_lessons: i64,
    pub progress_percent: u32,
    pub is_course_completed: bool,
}

impl CourseOutline {
    /// What a visitor without an account sees: the structure, nothing startable.
    pub fn lock_all(&mut self) {
        for lesson in self.modules.iter_mut().flat_map(|m| m.lessons.iter_mut()) {
            lesson.is_unlocked = false;
            lesson.status = if lesson.is_completed {
                LessonStatus::Completed
            } else {
                LessonStatus::Locked
            };
        }
    }
}

/// Groups ordered lesson rows into modules and applies sequential unlocking.
///
/// The first lesson of the course is always unlocked; every later lesson is
/// unlocked only when the lesson right before it (crossing module boundaries)
/// has its code challenge completed.
pub fn build_course_outline(rows: &[CourseLessonRow]) -> CourseOutline {
    let mut outline = CourseOutline::default();
    let mut previous_completed = true;

    for row in rows {
        let starts_new_module = outline
            .modules
            .last()
            .map_or(true, |m| m.module_id != row.module_id);
        if starts_new_module {
            outline.modules.push(OutlineModule {
                module_id: row.module_id,
                module_title: row.module_title.clone(),
                lessons: Vec::new(),
                total_lessons: 0,
                completed_lessons: 0,
                percent: 0,
            });
        }
        // Pushed just above when absent.
        let Some(module) = outline.modules.last_mut() else {
            continue;
        };

        let is_unlocked = previous_completed;
        let status = if row.is_completed {
            LessonStatus::Completed
        } else if is_unlocked {
            LessonStatus::Ready
        } else {
            LessonStatus::Locked
        };

        module.total_lessons += 1;
        if row.is_completed {
            module.completed_lessons += 1;
        }
        module.lessons.push(OutlineLesson {
            lesson_id: row.lesson_id,
            lesson_title: row.lesson_title.clone(),
            is_completed: row.is_completed,
            quiz_completed: row.quiz_completed,
            is_unlocked,
            status,
        });

        outline.total_lessons += 1;
        if lesson_fully_completed(row.is_completed, row.quiz_completed, row.has_quiz) {
            outline.fully_completed_lessons += 1;
        }
        previous_completed = row.is_completed;
    }

    for module in &mut outline.modules {
        module.percent = percent(module.completed_lessons, module.total_lessons);
    }
    outline.progress_percent = percent(outline.fully_completed_lessons, outline.total_lessons);
    outline.is_course_completed = outline.total_lessons > 0 && outline.progress_percent == 100;
    outline
}

/// Whether `lesson_id` may be attempted. `None` when the lesson is not among the rows.
pub fn is_lesson_unlocked(rows: &[CourseLessonRow], lesson_id: Uuid) -> Option<bool> {
    let position = rows.iter().position(|r| r.lesson_id == lesson_id)?;
    Some(position == 0 || rows[position - 1].is_completed)
}

/// The certificate data for a finished course, or `None` while lessons remain.
///
/// The completion date is the latest lesson completion, falling back to `today`
/// when no lesson recorded one.
pub fn course_completion(
    course: &Course,
    user_name: &str,
    rows: &[CourseLessonRow],
    today: NaiveDate,
) -> Option<CourseCompletion> {
    if !build_course_outline(rows).is_course_completed {
        return None;
    }
    let completed_on = rows
        .iter()
        .filter_map(|r| r.completion_date)
        .max()
        .map(|d| d.date_naive())
        .unwrap_or(today);
    Some(CourseCompletion {
        course_id: course.id,
        course_title: course.title.clone(),
        user_name: user_name.to_string(),
        completed_on,
    })
}

//=========================================================================================
// Quizzes
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizGrade {
    pub score: usize,
    pub total_questions: usize,
    pub passed: bool,
}

/// Scores a submission. Unanswered questions count as wrong; passing needs every answer right.
pub fn grade_quiz(questions: &[QuizQuestion], answers: &HashMap<Uuid, QuizOption>) -> QuizGrade {
    let score = questions
        .iter()
        .filter(|q| answers.get(&q.id) == Some(&q.correct_option))
        .count();
    let total_questions = questions.len();
    QuizGrade {
        score,
        total_questions,
        passed: total_questions > 0 && score == total_questions,
    }
}

//=========================================================================================
// Code challenges
//=========================================================================================

/// Compares program output with the stored expectation, ignoring surrounding whitespace.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    actual.trim() == expected.trim()
}
