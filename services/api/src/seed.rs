//! services/api/src/seed.rs
//!
//! Loads a course catalog from JSON into the database. Modules and lessons take
//! their order from their position in the file.

use career_quest_core::domain::QuizOption;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Invalid catalog: {0}")]
    Invalid(String),
    #[error("Catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub courses: Vec<CourseSeed>,
}

#[derive(Debug, Deserialize)]
pub struct CourseSeed {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub icon_class: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub modules: Vec<ModuleSeed>,
}

#[derive(Debug, Deserialize)]
pub struct ModuleSeed {
    pub title: String,
    #[serde(default)]
    pub lessons: Vec<LessonSeed>,
}

#[derive(Debug, Deserialize)]
pub struct LessonSeed {
    pub title: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub starter_code: String,
    #[serde(default)]
    pub expected_output: String,
    #[serde(default = "default_lesson_type")]
    pub lesson_type: String,
    #[serde(default)]
    pub quizzes: Vec<QuizSeed>,
}

#[derive(Debug, Deserialize)]
pub struct QuizSeed {
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_option: String,
}

fn default_true() -> bool {
    true
}

fn default_lesson_type() -> String {
    "code".to_string()
}

/// Totals of what a catalog inserted.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub courses: usize,
    pub modules: usize,
    pub lessons: usize,
    pub quizzes: usize,
}

impl CatalogFile {
    pub fn from_json(raw: &str) -> Result<Self, SeedError> {
        let catalog: CatalogFile = serde_json::from_str(raw)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Rejects blank titles and quiz answers outside `A`-`D`.
    pub fn validate(&self) -> Result<(), SeedError> {
        for course in &self.courses {
            if course.title.trim().is_empty() {
                return Err(SeedError::Invalid("a course has an empty title".to_string()));
            }
            for module in &course.modules {
                if module.title.trim().is_empty() {
                    return Err(SeedError::Invalid(format!(
                        "course '{}' has a module with an empty title",
                        course.title
                    )));
                }
                for lesson in &module.lessons {
                    if lesson.title.trim().is_empty() {
                        return Err(SeedError::Invalid(format!(
                            "module '{}' has a lesson with an empty title",
                            module.title
                        )));
                    }
                    for quiz in &lesson.quizzes {
                        quiz.correct_option.parse::<QuizOption>().map_err(|e| {
                            SeedError::Invalid(format!("lesson '{}': {}", lesson.title, e))
                        })?;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> SeedSummary {
        let modules = || self.courses.iter().flat_map(|c| &c.modules);
        let lessons = || modules().flat_map(|m| &m.lessons);
        SeedSummary {
            courses: self.courses.len(),
            modules: modules().count(),
            lessons: lessons().count(),
            quizzes: lessons().map(|l| l.quizzes.len()).sum(),
        }
    }
}

/// Inserts the whole catalog in one transaction.
pub async fn insert_catalog(pool: &PgPool, catalog: &CatalogFile) -> Result<SeedSummary, SeedError> {
    catalog.validate()?;
    let mut tx = pool.begin().await?;

    for course in &catalog.courses {
        let course_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO courses (id, title, description, icon_class, is_active) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(course_id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(course.icon_class.as_deref())
        .bind(course.is_active)
        .execute(&mut *tx)
        .await?;

        for (module_index, module) in course.modules.iter().enumerate() {
            let module_id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO modules (id, course_id, module_title, module_order) VALUES ($1, $2, $3, $4)",
            )
            .bind(module_id)
            .bind(course_id)
            .bind(&module.title)
            .bind(module_index as i32 + 1)
            .execute(&mut *tx)
            .await?;

            for (lesson_index, lesson) in module.lessons.iter().enumerate() {
                let lesson_id = Uuid::new_v4();
                sqlx::query(
                    "INSERT INTO lessons (id, module_id, lesson_title, instructions, starter_code, \
                     expected_output, lesson_type, lesson_order) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                )
                .bind(lesson_id)
                .bind(module_id)
                .bind(&lesson.title)
                .bind(&lesson.instructions)
                .bind(&lesson.starter_code)
                .bind(&lesson.expected_output)
                .bind(&lesson.lesson_type)
                .bind(lesson_index as i32 + 1)
                .execute(&mut *tx)
                .await?;

                for quiz in &lesson.quizzes {
                    // Checked by `validate` above.
                    let correct = quiz
                        .correct_option
                        .parse::<QuizOption>()
                        .map_err(SeedError::Invalid)?;
                    sqlx::query(
                        "INSERT INTO quizzes (id, lesson_id, question, option_a, option_b, option_c, \
                         option_d, correct_option) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                    )
                    .bind(Uuid::new_v4())
                    .bind(lesson_id)
                    .bind(&quiz.question)
                    .bind(&quiz.option_a)
                    .bind(&quiz.option_b)
                    .bind(&quiz.option_c)
                    .bind(&quiz.option_d)
                    .bind(correct.as_letter())
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }
    }

    tx.commit().await?;
    Ok(catalog.summary())
}
