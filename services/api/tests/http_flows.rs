//! End-to-end request flows through the router, backed by an in-memory store
//! and a runner that echoes the submitted code as its output.

use api_lib::config::Config;
use api_lib::web::{self, state::AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use career_quest_core::domain::{
    Course, CourseLessonRow, Lesson, LessonContext, NewUser, ProfileChanges,
    ProgressTotals, QuizOption, QuizQuestion, RunOutput, SessionUser, User, UserCredentials,
};
use career_quest_core::ports::{CodeRunner, DatabaseService, PortError, PortResult};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

//=========================================================================================
// In-memory adapters
//=========================================================================================

struct StoredModule {
    id: Uuid,
    course_id: Uuid,
    title: String,
    order: i32,
}

/// One learner's flags for one lesson.
#[derive(Debug, Clone, Default)]
struct Flags {
    is_completed: bool,
    quiz_completed: bool,
    completion_date: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Store {
    users: Vec<UserCredentials>,
    created: HashMap<Uuid, DateTime<Utc>>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    courses: Vec<Course>,
    modules: Vec<StoredModule>,
    lessons: Vec<Lesson>,
    quizzes: Vec<QuizQuestion>,
    progress: HashMap<(Uuid, Uuid), Flags>,
}

#[derive(Default)]
struct MemoryDb {
    store: Mutex<Store>,
}

impl MemoryDb {
    fn add_course(&self, title: &str, is_active: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.store.lock().unwrap().courses.push(Course {
            id,
            title: title.to_string(),
            description: format!("About {}", title),
            icon_class: None,
            is_active,
            created_by: None,
            created_at: Utc::now(),
        });
        id
    }

    fn add_module(&self, course_id: Uuid, title: &str, order: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.store.lock().unwrap().modules.push(StoredModule {
            id,
            course_id,
            title: title.to_string(),
            order,
        });
        id
    }

    fn add_lesson(&self, module_id: Uuid, title: &str, expected: &str, order: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.store.lock().unwrap().lessons.push(Lesson {
            id,
            module_id,
            lesson_title: title.to_string(),
            instructions: format!("Print {}", expected),
            starter_code: "<?php\n".to_string(),
            expected_output: expected.to_string(),
            lesson_type: "code".to_string(),
            lesson_order: order,
        });
        id
    }

    fn add_question(&self, lesson_id: Uuid, correct: QuizOption) -> Uuid {
        let id = Uuid::new_v4();
        self.store.lock().unwrap().quizzes.push(QuizQuestion {
            id,
            lesson_id,
            question: "Pick one".to_string(),
            option_a: "a".to_string(),
            option_b: "b".to_string(),
            option_c: "c".to_string(),
            option_d: "d".to_string(),
            correct_option: correct,
        });
        id
    }

    fn to_user(store: &Store, creds: &UserCredentials) -> User {
        User {
            user_id: creds.user_id,
            name: creds.name.clone(),
            email: creds.email.clone(),
            is_admin: creds.is_admin,
            created_at: store.created.get(&creds.user_id).copied().unwrap_or_else(Utc::now),
        }
    }

    fn upsert_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        completed_at: Option<DateTime<Utc>>,
        apply: impl FnOnce(&mut Flags),
    ) {
        let mut store = self.store.lock().unwrap();
        let entry = store.progress.entry((user_id, lesson_id)).or_default();
        apply(&mut *entry);
        if entry.completion_date.is_none() {
            entry.completion_date = completed_at;
        }
    }
}

#[async_trait]
impl DatabaseService for MemoryDb {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let mut store = self.store.lock().unwrap();
        if store.users.iter().any(|u| u.email == new_user.email) {
            return Err(PortError::Conflict("Email already registered".to_string()));
        }
        let creds = UserCredentials {
            user_id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            hashed_password: new_user.hashed_password,
            is_admin: new_user.is_admin,
        };
        store.created.insert(creds.user_id, Utc::now());
        store.users.push(creds.clone());
        Ok(Self::to_user(&store, &creds))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let store = self.store.lock().unwrap();
        store
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(email.to_string()))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let store = self.store.lock().unwrap();
        let creds = store
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .ok_or_else(|| PortError::NotFound("User not found".to_string()))?;
        Ok(Self::to_user(&store, creds))
    }

    async fn update_user_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> PortResult<User> {
        let mut store = self.store.lock().unwrap();
        if store
            .users
            .iter()
            .any(|u| u.email == changes.email && u.user_id != user_id)
        {
            return Err(PortError::Conflict("Email already registered".to_string()));
        }
        let creds = store
            .users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or_else(|| PortError::NotFound("User not found".to_string()))?;
        creds.name = changes.name;
        creds.email = changes.email;
        if let Some(hashed) = changes.hashed_password {
            creds.hashed_password = hashed;
        }
        let creds = creds.clone();
        Ok(Self::to_user(&store, &creds))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.store
            .lock()
            .unwrap()
            .sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<SessionUser> {
        let store = self.store.lock().unwrap();
        let (user_id, expires_at) = store
            .sessions
            .get(session_id)
            .copied()
            .ok_or(PortError::Unauthorized)?;
        if expires_at <= Utc::now() {
            return Err(PortError::Unauthorized);
        }
        let creds = store
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .ok_or(PortError::Unauthorized)?;
        Ok(SessionUser {
            user_id,
            name: creds.name.clone(),
            is_admin: creds.is_admin,
        })
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.store.lock().unwrap().sessions.remove(session_id);
        Ok(())
    }

    async fn list_active_courses(&self) -> PortResult<Vec<Course>> {
        let store = self.store.lock().unwrap();
        Ok(store.courses.iter().filter(|c| c.is_active).cloned().collect())
    }

    async fn get_course_by_id(&self, course_id: Uuid) -> PortResult<Course> {
        let store = self.store.lock().unwrap();
        store
            .courses
            .iter()
            .find(|c| c.id == course_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Course not found.".to_string()))
    }

    async fn get_course_lessons(
        &self,
        course_id: Uuid,
        user_id: Option<Uuid>,
    ) -> PortResult<Vec<CourseLessonRow>> {
        let store = self.store.lock().unwrap();
        let mut modules: Vec<&StoredModule> =
            store.modules.iter().filter(|m| m.course_id == course_id).collect();
        modules.sort_by_key(|m| m.order);

        let mut rows = Vec::new();
        for module in modules {
            let mut lessons: Vec<&Lesson> =
                store.lessons.iter().filter(|l| l.module_id == module.id).collect();
            lessons.sort_by_key(|l| l.lesson_order);
            for lesson in lessons {
                let progress = user_id
                    .and_then(|u| store.progress.get(&(u, lesson.id)))
                    .cloned()
                    .unwrap_or_default();
                rows.push(CourseLessonRow {
                    module_id: module.id,
                    module_title: module.title.clone(),
                    lesson_id: lesson.id,
                    lesson_title: lesson.lesson_title.clone(),
                    is_completed: progress.is_completed,
                    quiz_completed: progress.quiz_completed,
                    has_quiz: store.quizzes.iter().any(|q| q.lesson_id == lesson.id),
                    completion_date: progress.completion_date,
                });
            }
        }
        Ok(rows)
    }

    async fn get_lesson_context(&self, lesson_id: Uuid) -> PortResult<LessonContext> {
        let store = self.store.lock().unwrap();
        let not_found = || PortError::NotFound("Lesson not found.".to_string());
        let lesson = store
            .lessons
            .iter()
            .find(|l| l.id == lesson_id)
            .cloned()
            .ok_or_else(not_found)?;
        let module = store
            .modules
            .iter()
            .find(|m| m.id == lesson.module_id)
            .ok_or_else(not_found)?;
        let course = store
            .courses
            .iter()
            .find(|c| c.id == module.course_id)
            .ok_or_else(not_found)?;
        Ok(LessonContext {
            module_title: module.title.clone(),
            course_id: course.id,
            course_title: course.title.clone(),
            lesson,
        })
    }

    async fn get_quiz_questions(&self, lesson_id: Uuid) -> PortResult<Vec<QuizQuestion>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .quizzes
            .iter()
            .filter(|q| q.lesson_id == lesson_id)
            .cloned()
            .collect())
    }

    async fn mark_code_completed(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        completed_at: Option<DateTime<Utc>>,
    ) -> PortResult<()> {
        self.upsert_progress(user_id, lesson_id, completed_at, |p| p.is_completed = true);
        Ok(())
    }

    async fn mark_quiz_completed(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        completed_at: Option<DateTime<Utc>>,
    ) -> PortResult<()> {
        self.upsert_progress(user_id, lesson_id, completed_at, |p| p.quiz_completed = true);
        Ok(())
    }

    async fn get_progress_totals(&self, user_id: Uuid) -> PortResult<ProgressTotals> {
        let store = self.store.lock().unwrap();
        let active: Vec<Uuid> = store
            .lessons
            .iter()
            .filter(|l| {
                store.modules.iter().any(|m| {
                    m.id == l.module_id
                        && store.courses.iter().any(|c| c.id == m.course_id && c.is_active)
                })
            })
            .map(|l| l.id)
            .collect();
        let mine = store
            .progress
            .iter()
            .filter(|((u, lesson), _)| *u == user_id && active.contains(lesson));
        Ok(ProgressTotals {
            total_lessons: active.len() as i64,
            code_completed: mine.clone().filter(|(_, p)| p.is_completed).count() as i64,
            quiz_completed: mine.filter(|(_, p)| p.quiz_completed).count() as i64,
        })
    }
}

/// Prints the submitted code back. `loop` never finishes.
struct EchoRunner;

#[async_trait]
impl CodeRunner for EchoRunner {
    async fn run(&self, code: &str) -> PortResult<RunOutput> {
        if code == "loop" {
            return Ok(RunOutput {
                output: String::new(),
                timed_out: true,
                truncated: false,
            });
        }
        Ok(RunOutput {
            output: code.to_string(),
            ..RunOutput::default()
        })
    }
}

//=========================================================================================
// Harness
//=========================================================================================

struct Catalog {
    course_id: Uuid,
    first: Uuid,
    second: Uuid,
    retired: Uuid,
    retired_lesson: Uuid,
    q1: Uuid,
    q2: Uuid,
}

fn test_app() -> (Router, Arc<MemoryDb>, Catalog) {
    let db = Arc::new(MemoryDb::default());

    // Lesson two sits in a second module and has no quiz.
    let course_id = db.add_course("PHP Foundations", true);
    let basics = db.add_module(course_id, "Basics", 1);
    let output = db.add_module(course_id, "Output", 2);
    let first = db.add_lesson(basics, "Hello", "Hello, World!", 1);
    let second = db.add_lesson(output, "Numbers", "42", 1);
    let q1 = db.add_question(first, QuizOption::A);
    let q2 = db.add_question(first, QuizOption::C);
    let retired = db.add_course("Retired", false);
    let archive = db.add_module(retired, "Archive", 1);
    let retired_lesson = db.add_lesson(archive, "Old", "old", 1);

    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://unused".to_string()),
        _ => None,
    })
    .unwrap();

    let state = Arc::new(AppState {
        db: db.clone(),
        runner: Arc::new(EchoRunner),
        config: Arc::new(config),
    });
    (
        web::router(state),
        db,
        Catalog {
            course_id,
            first,
            second,
            retired,
            retired_lesson,
            q1,
            q2,
        },
    )
}

struct Reply {
    status: StatusCode,
    body: Value,
    cookie: Option<String>,
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    Reply {
        status,
        body,
        cookie,
    }
}

async fn sign_up(app: &Router, email: &str) -> String {
    let reply = send(
        app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "name": "Ada", "email": email, "password": "secret1" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    reply.cookie.expect("signup sets a session cookie")
}

fn lesson_status(outline: &Value, lesson_id: Uuid) -> String {
    outline["modules"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|m| m["lessons"].as_array().unwrap())
        .find(|l| l["lesson_id"] == lesson_id.to_string())
        .map(|l| l["status"].as_str().unwrap().to_string())
        .unwrap()
}

//=========================================================================================
// Flows
//=========================================================================================

#[tokio::test]
async fn signup_login_and_logout() {
    let (app, _, _) = test_app();
    let cookie = sign_up(&app, "ada@example.com").await;

    let me = send(&app, Method::GET, "/auth/me", Some(&cookie), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["name"], "Ada");

    let duplicate = send(
        &app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "name": "Ada", "email": "ada@example.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let wrong = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "nope123" })),
    )
    .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body, "Incorrect email or password.");

    let unknown = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "bob@example.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);

    let login = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(login.status, StatusCode::OK);
    let session = login.cookie.unwrap();

    let logout = send(&app, Method::POST, "/auth/logout", Some(&session), None).await;
    assert_eq!(logout.status, StatusCode::OK);
    let after = send(&app, Method::GET, "/auth/me", Some(&session), None).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_rejects_invalid_forms() {
    let (app, _, _) = test_app();
    let short = send(
        &app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "name": "Ada", "email": "ada@example.com", "password": "abc" })),
    )
    .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
    assert_eq!(short.body, "The password must be at least 6 characters long.");

    let bad_email = send(
        &app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "name": "Ada", "email": "not-an-email", "password": "secret1" })),
    )
    .await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_need_a_session() {
    let (app, _, catalog) = test_app();
    let uri = format!("/lessons/{}", catalog.first);
    let reply = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let forged = send(&app, Method::GET, &uri, Some("session=forged"), None).await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn catalog_lists_only_active_courses_and_locks_for_visitors() {
    let (app, _, catalog) = test_app();
    let courses = send(&app, Method::GET, "/courses", None, None).await;
    assert_eq!(courses.status, StatusCode::OK);
    let titles: Vec<&str> = courses
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["PHP Foundations"]);

    let uri = format!("/courses/{}", catalog.course_id);
    let outline = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(outline.status, StatusCode::OK);
    assert_eq!(lesson_status(&outline.body, catalog.first), "locked");
    assert_eq!(lesson_status(&outline.body, catalog.second), "locked");

    let missing = send(
        &app,
        Method::GET,
        &format!("/courses/{}", Uuid::new_v4()),
        None,
        None,
    )
    .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn learner_works_through_a_course() {
    let (app, _, catalog) = test_app();
    let cookie = sign_up(&app, "ada@example.com").await;
    let course_uri = format!("/courses/{}", catalog.course_id);
    let first = format!("/lessons/{}", catalog.first);
    let second = format!("/lessons/{}", catalog.second);

    // Only the first lesson is open at the start.
    let outline = send(&app, Method::GET, &course_uri, Some(&cookie), None).await;
    assert_eq!(lesson_status(&outline.body, catalog.first), "ready");
    assert_eq!(lesson_status(&outline.body, catalog.second), "locked");
    let locked = send(&app, Method::GET, &second, Some(&cookie), None).await;
    assert_eq!(locked.status, StatusCode::FORBIDDEN);

    let lesson = send(&app, Method::GET, &first, Some(&cookie), None).await;
    assert_eq!(lesson.status, StatusCode::OK);
    assert_eq!(lesson.body["has_quiz"], true);
    assert!(lesson.body.get("expected_output").is_none());

    // The quiz stays closed until the code challenge passes.
    let quiz_uri = format!("{}/quiz", first);
    let closed = send(&app, Method::GET, &quiz_uri, Some(&cookie), None).await;
    assert_eq!(closed.status, StatusCode::FORBIDDEN);

    let validate = format!("{}/validate", first);
    let wrong = send(
        &app,
        Method::POST,
        &validate,
        Some(&cookie),
        Some(json!({ "code": "Hello" })),
    )
    .await;
    assert_eq!(wrong.status, StatusCode::OK);
    assert_eq!(wrong.body["success"], false);
    assert_eq!(wrong.body["expected"], "Hello, World!");

    let timeout = send(
        &app,
        Method::POST,
        &validate,
        Some(&cookie),
        Some(json!({ "code": "loop" })),
    )
    .await;
    assert_eq!(timeout.body["success"], false);
    assert_eq!(timeout.body["message"], "Execution timed out.");

    let right = send(
        &app,
        Method::POST,
        &validate,
        Some(&cookie),
        Some(json!({ "code": "Hello, World!\n" })),
    )
    .await;
    assert_eq!(right.body["success"], true);
    assert_eq!(right.body["message"], "Correct!");

    // Passing the code opens the next lesson, across the module boundary.
    let opened = send(&app, Method::GET, &second, Some(&cookie), None).await;
    assert_eq!(opened.status, StatusCode::OK);

    let quiz = send(&app, Method::GET, &quiz_uri, Some(&cookie), None).await;
    assert_eq!(quiz.status, StatusCode::OK);
    assert_eq!(quiz.body["questions"].as_array().unwrap().len(), 2);

    let partial = send(
        &app,
        Method::POST,
        &quiz_uri,
        Some(&cookie),
        Some(json!({ "answers": { catalog.q1.to_string(): "a", catalog.q2.to_string(): "B" } })),
    )
    .await;
    assert_eq!(partial.body["success"], false);
    assert_eq!(partial.body["score"], 1);
    assert_eq!(partial.body["total_questions"], 2);

    // Half the course is fully done: the first lesson has both flags.
    let passed = send(
        &app,
        Method::POST,
        &quiz_uri,
        Some(&cookie),
        Some(json!({ "answers": { catalog.q1.to_string(): "A", catalog.q2.to_string(): "c" } })),
    )
    .await;
    assert_eq!(passed.body["success"], true);
    assert_eq!(passed.body["message"], "Quiz passed!");

    let outline = send(&app, Method::GET, &course_uri, Some(&cookie), None).await;
    assert_eq!(outline.body["progress_percent"], 50);
    assert_eq!(outline.body["is_course_completed"], false);
    assert_eq!(lesson_status(&outline.body, catalog.first), "completed");

    let completion_uri = format!("{}/completion", course_uri);
    let early = send(&app, Method::GET, &completion_uri, Some(&cookie), None).await;
    assert_eq!(early.status, StatusCode::FORBIDDEN);

    // The last lesson has no quiz, so its code challenge finishes the course.
    let last = send(
        &app,
        Method::POST,
        &format!("{}/validate", second),
        Some(&cookie),
        Some(json!({ "code": "42" })),
    )
    .await;
    assert_eq!(last.body["success"], true);

    let outline = send(&app, Method::GET, &course_uri, Some(&cookie), None).await;
    assert_eq!(outline.body["progress_percent"], 100);
    assert_eq!(outline.body["is_course_completed"], true);

    let completion = send(&app, Method::GET, &completion_uri, Some(&cookie), None).await;
    assert_eq!(completion.status, StatusCode::OK);
    assert_eq!(completion.body["user_name"], "Ada");
    assert_eq!(completion.body["course_title"], "PHP Foundations");
    assert_eq!(
        completion.body["completed_on"],
        Utc::now().date_naive().to_string()
    );
}

#[tokio::test]
async fn run_reports_output_without_recording_progress() {
    let (app, db, catalog) = test_app();
    let cookie = sign_up(&app, "ada@example.com").await;

    let reply = send(
        &app,
        Method::POST,
        &format!("/lessons/{}/run", catalog.first),
        Some(&cookie),
        Some(json!({ "code": "Hello, World!" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["output"], "Hello, World!");

    let user = db.get_user_by_email("ada@example.com").await.unwrap();
    let rows = db
        .get_course_lessons(catalog.course_id, Some(user.user_id))
        .await
        .unwrap();
    assert!(rows.iter().all(|r| !r.is_completed && !r.quiz_completed));
}

#[tokio::test]
async fn account_shows_stats_and_updates_profile() {
    let (app, _, catalog) = test_app();
    let cookie = sign_up(&app, "ada@example.com").await;
    sign_up(&app, "grace@example.com").await;

    send(
        &app,
        Method::POST,
        &format!("/lessons/{}/validate", catalog.first),
        Some(&cookie),
        Some(json!({ "code": "Hello, World!" })),
    )
    .await;

    let account = send(&app, Method::GET, "/account", Some(&cookie), None).await;
    assert_eq!(account.status, StatusCode::OK);
    assert_eq!(account.body["stats"]["total_lessons"], 2);
    assert_eq!(account.body["stats"]["completed_lessons"], 1);
    assert_eq!(account.body["stats"]["progress_percent"], 50);
    assert_eq!(account.body["stats"]["quiz_percent"], 0);

    let mismatch = send(
        &app,
        Method::PUT,
        "/account",
        Some(&cookie),
        Some(json!({
            "name": "Ada L.",
            "email": "ada@example.com",
            "new_password": "longer-secret",
            "confirm_password": "different"
        })),
    )
    .await;
    assert_eq!(mismatch.status, StatusCode::BAD_REQUEST);
    assert_eq!(mismatch.body, "New password and confirm password do not match.");

    let taken = send(
        &app,
        Method::PUT,
        "/account",
        Some(&cookie),
        Some(json!({ "name": "Ada", "email": "grace@example.com" })),
    )
    .await;
    assert_eq!(taken.status, StatusCode::CONFLICT);

    let updated = send(
        &app,
        Method::PUT,
        "/account",
        Some(&cookie),
        Some(json!({
            "name": "Ada L.",
            "email": "ada@example.com",
            "new_password": "longer-secret",
            "confirm_password": "longer-secret"
        })),
    )
    .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["message"], "Profile updated successfully!");

    let login = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "longer-secret" })),
    )
    .await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["name"], "Ada L.");
}

#[tokio::test]
async fn expired_sessions_are_rejected() {
    let (app, db, _) = test_app();
    sign_up(&app, "ada@example.com").await;
    let user = db.get_user_by_email("ada@example.com").await.unwrap();
    db.create_auth_session("stale", user.user_id, Utc::now() - chrono::Duration::hours(1))
        .await
        .unwrap();

    let reply = send(&app, Method::GET, "/auth/me", Some("session=stale"), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_lesson_is_not_found() {
    let (app, _, _) = test_app();
    let cookie = sign_up(&app, "ada@example.com").await;

    let reply = send(
        &app,
        Method::POST,
        &format!("/lessons/{}/validate", Uuid::new_v4()),
        Some(&cookie),
        Some(json!({ "code": "Hello, World!" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, "Lesson not found.");
}

#[tokio::test]
async fn quiz_submission_waits_for_the_code_challenge() {
    let (app, _, catalog) = test_app();
    let cookie = sign_up(&app, "ada@example.com").await;

    let reply = send(
        &app,
        Method::POST,
        &format!("/lessons/{}/quiz", catalog.first),
        Some(&cookie),
        Some(json!({ "answers": { catalog.q1.to_string(): "A", catalog.q2.to_string(): "C" } })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(
        reply.body,
        "Please complete the code editor challenge above to unlock the assessment quiz."
    );
}

#[tokio::test]
async fn unreadable_answer_keys_are_graded_as_wrong() {
    let (app, _, catalog) = test_app();
    let cookie = sign_up(&app, "ada@example.com").await;
    send(
        &app,
        Method::POST,
        &format!("/lessons/{}/validate", catalog.first),
        Some(&cookie),
        Some(json!({ "code": "Hello, World!" })),
    )
    .await;

    let reply = send(
        &app,
        Method::POST,
        &format!("/lessons/{}/quiz", catalog.first),
        Some(&cookie),
        Some(json!({ "answers": { catalog.q1.to_string(): "A", "answer_7": "B" } })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["success"], false);
    assert_eq!(reply.body["score"], 1);
    assert_eq!(reply.body["total_questions"], 2);
}

#[tokio::test]
async fn lesson_without_questions_has_nothing_to_submit() {
    let (app, _, catalog) = test_app();
    let cookie = sign_up(&app, "ada@example.com").await;
    for (lesson, code) in [(catalog.first, "Hello, World!"), (catalog.second, "42")] {
        let reply = send(
            &app,
            Method::POST,
            &format!("/lessons/{}/validate", lesson),
            Some(&cookie),
            Some(json!({ "code": code })),
        )
        .await;
        assert_eq!(reply.body["success"], true);
    }

    let reply = send(
        &app,
        Method::POST,
        &format!("/lessons/{}/quiz", catalog.second),
        Some(&cookie),
        Some(json!({ "answers": {} })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["success"], false);
    assert_eq!(reply.body["total_questions"], 0);
    assert_eq!(reply.body["message"], "No quiz questions found.");
}

#[tokio::test]
async fn retired_courses_are_hidden() {
    let (app, db, catalog) = test_app();
    let cookie = sign_up(&app, "ada@example.com").await;
    let user = db.get_user_by_email("ada@example.com").await.unwrap();
    db.mark_code_completed(user.user_id, catalog.retired_lesson, Some(Utc::now()))
        .await
        .unwrap();
    let uri = format!("/courses/{}", catalog.retired);

    let outline = send(&app, Method::GET, &uri, Some(&cookie), None).await;
    assert_eq!(outline.status, StatusCode::NOT_FOUND);

    // Finished before it was retired, still no record.
    let completion = send(
        &app,
        Method::GET,
        &format!("{}/completion", uri),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(completion.status, StatusCode::NOT_FOUND);
    assert_eq!(completion.body, "Course not found.");
}
