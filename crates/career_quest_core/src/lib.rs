pub mod domain;
pub mod learning;
pub mod ports;
pub mod validation;

pub use domain::{
    AuthSession, Course, CourseCompletion, CourseLessonRow, Lesson, LessonContext,
    NewUser, ProfileChanges, ProgressTotals, QuizOption, QuizQuestion, RunOutput,
    SessionUser, User, UserCredentials,
};
pub use ports::{CodeRunner, DatabaseService, PortError, PortResult};
