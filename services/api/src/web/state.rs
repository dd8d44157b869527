//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-request identity types.

use crate::config::Config;
use career_quest_core::domain::SessionUser;
use career_quest_core::ports::{CodeRunner, DatabaseService};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub runner: Arc<dyn CodeRunner>,
    pub config: Arc<Config>,
}

/// Who is looking at a page that anonymous visitors may also open.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<SessionUser>);
