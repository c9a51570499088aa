//! services/runner/src/flow/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use assessment_core::ports::{LocalStore, QuizService};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to
/// every flow.
#[derive(Clone)]
pub struct AppState {
    pub quiz_service: Arc<dyn QuizService>,
    pub store: Arc<dyn LocalStore>,
    pub config: Arc<Config>,
}
