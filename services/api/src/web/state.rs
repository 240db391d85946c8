//! services/api/src/web/state.rs
//!
//! Defines the application state shared by every request handler.

use crate::config::Config;
use math_tutor_core::{DocumentStore, MathTutor, OcrProvider};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub ocr: Arc<dyn OcrProvider>,
    pub tutor: MathTutor,
    pub config: Arc<Config>,
}
