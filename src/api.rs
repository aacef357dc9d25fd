//! HTTP API for the campus assistant

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::db::Database;
use crate::gateway::{AnswerService, Classifier};
use crate::runtime::RuntimeManager;
use crate::state_machine::CategoryMode;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeManager>,
}

impl AppState {
    pub fn new(
        db: Database,
        classifier: Arc<dyn Classifier>,
        answerer: Arc<dyn AnswerService>,
        category_mode: CategoryMode,
    ) -> Self {
        Self {
            runtime: Arc::new(RuntimeManager::new(db, classifier, answerer, category_mode)),
        }
    }
}
