use std::sync::Arc;

use crate::services::ViewOrchestrator;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ViewOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<ViewOrchestrator>) -> Self {
        Self { orchestrator }
    }
}
