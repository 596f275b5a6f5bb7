use std::sync::Arc;

use crate::config::Config;
use crate::workflow::Orchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The evaluation pipeline. Holds the job store, prompt cache, and judge.
    pub orchestrator: Arc<Orchestrator>,
    pub config: Config,
}
