use std::sync::Arc;

use datastory_analysis::AnalysisService;
use datastory_db::Store;
use datastory_pipeline::JobDispatcher;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Job and story persistence.
    pub store: Arc<dyn Store>,
    /// Hands accepted jobs to the orchestrator without blocking the request.
    pub dispatcher: Arc<JobDispatcher>,
    /// Analysis service, probed by `/health`.
    pub analysis: Arc<dyn AnalysisService>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
