use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the job store is reachable.
    pub store_healthy: bool,
    /// Whether the analysis service answered its health probe.
    pub analysis_healthy: bool,
}

/// GET /health -- returns service, store and analysis-service health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (store, analysis) = tokio::join!(state.store.health_check(), state.analysis.health());

    if let Err(e) = &analysis {
        tracing::warn!(error = %e, "Analysis service health probe failed");
    }
    let store_healthy = store.is_ok();
    let analysis_healthy = analysis.is_ok();

    let status = if store_healthy && analysis_healthy {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        store_healthy,
        analysis_healthy,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
