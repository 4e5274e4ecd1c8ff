//! Client for the external statistical analysis service.
//!
//! The service reads a dataset by URL, runs statistical analysis, writes a
//! three-part narrative and proposes charts, all in one synchronous
//! `POST /analyze` call. This crate owns the wire types, the reqwest-based
//! client and the classification of failures into retryable and
//! non-retryable job errors.

pub mod api;
pub mod error;
pub mod messages;

use async_trait::async_trait;

pub use api::AnalysisApi;
pub use error::AnalysisError;
pub use messages::{AnalyzeRequest, AnalyzeResponse};

/// The seam the orchestrator calls through. [`AnalysisApi`] is the HTTP
/// implementation; tests substitute scripted fakes.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Run the full analysis for one dataset.
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, AnalysisError>;

    /// Reachability probe.
    async fn health(&self) -> Result<(), AnalysisError>;
}
