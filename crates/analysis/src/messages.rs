//! Request and response bodies of the analysis service.
//!
//! The service speaks camelCase JSON. Success bodies carry the narrative
//! sections, chart descriptors and summary statistics; error bodies are
//! either FastAPI's `{"detail": ...}` or a structured `{code, message}`.

use datastory_core::job::{Job, JobOptions};
use datastory_core::story::{Chart, Narrative};
use datastory_core::types::JobId;
use serde::{Deserialize, Serialize};

/// Body of `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub file_url: String,
    /// The service treats user ids as opaque strings.
    pub user_id: String,
    pub job_id: JobId,
    pub options: JobOptions,
}

impl AnalyzeRequest {
    pub fn for_job(job: &Job) -> Self {
        Self {
            file_url: job.file_url.clone(),
            user_id: job.user_id.to_string(),
            job_id: job.job_id,
            options: job.options.clone(),
        }
    }
}

/// Successful `POST /analyze` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub narratives: Narrative,
    #[serde(default)]
    pub charts: Vec<Chart>,
    #[serde(default)]
    pub statistics: serde_json::Value,
}

/// Error body returned with a non-2xx status. Every field is optional so
/// that any JSON object decodes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// FastAPI puts a string here for `HTTPException` and a list of
    /// validation errors for 422s.
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Best human-readable message, falling back to the raw body.
    pub fn message_or(&self, raw: &str) -> String {
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            return message.to_string();
        }
        match &self.detail {
            Some(serde_json::Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => raw.to_string(),
        }
    }
}
