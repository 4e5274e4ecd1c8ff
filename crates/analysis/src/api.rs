//! REST client for the analysis service.
//!
//! Wraps `POST /analyze` and `GET /health` using [`reqwest`]. The whole
//! call, including reading the body, is bounded by the client timeout.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{truncate_body, AnalysisError};
use crate::messages::{AnalyzeRequest, AnalyzeResponse, ErrorBody};
use crate::AnalysisService;

/// HTTP client for one analysis service deployment.
#[derive(Clone)]
pub struct AnalysisApi {
    client: reqwest::Client,
    base_url: String,
}

impl AnalysisApi {
    /// Create a client whose every request is bounded by `timeout`.
    ///
    /// * `base_url` - e.g. `http://localhost:8000`, without trailing slash.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- private helpers ----

    /// Map a non-2xx response to [`AnalysisError::Server`] or
    /// [`AnalysisError::Rejected`]; pass 2xx responses through.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, AnalysisError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let raw = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        let body: ErrorBody = serde_json::from_str(&raw).unwrap_or_default();
        let message = truncate_body(&body.message_or(&raw));

        if status.is_server_error() {
            Err(AnalysisError::Server {
                status: status.as_u16(),
                message,
            })
        } else {
            Err(AnalysisError::Rejected {
                status: status.as_u16(),
                code: body.code.filter(|c| !c.is_empty()),
                message,
            })
        }
    }

    /// Decode a successful JSON body. Decoding failures are reported as
    /// [`AnalysisError::InvalidResponse`], not as transport errors.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, AnalysisError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(AnalysisError::from_transport)?;
        serde_json::from_slice(&bytes).map_err(|e| AnalysisError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl AnalysisService for AnalysisApi {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, AnalysisError> {
        tracing::debug!(job_id = %request.job_id, url = %self.base_url, "Submitting dataset for analysis");

        let response = self
            .client
            .post(format!("{}/analyze", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(AnalysisError::from_transport)?;

        Self::parse_response(response).await
    }

    async fn health(&self) -> Result<(), AnalysisError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(AnalysisError::from_transport)?;

        Self::ensure_success(response).await?;
        Ok(())
    }
}
