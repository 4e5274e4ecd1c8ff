//! Access to the job status API.

use std::time::Duration;

use async_trait::async_trait;
use datastory_core::status_view::JobStatusView;
use datastory_core::types::JobId;
use serde::Deserialize;

use crate::error::PollError;

/// The two calls a poller makes against the job API.
#[async_trait]
pub trait StatusClient: Send + Sync {
    async fn get_status(&self, job_id: JobId) -> Result<JobStatusView, PollError>;

    /// Ask the server to re-queue a failed job.
    async fn retry(&self, job_id: JobId) -> Result<JobStatusView, PollError>;
}

/// `{ "data": T }` success envelope.
#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// `{ "error": ..., "code": ... }` error body.
#[derive(Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// [`StatusClient`] over HTTP with a bearer token.
#[derive(Clone)]
pub struct HttpStatusClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpStatusClient {
    /// * `base_url` - API root, e.g. `http://localhost:3000`.
    /// * `timeout` - bound on each individual request.
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn job_url(&self, job_id: JobId) -> String {
        format!("{}/api/v1/jobs/{job_id}", self.base_url)
    }

    async fn read_view(response: reqwest::Response) -> Result<JobStatusView, PollError> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let body: ApiErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();
            return Err(PollError::Status {
                status: status.as_u16(),
                code: body.code,
                message: body
                    .error
                    .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned()),
            });
        }

        serde_json::from_slice::<Envelope<JobStatusView>>(&bytes)
            .map(|envelope| envelope.data)
            .map_err(|e| PollError::Decode(e.to_string()))
    }
}

#[async_trait]
impl StatusClient for HttpStatusClient {
    async fn get_status(&self, job_id: JobId) -> Result<JobStatusView, PollError> {
        let response = self
            .client
            .get(self.job_url(job_id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::read_view(response).await
    }

    async fn retry(&self, job_id: JobId) -> Result<JobStatusView, PollError> {
        let response = self
            .client
            .post(format!("{}/retry", self.job_url(job_id)))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::read_view(response).await
    }
}
