use datastory_core::error_codes;
use datastory_core::job::JobError;
use datastory_core::types::Timestamp;

/// Longest slice of a response body kept in error messages.
const MAX_BODY_IN_MESSAGE: usize = 512;

/// Errors from the analysis service client.
///
/// Every variant is classified as transient or not by
/// [`is_retryable`](Self::is_retryable); the orchestrator records that
/// classification on the failed job.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The call did not finish within the client timeout.
    #[error("Analysis service timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// The service could not be reached at all.
    #[error("Analysis service unreachable: {0}")]
    Connect(#[source] reqwest::Error),

    /// Any other failure while sending the request or reading the body.
    #[error("Analysis request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The service answered with a 5xx status.
    #[error("Analysis service error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The service refused the dataset or request (4xx).
    #[error("Analysis service rejected the request ({status}): {message}")]
    Rejected {
        status: u16,
        /// Service-supplied code, when the body carried one.
        code: Option<String>,
        message: String,
    },

    /// A 2xx response whose body is not a valid analysis result.
    #[error("Invalid analysis response: {0}")]
    InvalidResponse(String),
}

impl AnalysisError {
    /// Classify a reqwest failure by what went wrong on the wire.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err)
        } else if err.is_connect() {
            Self::Connect(err)
        } else {
            Self::Transport(err)
        }
    }

    /// Transient failures are worth another attempt; input rejections and
    /// malformed results are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connect(_) | Self::Transport(_) | Self::Server { .. } => true,
            Self::Rejected { .. } | Self::InvalidResponse(_) => false,
        }
    }

    /// Machine-readable code stored in `Job.error.code`.
    pub fn code(&self) -> &str {
        match self {
            Self::Timeout(_) => error_codes::ANALYSIS_TIMEOUT,
            Self::Connect(_) => error_codes::ANALYSIS_UNAVAILABLE,
            Self::Transport(_) => error_codes::ANALYSIS_TRANSPORT_ERROR,
            Self::Server { .. } => error_codes::ANALYSIS_SERVER_ERROR,
            Self::Rejected { code, .. } => code.as_deref().unwrap_or(error_codes::DATASET_REJECTED),
            Self::InvalidResponse(_) => error_codes::INVALID_ANALYSIS_RESPONSE,
        }
    }

    pub fn to_job_error(&self, now: Timestamp) -> JobError {
        JobError::new(self.code(), self.to_string(), self.is_retryable(), now)
    }
}

/// Cut `body` down to something fit for a log line or error message.
pub(crate) fn truncate_body(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_BODY_IN_MESSAGE) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}
