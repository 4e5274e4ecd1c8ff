/// Errors from a single status or retry request.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The request never produced a response (connect, timeout, reset).
    #[error("Status request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("Status endpoint returned {status}: {message}")]
    Status {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A 2xx body that is not a `{data: JobStatusView}` envelope.
    #[error("Invalid status response: {0}")]
    Decode(String),
}

impl PollError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this answer ends the polling session. Unknown, foreign and
    /// unauthenticated jobs will not start answering on the next tick.
    pub fn ends_session(&self) -> bool {
        matches!(self.status(), Some(401 | 403 | 404))
    }

    /// A 429 from the retry action: the cooldown since the last failure
    /// has not elapsed yet.
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }
}
