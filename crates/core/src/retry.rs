//! User-triggered retry policy.
//!
//! A retry is never automatic. The policy decides whether an explicit
//! retry request may re-enter `queued`: the job must be retryable (see
//! [`Job::can_retry`]) and the last failure must be older than the
//! cooldown.

use std::time::Duration;

use crate::error::CoreError;
use crate::job::Job;
use crate::types::Timestamp;

/// Default minimum delay between a failure and a user retry.
pub const DEFAULT_RETRY_COOLDOWN: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_RETRY_COOLDOWN,
        }
    }
}

impl RetryPolicy {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    /// Check whether `job` may be retried at `now`.
    ///
    /// Returns `Conflict` when the job is not retryable and `RateLimited`
    /// while the cooldown is still running.
    pub fn check(&self, job: &Job, now: Timestamp) -> Result<(), CoreError> {
        if !job.can_retry() {
            return Err(CoreError::Conflict(format!(
                "Job {} cannot be retried",
                job.job_id
            )));
        }

        let Some(failed_at) = job.error.as_ref().map(|e| e.timestamp) else {
            return Ok(());
        };
        let elapsed = (now - failed_at).to_std().unwrap_or(Duration::ZERO);
        if elapsed < self.cooldown {
            let wait = (self.cooldown - elapsed).as_secs().max(1);
            return Err(CoreError::RateLimited(format!(
                "Retry available in {wait}s"
            )));
        }
        Ok(())
    }
}
