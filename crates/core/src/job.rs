//! The job aggregate and its state machine.
//!
//! Every mutation of a [`Job`] goes through one of the transition methods
//! below. Each method either applies a complete, invariant-preserving
//! change or returns an error and leaves the job untouched, so a store can
//! apply a transition inside a single atomic update.
//!
//! ```text
//! queued ──begin_attempt──▶ processing ──advance_to──▶ … ──complete──▶ completed
//!   ▲                         │
//!   │                         └──fail──▶ failed
//!   └──────reset_for_retry───────────────┘
//! ```

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::error_codes;
use crate::status::{JobStage, JobStatus};
use crate::types::{JobId, StoryId, Timestamp, UserId};

/// Default ceiling on orchestration attempts for a new job.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Upper bound accepted for a caller-supplied `maxAttempts`.
pub const MAX_ALLOWED_ATTEMPTS: u32 = 10;

/// Target audience for the generated narrative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceLevel {
    #[default]
    General,
    Executive,
    Technical,
}

/// Caller-supplied configuration, immutable after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    #[serde(default)]
    pub audience_level: AudienceLevel,
    /// Any further options are forwarded to the analysis service untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Dataset facts gathered at upload time. Written once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    #[validate(length(min = 1, max = 255))]
    pub original_filename: String,
    #[validate(length(min = 1, max = 1024))]
    pub storage_key: String,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_count: Option<u64>,
}

/// Structured failure recorded on a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobError {
    pub code: String,
    pub message: String,
    pub timestamp: Timestamp,
    /// Whether the cause is transient. Budget exhaustion is decided
    /// separately by [`Job::can_retry`].
    pub retryable: bool,
}

impl JobError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            timestamp,
            retryable,
        }
    }
}

/// Input for creating a job.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    pub user_id: UserId,
    pub file_url: String,
    pub options: JobOptions,
    pub metadata: DatasetMetadata,
    pub max_attempts: u32,
}

/// Outcome of [`Job::begin_attempt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStart {
    /// The attempt counter was incremented; the job is now processing.
    Started { attempt: u32 },
    /// No budget was left; the job has been failed with
    /// `MAX_ATTEMPTS_EXCEEDED`.
    BudgetExhausted,
}

/// The unit of trackable asynchronous work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: JobId,
    pub user_id: UserId,
    pub status: JobStatus,
    pub current_stage: JobStage,
    pub progress: u8,
    pub file_url: String,
    pub options: JobOptions,
    pub story_id: Option<StoryId>,
    pub error: Option<JobError>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub metadata: DatasetMetadata,
    /// Bumped by the store on every committed update.
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl Job {
    /// Build a freshly queued job. The dataset is already in the object
    /// store, so the job starts at the `uploading` checkpoint.
    pub fn new(job_id: JobId, input: NewJob, now: Timestamp) -> Result<Self, CoreError> {
        if input.max_attempts == 0 || input.max_attempts > MAX_ALLOWED_ATTEMPTS {
            return Err(CoreError::Validation(format!(
                "maxAttempts must be between 1 and {MAX_ALLOWED_ATTEMPTS}"
            )));
        }
        if input.file_url.trim().is_empty() {
            return Err(CoreError::Validation("fileUrl must not be empty".into()));
        }

        Ok(Self {
            job_id,
            user_id: input.user_id,
            status: JobStatus::Queued,
            current_stage: JobStage::Uploading,
            progress: JobStage::Uploading.checkpoint(),
            file_url: input.file_url,
            options: input.options,
            story_id: None,
            error: None,
            attempts: 0,
            max_attempts: input.max_attempts,
            metadata: input.metadata,
            version: 0,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// A user retry is allowed only for a transient failure with budget left.
    pub fn can_retry(&self) -> bool {
        self.status == JobStatus::Failed
            && self.error.as_ref().is_some_and(|e| e.retryable)
            && self.attempts < self.max_attempts
    }

    /// Start a new attempt. Only a queued job can begin one.
    pub fn begin_attempt(&mut self, now: Timestamp) -> Result<AttemptStart, CoreError> {
        self.expect_status(&[JobStatus::Queued], "begin an attempt")?;

        if self.attempts >= self.max_attempts {
            let message = format!(
                "All {} attempts have been used for this job",
                self.max_attempts
            );
            self.fail(
                JobError::new(error_codes::MAX_ATTEMPTS_EXCEEDED, message, false, now),
                now,
            )?;
            return Ok(AttemptStart::BudgetExhausted);
        }

        self.attempts += 1;
        self.status = JobStatus::Processing;
        self.current_stage = JobStage::Analyzing;
        self.progress = self.progress.max(JobStage::Analyzing.checkpoint());
        self.started_at = Some(now);
        Ok(AttemptStart::Started {
            attempt: self.attempts,
        })
    }

    /// Move a processing job forward to `stage`. Stages never go backwards.
    pub fn advance_to(&mut self, stage: JobStage) -> Result<(), CoreError> {
        self.expect_status(&[JobStatus::Processing], "advance its stage")?;

        if stage.ordinal() <= self.current_stage.ordinal() {
            return Err(CoreError::Conflict(format!(
                "Cannot move job {} from stage {} back to {}",
                self.job_id, self.current_stage, stage
            )));
        }

        self.current_stage = stage;
        self.progress = self.progress.max(stage.checkpoint());
        Ok(())
    }

    /// The single success exit of an attempt.
    pub fn complete(&mut self, story_id: StoryId, now: Timestamp) -> Result<(), CoreError> {
        self.expect_status(&[JobStatus::Processing], "complete")?;

        self.status = JobStatus::Completed;
        self.current_stage = JobStage::CreatingVisualizations;
        self.progress = 100;
        self.story_id = Some(story_id);
        self.error = None;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Record a failed attempt. Progress stays where the attempt stopped.
    pub fn fail(&mut self, error: JobError, now: Timestamp) -> Result<(), CoreError> {
        self.expect_status(&[JobStatus::Queued, JobStatus::Processing], "fail")?;

        self.status = JobStatus::Failed;
        self.story_id = None;
        self.error = Some(error);
        self.completed_at = Some(now);
        Ok(())
    }

    /// Re-enter `queued` after a user retry. `attempts` is left as-is; the
    /// next attempt increments it.
    pub fn reset_for_retry(&mut self) -> Result<(), CoreError> {
        if !self.can_retry() {
            return Err(CoreError::Conflict(format!(
                "Job {} cannot be retried (status {}, attempts {}/{})",
                self.job_id, self.status, self.attempts, self.max_attempts
            )));
        }

        self.status = JobStatus::Queued;
        self.current_stage = JobStage::Uploading;
        self.progress = 0;
        self.error = None;
        self.started_at = None;
        self.completed_at = None;
        Ok(())
    }

    /// Check the record-level invariants. Stores call this before every
    /// commit.
    pub fn check_invariants(&self) -> Result<(), CoreError> {
        let violation = |msg: String| Err(CoreError::Internal(format!("Job {}: {msg}", self.job_id)));

        if (self.status == JobStatus::Completed) != self.story_id.is_some() {
            return violation(format!(
                "storyId presence does not match status {}",
                self.status
            ));
        }
        if (self.status == JobStatus::Failed) != self.error.is_some() {
            return violation(format!(
                "error presence does not match status {}",
                self.status
            ));
        }
        if self.attempts > self.max_attempts {
            return violation(format!(
                "attempts {} exceeds maxAttempts {}",
                self.attempts, self.max_attempts
            ));
        }
        if self.progress > 100 {
            return violation(format!("progress {} is out of range", self.progress));
        }
        if (self.progress == 100) != (self.status == JobStatus::Completed) {
            return violation(format!(
                "progress {} does not match status {}",
                self.progress, self.status
            ));
        }
        Ok(())
    }

    fn expect_status(&self, allowed: &[JobStatus], action: &str) -> Result<(), CoreError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(CoreError::Conflict(format!(
                "Job {} is {} and cannot {action}",
                self.job_id, self.status
            )))
        }
    }
}
