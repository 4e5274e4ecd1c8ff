//! Client-facing projection of a job, served by the status endpoint and
//! consumed by the polling client.

use serde::{Deserialize, Serialize};

use crate::job::{Job, JobError};
use crate::status::{JobStage, JobStatus};
use crate::types::{JobId, StoryId, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    /// Only present while the job is queued or processing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<JobStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_id: Option<StoryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    pub can_retry: bool,
    pub attempts: u32,
    pub max_attempts: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Job> for JobStatusView {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.job_id,
            status: job.status,
            progress: job.progress,
            current_stage: (!job.is_terminal()).then_some(job.current_stage),
            story_id: job.story_id,
            error: job.error.clone(),
            can_retry: job.can_retry(),
            attempts: job.attempts,
            max_attempts: job.max_attempts,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

impl JobStatusView {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Acknowledgement returned by the upload handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAccepted {
    pub job_id: JobId,
    /// Always reported as `processing`: the orchestrator has been handed
    /// the job even if it has not picked it up yet.
    pub status: JobStatus,
}
