//! Row mapping for the `jobs` table.

use datastory_core::error::CoreError;
use datastory_core::job::{DatasetMetadata, Job, JobError, JobOptions};
use datastory_core::status::{JobStage, JobStatus, StatusId};
use datastory_core::types::{DbId, Timestamp};
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Column list for `jobs` queries.
pub const COLUMNS: &str = "\
    id, user_id, status_id, stage_id, progress, file_url, options, metadata, \
    story_id, error, attempts, max_attempts, version, \
    created_at, updated_at, started_at, completed_at";

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub user_id: DbId,
    pub status_id: StatusId,
    pub stage_id: StatusId,
    pub progress: i16,
    pub file_url: String,
    pub options: Json<JobOptions>,
    pub metadata: Json<DatasetMetadata>,
    pub story_id: Option<Uuid>,
    pub error: Option<Json<JobError>>,
    pub attempts: i32,
    pub max_attempts: i32,
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl TryFrom<JobRow> for Job {
    type Error = CoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let out_of_range =
            |field: &str| CoreError::Internal(format!("Job {id}: {field} out of range"));

        Ok(Job {
            job_id: row.id,
            user_id: row.user_id,
            status: JobStatus::from_id(row.status_id)?,
            current_stage: JobStage::from_id(row.stage_id)?,
            progress: u8::try_from(row.progress).map_err(|_| out_of_range("progress"))?,
            file_url: row.file_url,
            options: row.options.0,
            metadata: row.metadata.0,
            story_id: row.story_id,
            error: row.error.map(|e| e.0),
            attempts: u32::try_from(row.attempts).map_err(|_| out_of_range("attempts"))?,
            max_attempts: u32::try_from(row.max_attempts)
                .map_err(|_| out_of_range("max_attempts"))?,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

/// Query parameters for `GET /api/v1/jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListQuery {
    /// Filter by status name (e.g. `failed`).
    pub status: Option<JobStatus>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
