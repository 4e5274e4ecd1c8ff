//! Repository for the `jobs` table.
//!
//! Status and stage are written through their `JobStatus` / `JobStage`
//! ids; there are no bare status literals in the SQL.

use datastory_core::error::CoreError;
use datastory_core::job::Job;
use datastory_core::status::JobStatus;
use datastory_core::types::{JobId, UserId};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::error::StoreError;
use crate::models::job::{JobListQuery, JobRow, COLUMNS};
use crate::models::page;

/// SQL for the `jobs` table.
pub struct JobRepo;

impl JobRepo {
    /// Insert a fully built job row.
    pub async fn insert(pool: &PgPool, job: &Job) -> Result<Job, StoreError> {
        let query = format!(
            "INSERT INTO jobs \
                 (id, user_id, status_id, stage_id, progress, file_url, options, metadata, \
                  story_id, error, attempts, max_attempts, version, \
                  created_at, updated_at, started_at, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(job.job_id)
            .bind(job.user_id)
            .bind(job.status.id())
            .bind(job.current_stage.id())
            .bind(i16::from(job.progress))
            .bind(&job.file_url)
            .bind(Json(&job.options))
            .bind(Json(&job.metadata))
            .bind(job.story_id)
            .bind(job.error.as_ref().map(Json))
            .bind(attempts_column(job.attempts)?)
            .bind(attempts_column(job.max_attempts)?)
            .bind(job.version)
            .bind(job.created_at)
            .bind(job.updated_at)
            .bind(job.started_at)
            .bind(job.completed_at)
            .fetch_one(pool)
            .await?;
        Ok(Job::try_from(row)?)
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: JobId) -> Result<Option<Job>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Job::try_from).transpose()?)
    }

    /// Load and row-lock a job inside an open transaction.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: JobId,
    ) -> Result<Option<Job>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(Job::try_from).transpose()?)
    }

    /// Write every mutable column of `job` in one statement.
    ///
    /// `job.version` must already hold the new version; the row is only
    /// updated if the stored version is the one before it.
    pub async fn save(conn: &mut PgConnection, job: &Job) -> Result<Job, StoreError> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $2, stage_id = $3, progress = $4, story_id = $5, error = $6, \
                 attempts = $7, version = $8, updated_at = $9, started_at = $10, \
                 completed_at = $11 \
             WHERE id = $1 AND version = $8 - 1 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(job.job_id)
            .bind(job.status.id())
            .bind(job.current_stage.id())
            .bind(i16::from(job.progress))
            .bind(job.story_id)
            .bind(job.error.as_ref().map(Json))
            .bind(attempts_column(job.attempts)?)
            .bind(job.version)
            .bind(job.updated_at)
            .bind(job.started_at)
            .bind(job.completed_at)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| {
                CoreError::Conflict(format!(
                    "Job {} was modified concurrently",
                    job.job_id
                ))
            })?;
        Ok(Job::try_from(row)?)
    }

    /// List a user's jobs with optional status filter and pagination,
    /// newest first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: UserId,
        params: &JobListQuery,
    ) -> Result<Vec<Job>, StoreError> {
        let (limit, offset) = page(params.limit, params.offset);

        let rows = match params.status {
            Some(status) => {
                let query = format!(
                    "SELECT {COLUMNS} FROM jobs \
                     WHERE user_id = $1 AND status_id = $2 \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $3 OFFSET $4"
                );
                sqlx::query_as::<_, JobRow>(&query)
                    .bind(user_id)
                    .bind(status.id())
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(pool)
                    .await?
            }
            None => {
                let query = format!(
                    "SELECT {COLUMNS} FROM jobs \
                     WHERE user_id = $1 \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $2 OFFSET $3"
                );
                sqlx::query_as::<_, JobRow>(&query)
                    .bind(user_id)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(pool)
                    .await?
            }
        };

        Ok(rows
            .into_iter()
            .map(Job::try_from)
            .collect::<Result<_, _>>()?)
    }

    /// All jobs currently in `status`, oldest first.
    pub async fn list_by_status(pool: &PgPool, status: JobStatus) -> Result<Vec<Job>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs WHERE status_id = $1 ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, JobRow>(&query)
            .bind(status.id())
            .fetch_all(pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(Job::try_from)
            .collect::<Result<_, _>>()?)
    }
}

fn attempts_column(value: u32) -> Result<i32, CoreError> {
    i32::try_from(value).map_err(|_| CoreError::Validation(format!("attempt count {value} is too large")))
}
