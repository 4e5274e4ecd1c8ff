//! Handlers for `/api/v1/jobs`.
//!
//! Creating a job is the upload handler's hand-off: the dataset is already
//! in object storage, the job is persisted as `queued` and dispatched, and
//! the request returns `202` straight away.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use datastory_core::error::CoreError;
use datastory_core::job::{DatasetMetadata, Job, JobOptions, NewJob, MAX_ALLOWED_ATTEMPTS};
use datastory_core::status::JobStatus;
use datastory_core::status_view::{JobAccepted, JobStatusView};
use datastory_core::types::JobId;
use datastory_db::models::job::JobListQuery;
use datastory_db::Store;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /api/v1/jobs`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    #[validate(length(min = 1, max = 2048))]
    pub file_url: String,
    #[serde(default)]
    pub options: JobOptions,
    #[validate(nested)]
    pub metadata: DatasetMetadata,
    #[validate(range(min = 1, max = MAX_ALLOWED_ATTEMPTS))]
    pub max_attempts: Option<u32>,
}

/// Look up a job the caller may see.
///
/// Returns `NotFound` for unknown ids and `Forbidden` when the job belongs
/// to another user and the caller is not an admin.
async fn find_and_authorize(
    store: &dyn Store,
    job_id: JobId,
    auth: &AuthUser,
) -> AppResult<Job> {
    let job = store
        .get(job_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Job", job_id))?;

    if !auth.can_access(job.user_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not have access to this job".into(),
        )));
    }
    Ok(job)
}

/// POST /api/v1/jobs
pub async fn create_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateJobRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))?;

    let job = state
        .store
        .create(NewJob {
            user_id: auth.user_id,
            file_url: input.file_url,
            options: input.options,
            metadata: input.metadata,
            max_attempts: input.max_attempts.unwrap_or(state.config.job_max_attempts),
        })
        .await?;

    tracing::info!(
        job_id = %job.job_id,
        user_id = auth.user_id,
        file = %job.metadata.original_filename,
        "Job accepted",
    );
    state.dispatcher.dispatch(job.job_id);

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: JobAccepted {
                job_id: job.job_id,
                status: JobStatus::Processing,
            },
        }),
    ))
}

/// GET /api/v1/jobs
pub async fn list_jobs(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    let jobs = state.store.list_for_user(auth.user_id, &params).await?;
    let views: Vec<JobStatusView> = jobs.iter().map(JobStatusView::from).collect();
    Ok(Json(DataResponse { data: views }))
}

/// GET /api/v1/jobs/{id}
pub async fn get_job_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = find_and_authorize(state.store.as_ref(), job_id, &auth).await?;
    Ok(Json(DataResponse {
        data: JobStatusView::from(&job),
    }))
}

/// POST /api/v1/jobs/{id}/retry
///
/// `409` when the job cannot be retried, `429` inside the cooldown.
pub async fn retry_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(state.store.as_ref(), job_id, &auth).await?;

    let job = state
        .dispatcher
        .retry(job_id, state.config.retry_policy())
        .await?;

    tracing::info!(job_id = %job_id, user_id = auth.user_id, "Job retry requested");
    Ok(Json(DataResponse {
        data: JobStatusView::from(&job),
    }))
}
