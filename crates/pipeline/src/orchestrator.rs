//! Single-attempt orchestration.
//!
//! An attempt is a sequence of separate atomic writes to the job record:
//!
//! 1. `begin_attempt` (queued → processing/analyzing, or budget exhausted)
//! 2. the analysis call, the only slow step
//! 3. `generating_narrative` once the narrative is validated
//! 4. `creating_visualizations` once the charts are ranked
//! 5. story insert + completion in one write
//!
//! A crash between writes leaves the job at the last recorded stage.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use datastory_analysis::{AnalysisService, AnalyzeRequest, AnalyzeResponse};
use datastory_core::error::CoreError;
use datastory_core::error_codes;
use datastory_core::job::{Job, JobError};
use datastory_core::status::{JobStage, JobStatus};
use datastory_core::story::{rank_charts, NewStory};
use datastory_core::types::{JobId, StoryId};
use datastory_db::{Store, StoreError};

/// Charts kept per story when not configured otherwise.
pub const DEFAULT_MAX_CHARTS: usize = 6;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_charts: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_charts: DEFAULT_MAX_CHARTS,
        }
    }
}

/// How an attempt ended. Every variant has already been written to the
/// job record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Completed { story_id: StoryId },
    Failed { code: String, retryable: bool },
    /// The job had no attempts left and was failed without calling the
    /// analysis service.
    BudgetExhausted,
}

pub struct Orchestrator {
    store: Arc<dyn Store>,
    analysis: Arc<dyn AnalysisService>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        analysis: Arc<dyn AnalysisService>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            analysis,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Run one attempt of `job_id`.
    ///
    /// Returns `Err` only when the attempt could not start: the job is
    /// unknown, not `queued`, or the store is unavailable. Once the job is
    /// `processing`, every failure is recorded on the job and reported as
    /// [`AttemptOutcome::Failed`].
    pub async fn run_attempt(&self, job_id: JobId) -> Result<AttemptOutcome, StoreError> {
        let job = self
            .store
            .update(
                job_id,
                Box::new(|job| job.begin_attempt(Utc::now()).map(|_| ())),
            )
            .await?;

        if job.status == JobStatus::Failed {
            tracing::warn!(
                job_id = %job_id,
                attempts = job.attempts,
                max_attempts = job.max_attempts,
                "Attempt budget exhausted, job failed without analysis",
            );
            return Ok(AttemptOutcome::BudgetExhausted);
        }

        tracing::info!(
            job_id = %job_id,
            attempt = job.attempts,
            max_attempts = job.max_attempts,
            "Attempt started",
        );

        match self.execute(&job).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Attempt aborted by store error");
                self.fail_internal(job_id, &e.to_string()).await?;
                Ok(AttemptOutcome::Failed {
                    code: error_codes::INTERNAL_ERROR.to_string(),
                    retryable: true,
                })
            }
        }
    }

    /// Record an orchestrator-side fault against a job that is not yet
    /// terminal. Used for store errors mid-attempt and for panics caught by
    /// the dispatcher. A job that already reached a terminal state is left
    /// alone.
    pub async fn fail_internal(&self, job_id: JobId, message: &str) -> Result<(), StoreError> {
        let message = format!("Internal error: {message}");
        let result = self
            .store
            .update(
                job_id,
                Box::new(move |job| {
                    let now = Utc::now();
                    job.fail(
                        JobError::new(error_codes::INTERNAL_ERROR, message, true, now),
                        now,
                    )
                }),
            )
            .await;

        match result {
            Ok(_) => {
                tracing::error!(job_id = %job_id, "Job failed with internal error");
                Ok(())
            }
            Err(StoreError::Core(CoreError::Conflict(reason))) => {
                tracing::debug!(job_id = %job_id, reason = %reason, "Job already settled, internal failure not recorded");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    // ---- private helpers ----

    /// Steps 2-5 of the attempt, for a job that is now `processing`.
    async fn execute(&self, job: &Job) -> Result<AttemptOutcome, StoreError> {
        let job_id = job.job_id;
        let request = AnalyzeRequest::for_job(job);

        let response = match self.analysis.analyze(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    job_id = %job_id,
                    code = e.code(),
                    retryable = e.is_retryable(),
                    error = %e,
                    "Analysis call failed",
                );
                return self.fail(job_id, e.to_job_error(Utc::now())).await;
            }
        };

        let AnalyzeResponse {
            narratives,
            charts,
            statistics,
        } = response;

        let missing = narratives.missing_sections();
        if !missing.is_empty() {
            let error = JobError::new(
                error_codes::NARRATIVE_INCOMPLETE,
                format!("Narrative is missing: {}", missing.join(", ")),
                false,
                Utc::now(),
            );
            return self.fail(job_id, error).await;
        }
        self.advance(job_id, JobStage::GeneratingNarrative).await?;

        let received = charts.len();
        let charts = rank_charts(charts, self.config.max_charts);
        self.advance(job_id, JobStage::CreatingVisualizations).await?;
        tracing::debug!(job_id = %job_id, received, kept = charts.len(), "Charts ranked");

        let story = NewStory {
            job_id,
            user_id: job.user_id,
            title: story_title(&job.metadata.original_filename),
            narrative: narratives,
            charts,
            statistics,
        };
        let (_, story) = self.store.complete_with_story(job_id, story).await?;

        tracing::info!(job_id = %job_id, story_id = %story.story_id, "Job completed");
        Ok(AttemptOutcome::Completed {
            story_id: story.story_id,
        })
    }

    async fn advance(&self, job_id: JobId, stage: JobStage) -> Result<(), StoreError> {
        let job = self
            .store
            .update(
                job_id,
                Box::new(move |job| job.advance_to(stage)),
            )
            .await?;
        tracing::info!(job_id = %job_id, stage = %stage, progress = job.progress, "Stage reached");
        Ok(())
    }

    async fn fail(&self, job_id: JobId, error: JobError) -> Result<AttemptOutcome, StoreError> {
        let outcome = AttemptOutcome::Failed {
            code: error.code.clone(),
            retryable: error.retryable,
        };
        let job = self
            .store
            .update(job_id, Box::new(move |job| job.fail(error, Utc::now())))
            .await?;

        tracing::info!(
            job_id = %job_id,
            attempts = job.attempts,
            can_retry = job.can_retry(),
            "Job failed",
        );
        Ok(outcome)
    }
}

/// Story title derived from the uploaded file name.
fn story_title(original_filename: &str) -> String {
    let stem = Path::new(original_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::trim)
        .unwrap_or_default();
    if stem.is_empty() {
        "Untitled dataset".to_string()
    } else {
        stem.replace(['_', '-'], " ")
    }
}
