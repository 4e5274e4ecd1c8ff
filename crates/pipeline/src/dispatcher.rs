//! Background job dispatcher.
//!
//! Each dispatched attempt runs as a detached Tokio task tracked by a
//! [`TaskTracker`], so callers never wait on orchestration and shutdown
//! can drain in-flight attempts. The attempt itself runs in a nested task
//! whose [`JoinHandle`](tokio::task::JoinHandle) turns a panic into a
//! recorded `INTERNAL_ERROR` instead of a job stuck in `processing`.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use datastory_core::error::CoreError;
use datastory_core::error_codes;
use datastory_core::job::{Job, JobError};
use datastory_core::retry::RetryPolicy;
use datastory_core::status::JobStatus;
use datastory_core::types::JobId;
use datastory_db::StoreError;
use tokio_util::task::TaskTracker;

use crate::orchestrator::Orchestrator;

/// What [`JobDispatcher::recover_interrupted`] found at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Jobs left `processing` by the previous process, now failed.
    pub interrupted: usize,
    /// Jobs left `queued`, dispatched again.
    pub requeued: usize,
}

pub struct JobDispatcher {
    orchestrator: Arc<Orchestrator>,
    tracker: TaskTracker,
}

impl JobDispatcher {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            tracker: TaskTracker::new(),
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Start an attempt for `job_id` without waiting for it.
    pub fn dispatch(&self, job_id: JobId) {
        let orchestrator = Arc::clone(&self.orchestrator);
        tracing::debug!(job_id = %job_id, "Dispatching job");

        self.tracker.spawn(async move {
            let attempt = tokio::spawn({
                let orchestrator = Arc::clone(&orchestrator);
                async move { orchestrator.run_attempt(job_id).await }
            });

            match attempt.await {
                Ok(Ok(outcome)) => {
                    tracing::debug!(job_id = %job_id, ?outcome, "Attempt finished");
                }
                Ok(Err(StoreError::Core(CoreError::Conflict(reason)))) => {
                    tracing::warn!(job_id = %job_id, reason = %reason, "Job not dispatchable, skipped");
                }
                Ok(Err(StoreError::JobNotFound(_))) => {
                    tracing::warn!(job_id = %job_id, "Dispatched job no longer exists");
                }
                Ok(Err(e)) => {
                    tracing::error!(job_id = %job_id, error = %e, "Attempt could not run");
                    record_internal(&orchestrator, job_id, &e.to_string()).await;
                }
                Err(join_error) => {
                    let message = if join_error.is_panic() {
                        panic_message(join_error.into_panic())
                    } else {
                        "attempt task was cancelled".to_string()
                    };
                    tracing::error!(job_id = %job_id, error = %message, "Attempt panicked");
                    record_internal(&orchestrator, job_id, &message).await;
                }
            }
        });
    }

    /// Apply a user retry and dispatch the new attempt.
    ///
    /// The cooldown check and the reset happen in the same atomic update,
    /// so two concurrent retries cannot both re-queue the job.
    pub async fn retry(&self, job_id: JobId, policy: RetryPolicy) -> Result<Job, StoreError> {
        let job = self
            .orchestrator
            .store()
            .update(
                job_id,
                Box::new(move |job| {
                    policy.check(job, Utc::now())?;
                    job.reset_for_retry()
                }),
            )
            .await?;

        tracing::info!(
            job_id = %job_id,
            attempts = job.attempts,
            max_attempts = job.max_attempts,
            "Job re-queued by user retry",
        );
        self.dispatch(job_id);
        Ok(job)
    }

    /// Settle jobs orphaned by a previous process.
    ///
    /// `processing` jobs lost their attempt mid-flight and are failed with a
    /// retryable `ORCHESTRATOR_INTERRUPTED`. `queued` jobs never started and
    /// are dispatched again.
    pub async fn recover_interrupted(&self) -> Result<RecoveryReport, StoreError> {
        let store = self.orchestrator.store();
        let mut report = RecoveryReport::default();

        for job in store.list_by_status(JobStatus::Processing).await? {
            let result = store
                .update(
                    job.job_id,
                    Box::new(|job| {
                        let now = Utc::now();
                        job.fail(
                            JobError::new(
                                error_codes::ORCHESTRATOR_INTERRUPTED,
                                "The service restarted while this job was processing",
                                true,
                                now,
                            ),
                            now,
                        )
                    }),
                )
                .await;

            match result {
                Ok(_) => {
                    report.interrupted += 1;
                    tracing::warn!(job_id = %job.job_id, stage = %job.current_stage, "Interrupted job marked failed");
                }
                Err(e) => {
                    tracing::error!(job_id = %job.job_id, error = %e, "Failed to settle interrupted job");
                }
            }
        }

        for job in store.list_by_status(JobStatus::Queued).await? {
            self.dispatch(job.job_id);
            report.requeued += 1;
        }

        tracing::info!(
            interrupted = report.interrupted,
            requeued = report.requeued,
            "Job recovery finished",
        );
        Ok(report)
    }

    /// Number of attempts currently running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every dispatched attempt has finished.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Wait up to `timeout` for running attempts. Attempts still running
    /// afterwards are picked up by
    /// [`recover_interrupted`](Self::recover_interrupted) on next start.
    pub async fn shutdown(&self, timeout: Duration) {
        self.tracker.close();
        tracing::info!(in_flight = self.tracker.len(), "Draining job dispatcher");

        if tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                in_flight = self.tracker.len(),
                "Dispatcher shutdown timed out with attempts still running",
            );
        }
    }
}

async fn record_internal(orchestrator: &Orchestrator, job_id: JobId, message: &str) {
    if let Err(e) = orchestrator.fail_internal(job_id, message).await {
        tracing::error!(job_id = %job_id, error = %e, "Failed to record internal error on job");
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "attempt panicked".to_string()
    }
}
