//! The polling loop.
//!
//! One status request goes out immediately, then one per
//! [`PollerConfig::interval`] until the job is terminal or the session is
//! cancelled. Requests never overlap: a slow response delays the next
//! tick instead of stacking requests behind it.

use std::time::Duration;

use datastory_core::status::JobStatus;
use datastory_core::status_view::JobStatusView;
use datastory_core::types::{JobId, StoryId};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::client::StatusClient;
use crate::error::PollError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Shortest interval the loop will tick at.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Pause between seeing `completed` and navigating to the story, so the
/// success message gets rendered.
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub interval: Duration,
    pub redirect_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            redirect_delay: DEFAULT_REDIRECT_DELAY,
        }
    }
}

/// Receives everything a polling session observes.
///
/// Only [`on_status`](Self::on_status) and
/// [`navigate_to_story`](Self::navigate_to_story) are required.
pub trait PollObserver: Send {
    /// Every successfully fetched status, terminal or not.
    fn on_status(&mut self, view: &JobStatusView);

    /// A poll that got no usable answer. Polling continues.
    fn on_poll_error(&mut self, _error: &PollError) {}

    fn on_completed(&mut self, _view: &JobStatusView) {}

    /// Called once, after the redirect delay.
    fn navigate_to_story(&mut self, story_id: StoryId);

    fn on_failed(&mut self, _view: &JobStatusView) {}

    /// Offered only when the failed job reports `canRetry`.
    fn should_retry(&mut self, _view: &JobStatusView) -> bool {
        false
    }

    /// The API is still inside the retry cooldown. The retry is sent
    /// again after one poll interval.
    fn on_retry_deferred(&mut self, _error: &PollError) {}

    fn on_retry_rejected(&mut self, _error: &PollError) {}
}

/// How a polling session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The job completed; the observer was sent to the story.
    Completed { story_id: StoryId },
    /// The job failed and was not (or could not be) retried.
    Failed(JobStatusView),
    NotFound,
    Forbidden,
    /// The token was rejected.
    Unauthorized,
    /// The session was torn down. The job itself is unaffected.
    Cancelled,
}

pub struct Poller<C> {
    client: C,
    config: PollerConfig,
}

impl<C: StatusClient> Poller<C> {
    pub fn new(client: C, config: PollerConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn interval(&self) -> Duration {
        self.config.interval.max(MIN_POLL_INTERVAL)
    }

    /// Poll `job_id` until it is terminal, an answer ends the session, or
    /// `cancel` fires.
    pub async fn run<O>(
        &self,
        job_id: JobId,
        observer: &mut O,
        cancel: &CancellationToken,
    ) -> PollOutcome
    where
        O: PollObserver + ?Sized,
    {
        let mut ticker = tokio::time::interval(self.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls: u32 = 0;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                result = self.client.get_status(job_id) => result,
            };
            polls += 1;

            let view = match result {
                Ok(view) => view,
                Err(e) => {
                    if let Some(outcome) = session_end(&e) {
                        tracing::warn!(job_id = %job_id, error = %e, "Polling stopped");
                        return outcome;
                    }
                    tracing::debug!(job_id = %job_id, polls, error = %e, "Status poll failed, will retry");
                    observer.on_poll_error(&e);
                    continue;
                }
            };

            observer.on_status(&view);

            match view.status {
                JobStatus::Completed => {
                    observer.on_completed(&view);
                    let Some(story_id) = view.story_id else {
                        // A completed view always carries its story; treat
                        // the odd one out as a bad answer and ask again.
                        observer.on_poll_error(&PollError::Decode(
                            "completed job without storyId".into(),
                        ));
                        continue;
                    };

                    tokio::select! {
                        _ = cancel.cancelled() => return PollOutcome::Cancelled,
                        _ = tokio::time::sleep(self.config.redirect_delay) => {}
                    }
                    tracing::info!(job_id = %job_id, story_id = %story_id, polls, "Job completed");
                    observer.navigate_to_story(story_id);
                    return PollOutcome::Completed { story_id };
                }
                JobStatus::Failed => {
                    tracing::info!(
                        job_id = %job_id,
                        polls,
                        can_retry = view.can_retry,
                        "Job failed",
                    );
                    observer.on_failed(&view);
                    return PollOutcome::Failed(view);
                }
                JobStatus::Queued | JobStatus::Processing => {}
            }
        }
    }

    /// [`run`](Self::run), then offer a retry whenever the job fails with
    /// `canRetry`. An accepted retry starts a fresh polling session. A retry
    /// refused because of the cooldown is sent again every interval; any
    /// other refusal is reported and ends the watch.
    pub async fn watch<O>(
        &self,
        job_id: JobId,
        observer: &mut O,
        cancel: &CancellationToken,
    ) -> PollOutcome
    where
        O: PollObserver + ?Sized,
    {
        loop {
            let view = match self.run(job_id, observer, cancel).await {
                PollOutcome::Failed(view) => view,
                other => return other,
            };

            if !view.can_retry || !observer.should_retry(&view) {
                return PollOutcome::Failed(view);
            }

            let requeued = loop {
                let result = tokio::select! {
                    _ = cancel.cancelled() => return PollOutcome::Cancelled,
                    result = self.client.retry(job_id) => result,
                };
                match result {
                    Ok(requeued) => break requeued,
                    Err(e) if e.is_rate_limited() => {
                        tracing::debug!(job_id = %job_id, error = %e, "Retry cooldown active, waiting");
                        observer.on_retry_deferred(&e);
                        tokio::select! {
                            _ = cancel.cancelled() => return PollOutcome::Cancelled,
                            _ = tokio::time::sleep(self.interval()) => {}
                        }
                    }
                    Err(e) => {
                        tracing::warn!(job_id = %job_id, error = %e, "Retry rejected");
                        observer.on_retry_rejected(&e);
                        return PollOutcome::Failed(view);
                    }
                }
            };

            tracing::info!(
                job_id = %job_id,
                attempts = requeued.attempts,
                max_attempts = requeued.max_attempts,
                "Retry accepted, polling again",
            );
            observer.on_status(&requeued);
        }
    }
}

fn session_end(error: &PollError) -> Option<PollOutcome> {
    if !error.ends_session() {
        return None;
    }
    match error.status() {
        Some(404) => Some(PollOutcome::NotFound),
        Some(403) => Some(PollOutcome::Forbidden),
        _ => Some(PollOutcome::Unauthorized),
    }
}
