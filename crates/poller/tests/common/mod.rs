#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use datastory_core::job::JobError;
use datastory_core::status::{JobStage, JobStatus};
use datastory_core::status_view::JobStatusView;
use datastory_core::types::{JobId, StoryId};
use datastory_poller::{PollError, PollObserver, StatusClient};
use tokio::time::Instant;

pub type Answer = Result<JobStatusView, PollError>;

// ---------------------------------------------------------------------------
// Scripted status client
// ---------------------------------------------------------------------------

/// Answers status and retry calls from scripts. Once the status script
/// runs out, further polls never answer.
pub struct ScriptedClient {
    statuses: Mutex<VecDeque<Answer>>,
    retries: Mutex<VecDeque<Answer>>,
    status_calls: Mutex<Vec<Duration>>,
    retry_calls: Mutex<Vec<Duration>>,
    started: Instant,
}

impl ScriptedClient {
    pub fn new(statuses: impl IntoIterator<Item = Answer>) -> Self {
        Self::with_retries(statuses, [])
    }

    pub fn with_retries(
        statuses: impl IntoIterator<Item = Answer>,
        retries: impl IntoIterator<Item = Answer>,
    ) -> Self {
        Self {
            statuses: Mutex::new(statuses.into_iter().collect()),
            retries: Mutex::new(retries.into_iter().collect()),
            status_calls: Mutex::new(Vec::new()),
            retry_calls: Mutex::new(Vec::new()),
            started: Instant::now(),
        }
    }

    /// Offsets from construction at which each status poll was made.
    pub fn status_calls(&self) -> Vec<Duration> {
        self.status_calls.lock().unwrap().clone()
    }

    pub fn retry_calls(&self) -> usize {
        self.retry_calls.lock().unwrap().len()
    }

    /// Offsets from construction at which each retry was sent.
    pub fn retry_offsets(&self) -> Vec<Duration> {
        self.retry_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusClient for ScriptedClient {
    async fn get_status(&self, _job_id: JobId) -> Result<JobStatusView, PollError> {
        self.status_calls
            .lock()
            .unwrap()
            .push(self.started.elapsed());
        let next = self.statuses.lock().unwrap().pop_front();
        match next {
            Some(answer) => answer,
            None => std::future::pending().await,
        }
    }

    async fn retry(&self, _job_id: JobId) -> Result<JobStatusView, PollError> {
        self.retry_calls
            .lock()
            .unwrap()
            .push(self.started.elapsed());
        self.retries
            .lock()
            .unwrap()
            .pop_front()
            .expect("retry called more often than scripted")
    }
}

// ---------------------------------------------------------------------------
// Recording observer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Status(JobStatus, u8),
    PollError,
    Completed,
    Navigate(StoryId),
    Failed,
    RetryOffered,
    RetryDeferred,
    RetryRejected(Option<u16>),
}

pub struct Recorder {
    pub events: Vec<Event>,
    pub accept_retry: bool,
    pub navigated_at: Option<Duration>,
    started: Instant,
}

impl Recorder {
    pub fn new(accept_retry: bool) -> Self {
        Self {
            events: Vec::new(),
            accept_retry,
            navigated_at: None,
            started: Instant::now(),
        }
    }

    pub fn count(&self, event: &Event) -> usize {
        self.events.iter().filter(|e| *e == event).count()
    }
}

impl PollObserver for Recorder {
    fn on_status(&mut self, view: &JobStatusView) {
        self.events.push(Event::Status(view.status, view.progress));
    }

    fn on_poll_error(&mut self, _error: &PollError) {
        self.events.push(Event::PollError);
    }

    fn on_completed(&mut self, _view: &JobStatusView) {
        self.events.push(Event::Completed);
    }

    fn navigate_to_story(&mut self, story_id: StoryId) {
        self.navigated_at = Some(self.started.elapsed());
        self.events.push(Event::Navigate(story_id));
    }

    fn on_failed(&mut self, _view: &JobStatusView) {
        self.events.push(Event::Failed);
    }

    fn should_retry(&mut self, _view: &JobStatusView) -> bool {
        self.events.push(Event::RetryOffered);
        self.accept_retry
    }

    fn on_retry_deferred(&mut self, _error: &PollError) {
        self.events.push(Event::RetryDeferred);
    }

    fn on_retry_rejected(&mut self, error: &PollError) {
        self.events.push(Event::RetryRejected(error.status()));
    }
}

// ---------------------------------------------------------------------------
// Status fixtures
// ---------------------------------------------------------------------------

pub fn job_id() -> JobId {
    uuid::Uuid::from_u128(0x0190_0000_0000_7000_8000_0000_0000_0001)
}

pub fn story_id() -> StoryId {
    uuid::Uuid::from_u128(0x0190_0000_0000_7000_8000_0000_0000_0002)
}

fn base(status: JobStatus, progress: u8) -> JobStatusView {
    let now = Utc::now();
    JobStatusView {
        job_id: job_id(),
        status,
        progress,
        current_stage: None,
        story_id: None,
        error: None,
        can_retry: false,
        attempts: 1,
        max_attempts: 3,
        created_at: now,
        updated_at: now,
    }
}

pub fn queued() -> JobStatusView {
    JobStatusView {
        current_stage: Some(JobStage::Uploading),
        ..base(JobStatus::Queued, 0)
    }
}

pub fn processing(stage: JobStage, progress: u8) -> JobStatusView {
    JobStatusView {
        current_stage: Some(stage),
        ..base(JobStatus::Processing, progress)
    }
}

pub fn completed() -> JobStatusView {
    JobStatusView {
        story_id: Some(story_id()),
        ..base(JobStatus::Completed, 100)
    }
}

pub fn failed(can_retry: bool) -> JobStatusView {
    JobStatusView {
        error: Some(JobError::new(
            "ANALYSIS_TIMEOUT",
            "Analysis timed out",
            true,
            Utc::now(),
        )),
        can_retry,
        ..base(JobStatus::Failed, 40)
    }
}

pub fn http_error(status: u16) -> PollError {
    PollError::Status {
        status,
        code: None,
        message: format!("HTTP {status}"),
    }
}
