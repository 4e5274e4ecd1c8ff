#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use datastory_analysis::{AnalysisError, AnalysisService, AnalyzeRequest, AnalyzeResponse};
use datastory_core::job::{DatasetMetadata, Job, JobOptions, NewJob};
use datastory_core::status::JobStatus;
use datastory_core::story::{Chart, ChartType, NewStory, Narrative, Story};
use datastory_core::types::{JobId, StoryId, UserId};
use datastory_db::models::job::JobListQuery;
use datastory_db::models::story::StoryListQuery;
use datastory_db::{JobMutation, JobStore, MemoryStore, StoreError, StoryStore};
use datastory_pipeline::{JobDispatcher, Orchestrator, OrchestratorConfig};
use tokio::sync::Notify;

// ---------------------------------------------------------------------------
// Analysis fakes
// ---------------------------------------------------------------------------

pub type Scripted = Result<AnalyzeResponse, AnalysisError>;

/// Returns queued results in order; panics when the script runs out so a
/// test that calls the service too often fails loudly.
#[derive(Default)]
pub struct ScriptedAnalysis {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<AnalyzeRequest>>,
}

impl ScriptedAnalysis {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<AnalyzeRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisService for ScriptedAnalysis {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, AnalysisError> {
        self.calls.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("analysis called more often than scripted")
    }

    async fn health(&self) -> Result<(), AnalysisError> {
        Ok(())
    }
}

/// Holds every call until [`release`](Self::release) is called.
#[derive(Default)]
pub struct GatedAnalysis {
    pub entered: Notify,
    gate: Notify,
}

impl GatedAnalysis {
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl AnalysisService for GatedAnalysis {
    async fn analyze(&self, _request: &AnalyzeRequest) -> Result<AnalyzeResponse, AnalysisError> {
        self.entered.notify_one();
        self.gate.notified().await;
        Ok(success())
    }

    async fn health(&self) -> Result<(), AnalysisError> {
        Ok(())
    }
}

pub struct PanickingAnalysis;

#[async_trait]
impl AnalysisService for PanickingAnalysis {
    async fn analyze(&self, _request: &AnalyzeRequest) -> Result<AnalyzeResponse, AnalysisError> {
        panic!("chart renderer exploded");
    }

    async fn health(&self) -> Result<(), AnalysisError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Recording store
// ---------------------------------------------------------------------------

/// Delegates to [`MemoryStore`] and keeps a snapshot of every committed
/// job write. Can be told to fail one `update` or the completing write.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    writes: Mutex<Vec<Job>>,
    faults: Mutex<Faults>,
}

#[derive(Default)]
struct Faults {
    updates: usize,
    fail_update: Option<usize>,
    fail_complete: bool,
}

/// The error injected writes fail with.
pub fn store_unavailable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

impl RecordingStore {
    pub fn writes(&self, job_id: JobId) -> Vec<Job> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.job_id == job_id)
            .cloned()
            .collect()
    }

    /// Fail the `n`-th `update` call (1-based, counted from store
    /// creation) without applying it.
    pub fn fail_update(&self, n: usize) {
        self.faults.lock().unwrap().fail_update = Some(n);
    }

    /// Fail every `complete_with_story` call without writing anything.
    pub fn fail_complete(&self) {
        self.faults.lock().unwrap().fail_complete = true;
    }

    fn record(&self, job: &Job) {
        self.writes.lock().unwrap().push(job.clone());
    }
}

#[async_trait]
impl JobStore for RecordingStore {
    async fn create(&self, input: NewJob) -> Result<Job, StoreError> {
        let job = self.inner.create(input).await?;
        self.record(&job);
        Ok(job)
    }

    async fn get(&self, job_id: JobId) -> Result<Option<Job>, StoreError> {
        self.inner.get(job_id).await
    }

    async fn update(&self, job_id: JobId, mutation: JobMutation) -> Result<Job, StoreError> {
        let injected = {
            let mut faults = self.faults.lock().unwrap();
            faults.updates += 1;
            faults.fail_update == Some(faults.updates)
        };
        if injected {
            return Err(store_unavailable());
        }
        let job = self.inner.update(job_id, mutation).await?;
        self.record(&job);
        Ok(job)
    }

    async fn complete_with_story(
        &self,
        job_id: JobId,
        story: NewStory,
    ) -> Result<(Job, Story), StoreError> {
        if self.faults.lock().unwrap().fail_complete {
            return Err(store_unavailable());
        }
        let (job, story) = self.inner.complete_with_story(job_id, story).await?;
        self.record(&job);
        Ok((job, story))
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        query: &JobListQuery,
    ) -> Result<Vec<Job>, StoreError> {
        self.inner.list_for_user(user_id, query).await
    }

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError> {
        self.inner.list_by_status(status).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl StoryStore for RecordingStore {
    async fn get_story(&self, story_id: StoryId) -> Result<Option<Story>, StoreError> {
        self.inner.get_story(story_id).await
    }

    async fn list_stories_for_user(
        &self,
        user_id: UserId,
        query: &StoryListQuery,
    ) -> Result<Vec<Story>, StoreError> {
        self.inner.list_stories_for_user(user_id, query).await
    }

    async fn delete_story(&self, story_id: StoryId) -> Result<bool, StoreError> {
        self.inner.delete_story(story_id).await
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: Arc<RecordingStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub dispatcher: JobDispatcher,
}

pub fn harness(analysis: Arc<dyn AnalysisService>) -> Harness {
    let store = Arc::new(RecordingStore::default());
    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        analysis,
        OrchestratorConfig::default(),
    ));
    let dispatcher = JobDispatcher::new(Arc::clone(&orchestrator));
    Harness {
        store,
        orchestrator,
        dispatcher,
    }
}

pub fn new_job(max_attempts: u32) -> NewJob {
    NewJob {
        user_id: 11,
        file_url: "s3://datasets/churn_2026.csv".into(),
        options: JobOptions::default(),
        metadata: DatasetMetadata {
            original_filename: "churn_2026.csv".into(),
            storage_key: "uploads/11/churn_2026.csv".into(),
            size_bytes: 10_240,
            row_count: Some(500),
            column_count: Some(8),
        },
        max_attempts,
    }
}

pub fn chart(title: &str, score: f64) -> Chart {
    Chart {
        chart_type: ChartType::Bar,
        title: title.into(),
        data: serde_json::json!({ "labels": ["a", "b"], "values": [1, 2] }),
        config: serde_json::json!({}),
        insight: format!("{title} insight"),
        score: Some(score),
    }
}

pub fn success() -> AnalyzeResponse {
    AnalyzeResponse {
        narratives: Narrative {
            summary: "Churn fell by 3 points.".into(),
            key_findings: "Annual plans churn least.".into(),
            recommendations: "Promote annual plans.".into(),
        },
        charts: vec![chart("By plan", 0.9), chart("By month", 0.6)],
        statistics: serde_json::json!({ "rowCount": 500 }),
    }
}

/// A 503 from the service: transient.
pub fn transient() -> AnalysisError {
    AnalysisError::Server {
        status: 503,
        message: "Service unavailable".into(),
    }
}

/// A 400 preprocessing rejection: permanent.
pub fn rejection() -> AnalysisError {
    AnalysisError::Rejected {
        status: 400,
        code: Some("PREPROCESSING_ERROR".into()),
        message: "No numeric columns found".into(),
    }
}

/// Reset a failed job to `queued` the way a user retry does, without the
/// cooldown.
pub async fn reset(store: &RecordingStore, job_id: JobId) {
    store
        .update(
            job_id,
            Box::new(|job| job.reset_for_retry()),
        )
        .await
        .unwrap();
}
