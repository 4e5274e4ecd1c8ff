//! In-process [`JobStore`] / [`StoryStore`].
//!
//! All state sits behind one `RwLock`, so each update is applied and
//! observed as a unit. Used by tests and when no `DATABASE_URL` is set.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use datastory_core::job::{Job, NewJob};
use datastory_core::status::JobStatus;
use datastory_core::story::{NewStory, Story};
use datastory_core::types::{JobId, StoryId, UserId};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::job::JobListQuery;
use crate::models::page;
use crate::models::story::StoryListQuery;
use crate::store::{JobMutation, JobStore, StoryStore};

#[derive(Default)]
struct State {
    jobs: HashMap<JobId, Job>,
    stories: HashMap<StoryId, Story>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create(&self, input: NewJob) -> Result<Job, StoreError> {
        let job = Job::new(Uuid::now_v7(), input, Utc::now())?;
        self.state
            .write()
            .await
            .jobs
            .insert(job.job_id, job.clone());
        Ok(job)
    }

    async fn get(&self, job_id: JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.state.read().await.jobs.get(&job_id).cloned())
    }

    async fn update(&self, job_id: JobId, mutation: JobMutation) -> Result<Job, StoreError> {
        let mut state = self.state.write().await;
        let stored = state
            .jobs
            .get_mut(&job_id)
            .ok_or(StoreError::JobNotFound(job_id))?;

        let mut job = stored.clone();
        mutation(&mut job)?;
        job.check_invariants()?;
        job.version += 1;
        job.updated_at = Utc::now();

        *stored = job.clone();
        Ok(job)
    }

    async fn complete_with_story(
        &self,
        job_id: JobId,
        story: NewStory,
    ) -> Result<(Job, Story), StoreError> {
        let mut state = self.state.write().await;
        let mut job = state
            .jobs
            .get(&job_id)
            .cloned()
            .ok_or(StoreError::JobNotFound(job_id))?;

        if state.stories.values().any(|s| s.job_id == job_id) {
            return Err(datastory_core::error::CoreError::Conflict(format!(
                "Job {job_id} already has a story"
            ))
            .into());
        }

        let now = Utc::now();
        let story = Story::from_new(Uuid::now_v7(), story, now);
        job.complete(story.story_id, now)?;
        job.check_invariants()?;
        job.version += 1;
        job.updated_at = now;

        state.stories.insert(story.story_id, story.clone());
        state.jobs.insert(job_id, job.clone());
        Ok((job, story))
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        query: &JobListQuery,
    ) -> Result<Vec<Job>, StoreError> {
        let (limit, offset) = page(query.limit, query.offset);
        let state = self.state.read().await;

        let mut jobs: Vec<Job> = state
            .jobs
            .values()
            .filter(|j| j.user_id == user_id)
            .filter(|j| query.status.map_or(true, |s| j.status == s))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.job_id.cmp(&a.job_id)));

        Ok(jobs
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError> {
        let state = self.state.read().await;
        let mut jobs: Vec<Job> = state
            .jobs
            .values()
            .filter(|j| j.status == status)
            .cloned()
            .collect();
        jobs.sort_by_key(|j| (j.created_at, j.job_id));
        Ok(jobs)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl StoryStore for MemoryStore {
    async fn get_story(&self, story_id: StoryId) -> Result<Option<Story>, StoreError> {
        Ok(self.state.read().await.stories.get(&story_id).cloned())
    }

    async fn list_stories_for_user(
        &self,
        user_id: UserId,
        query: &StoryListQuery,
    ) -> Result<Vec<Story>, StoreError> {
        let (limit, offset) = page(query.limit, query.offset);
        let state = self.state.read().await;

        let mut stories: Vec<Story> = state
            .stories
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        stories.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.story_id.cmp(&a.story_id)));

        Ok(stories
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn delete_story(&self, story_id: StoryId) -> Result<bool, StoreError> {
        Ok(self.state.write().await.stories.remove(&story_id).is_some())
    }
}
