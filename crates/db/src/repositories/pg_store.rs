//! PostgreSQL-backed [`JobStore`] / [`StoryStore`].

use async_trait::async_trait;
use chrono::Utc;
use datastory_core::job::{Job, NewJob};
use datastory_core::status::JobStatus;
use datastory_core::story::{NewStory, Story};
use datastory_core::types::{JobId, StoryId, UserId};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::job::JobListQuery;
use crate::models::story::StoryListQuery;
use crate::repositories::{JobRepo, StoryRepo};
use crate::store::{JobMutation, JobStore, StoryStore};
use crate::DbPool;

/// Store backed by a sqlx connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn create(&self, input: NewJob) -> Result<Job, StoreError> {
        let job = Job::new(Uuid::now_v7(), input, Utc::now())?;
        JobRepo::insert(&self.pool, &job).await
    }

    async fn get(&self, job_id: JobId) -> Result<Option<Job>, StoreError> {
        JobRepo::find_by_id(&self.pool, job_id).await
    }

    async fn update(&self, job_id: JobId, mutation: JobMutation) -> Result<Job, StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut job = JobRepo::find_for_update(&mut *tx, job_id)
            .await?
            .ok_or(StoreError::JobNotFound(job_id))?;

        // Dropping `tx` on any error below rolls the transaction back.
        mutation(&mut job)?;
        job.check_invariants()?;
        job.version += 1;
        job.updated_at = Utc::now();

        let saved = JobRepo::save(&mut *tx, &job).await?;
        tx.commit().await?;
        Ok(saved)
    }

    async fn complete_with_story(
        &self,
        job_id: JobId,
        story: NewStory,
    ) -> Result<(Job, Story), StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut job = JobRepo::find_for_update(&mut *tx, job_id)
            .await?
            .ok_or(StoreError::JobNotFound(job_id))?;

        let now = Utc::now();
        let story = Story::from_new(Uuid::now_v7(), story, now);
        job.complete(story.story_id, now)?;
        job.check_invariants()?;
        job.version += 1;
        job.updated_at = now;

        let story = StoryRepo::insert(&mut *tx, &story).await?;
        let saved = JobRepo::save(&mut *tx, &job).await?;
        tx.commit().await?;
        Ok((saved, story))
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        query: &JobListQuery,
    ) -> Result<Vec<Job>, StoreError> {
        JobRepo::list_by_user(&self.pool, user_id, query).await
    }

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError> {
        JobRepo::list_by_status(&self.pool, status).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl StoryStore for PgStore {
    async fn get_story(&self, story_id: StoryId) -> Result<Option<Story>, StoreError> {
        StoryRepo::find_by_id(&self.pool, story_id).await
    }

    async fn list_stories_for_user(
        &self,
        user_id: UserId,
        query: &StoryListQuery,
    ) -> Result<Vec<Story>, StoreError> {
        StoryRepo::list_by_user(&self.pool, user_id, query).await
    }

    async fn delete_story(&self, story_id: StoryId) -> Result<bool, StoreError> {
        StoryRepo::delete(&self.pool, story_id).await
    }
}
