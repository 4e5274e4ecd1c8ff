//! Storage traits.

use async_trait::async_trait;
use datastory_core::error::CoreError;
use datastory_core::job::{Job, NewJob};
use datastory_core::status::JobStatus;
use datastory_core::story::{NewStory, Story};
use datastory_core::types::{JobId, StoryId, UserId};

use crate::error::StoreError;
use crate::models::job::JobListQuery;
use crate::models::story::StoryListQuery;

/// A state-machine transition applied to a job inside one atomic update.
pub type JobMutation = Box<dyn FnOnce(&mut Job) -> Result<(), CoreError> + Send>;

/// Persistence for job records.
///
/// There is deliberately no delete: retention is handled outside this
/// service.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new queued job and return it.
    async fn create(&self, input: NewJob) -> Result<Job, StoreError>;

    async fn get(&self, job_id: JobId) -> Result<Option<Job>, StoreError>;

    /// Apply `mutation` atomically.
    ///
    /// The record is locked for the duration of the call, so concurrent
    /// readers see either the previous or the new version, never a mix.
    /// When the mutation fails or the result breaks a job invariant,
    /// nothing is written. On success `version` and `updated_at` are
    /// bumped.
    async fn update(&self, job_id: JobId, mutation: JobMutation) -> Result<Job, StoreError>;

    /// Persist `story` and complete the job with its id in one atomic
    /// unit.
    async fn complete_with_story(
        &self,
        job_id: JobId,
        story: NewStory,
    ) -> Result<(Job, Story), StoreError>;

    /// A user's jobs, newest first.
    async fn list_for_user(
        &self,
        user_id: UserId,
        query: &JobListQuery,
    ) -> Result<Vec<Job>, StoreError>;

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Persistence for stories produced by completed jobs.
#[async_trait]
pub trait StoryStore: Send + Sync {
    async fn get_story(&self, story_id: StoryId) -> Result<Option<Story>, StoreError>;

    /// A user's stories, newest first.
    async fn list_stories_for_user(
        &self,
        user_id: UserId,
        query: &StoryListQuery,
    ) -> Result<Vec<Story>, StoreError>;

    /// Returns `false` when the story did not exist.
    async fn delete_story(&self, story_id: StoryId) -> Result<bool, StoreError>;
}

/// Everything the service needs from storage, usable as `Arc<dyn Store>`.
pub trait Store: JobStore + StoryStore {}

impl<T: JobStore + StoryStore> Store for T {}
