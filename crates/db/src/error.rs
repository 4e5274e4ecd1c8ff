use datastory_core::error::CoreError;
use datastory_core::types::{JobId, StoryId};

/// Errors returned by [`JobStore`](crate::JobStore) and
/// [`StoryStore`](crate::StoryStore) implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Job {0} not found")]
    JobNotFound(JobId),

    #[error("Story {0} not found")]
    StoryNotFound(StoryId),

    /// The mutation was rejected by the job state machine or would have
    /// broken a record invariant. Nothing was written.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
