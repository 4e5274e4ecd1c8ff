/// User identifiers come from the auth layer as BIGSERIAL keys.
pub type DbId = i64;

/// Owning principal of a job or story.
pub type UserId = DbId;

/// Opaque external handle of a job.
pub type JobId = uuid::Uuid;

/// Identifier of a persisted story.
pub type StoryId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
