//! PostgreSQL repositories.
//!
//! [`JobRepo`] and [`StoryRepo`] hold the SQL; [`PgStore`] wires them into
//! the [`JobStore`](crate::JobStore) and [`StoryStore`](crate::StoryStore)
//! traits and owns the transaction boundaries.

pub mod job_repo;
pub mod pg_store;
pub mod story_repo;

pub use job_repo::JobRepo;
pub use pg_store::PgStore;
pub use story_repo::StoryRepo;
