//! Job orchestration.
//!
//! [`Orchestrator`] drives one attempt of a job through its stages against
//! the analysis service. [`JobDispatcher`] runs attempts as detached
//! background tasks, turns anything that escapes an attempt into a
//! recorded failure, and recovers jobs orphaned by a restart.

pub mod dispatcher;
pub mod orchestrator;

pub use dispatcher::{JobDispatcher, RecoveryReport};
pub use orchestrator::{AttemptOutcome, Orchestrator, OrchestratorConfig, DEFAULT_MAX_CHARTS};
