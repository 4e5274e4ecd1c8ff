//! Domain model for the DataStory job pipeline.
//!
//! Pure types and state-machine logic shared by the store, the
//! orchestrator, the HTTP API and the polling client. This crate performs
//! no I/O.

pub mod error;
pub mod error_codes;
pub mod job;
pub mod retry;
pub mod roles;
pub mod status;
pub mod status_view;
pub mod story;
pub mod types;
