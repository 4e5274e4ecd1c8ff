//! Client-side status polling for DataStory jobs.
//!
//! [`Poller`] drives a timer loop against a [`StatusClient`] until the job
//! reaches a terminal status, reporting every observation to a
//! [`PollObserver`]. A failed poll is a local connectivity problem and
//! never a job failure; only the status endpoint decides that.

pub mod client;
pub mod error;
pub mod poller;

pub use client::{HttpStatusClient, StatusClient};
pub use error::PollError;
pub use poller::{PollObserver, PollOutcome, Poller, PollerConfig, MIN_POLL_INTERVAL};
