pub mod jobs;
pub mod stories;
