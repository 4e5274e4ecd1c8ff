//! Machine-readable failure codes recorded in `Job.error.code`.
//!
//! The analysis service may also supply its own codes for input
//! rejections (e.g. `PREPROCESSING_ERROR`); those are stored verbatim.

/// The attempt budget was already spent when a new attempt began.
pub const MAX_ATTEMPTS_EXCEEDED: &str = "MAX_ATTEMPTS_EXCEEDED";

/// The analysis service did not answer within the configured timeout.
pub const ANALYSIS_TIMEOUT: &str = "ANALYSIS_TIMEOUT";

/// The analysis service could not be reached.
pub const ANALYSIS_UNAVAILABLE: &str = "ANALYSIS_UNAVAILABLE";

/// Any other transport-level failure talking to the analysis service.
pub const ANALYSIS_TRANSPORT_ERROR: &str = "ANALYSIS_TRANSPORT_ERROR";

/// The analysis service answered with a 5xx status.
pub const ANALYSIS_SERVER_ERROR: &str = "ANALYSIS_SERVER_ERROR";

/// The analysis service rejected the dataset (4xx) without its own code.
pub const DATASET_REJECTED: &str = "DATASET_REJECTED";

/// A 2xx response whose body could not be decoded.
pub const INVALID_ANALYSIS_RESPONSE: &str = "INVALID_ANALYSIS_RESPONSE";

/// The returned narrative is missing one of its sections.
pub const NARRATIVE_INCOMPLETE: &str = "NARRATIVE_INCOMPLETE";

/// The process stopped while the job was mid-attempt.
pub const ORCHESTRATOR_INTERRUPTED: &str = "ORCHESTRATOR_INTERRUPTED";

/// Unexpected failure inside the orchestrator itself.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
