//! Job status and stage enums.
//!
//! Both map to SMALLINT columns in the `jobs` table. Each variant's
//! discriminant is its database ID; the string form is what the HTTP API
//! and the analysis service see.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up a variant by its database ID.
            pub fn from_id(id: StatusId) -> Result<Self, CoreError> {
                match id {
                    $( $val => Ok(Self::$variant), )+
                    other => Err(CoreError::Internal(format!(
                        "Unknown {} id {other}",
                        stringify!($name),
                    ))),
                }
            }

            /// Wire name of the variant.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $text, )+
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok(Self::$variant), )+
                    other => Err(CoreError::Validation(format!(
                        "Unknown {} '{other}'",
                        stringify!($name),
                    ))),
                }
            }
        }
    };
}

define_status_enum! {
    /// Lifecycle status of a job.
    JobStatus {
        Queued = 1 => "queued",
        Processing = 2 => "processing",
        Completed = 3 => "completed",
        Failed = 4 => "failed",
    }
}

define_status_enum! {
    /// Ordered phase of a job while it is queued or processing.
    JobStage {
        Uploading = 1 => "uploading",
        Analyzing = 2 => "analyzing",
        GeneratingNarrative = 3 => "generating_narrative",
        CreatingVisualizations = 4 => "creating_visualizations",
    }
}

impl JobStatus {
    /// `completed` and `failed` end polling; only an explicit retry leaves `failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl JobStage {
    /// Progress reached when an attempt enters this stage.
    pub fn checkpoint(self) -> u8 {
        match self {
            Self::Uploading => 10,
            Self::Analyzing => 40,
            Self::GeneratingNarrative => 70,
            Self::CreatingVisualizations => 90,
        }
    }

    /// Position in the stage order, starting at 0.
    pub fn ordinal(self) -> u8 {
        (self.id() - 1) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_ids_match_seed_data() {
        assert_eq!(JobStatus::Queued.id(), 1);
        assert_eq!(JobStatus::Processing.id(), 2);
        assert_eq!(JobStatus::Completed.id(), 3);
        assert_eq!(JobStatus::Failed.id(), 4);
    }

    #[test]
    fn status_round_trips_through_id() {
        for status in [
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::from_id(status.id()).unwrap(), status);
        }
        assert!(JobStatus::from_id(9).is_err());
    }

    #[test]
    fn stage_serializes_as_snake_case() {
        let json = serde_json::to_string(&JobStage::GeneratingNarrative).unwrap();
        assert_eq!(json, "\"generating_narrative\"");
        let stage: JobStage = "creating_visualizations".parse().unwrap();
        assert_eq!(stage, JobStage::CreatingVisualizations);
    }

    #[test]
    fn checkpoints_increase_with_stage_order() {
        let stages = [
            JobStage::Uploading,
            JobStage::Analyzing,
            JobStage::GeneratingNarrative,
            JobStage::CreatingVisualizations,
        ];
        for pair in stages.windows(2) {
            assert!(pair[0].ordinal() < pair[1].ordinal());
            assert!(pair[0].checkpoint() < pair[1].checkpoint());
        }
        assert!(JobStage::CreatingVisualizations.checkpoint() < 100);
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }
}
