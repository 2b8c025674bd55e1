use cloudsweep_config::ResourceClass;

use crate::errors::SweepError;
use crate::safety::BlockedError;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Blocked(#[from] BlockedError),

    #[error("Ordering constraints form a cycle between: {classes}")]
    OrderingCycle { classes: String },

    #[error("Resource class '{class}' was registered twice")]
    DuplicateClass { class: ResourceClass },

    #[error("No resource classes selected")]
    NothingToRun,
}

impl SweepError for OrchestratorError {
    fn error_code(&self) -> &'static str {
        match self {
            OrchestratorError::Blocked(e) => e.error_code(),
            OrchestratorError::OrderingCycle { .. } => "ORDERING_CYCLE",
            OrchestratorError::DuplicateClass { .. } => "DUPLICATE_CLASS",
            OrchestratorError::NothingToRun => "NOTHING_TO_RUN",
        }
    }

    fn is_user_error(&self) -> bool {
        !matches!(self, OrchestratorError::DuplicateClass { .. })
    }
}
