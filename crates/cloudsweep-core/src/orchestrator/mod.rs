//! Runs several class runners and merges their summaries.

mod errors;
mod schedule;

pub use errors::OrchestratorError;
pub use schedule::{DEFAULT_ORDERING, Orchestrator};
