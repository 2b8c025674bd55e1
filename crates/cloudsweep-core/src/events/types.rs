use serde::Serialize;

use cloudsweep_config::ResourceClass;

use crate::executor::{Outcome, OutcomeStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub resource_id: String,
    pub class: ResourceClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub dry_run: bool,
}

impl ProgressEvent {
    pub fn from_outcome(outcome: &Outcome, dry_run: bool) -> Self {
        Self {
            resource_id: outcome.resource_id.clone(),
            class: outcome.class,
            parent_id: outcome.parent_id.clone(),
            status: outcome.status,
            error: outcome.error.clone(),
            dry_run,
        }
    }
}
