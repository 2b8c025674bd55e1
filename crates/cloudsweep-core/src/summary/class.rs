use std::collections::HashMap;

use serde::Serialize;

use cloudsweep_config::ResourceClass;

use crate::executor::{ExecutionReport, Outcome, OutcomeStatus};
use crate::filter::{Decision, DecisionReason};
use crate::provider::ProviderError;
use crate::resources::ResourceDescriptor;
use crate::safety::BlockedError;

/// One row of the per-resource report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceReport {
    pub id: String,
    pub class: ResourceClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub included: bool,
    pub reason: String,
    /// `None` when the resource never reached the executor.
    pub status: Option<OutcomeStatus>,
    pub attempted: bool,
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResourceReport {
    fn from_decision(resource: &ResourceDescriptor, decision: &Decision) -> Self {
        Self {
            id: resource.id.clone(),
            class: resource.class,
            parent_id: resource.parent.clone(),
            included: decision.included,
            reason: decision.reason.to_string(),
            status: None,
            attempted: false,
            deleted: false,
            error: None,
        }
    }

    fn apply(&mut self, outcome: Outcome) {
        self.status = Some(outcome.status);
        self.attempted = outcome.attempted;
        self.deleted = outcome.deleted;
        self.error = outcome.error;
    }
}

/// Result of cleaning up one resource class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassSummary {
    pub class: ResourceClass,
    pub dry_run: bool,
    /// Top-level resources discovered plus child entries listed.
    pub scanned: usize,
    pub eligible: usize,
    pub planned: usize,
    pub attempted: usize,
    pub deleted: usize,
    pub failed: usize,
    pub rejected: usize,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_error: Option<String>,
    pub cancelled: bool,
    pub batches: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceReport>,
}

impl ClassSummary {
    /// Failures that should make the process exit non-zero.
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.discovery_error.is_some()
    }
}

/// Accumulates one class's decisions and outcomes in discovery order.
#[derive(Debug)]
pub struct ClassSummaryBuilder {
    class: ResourceClass,
    dry_run: bool,
    scanned: usize,
    blocked: Option<BlockedError>,
    discovery_error: Option<String>,
    cancelled: bool,
    batches: usize,
    rows: Vec<ResourceReport>,
    index: HashMap<(Option<String>, String), usize>,
}

impl ClassSummaryBuilder {
    pub fn new(class: ResourceClass, dry_run: bool) -> Self {
        Self {
            class,
            dry_run,
            scanned: 0,
            blocked: None,
            discovery_error: None,
            cancelled: false,
            batches: 0,
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn scanned(&mut self, count: usize) -> &mut Self {
        self.scanned += count;
        self
    }

    pub fn decision(&mut self, resource: &ResourceDescriptor, decision: &Decision) -> &mut Self {
        let key = (resource.parent.clone(), resource.id.clone());
        self.index.insert(key, self.rows.len());
        self.rows.push(ResourceReport::from_decision(resource, decision));
        self
    }

    /// Child entry scheduled for deletion along with its parent.
    pub fn scheduled_child(&mut self, child: &ResourceDescriptor) -> &mut Self {
        let decision = Decision {
            resource_id: child.id.clone(),
            included: true,
            reason: DecisionReason::MeetsAllCriteria,
        };
        self.decision(child, &decision)
    }

    pub fn blocked(&mut self, error: BlockedError) -> &mut Self {
        self.blocked = Some(error);
        self
    }

    pub fn discovery_failed(&mut self, error: &ProviderError) -> &mut Self {
        self.discovery_error = Some(error.to_string());
        self
    }

    pub fn rejected(&mut self, outcome: Outcome) -> &mut Self {
        self.outcome(outcome);
        self
    }

    pub fn execution(&mut self, report: ExecutionReport) -> &mut Self {
        self.cancelled |= report.cancelled;
        self.batches += report.batches();
        for outcome in report.outcomes {
            self.outcome(outcome);
        }
        self
    }

    fn outcome(&mut self, outcome: Outcome) {
        let key = (outcome.parent_id.clone(), outcome.resource_id.clone());
        match self.index.get(&key) {
            Some(&row) => self.rows[row].apply(outcome),
            None => {
                let mut row = ResourceReport {
                    id: outcome.resource_id.clone(),
                    class: outcome.class,
                    parent_id: outcome.parent_id.clone(),
                    included: true,
                    reason: DecisionReason::MeetsAllCriteria.to_string(),
                    status: None,
                    attempted: false,
                    deleted: false,
                    error: None,
                };
                row.apply(outcome);
                self.index.insert(key, self.rows.len());
                self.rows.push(row);
            }
        }
    }

    pub fn finish(self) -> ClassSummary {
        let count = |status: OutcomeStatus| {
            self.rows
                .iter()
                .filter(|row| row.status == Some(status))
                .count()
        };
        let (blocked, blocked_reason) = match &self.blocked {
            Some(error) => (true, Some(error.reason.as_str().to_string())),
            None => (false, None),
        };
        // A class that could not be discovered has nothing eligible.
        let eligible = if self.discovery_error.is_some() {
            0
        } else {
            self.rows.iter().filter(|row| row.included).count()
        };

        ClassSummary {
            class: self.class,
            dry_run: self.dry_run,
            scanned: self.scanned,
            eligible,
            planned: count(OutcomeStatus::Planned),
            attempted: self.rows.iter().filter(|row| row.attempted).count(),
            deleted: self.rows.iter().filter(|row| row.deleted).count(),
            failed: self
                .rows
                .iter()
                .filter(|row| row.status.is_some_and(|s| s.is_failure()))
                .count(),
            rejected: count(OutcomeStatus::Rejected),
            blocked,
            blocked_reason,
            discovery_error: self.discovery_error,
            cancelled: self.cancelled,
            batches: self.batches,
            resources: self.rows,
        }
    }
}
