use serde::Serialize;

use cloudsweep_config::ResourceClass;

use crate::provider::{ProviderError, ProviderErrorKind};
use crate::resources::ResourceDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Dry run: would have been deleted.
    Planned,
    Deleted,
    Failed,
    /// Parent skipped because a child could not be removed.
    DependencyUnsatisfied,
    /// Parent left in place on purpose after its children were emptied.
    Kept,
    /// Never submitted because the run was cancelled.
    Cancelled,
    /// Declined by the operator during interactive approval.
    Rejected,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Planned => "planned",
            OutcomeStatus::Deleted => "deleted",
            OutcomeStatus::Failed => "failed",
            OutcomeStatus::DependencyUnsatisfied => "dependency_unsatisfied",
            OutcomeStatus::Kept => "kept",
            OutcomeStatus::Cancelled => "cancelled",
            OutcomeStatus::Rejected => "rejected",
        }
    }

    /// Statuses that count against a clean run.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            OutcomeStatus::Failed | OutcomeStatus::DependencyUnsatisfied
        )
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What happened to one resource during execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub resource_id: String,
    pub class: ResourceClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub status: OutcomeStatus,
    pub attempted: bool,
    pub deleted: bool,
    /// Delete calls issued for this resource, retries included.
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ProviderErrorKind>,
}

impl Outcome {
    fn base(resource: &ResourceDescriptor, status: OutcomeStatus) -> Self {
        Self {
            resource_id: resource.id.clone(),
            class: resource.class,
            parent_id: resource.parent.clone(),
            status,
            attempted: false,
            deleted: false,
            attempts: 0,
            error: None,
            error_kind: None,
        }
    }

    pub fn planned(resource: &ResourceDescriptor) -> Self {
        Self::base(resource, OutcomeStatus::Planned)
    }

    pub fn deleted(resource: &ResourceDescriptor, attempts: u32) -> Self {
        Self {
            attempted: true,
            deleted: true,
            attempts,
            ..Self::base(resource, OutcomeStatus::Deleted)
        }
    }

    pub fn failed(resource: &ResourceDescriptor, error: &ProviderError, attempts: u32) -> Self {
        Self {
            attempted: true,
            attempts,
            error: Some(error.to_string()),
            error_kind: Some(error.kind),
            ..Self::base(resource, OutcomeStatus::Failed)
        }
    }

    pub fn dependency_unsatisfied(resource: &ResourceDescriptor, reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::base(resource, OutcomeStatus::DependencyUnsatisfied)
        }
    }

    pub fn kept(resource: &ResourceDescriptor) -> Self {
        Self::base(resource, OutcomeStatus::Kept)
    }

    pub fn cancelled(resource: &ResourceDescriptor) -> Self {
        Self::base(resource, OutcomeStatus::Cancelled)
    }

    pub fn rejected(resource: &ResourceDescriptor) -> Self {
        Self::base(resource, OutcomeStatus::Rejected)
    }
}

/// What to do with a parent once its children have been processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentAction {
    /// Delete the parent once every scheduled child is gone.
    Delete,
    /// Empty the parent but leave it in place.
    Keep,
    /// The parent cannot be removed (retained children, listing failed).
    Blocked { reason: String },
}

/// A resource plus the children that must go before it.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletionUnit {
    pub resource: ResourceDescriptor,
    pub children: Vec<ResourceDescriptor>,
    pub parent_action: ParentAction,
}

impl DeletionUnit {
    /// A standalone resource with no children.
    pub fn single(resource: ResourceDescriptor) -> Self {
        Self {
            resource,
            children: Vec::new(),
            parent_action: ParentAction::Delete,
        }
    }

    pub fn with_children(
        resource: ResourceDescriptor,
        children: Vec<ResourceDescriptor>,
        parent_action: ParentAction,
    ) -> Self {
        Self {
            resource,
            children,
            parent_action,
        }
    }

    /// Whether the parent itself goes, not only its scheduled children.
    pub fn removes_parent(&self) -> bool {
        self.parent_action == ParentAction::Delete
    }

    /// Number of outcomes this unit produces.
    pub fn outcome_count(&self) -> usize {
        self.children.len() + 1
    }
}

/// Everything the executor produced for one class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Children first, then their parent, in plan order.
    pub outcomes: Vec<Outcome>,
    /// Size of each batch that was flushed, in order.
    pub batch_sizes: Vec<usize>,
    pub cancelled: bool,
}

impl ExecutionReport {
    pub fn batches(&self) -> usize {
        self.batch_sizes.len()
    }

    pub fn deleted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.deleted).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_outcome_records_error_kind() {
        let resource = ResourceDescriptor::new(ResourceClass::EbsVolume, "vol-1");
        let outcome = Outcome::failed(&resource, &ProviderError::not_found("gone"), 1);
        assert!(outcome.attempted);
        assert!(!outcome.deleted);
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.error_kind, Some(ProviderErrorKind::NotFound));
        assert_eq!(outcome.error.as_deref(), Some("not_found: gone"));
    }

    #[test]
    fn test_planned_outcome_is_not_attempted() {
        let resource = ResourceDescriptor::new(ResourceClass::S3Bucket, "v1").with_parent("tmp");
        let outcome = Outcome::planned(&resource);
        assert!(!outcome.attempted);
        assert!(!outcome.deleted);
        assert_eq!(outcome.parent_id.as_deref(), Some("tmp"));
    }

    #[test]
    fn test_failure_statuses() {
        assert!(OutcomeStatus::Failed.is_failure());
        assert!(OutcomeStatus::DependencyUnsatisfied.is_failure());
        assert!(!OutcomeStatus::Rejected.is_failure());
        assert!(!OutcomeStatus::Cancelled.is_failure());
        assert_eq!(OutcomeStatus::DependencyUnsatisfied.to_string(), "dependency_unsatisfied");
    }

    #[test]
    fn test_unit_outcome_count_includes_parent() {
        let parent = ResourceDescriptor::new(ResourceClass::LogGroup, "/aws/lambda/tmp");
        let unit = DeletionUnit::with_children(
            parent,
            vec![
                ResourceDescriptor::new(ResourceClass::LogGroup, "s1"),
                ResourceDescriptor::new(ResourceClass::LogGroup, "s2"),
            ],
            ParentAction::Delete,
        );
        assert_eq!(unit.outcome_count(), 3);
    }

    #[test]
    fn test_emptied_parent_is_not_removed() {
        let bucket = ResourceDescriptor::new(ResourceClass::S3Bucket, "tmp");
        let version = ResourceDescriptor::new(ResourceClass::S3Bucket, "v1").with_parent("tmp");
        assert!(DeletionUnit::single(bucket.clone()).removes_parent());
        let emptied = DeletionUnit::with_children(bucket, vec![version], ParentAction::Keep);
        assert!(!emptied.removes_parent());
    }
}
