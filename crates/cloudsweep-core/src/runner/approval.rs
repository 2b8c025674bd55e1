use async_trait::async_trait;

use crate::executor::DeletionUnit;

/// Operator approval consulted once per deletion unit before execution.
///
/// A rejected unit (the resource and its scheduled children) is dropped
/// from the plan for the rest of the run. Units that would delete nothing
/// are never offered.
#[async_trait]
pub trait Approver: Send + Sync {
    async fn approve(&self, unit: &DeletionUnit) -> bool;
}

/// Declines everything. Used when approval is required but no operator is
/// attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectAll;

#[async_trait]
impl Approver for RejectAll {
    async fn approve(&self, _unit: &DeletionUnit) -> bool {
        false
    }
}
