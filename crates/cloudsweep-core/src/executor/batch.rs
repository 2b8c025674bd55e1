use std::collections::HashMap;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::outcome::{DeletionUnit, ExecutionReport, Outcome, OutcomeStatus, ParentAction};
use super::retry::{RetryPolicy, with_retry};
use crate::events::{EventBus, ProgressEvent};
use crate::provider::{ProviderError, ProviderErrorKind, ResourceProvider};
use crate::resources::ResourceDescriptor;
use crate::safety::RunMode;

/// Slot in the report plus the resource waiting to be submitted.
type Pending = (usize, ResourceDescriptor);

/// Executes one class's deletion plan against its provider.
pub struct Executor<'a> {
    provider: &'a dyn ResourceProvider,
    mode: RunMode,
    batch_size: usize,
    retry: RetryPolicy,
    events: &'a EventBus,
    cancel: &'a CancellationToken,
}

impl<'a> Executor<'a> {
    /// `batch_size` is clamped to the provider's bulk limit and to at least 1.
    pub fn new(
        provider: &'a dyn ResourceProvider,
        mode: RunMode,
        batch_size: usize,
        retry: RetryPolicy,
        events: &'a EventBus,
        cancel: &'a CancellationToken,
    ) -> Self {
        let batch_size = match provider.bulk_limit() {
            Some(limit) => batch_size.min(limit),
            None => batch_size,
        }
        .max(1);
        Self {
            provider,
            mode,
            batch_size,
            retry,
            events,
            cancel,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Execute `plan` in order.
    ///
    /// Children are submitted before their parent. A parent whose children
    /// are still in the current batch forces that batch out first, and is
    /// only submitted once every child is gone. Cancellation is checked
    /// before each batch; a batch already submitted runs to completion.
    pub async fn execute(&self, plan: Vec<DeletionUnit>) -> ExecutionReport {
        let total: usize = plan.iter().map(DeletionUnit::outcome_count).sum();
        let mut slots: Vec<Option<Outcome>> = vec![None; total];
        let mut report = ExecutionReport::default();
        let mut pending: Vec<Pending> = Vec::with_capacity(self.batch_size);
        let mut next_slot = 0;

        info!(
            event = "core.executor.execute_started",
            class = %self.provider.class(),
            mode = %self.mode.mode,
            units = plan.len(),
            items = total,
            batch_size = self.batch_size
        );

        for unit in plan {
            let first_child = next_slot;
            for child in unit.children {
                pending.push((next_slot, child));
                next_slot += 1;
                if pending.len() >= self.batch_size {
                    self.flush(&mut pending, &mut slots, &mut report).await;
                }
            }
            let child_slots = first_child..next_slot;
            let parent_slot = next_slot;
            next_slot += 1;

            match unit.parent_action {
                ParentAction::Keep => {
                    self.record(&mut slots, parent_slot, Outcome::kept(&unit.resource));
                }
                ParentAction::Blocked { reason } => {
                    self.record(
                        &mut slots,
                        parent_slot,
                        Outcome::dependency_unsatisfied(&unit.resource, reason),
                    );
                }
                ParentAction::Delete => {
                    if pending.iter().any(|(slot, _)| child_slots.contains(slot)) {
                        self.flush(&mut pending, &mut slots, &mut report).await;
                    }
                    let children = &slots[child_slots];
                    let cancelled = children
                        .iter()
                        .flatten()
                        .any(|o| o.status == OutcomeStatus::Cancelled);
                    let unresolved = children
                        .iter()
                        .filter(|o| !o.as_ref().is_some_and(child_cleared))
                        .count();
                    if cancelled {
                        self.record(&mut slots, parent_slot, Outcome::cancelled(&unit.resource));
                    } else if unresolved > 0 {
                        let reason = format!(
                            "{} of {} child entries were not deleted",
                            unresolved,
                            children.len()
                        );
                        self.record(
                            &mut slots,
                            parent_slot,
                            Outcome::dependency_unsatisfied(&unit.resource, reason),
                        );
                    } else {
                        pending.push((parent_slot, unit.resource));
                        if pending.len() >= self.batch_size {
                            self.flush(&mut pending, &mut slots, &mut report).await;
                        }
                    }
                }
            }
        }
        self.flush(&mut pending, &mut slots, &mut report).await;

        report.outcomes = slots.into_iter().flatten().collect();
        info!(
            event = "core.executor.execute_completed",
            class = %self.provider.class(),
            batches = report.batches(),
            deleted = report.deleted_count(),
            cancelled = report.cancelled
        );
        report
    }

    fn record(&self, slots: &mut [Option<Outcome>], slot: usize, outcome: Outcome) {
        self.events
            .emit(&ProgressEvent::from_outcome(&outcome, self.mode.is_dry_run()));
        slots[slot] = Some(outcome);
    }

    async fn flush(
        &self,
        pending: &mut Vec<Pending>,
        slots: &mut [Option<Outcome>],
        report: &mut ExecutionReport,
    ) {
        if pending.is_empty() {
            return;
        }
        let batch = std::mem::take(pending);

        if self.cancel.is_cancelled() {
            if !report.cancelled {
                warn!(
                    event = "core.executor.cancelled",
                    class = %self.provider.class(),
                    batches_completed = report.batches()
                );
            }
            report.cancelled = true;
            for (slot, resource) in batch {
                self.record(slots, slot, Outcome::cancelled(&resource));
            }
            return;
        }

        report.batch_sizes.push(batch.len());
        debug!(
            event = "core.executor.batch_started",
            class = %self.provider.class(),
            batch = report.batches(),
            size = batch.len()
        );

        if self.mode.is_dry_run() {
            for (slot, resource) in batch {
                self.record(slots, slot, Outcome::planned(&resource));
            }
        } else if self.provider.bulk_limit().is_some() {
            self.delete_bulk(batch, slots).await;
        } else {
            for (slot, resource) in batch {
                let (result, attempts) = with_retry(&self.retry, "delete_one", || {
                    self.provider.delete_one(&resource)
                })
                .await;
                let outcome = match result {
                    Ok(()) => Outcome::deleted(&resource, attempts),
                    Err(e) => {
                        log_delete_failure(&resource, &e);
                        Outcome::failed(&resource, &e, attempts)
                    }
                };
                self.record(slots, slot, outcome);
            }
        }
    }

    /// One bulk call per attempt; only retryable items are resubmitted.
    async fn delete_bulk(&self, batch: Vec<Pending>, slots: &mut [Option<Outcome>]) {
        let mut remaining = batch;
        let mut attempt = 0;
        while !remaining.is_empty() {
            attempt += 1;
            let items: Vec<ResourceDescriptor> =
                remaining.iter().map(|(_, resource)| resource.clone()).collect();

            let mut results: HashMap<String, Result<(), ProviderError>> =
                match self.provider.delete_bulk(&items).await {
                    Ok(results) => results.into_iter().map(|r| (r.id, r.result)).collect(),
                    Err(e) if self.retry.should_retry(attempt, &e) => {
                        tokio::time::sleep(self.retry.delay_after(attempt)).await;
                        continue;
                    }
                    Err(e) => {
                        warn!(
                            event = "core.executor.bulk_call_failed",
                            class = %self.provider.class(),
                            size = remaining.len(),
                            error = %e
                        );
                        for (slot, resource) in remaining {
                            self.record(slots, slot, Outcome::failed(&resource, &e, attempt));
                        }
                        return;
                    }
                };

            let mut retry = Vec::new();
            for (slot, resource) in remaining {
                let result = results.remove(&resource.id).unwrap_or_else(|| {
                    Err(ProviderError::new(
                        ProviderErrorKind::Other,
                        "missing from bulk delete response",
                    ))
                });
                match result {
                    Ok(()) => self.record(slots, slot, Outcome::deleted(&resource, attempt)),
                    Err(e) if self.retry.should_retry(attempt, &e) => retry.push((slot, resource)),
                    Err(e) => {
                        log_delete_failure(&resource, &e);
                        self.record(slots, slot, Outcome::failed(&resource, &e, attempt));
                    }
                }
            }
            if !retry.is_empty() {
                tokio::time::sleep(self.retry.delay_after(attempt)).await;
            }
            remaining = retry;
        }
    }
}

/// Deleted for real, or would have been in a dry run.
fn child_cleared(outcome: &Outcome) -> bool {
    outcome.deleted || outcome.status == OutcomeStatus::Planned
}

fn log_delete_failure(resource: &ResourceDescriptor, error: &ProviderError) {
    warn!(
        event = "core.executor.delete_failed",
        class = %resource.class,
        resource_id = %resource.id,
        error_kind = error.kind.as_str(),
        error = %error
    );
}
