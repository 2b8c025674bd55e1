use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use cloudsweep_config::{ResourceClass, RuleSet};

use super::approval::Approver;
use crate::events::{EventBus, ProgressEvent};
use crate::executor::{DeletionUnit, Executor, Outcome, ParentAction, RetryPolicy, with_retry};
use crate::filter::{ReleasedOwners, decide, decide_dependent, select_children};
use crate::provider::{ProviderError, ResourceProvider};
use crate::resources::ResourceDescriptor;
use crate::safety::{RunMode, authorize};
use crate::summary::{ClassSummary, ClassSummaryBuilder};

/// Runs the cleanup pipeline for one resource class.
///
/// Never fails: discovery errors, blocks and per-item failures all end up
/// in the returned [`ClassSummary`].
pub struct CleanupRunner {
    provider: Arc<dyn ResourceProvider>,
    rules: Arc<RuleSet>,
    mode: RunMode,
    retry: RetryPolicy,
    events: EventBus,
    approver: Option<Arc<dyn Approver>>,
    cancel: CancellationToken,
    /// Only consider dependents of owners released earlier in the run.
    dependents_only: bool,
}

impl CleanupRunner {
    pub fn new(provider: Arc<dyn ResourceProvider>, rules: Arc<RuleSet>, mode: RunMode) -> Self {
        Self {
            provider,
            rules,
            mode,
            retry: RetryPolicy::default(),
            events: EventBus::new(),
            approver: None,
            cancel: CancellationToken::new(),
            dependents_only: false,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_approver(mut self, approver: Arc<dyn Approver>) -> Self {
        self.approver = Some(approver);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_dependents_only(mut self, dependents_only: bool) -> Self {
        self.dependents_only = dependents_only;
        self
    }

    pub fn class(&self) -> ResourceClass {
        self.rules.class
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub async fn run(&self, now: DateTime<Utc>) -> ClassSummary {
        self.run_after(now, &ReleasedOwners::new()).await
    }

    /// Run with the owners other classes already removed, or planned to
    /// remove, so their dependents in this class go too.
    pub async fn run_after(&self, now: DateTime<Utc>, released: &ReleasedOwners) -> ClassSummary {
        let span = info_span!("cleanup", class = %self.class(), mode = %self.mode.mode);
        self.run_pipeline(now, released).instrument(span).await
    }

    async fn run_pipeline(&self, now: DateTime<Utc>, released: &ReleasedOwners) -> ClassSummary {
        let class = self.class();
        let mut builder = ClassSummaryBuilder::new(class, self.mode.is_dry_run());
        info!(event = "core.runner.run_started", class = %class);

        let resources = match self.discover().await {
            Ok(resources) => resources,
            Err(e) => {
                error!(
                    event = "core.runner.discovery_failed",
                    class = %class,
                    error = %e
                );
                builder.discovery_failed(&e);
                return self.finish(builder);
            }
        };
        builder.scanned(resources.len());

        let mut included = Vec::new();
        for resource in resources {
            let decision = decide_dependent(
                &resource,
                decide(&resource, &self.rules, now),
                released,
                self.dependents_only,
            );
            builder.decision(&resource, &decision);
            if decision.included {
                included.push(resource);
            }
        }
        info!(
            event = "core.runner.filter_completed",
            class = %class,
            eligible = included.len()
        );

        // Children are listed before the gate in both modes.
        let mut plan = Vec::with_capacity(included.len());
        for resource in included {
            let unit = if self.rules.include_children && self.provider.supports_children() {
                self.expand_children(resource, now, &mut builder).await
            } else {
                DeletionUnit::single(resource)
            };
            plan.push(unit);
        }

        if !plan.is_empty()
            && let Err(e) = authorize(self.mode, &self.rules)
        {
            builder.blocked(e);
            return self.finish(builder);
        }

        if !self.mode.is_dry_run()
            && let Some(approver) = &self.approver
        {
            plan = self.approve(approver.as_ref(), plan, &mut builder).await;
        }

        let executor = Executor::new(
            self.provider.as_ref(),
            self.mode,
            self.rules.batch_size,
            self.retry,
            &self.events,
            &self.cancel,
        );
        let report = executor.execute(plan).await;
        builder.execution(report);
        self.finish(builder)
    }

    /// Drain every page of the listing, retrying transient page failures.
    async fn discover(&self) -> Result<Vec<ResourceDescriptor>, ProviderError> {
        let mut resources = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let (page, _) = with_retry(&self.retry, "list_page", || {
                self.provider.list_page(cursor.clone())
            })
            .await;
            let page = page?;
            resources.extend(page.items);
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(resources)
    }

    async fn expand_children(
        &self,
        resource: ResourceDescriptor,
        now: DateTime<Utc>,
        builder: &mut ClassSummaryBuilder,
    ) -> DeletionUnit {
        let (listing, _) = with_retry(&self.retry, "list_children", || {
            self.provider.list_children(&resource)
        })
        .await;
        let children = match listing {
            Ok(children) => children,
            Err(e) => {
                warn!(
                    event = "core.runner.children_listing_failed",
                    class = %resource.class,
                    resource_id = %resource.id,
                    error = %e
                );
                let reason = format!("listing child entries failed: {}", e);
                return DeletionUnit::with_children(
                    resource,
                    Vec::new(),
                    ParentAction::Blocked { reason },
                );
            }
        };
        builder.scanned(children.len());

        let selection = select_children(children, &self.rules, now);
        for child in &selection.delete {
            builder.scheduled_child(child);
        }
        for (child, decision) in &selection.retained {
            builder.decision(child, decision);
        }

        let action = if !self.rules.remove_parent {
            ParentAction::Keep
        } else if !selection.retained.is_empty()
            && !resource.class.parent_delete_removes_children()
        {
            ParentAction::Blocked {
                reason: format!("{} child entries retained", selection.retained.len()),
            }
        } else {
            ParentAction::Delete
        };
        DeletionUnit::with_children(resource, selection.delete, action)
    }

    async fn approve(
        &self,
        approver: &dyn Approver,
        plan: Vec<DeletionUnit>,
        builder: &mut ClassSummaryBuilder,
    ) -> Vec<DeletionUnit> {
        let mut approved = Vec::with_capacity(plan.len());
        for unit in plan {
            let deletes_anything = !unit.children.is_empty() || unit.removes_parent();
            if !deletes_anything || approver.approve(&unit).await {
                approved.push(unit);
                continue;
            }
            info!(
                event = "core.runner.resource_rejected",
                class = %unit.resource.class,
                resource_id = %unit.resource.id
            );
            for resource in unit.children.iter().chain(std::iter::once(&unit.resource)) {
                let outcome = Outcome::rejected(resource);
                self.events.emit(&ProgressEvent::from_outcome(&outcome, false));
                builder.rejected(outcome);
            }
        }
        approved
    }

    fn finish(&self, builder: ClassSummaryBuilder) -> ClassSummary {
        let summary = builder.finish();
        info!(
            event = "core.runner.run_completed",
            class = %summary.class,
            scanned = summary.scanned,
            eligible = summary.eligible,
            deleted = summary.deleted,
            failed = summary.failed,
            blocked = summary.blocked,
            cancelled = summary.cancelled
        );
        self.events.class_finished(&summary);
        summary
    }
}
