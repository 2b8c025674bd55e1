use std::sync::Mutex;

use tracing::{info, warn};

use super::bus::ProgressObserver;
use super::types::ProgressEvent;
use crate::summary::ClassSummary;

/// Writes every event to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_event(&self, event: &ProgressEvent) {
        if event.status.is_failure() {
            warn!(
                event = "core.progress.resource_failed",
                class = %event.class,
                resource_id = %event.resource_id,
                status = event.status.as_str(),
                error = event.error.as_deref().unwrap_or("")
            );
        } else {
            info!(
                event = "core.progress.resource",
                class = %event.class,
                resource_id = %event.resource_id,
                status = event.status.as_str(),
                dry_run = event.dry_run
            );
        }
    }

    fn on_class_finished(&self, summary: &ClassSummary) {
        info!(
            event = "core.progress.class_finished",
            class = %summary.class,
            scanned = summary.scanned,
            eligible = summary.eligible,
            deleted = summary.deleted,
            failed = summary.failed,
            blocked = summary.blocked
        );
    }
}

/// Accumulates events in memory, in arrival order.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ProgressObserver for CollectingObserver {
    fn on_event(&self, event: &ProgressEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
