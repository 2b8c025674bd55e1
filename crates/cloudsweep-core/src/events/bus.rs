use std::sync::Arc;

use super::types::ProgressEvent;
use crate::summary::ClassSummary;

/// Receives progress from the engine.
///
/// Called from whichever task produced the event, so implementations must
/// be cheap and must not block.
pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);

    /// Called once when a class finishes, blocked and failed runs included.
    fn on_class_finished(&self, _summary: &ClassSummary) {}
}

/// Fan-out of progress events to every subscribed observer.
#[derive(Clone, Default)]
pub struct EventBus {
    observers: Vec<Arc<dyn ProgressObserver>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: Arc<dyn ProgressObserver>) {
        self.observers.push(observer);
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.subscribe(observer);
        self
    }

    pub fn emit(&self, event: &ProgressEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }

    pub fn class_finished(&self, summary: &ClassSummary) {
        for observer in &self.observers {
            observer.on_class_finished(summary);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observers.len())
            .finish()
    }
}
