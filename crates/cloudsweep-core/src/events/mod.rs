//! Per-resource progress events and the observers that consume them.
//!
//! The engine emits one [`ProgressEvent`] per outcome as soon as it is known.
//! Renderers, log sinks and accumulators subscribe to an [`EventBus`]; the
//! engine depends on none of them.

mod bus;
mod observers;
mod types;

pub use bus::{EventBus, ProgressObserver};
pub use observers::{CollectingObserver, TracingObserver};
pub use types::ProgressEvent;
