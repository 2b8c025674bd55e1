//! Resource cleanup engine for cloudsweep.
//!
//! Filters discovered resources against per-class rules, refuses dangerous
//! configurations without explicit force flags, and deletes what remains in
//! bounded batches while tolerating partial failure.

pub mod errors;
pub mod events;
pub mod executor;
pub mod filter;
pub mod logging;
pub mod orchestrator;
pub mod provider;
pub mod resources;
pub mod runner;
pub mod safety;
pub mod summary;

pub use errors::{SweepError, SweepResult, log_app_error};
pub use events::{CollectingObserver, EventBus, ProgressEvent, ProgressObserver, TracingObserver};
pub use executor::{
    DeletionUnit, ExecutionReport, Executor, Outcome, OutcomeStatus, ParentAction, RetryPolicy,
};
pub use filter::{
    Cascade, DEFAULT_CASCADES, Decision, DecisionReason, DependentLink, ReleasedOwners, decide,
    decide_dependent, select_children,
};
pub use logging::init_logging;
pub use orchestrator::{DEFAULT_ORDERING, Orchestrator, OrchestratorError};
pub use provider::{
    FailureSpec, Inventory, InventoryError, InventoryStore, ItemResult, Page, ProviderError,
    ProviderErrorKind, ResourceProvider,
};
pub use resources::ResourceDescriptor;
pub use runner::{Approver, CleanupRunner, RejectAll};
pub use safety::{BlockReason, BlockedError, Mode, RunMode, authorize};
pub use summary::{ClassSummary, ClassSummaryBuilder, ResourceReport, RunSummary, RunTotals};
