//! Batched deletion executor.
//!
//! Turns an ordered deletion plan into per-resource outcomes. Dry runs go
//! through the same batching as real ones and only differ at the point
//! where a batch is submitted.

mod batch;
mod outcome;
mod retry;

pub use batch::Executor;
pub use outcome::{DeletionUnit, ExecutionReport, Outcome, OutcomeStatus, ParentAction};
pub use retry::{RetryPolicy, with_retry};
