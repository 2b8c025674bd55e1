//! Per-class cleanup runner: discover, filter, gate, approve, execute.

mod approval;
mod cleanup;

pub use approval::{Approver, RejectAll};
pub use cleanup::CleanupRunner;
