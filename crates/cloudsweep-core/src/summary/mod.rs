//! Run summaries: the engine's only externally visible artifact.
//!
//! A [`ClassSummary`] is built incrementally by one runner and frozen with
//! [`ClassSummaryBuilder::finish`]. The orchestrator merges finished class
//! summaries into a [`RunSummary`]; nothing is shared between classes while
//! they run.

mod class;
mod run;

pub use class::{ClassSummary, ClassSummaryBuilder, ResourceReport};
pub use run::{RunSummary, RunTotals};
