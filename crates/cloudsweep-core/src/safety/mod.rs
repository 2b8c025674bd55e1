//! Safety gate: refuses destructive runs that were not explicitly confirmed.

use serde::Serialize;
use tracing::warn;

use chrono::TimeDelta;
use cloudsweep_config::{ResourceClass, RuleSet};

use crate::errors::SweepError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    DryRun,
    Apply,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::DryRun => "dry_run",
            Mode::Apply => "apply",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the operator asked this run to behave. Fixed for the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunMode {
    pub mode: Mode,
    pub force_zero_retention: bool,
    pub force_delete_all: bool,
    /// Ask for confirmation before each deletion.
    pub interactive: bool,
}

impl RunMode {
    pub fn dry_run() -> Self {
        Self::default()
    }

    pub fn apply() -> Self {
        Self {
            mode: Mode::Apply,
            ..Self::default()
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.mode == Mode::DryRun
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    ZeroRetentionWithoutForce,
    DeleteAllWithoutForce,
}

impl BlockReason {
    /// Stable identifier surfaced in summaries and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::ZeroRetentionWithoutForce => "zero_retention_without_force",
            BlockReason::DeleteAllWithoutForce => "delete_all_without_force",
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            BlockReason::ZeroRetentionWithoutForce => {
                "retention is zero or negative; pass --force-zero-retention to delete everything"
            }
            BlockReason::DeleteAllWithoutForce => {
                "delete-all ignores age; pass --force-delete-all to confirm"
            }
        }
    }
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Refusing to delete {class} resources: {} ({})", .reason.as_str(), .reason.hint())]
pub struct BlockedError {
    pub class: ResourceClass,
    pub reason: BlockReason,
}

impl SweepError for BlockedError {
    fn error_code(&self) -> &'static str {
        match self.reason {
            BlockReason::ZeroRetentionWithoutForce => "SAFETY_ZERO_RETENTION",
            BlockReason::DeleteAllWithoutForce => "SAFETY_DELETE_ALL",
        }
    }

    fn is_user_error(&self) -> bool {
        true
    }
}

/// Decide whether a run in `mode` may execute deletions under `rules`.
///
/// Dry runs always pass. Zero retention and delete-all each need their own
/// force flag; a rule set with both needs both.
pub fn authorize(mode: RunMode, rules: &RuleSet) -> Result<(), BlockedError> {
    if mode.is_dry_run() {
        return Ok(());
    }

    let zero_retention = rules.retention <= TimeDelta::zero()
        || (rules.include_children && rules.child_retention <= TimeDelta::zero());
    if zero_retention && !mode.force_zero_retention {
        return Err(blocked(rules, BlockReason::ZeroRetentionWithoutForce));
    }
    if rules.delete_all && !mode.force_delete_all {
        return Err(blocked(rules, BlockReason::DeleteAllWithoutForce));
    }
    Ok(())
}

fn blocked(rules: &RuleSet, reason: BlockReason) -> BlockedError {
    warn!(
        event = "core.safety.blocked",
        class = %rules.class,
        reason = reason.as_str()
    );
    BlockedError {
        class: rules.class,
        reason,
    }
}
