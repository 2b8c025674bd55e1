use chrono::{DateTime, Utc};
use serde::Serialize;

use cloudsweep_config::ResourceClass;

use super::class::{ClassSummary, ResourceReport};
use crate::safety::Mode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub scanned: usize,
    pub eligible: usize,
    pub planned: usize,
    pub attempted: usize,
    pub deleted: usize,
    pub failed: usize,
    pub rejected: usize,
}

impl RunTotals {
    fn add(&mut self, class: &ClassSummary) {
        self.scanned += class.scanned;
        self.eligible += class.eligible;
        self.planned += class.planned;
        self.attempted += class.attempted;
        self.deleted += class.deleted;
        self.failed += class.failed;
        self.rejected += class.rejected;
    }
}

/// Merged result of every class in one run.
///
/// The shape is the same for every renderer. Per-resource rows are lifted
/// out of the class summaries into `per_resource`, so `per_class` only
/// carries counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub mode: Mode,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub totals: RunTotals,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    pub cancelled: bool,
    pub per_resource: Vec<ResourceReport>,
    pub per_class: Vec<ClassSummary>,
}

impl RunSummary {
    /// Merge finished class summaries, ordered by class.
    pub fn merge(
        mode: Mode,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        mut classes: Vec<ClassSummary>,
    ) -> Self {
        classes.sort_by_key(|summary| summary.class);

        let mut totals = RunTotals::default();
        let mut per_resource = Vec::new();
        let mut blocked_reason = None;
        let mut cancelled = false;
        for class in &mut classes {
            totals.add(class);
            cancelled |= class.cancelled;
            if blocked_reason.is_none() {
                blocked_reason = class.blocked_reason.clone();
            }
            per_resource.append(&mut class.resources);
        }

        Self {
            mode,
            dry_run: mode == Mode::DryRun,
            started_at,
            finished_at,
            totals,
            blocked: classes.iter().any(|class| class.blocked),
            blocked_reason,
            cancelled,
            per_resource,
            per_class: classes,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.per_class.iter().any(ClassSummary::has_failures)
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Rows for one class, in discovery order.
    pub fn resources_for(&self, class: ResourceClass) -> impl Iterator<Item = &ResourceReport> {
        self.per_resource.iter().filter(move |row| row.class == class)
    }
}
