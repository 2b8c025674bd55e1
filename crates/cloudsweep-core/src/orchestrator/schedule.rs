use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info};

use cloudsweep_config::ResourceClass;

use super::errors::OrchestratorError;
use crate::executor::OutcomeStatus;
use crate::filter::{DEFAULT_CASCADES, ReleasedOwners};
use crate::runner::CleanupRunner;
use crate::safety::{RunMode, authorize};
use crate::summary::{ClassSummary, RunSummary};

/// Classes that must finish before another class starts: instances before
/// the volumes attached to them, functions before their log groups.
pub const DEFAULT_ORDERING: [(ResourceClass, ResourceClass); 2] = [
    (ResourceClass::Ec2Instance, ResourceClass::EbsVolume),
    (ResourceClass::LambdaFunction, ResourceClass::LogGroup),
];

/// Runs class runners in dependency stages.
///
/// Classes inside one stage run concurrently unless the orchestrator is
/// sequential. Each runner produces its own summary; they are merged only
/// after every stage has finished. Owners a stage removes (or plans to
/// remove) release their dependents to the stages after it.
pub struct Orchestrator {
    mode: RunMode,
    runners: Vec<CleanupRunner>,
    constraints: Vec<(ResourceClass, ResourceClass)>,
    sequential: bool,
}

impl Orchestrator {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            runners: Vec::new(),
            constraints: DEFAULT_ORDERING.to_vec(),
            sequential: mode.interactive,
        }
    }

    pub fn add(&mut self, runner: CleanupRunner) -> Result<(), OrchestratorError> {
        if self.runners.iter().any(|r| r.class() == runner.class()) {
            return Err(OrchestratorError::DuplicateClass {
                class: runner.class(),
            });
        }
        self.runners.push(runner);
        Ok(())
    }

    /// Require `before` to finish before `after` starts.
    pub fn with_constraint(mut self, before: ResourceClass, after: ResourceClass) -> Self {
        self.constraints.push((before, after));
        self
    }

    pub fn sequential(mut self, sequential: bool) -> Self {
        self.sequential = sequential;
        self
    }

    pub fn classes(&self) -> Vec<ResourceClass> {
        self.runners.iter().map(CleanupRunner::class).collect()
    }

    /// Group enabled classes into stages that respect every constraint.
    ///
    /// Constraints naming a class that is not registered are ignored.
    pub fn stages(&self) -> Result<Vec<Vec<ResourceClass>>, OrchestratorError> {
        let classes: BTreeSet<ResourceClass> = self
            .runners
            .iter()
            .filter(|r| r.rules().enabled)
            .map(CleanupRunner::class)
            .collect();

        let mut indegree: BTreeMap<ResourceClass, usize> =
            classes.iter().map(|class| (*class, 0)).collect();
        let mut edges: BTreeMap<ResourceClass, Vec<ResourceClass>> = BTreeMap::new();
        for (before, after) in &self.constraints {
            if before == after || !classes.contains(before) || !classes.contains(after) {
                continue;
            }
            edges.entry(*before).or_default().push(*after);
            *indegree.entry(*after).or_default() += 1;
        }

        let mut stages = Vec::new();
        let mut ready: Vec<ResourceClass> = indegree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(class, _)| *class)
            .collect();
        while !ready.is_empty() {
            let mut next = Vec::new();
            for class in &ready {
                indegree.remove(class);
                for after in edges.get(class).into_iter().flatten() {
                    if let Some(degree) = indegree.get_mut(after) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.push(*after);
                        }
                    }
                }
            }
            next.sort();
            stages.push(std::mem::replace(&mut ready, next));
        }

        if !indegree.is_empty() {
            let classes = indegree
                .keys()
                .map(|class| class.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(OrchestratorError::OrderingCycle { classes });
        }
        Ok(stages)
    }

    /// Check the safety gate for every enabled class before anything runs.
    pub fn preflight(&self) -> Result<(), OrchestratorError> {
        for runner in self.runners.iter().filter(|r| r.rules().enabled) {
            authorize(self.mode, runner.rules())?;
        }
        Ok(())
    }

    /// Run every enabled class and merge the results.
    ///
    /// Fails only on setup problems: a blocked class or impossible ordering.
    /// Everything that happens once deletion starts is in the summary.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunSummary, OrchestratorError> {
        let stages = self.stages()?;
        if stages.is_empty() {
            return Err(OrchestratorError::NothingToRun);
        }
        self.preflight()?;

        let started_at = Utc::now();
        info!(
            event = "core.orchestrator.run_started",
            mode = %self.mode.mode,
            stages = stages.len(),
            classes = self.runners.len(),
            sequential = self.sequential
        );

        let mut summaries: Vec<ClassSummary> = Vec::new();
        let mut released = ReleasedOwners::new();
        for (index, stage) in stages.iter().enumerate() {
            debug!(
                event = "core.orchestrator.stage_started",
                stage = index,
                classes = ?stage
            );
            let first = summaries.len();
            let runners = self
                .runners
                .iter()
                .filter(|runner| stage.contains(&runner.class()));
            if self.sequential {
                for runner in runners {
                    summaries.push(runner.run_after(now, &released).await);
                }
            } else {
                let released = &released;
                summaries.extend(
                    join_all(runners.map(|runner| runner.run_after(now, released))).await,
                );
            }
            for summary in &summaries[first..] {
                self.release_owners(summary, &mut released);
            }
        }

        let summary = RunSummary::merge(self.mode.mode, started_at, Utc::now(), summaries);
        info!(
            event = "core.orchestrator.run_completed",
            scanned = summary.totals.scanned,
            eligible = summary.totals.eligible,
            deleted = summary.totals.deleted,
            failed = summary.totals.failed,
            cancelled = summary.cancelled,
            duration_ms = summary.duration_ms()
        );
        Ok(summary)
    }

    fn release_owners(&self, summary: &ClassSummary, released: &mut ReleasedOwners) {
        let cascades = self
            .runners
            .iter()
            .any(|r| r.class() == summary.class && r.rules().delete_dependents);
        if !cascades {
            return;
        }
        for cascade in DEFAULT_CASCADES.iter().filter(|c| c.owner == summary.class) {
            let owners: Vec<String> = summary
                .resources
                .iter()
                .filter(|row| {
                    row.parent_id.is_none()
                        && matches!(
                            row.status,
                            Some(OutcomeStatus::Deleted | OutcomeStatus::Planned)
                        )
                })
                .map(|row| row.id.clone())
                .collect();
            debug!(
                event = "core.orchestrator.owners_released",
                class = %summary.class,
                dependent = %cascade.dependent,
                count = owners.len()
            );
            released.release(*cascade, owners);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeDelta;
    use cloudsweep_config::RuleSet;

    use crate::provider::InventoryStore;
    use crate::resources::ResourceDescriptor;

    fn runner(store: &Arc<InventoryStore>, class: ResourceClass, mode: RunMode) -> CleanupRunner {
        CleanupRunner::new(
            store.provider(class),
            Arc::new(RuleSet::for_class(class)),
            mode,
        )
    }

    fn orchestrator(classes: &[ResourceClass], mode: RunMode) -> (Orchestrator, Arc<InventoryStore>) {
        let old = Utc::now() - TimeDelta::days(400);
        let resources = classes
            .iter()
            .map(|class| {
                ResourceDescriptor::new(*class, format!("{}-1", class))
                    .with_timestamp(old)
                    .with_state(match class {
                        ResourceClass::Ec2Instance => "stopped",
                        _ => "available",
                    })
            })
            .collect();
        let store = InventoryStore::from_resources(resources);
        let mut orchestrator = Orchestrator::new(mode);
        for class in classes {
            orchestrator.add(runner(&store, *class, mode)).unwrap();
        }
        (orchestrator, store)
    }

    #[test]
    fn test_default_ordering_stages() {
        let (orchestrator, _) = orchestrator(
            &[
                ResourceClass::EbsVolume,
                ResourceClass::IamRole,
                ResourceClass::Ec2Instance,
            ],
            RunMode::dry_run(),
        );
        let stages = orchestrator.stages().unwrap();
        assert_eq!(
            stages,
            vec![
                vec![ResourceClass::Ec2Instance, ResourceClass::IamRole],
                vec![ResourceClass::EbsVolume],
            ]
        );
    }

    #[test]
    fn test_constraints_on_missing_classes_are_ignored() {
        let (orchestrator, _) = orchestrator(&[ResourceClass::EbsVolume], RunMode::dry_run());
        assert_eq!(
            orchestrator.stages().unwrap(),
            vec![vec![ResourceClass::EbsVolume]]
        );
    }

    #[test]
    fn test_cycle_is_rejected() {
        let (orchestrator, _) = orchestrator(
            &[ResourceClass::Ec2Instance, ResourceClass::EbsVolume],
            RunMode::dry_run(),
        );
        let orchestrator =
            orchestrator.with_constraint(ResourceClass::EbsVolume, ResourceClass::Ec2Instance);
        match orchestrator.stages() {
            Err(OrchestratorError::OrderingCycle { classes }) => {
                assert_eq!(classes, "ec2_instance, ebs_volume");
            }
            other => panic!("expected cycle, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let store = InventoryStore::from_resources(Vec::new());
        let mut orchestrator = Orchestrator::new(RunMode::dry_run());
        orchestrator
            .add(runner(&store, ResourceClass::IamRole, RunMode::dry_run()))
            .unwrap();
        let error = orchestrator
            .add(runner(&store, ResourceClass::IamRole, RunMode::dry_run()))
            .unwrap_err();
        assert!(matches!(error, OrchestratorError::DuplicateClass { .. }));
    }

    #[tokio::test]
    async fn test_runs_all_classes_and_merges() {
        let (orchestrator, store) = orchestrator(
            &[
                ResourceClass::Ec2Instance,
                ResourceClass::EbsVolume,
                ResourceClass::IamRole,
            ],
            RunMode::apply(),
        );

        let summary = orchestrator.run(Utc::now()).await.unwrap();

        assert_eq!(summary.per_class.len(), 3);
        assert_eq!(summary.totals.deleted, 3);
        assert!(store.snapshot().resources.is_empty());
        assert!(!summary.dry_run);
    }

    #[tokio::test]
    async fn test_preflight_blocks_every_class() {
        let store = InventoryStore::from_resources(vec![
            ResourceDescriptor::new(ResourceClass::IamRole, "ci")
                .with_timestamp(Utc::now() - TimeDelta::days(400)),
            ResourceDescriptor::new(ResourceClass::IamUser, "bot")
                .with_timestamp(Utc::now() - TimeDelta::days(400)),
        ]);
        let mut zero = RuleSet::for_class(ResourceClass::IamUser);
        zero.retention = TimeDelta::zero();
        zero.child_retention = TimeDelta::zero();

        let mut orchestrator = Orchestrator::new(RunMode::apply());
        orchestrator
            .add(runner(&store, ResourceClass::IamRole, RunMode::apply()))
            .unwrap();
        orchestrator
            .add(CleanupRunner::new(
                store.provider(ResourceClass::IamUser),
                Arc::new(zero),
                RunMode::apply(),
            ))
            .unwrap();

        let error = orchestrator.run(Utc::now()).await.unwrap_err();
        assert!(matches!(error, OrchestratorError::Blocked(_)));
        // The unblocked class did not run either.
        assert_eq!(store.snapshot().resources.len(), 2);
        assert_eq!(store.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_disabled_classes_are_skipped() {
        let store = InventoryStore::from_resources(Vec::new());
        let mut disabled = RuleSet::for_class(ResourceClass::IamPolicy);
        disabled.enabled = false;
        let mut orchestrator = Orchestrator::new(RunMode::dry_run());
        orchestrator
            .add(CleanupRunner::new(
                store.provider(ResourceClass::IamPolicy),
                Arc::new(disabled),
                RunMode::dry_run(),
            ))
            .unwrap();

        let error = orchestrator.run(Utc::now()).await.unwrap_err();
        assert!(matches!(error, OrchestratorError::NothingToRun));
    }

    #[test]
    fn test_default_ordering_covers_cascades() {
        for cascade in DEFAULT_CASCADES {
            assert!(DEFAULT_ORDERING.contains(&(cascade.owner, cascade.dependent)));
        }
    }

    const DEPENDENT_CLASSES: [ResourceClass; 4] = [
        ResourceClass::Ec2Instance,
        ResourceClass::EbsVolume,
        ResourceClass::LambdaFunction,
        ResourceClass::LogGroup,
    ];

    fn owners_and_dependents() -> Arc<InventoryStore> {
        let old = Utc::now() - TimeDelta::days(400);
        let fresh = Utc::now() - TimeDelta::days(1);
        InventoryStore::from_resources(vec![
            ResourceDescriptor::new(ResourceClass::Ec2Instance, "i-1")
                .with_timestamp(old)
                .with_state("stopped"),
            ResourceDescriptor::new(ResourceClass::EbsVolume, "vol-root")
                .with_timestamp(fresh)
                .with_state("in-use")
                .attached_to("i-1"),
            ResourceDescriptor::new(ResourceClass::LambdaFunction, "tmp-fn").with_timestamp(old),
            ResourceDescriptor::new(ResourceClass::LogGroup, "/aws/lambda/tmp-fn")
                .with_timestamp(fresh),
            ResourceDescriptor::new(ResourceClass::LogGroup, "/aws/lambda/live-fn")
                .with_timestamp(fresh),
        ])
    }

    fn dependent_orchestrator(store: &Arc<InventoryStore>, mode: RunMode) -> Orchestrator {
        let mut orchestrator = Orchestrator::new(mode);
        for class in DEPENDENT_CLASSES {
            orchestrator.add(runner(store, class, mode)).unwrap();
        }
        orchestrator
    }

    #[tokio::test]
    async fn test_removed_owners_take_their_dependents() {
        let store = owners_and_dependents();

        let summary = dependent_orchestrator(&store, RunMode::apply())
            .run(Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.totals.deleted, 4);
        assert!(!store.contains(ResourceClass::EbsVolume, "vol-root"));
        assert!(!store.contains(ResourceClass::LogGroup, "/aws/lambda/tmp-fn"));
        assert!(store.contains(ResourceClass::LogGroup, "/aws/lambda/live-fn"));
    }

    #[tokio::test]
    async fn test_dry_run_plans_dependents() {
        let store = owners_and_dependents();

        let summary = dependent_orchestrator(&store, RunMode::dry_run())
            .run(Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.totals.planned, 4);
        assert_eq!(summary.totals.deleted, 0);
        assert_eq!(store.snapshot().resources.len(), 5);
    }

    #[tokio::test]
    async fn test_dependents_stay_when_cascade_disabled() {
        let store = owners_and_dependents();
        let mut ec2 = RuleSet::for_class(ResourceClass::Ec2Instance);
        ec2.delete_dependents = false;
        let mut orchestrator = Orchestrator::new(RunMode::apply());
        orchestrator
            .add(CleanupRunner::new(
                store.provider(ResourceClass::Ec2Instance),
                Arc::new(ec2),
                RunMode::apply(),
            ))
            .unwrap();
        orchestrator
            .add(runner(&store, ResourceClass::EbsVolume, RunMode::apply()))
            .unwrap();

        let summary = orchestrator.run(Utc::now()).await.unwrap();

        assert_eq!(summary.totals.deleted, 1);
        assert!(!store.contains(ResourceClass::Ec2Instance, "i-1"));
        assert!(store.contains(ResourceClass::EbsVolume, "vol-root"));
    }
}
