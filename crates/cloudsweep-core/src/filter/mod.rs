//! Filter predicate: decides per resource whether it is eligible for deletion.
//!
//! Pure and deterministic. Checks run cheapest first and the first exclusion
//! wins, so the reported reason is always the earliest failing rule.

mod dependents;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use cloudsweep_config::{MissingTimestampPolicy, ResourceClass, RuleSet};

use crate::resources::ResourceDescriptor;

pub use dependents::{
    Cascade, DEFAULT_CASCADES, DependentLink, ReleasedOwners, decide_dependent,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum DecisionReason {
    ManagedByProvider,
    Ignored,
    NotTargeted,
    NameMismatch,
    MissingTag { key: String },
    StateMismatch { state: Option<String> },
    TooRecent { age_days: i64 },
    MissingTimestamp,
    KeptNewest,
    DependentOf {
        owner_class: ResourceClass,
        owner: String,
    },
    OwnerNotRemoved,
    MeetsAllCriteria,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::ManagedByProvider => "managed_by_provider",
            DecisionReason::Ignored => "ignored",
            DecisionReason::NotTargeted => "not_targeted",
            DecisionReason::NameMismatch => "name_mismatch",
            DecisionReason::MissingTag { .. } => "missing_tag",
            DecisionReason::StateMismatch { .. } => "state_mismatch",
            DecisionReason::TooRecent { .. } => "too_recent",
            DecisionReason::MissingTimestamp => "missing_timestamp",
            DecisionReason::KeptNewest => "kept_newest",
            DecisionReason::DependentOf { .. } => "dependent_of_removed",
            DecisionReason::OwnerNotRemoved => "owner_not_removed",
            DecisionReason::MeetsAllCriteria => "meets_all_criteria",
        }
    }
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionReason::ManagedByProvider => write!(f, "managed by the provider"),
            DecisionReason::Ignored => write!(f, "in ignore list"),
            DecisionReason::NotTargeted => write!(f, "not in target list"),
            DecisionReason::NameMismatch => write!(f, "name matches no prefix or pattern"),
            DecisionReason::MissingTag { key } => write!(f, "required tag '{}' missing", key),
            DecisionReason::StateMismatch { state } => write!(
                f,
                "state '{}' not targeted",
                state.as_deref().unwrap_or("unknown")
            ),
            DecisionReason::TooRecent { age_days } => {
                write!(f, "age {} day(s) below retention", age_days)
            }
            DecisionReason::MissingTimestamp => write!(f, "no timestamp recorded"),
            DecisionReason::KeptNewest => write!(f, "among the newest entries kept"),
            DecisionReason::DependentOf { owner_class, owner } => {
                write!(f, "{} '{}' is removed", owner_class, owner)
            }
            DecisionReason::OwnerNotRemoved => write!(f, "owner not removed in this run"),
            DecisionReason::MeetsAllCriteria => write!(f, "meets all criteria"),
        }
    }
}

/// Verdict for one resource. Produced once, consumed once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub resource_id: String,
    pub included: bool,
    pub reason: DecisionReason,
}

impl Decision {
    fn include(resource: &ResourceDescriptor) -> Self {
        Self {
            resource_id: resource.id.clone(),
            included: true,
            reason: DecisionReason::MeetsAllCriteria,
        }
    }

    fn exclude(resource: &ResourceDescriptor, reason: DecisionReason) -> Self {
        Self {
            resource_id: resource.id.clone(),
            included: false,
            reason,
        }
    }
}

/// Decide whether `resource` is eligible under `rules` at time `now`.
pub fn decide(resource: &ResourceDescriptor, rules: &RuleSet, now: DateTime<Utc>) -> Decision {
    if resource.managed {
        return Decision::exclude(resource, DecisionReason::ManagedByProvider);
    }
    if rules.ignore.contains(&resource.id) {
        return Decision::exclude(resource, DecisionReason::Ignored);
    }
    if !rules.targets.is_empty() {
        if !rules.targets.contains(&resource.id) {
            return Decision::exclude(resource, DecisionReason::NotTargeted);
        }
    } else if rules.has_name_filters() && !matches_name(&resource.id, rules) {
        return Decision::exclude(resource, DecisionReason::NameMismatch);
    }
    if let Some(tag) = &rules.require_tag {
        let present = match &tag.value {
            Some(value) => resource.tags.get(&tag.key) == Some(value),
            None => resource.tags.contains_key(&tag.key),
        };
        if !present {
            return Decision::exclude(
                resource,
                DecisionReason::MissingTag {
                    key: tag.key.clone(),
                },
            );
        }
    }
    if !rules.states.is_empty() {
        let targeted = resource
            .state
            .as_ref()
            .is_some_and(|state| rules.states.contains(state));
        if !targeted {
            return Decision::exclude(
                resource,
                DecisionReason::StateMismatch {
                    state: resource.state.clone(),
                },
            );
        }
    }
    if !rules.delete_all
        && let Some(reason) = age_gate(
            resource,
            rules.retention,
            rules.missing_timestamp,
            now,
        )
    {
        return Decision::exclude(resource, reason);
    }
    Decision::include(resource)
}

fn matches_name(id: &str, rules: &RuleSet) -> bool {
    rules.name_prefixes.iter().any(|prefix| id.starts_with(prefix.as_str()))
        || rules.name_patterns.iter().any(|pattern| pattern.matches(id))
}

/// Returns the exclusion reason when `resource` is too young to delete.
fn age_gate(
    resource: &ResourceDescriptor,
    retention: TimeDelta,
    missing: MissingTimestampPolicy,
    now: DateTime<Utc>,
) -> Option<DecisionReason> {
    // Zero or negative retention makes everything old enough.
    if retention <= TimeDelta::zero() {
        return None;
    }
    match resource.timestamp {
        None => match missing {
            MissingTimestampPolicy::Eligible => None,
            MissingTimestampPolicy::Excluded => Some(DecisionReason::MissingTimestamp),
        },
        Some(timestamp) => {
            let age = now - timestamp;
            (age < retention).then(|| DecisionReason::TooRecent {
                age_days: age.num_days(),
            })
        }
    }
}

/// Children of one eligible parent, split into deletable and retained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildSelection {
    pub delete: Vec<ResourceDescriptor>,
    pub retained: Vec<(ResourceDescriptor, Decision)>,
}

/// Apply child retention to the entries owned by one parent.
///
/// The `keep_newest_children` newest entries are always retained; the rest
/// pass through the age gate with the child retention age. Discovery order
/// is preserved in both lists.
pub fn select_children(
    children: Vec<ResourceDescriptor>,
    rules: &RuleSet,
    now: DateTime<Utc>,
) -> ChildSelection {
    let mut newest: Vec<(usize, Option<DateTime<Utc>>)> = children
        .iter()
        .enumerate()
        .map(|(index, child)| (index, child.timestamp))
        .collect();
    // Newest first; entries without a timestamp sort last.
    newest.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let kept: Vec<usize> = newest
        .iter()
        .take(rules.keep_newest_children)
        .map(|(index, _)| *index)
        .collect();

    let mut selection = ChildSelection::default();
    for (index, child) in children.into_iter().enumerate() {
        if kept.contains(&index) {
            let decision = Decision::exclude(&child, DecisionReason::KeptNewest);
            selection.retained.push((child, decision));
            continue;
        }
        let gate = if rules.delete_all {
            None
        } else {
            age_gate(&child, rules.child_retention, rules.missing_timestamp, now)
        };
        match gate {
            Some(reason) => {
                let decision = Decision::exclude(&child, reason);
                selection.retained.push((child, decision));
            }
            None => selection.delete.push(child),
        }
    }
    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudsweep_config::TagRequirement;
    use glob::Pattern;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn rules() -> RuleSet {
        let mut rules = RuleSet::for_class(ResourceClass::LambdaFunction);
        rules.retention = TimeDelta::days(30);
        rules.keep_newest_children = 0;
        rules
    }

    fn aged(id: &str, days: i64) -> ResourceDescriptor {
        ResourceDescriptor::new(ResourceClass::LambdaFunction, id)
            .with_timestamp(now() - TimeDelta::days(days))
    }

    #[test]
    fn test_ignore_wins_over_target() {
        let mut rules = rules();
        rules.targets.insert("temp-123".to_string());
        rules.ignore.insert("temp-123".to_string());
        let decision = decide(&aged("temp-123", 90), &rules, now());
        assert!(!decision.included);
        assert_eq!(decision.reason, DecisionReason::Ignored);
    }

    #[test]
    fn test_target_list_is_allow_list() {
        let mut rules = rules();
        rules.targets.insert("fn-a".to_string());
        rules.name_prefixes.push("zzz-".to_string());

        let decision = decide(&aged("fn-b", 90), &rules, now());
        assert_eq!(decision.reason, DecisionReason::NotTargeted);

        // Target list overrides prefix matching.
        let decision = decide(&aged("fn-a", 90), &rules, now());
        assert!(decision.included);
    }

    #[test]
    fn test_prefix_and_glob_matching() {
        let mut rules = rules();
        rules.name_prefixes.push("tmp-".to_string());
        rules.name_patterns.push(Pattern::new("ci-??-*").unwrap());

        assert!(decide(&aged("tmp-build", 90), &rules, now()).included);
        assert!(decide(&aged("ci-42-runner", 90), &rules, now()).included);
        assert_eq!(
            decide(&aged("ci-420-runner", 90), &rules, now()).reason,
            DecisionReason::NameMismatch
        );
        assert_eq!(
            decide(&aged("prod-api", 90), &rules, now()).reason,
            DecisionReason::NameMismatch
        );
    }

    #[test]
    fn test_pattern_matching_is_case_sensitive_and_full() {
        let mut rules = rules();
        rules.name_patterns.push(Pattern::new("tmp-*").unwrap());
        assert!(!decide(&aged("TMP-build", 90), &rules, now()).included);
        assert!(!decide(&aged("x-tmp-build", 90), &rules, now()).included);
    }

    #[test]
    fn test_required_tag_exact_pair() {
        let mut rules = rules();
        rules.require_tag = Some(TagRequirement {
            key: "env".to_string(),
            value: Some("dev".to_string()),
        });

        let tagged = aged("fn", 90).with_tag("env", "dev");
        assert!(decide(&tagged, &rules, now()).included);

        let wrong_value = aged("fn", 90).with_tag("env", "prod");
        assert_eq!(
            decide(&wrong_value, &rules, now()).reason,
            DecisionReason::MissingTag {
                key: "env".to_string()
            }
        );
    }

    #[test]
    fn test_required_tag_key_only() {
        let mut rules = rules();
        rules.require_tag = Some(TagRequirement {
            key: "ephemeral".to_string(),
            value: None,
        });
        assert!(decide(&aged("fn", 90).with_tag("ephemeral", "yes"), &rules, now()).included);
        assert!(!decide(&aged("fn", 90), &rules, now()).included);
    }

    #[test]
    fn test_state_filter() {
        let mut rules = rules();
        rules.states = vec!["stopped".to_string()];
        assert!(decide(&aged("i-1", 90).with_state("stopped"), &rules, now()).included);
        assert_eq!(
            decide(&aged("i-2", 90).with_state("running"), &rules, now()).reason,
            DecisionReason::StateMismatch {
                state: Some("running".to_string())
            }
        );
        assert!(!decide(&aged("i-3", 90), &rules, now()).included);
    }

    #[test]
    fn test_managed_resources_always_excluded() {
        let mut rules = rules();
        rules.delete_all = true;
        rules.targets.insert("AWSServiceRoleForSupport".to_string());
        let role = aged("AWSServiceRoleForSupport", 900).managed();
        assert_eq!(
            decide(&role, &rules, now()).reason,
            DecisionReason::ManagedByProvider
        );
    }

    #[test]
    fn test_age_gate_boundaries() {
        let rules = rules();
        let young = decide(&aged("fn", 29), &rules, now());
        assert_eq!(young.reason, DecisionReason::TooRecent { age_days: 29 });
        assert!(decide(&aged("fn", 31), &rules, now()).included);
        // Exactly at the retention age is old enough.
        assert!(decide(&aged("fn", 30), &rules, now()).included);
    }

    #[test]
    fn test_delete_all_skips_age_gate() {
        let mut rules = rules();
        rules.delete_all = true;
        assert!(decide(&aged("fn", 0), &rules, now()).included);
    }

    #[test]
    fn test_zero_and_negative_retention_pass_age_gate() {
        let mut rules = rules();
        rules.retention = TimeDelta::zero();
        assert!(decide(&aged("fn", 0), &rules, now()).included);
        rules.retention = TimeDelta::days(-5);
        assert!(decide(&aged("fn", 0), &rules, now()).included);
    }

    #[test]
    fn test_missing_timestamp_policy() {
        let mut rules = rules();
        let untracked = ResourceDescriptor::new(ResourceClass::LambdaFunction, "fn");
        assert!(decide(&untracked, &rules, now()).included);

        rules.missing_timestamp = MissingTimestampPolicy::Excluded;
        assert_eq!(
            decide(&untracked, &rules, now()).reason,
            DecisionReason::MissingTimestamp
        );
    }

    #[test]
    fn test_decide_is_idempotent() {
        let mut rules = rules();
        rules.name_prefixes.push("tmp-".to_string());
        let resources = [aged("tmp-a", 10), aged("tmp-b", 40), aged("other", 40)];
        for resource in &resources {
            let first = decide(resource, &rules, now());
            let second = decide(resource, &rules, now());
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_select_children_applies_child_retention() {
        let mut rules = rules();
        rules.child_retention = TimeDelta::days(7);
        let children = vec![aged("v1", 30), aged("v2", 3), aged("v3", 10)];

        let selection = select_children(children, &rules, now());
        let deleted: Vec<&str> = selection.delete.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(deleted, vec!["v1", "v3"]);
        assert_eq!(selection.retained.len(), 1);
        assert_eq!(selection.retained[0].0.id, "v2");
    }

    #[test]
    fn test_select_children_keeps_newest() {
        let mut rules = rules();
        rules.child_retention = TimeDelta::zero();
        rules.keep_newest_children = 2;
        let children = vec![aged("v1", 90), aged("v2", 60), aged("v3", 30), aged("v4", 45)];

        let selection = select_children(children, &rules, now());
        let deleted: Vec<&str> = selection.delete.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(deleted, vec!["v1", "v2"]);
        let kept: Vec<&str> = selection.retained.iter().map(|(c, _)| c.id.as_str()).collect();
        assert_eq!(kept, vec!["v3", "v4"]);
        assert!(
            selection
                .retained
                .iter()
                .all(|(_, d)| d.reason == DecisionReason::KeptNewest)
        );
    }
}
