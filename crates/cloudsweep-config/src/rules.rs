use std::collections::HashSet;

use chrono::TimeDelta;
use glob::Pattern;

use crate::defaults::{PROVIDER_BATCH_CAP, class_defaults};
use crate::errors::ConfigError;
use crate::types::{MissingTimestampPolicy, ResourceClass, SweepConfig, TagRequirement};

/// Frozen rules for one resource class.
///
/// Built once per run from defaults, the config file and command-line
/// overrides. Nothing mutates a `RuleSet` after it is handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    pub class: ResourceClass,
    pub enabled: bool,
    pub name_prefixes: Vec<String>,
    pub name_patterns: Vec<Pattern>,
    /// Allow-list. When non-empty it overrides prefix and pattern matching.
    pub targets: HashSet<String>,
    pub ignore: HashSet<String>,
    pub require_tag: Option<TagRequirement>,
    pub states: Vec<String>,
    pub retention: TimeDelta,
    pub child_retention: TimeDelta,
    pub delete_all: bool,
    pub include_children: bool,
    pub remove_parent: bool,
    pub keep_newest_children: usize,
    pub delete_dependents: bool,
    pub missing_timestamp: MissingTimestampPolicy,
    pub batch_size: usize,
}

impl RuleSet {
    /// Rules for `class` with nothing but the built-in defaults applied.
    pub fn for_class(class: ResourceClass) -> RuleSet {
        // Defaults carry no patterns, so resolution cannot fail.
        match resolve(class, &SweepConfig::default(), &RuleOverrides::default()) {
            Ok(rules) => rules,
            Err(_) => unreachable!("built-in defaults always resolve"),
        }
    }

    /// Whether any name filter (prefix or glob) is configured.
    pub fn has_name_filters(&self) -> bool {
        !self.name_prefixes.is_empty() || !self.name_patterns.is_empty()
    }

    pub fn retention_days(&self) -> i64 {
        self.retention.num_days()
    }

    /// Short human description of the deletion policy.
    pub fn policy_summary(&self) -> String {
        if self.delete_all {
            return format!("delete all {} resources regardless of age", self.class);
        }
        format!(
            "delete {} resources older than {} day(s)",
            self.class,
            self.retention_days()
        )
    }
}

/// One-off adjustments supplied on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleOverrides {
    pub targets: Vec<String>,
    pub ignore: Vec<String>,
    pub delete_all: bool,
    pub batch_size: Option<usize>,
}

/// Resolve the rule set for `class`: defaults, then file, then overrides.
pub fn resolve(
    class: ResourceClass,
    config: &SweepConfig,
    overrides: &RuleOverrides,
) -> Result<RuleSet, ConfigError> {
    let defaults = class_defaults(class);
    let merged = match config.rules.get(class) {
        Some(file_rules) => file_rules.merged_over(&defaults),
        None => defaults,
    };

    let name_patterns = merged
        .name_patterns
        .unwrap_or_default()
        .iter()
        .map(|raw| {
            Pattern::new(raw).map_err(|e| ConfigError::InvalidPattern {
                pattern: raw.clone(),
                message: e.msg.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut targets: HashSet<String> = merged.targets.unwrap_or_default().into_iter().collect();
    targets.extend(overrides.targets.iter().cloned());
    let mut ignore: HashSet<String> = merged.ignore.unwrap_or_default().into_iter().collect();
    ignore.extend(overrides.ignore.iter().cloned());

    if let Some(tag) = &merged.require_tag
        && tag.key.trim().is_empty()
    {
        return Err(ConfigError::InvalidConfiguration {
            message: format!("[rules.{}] require_tag.key must not be empty", class),
        });
    }

    let batch_size = overrides
        .batch_size
        .or(merged.batch_size)
        .unwrap_or(config.batch_size);
    validate_batch_size(batch_size)?;

    let retention_days = merged.retention_days.unwrap_or(0);
    let child_retention_days = merged.child_retention_days.unwrap_or(retention_days);
    let retention = retention_delta(class, "retention_days", retention_days)?;
    let child_retention = retention_delta(class, "child_retention_days", child_retention_days)?;

    Ok(RuleSet {
        class,
        enabled: merged.enabled.unwrap_or(true),
        name_prefixes: merged.name_prefixes.unwrap_or_default(),
        name_patterns,
        targets,
        ignore,
        require_tag: merged.require_tag,
        states: merged.states.unwrap_or_default(),
        retention,
        child_retention,
        delete_all: overrides.delete_all || merged.delete_all.unwrap_or(false),
        include_children: merged.include_children.unwrap_or(false),
        remove_parent: merged.remove_parent.unwrap_or(true),
        keep_newest_children: merged.keep_newest_children.unwrap_or(0),
        delete_dependents: merged.delete_dependents.unwrap_or(false),
        missing_timestamp: merged.missing_timestamp.unwrap_or_default(),
        batch_size,
    })
}

fn retention_delta(class: ResourceClass, key: &str, days: i64) -> Result<TimeDelta, ConfigError> {
    TimeDelta::try_days(days).ok_or_else(|| ConfigError::InvalidConfiguration {
        message: format!("[rules.{}] {} out of range (got {})", class, key, days),
    })
}

pub fn validate_batch_size(batch_size: usize) -> Result<(), ConfigError> {
    if batch_size == 0 || batch_size > PROVIDER_BATCH_CAP {
        return Err(ConfigError::InvalidConfiguration {
            message: format!(
                "batch_size must be between 1 and {} (got {})",
                PROVIDER_BATCH_CAP, batch_size
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RuleConfig;

    fn config_with(class_rules: RuleConfig) -> SweepConfig {
        let mut config = SweepConfig::default();
        config.rules.lambda_function = Some(class_rules);
        config
    }

    #[test]
    fn test_for_class_uses_defaults() {
        let rules = RuleSet::for_class(ResourceClass::Ec2Instance);
        assert_eq!(rules.retention, TimeDelta::days(7));
        assert_eq!(rules.states, vec!["stopped".to_string()]);
        assert_eq!(rules.batch_size, PROVIDER_BATCH_CAP);
        assert!(!rules.has_name_filters());
    }

    #[test]
    fn test_child_retention_defaults_to_retention() {
        let config = config_with(RuleConfig {
            retention_days: Some(12),
            ..Default::default()
        });
        let rules = resolve(
            ResourceClass::LambdaFunction,
            &config,
            &RuleOverrides::default(),
        )
        .unwrap();
        assert_eq!(rules.child_retention, TimeDelta::days(12));
    }

    #[test]
    fn test_overrides_extend_lists_and_force_delete_all() {
        let config = config_with(RuleConfig {
            targets: Some(vec!["fn-a".to_string()]),
            ..Default::default()
        });
        let overrides = RuleOverrides {
            targets: vec!["fn-b".to_string()],
            ignore: vec!["fn-c".to_string()],
            delete_all: true,
            batch_size: Some(50),
        };
        let rules = resolve(ResourceClass::LambdaFunction, &config, &overrides).unwrap();
        assert!(rules.targets.contains("fn-a"));
        assert!(rules.targets.contains("fn-b"));
        assert!(rules.ignore.contains("fn-c"));
        assert!(rules.delete_all);
        assert_eq!(rules.batch_size, 50);
    }

    #[test]
    fn test_invalid_glob_is_rejected() {
        let config = config_with(RuleConfig {
            name_patterns: Some(vec!["tmp-[".to_string()]),
            ..Default::default()
        });
        let err = resolve(
            ResourceClass::LambdaFunction,
            &config,
            &RuleOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_empty_tag_key_is_rejected() {
        let config = config_with(RuleConfig {
            require_tag: Some(TagRequirement {
                key: " ".to_string(),
                value: None,
            }),
            ..Default::default()
        });
        let err = resolve(
            ResourceClass::LambdaFunction,
            &config,
            &RuleOverrides::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("require_tag.key"));
    }

    #[test]
    fn test_batch_size_bounds() {
        assert!(validate_batch_size(1).is_ok());
        assert!(validate_batch_size(PROVIDER_BATCH_CAP).is_ok());
        assert!(validate_batch_size(0).is_err());
        assert!(validate_batch_size(PROVIDER_BATCH_CAP + 1).is_err());
    }

    #[test]
    fn test_negative_retention_is_kept() {
        let config = config_with(RuleConfig {
            retention_days: Some(-1),
            ..Default::default()
        });
        let rules = resolve(
            ResourceClass::LambdaFunction,
            &config,
            &RuleOverrides::default(),
        )
        .unwrap();
        assert_eq!(rules.retention_days(), -1);
    }

    #[test]
    fn test_out_of_range_retention_is_rejected() {
        let config = config_with(RuleConfig {
            retention_days: Some(200_000_000_000),
            ..Default::default()
        });
        let err = resolve(
            ResourceClass::LambdaFunction,
            &config,
            &RuleOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("retention_days out of range"));

        let config = config_with(RuleConfig {
            child_retention_days: Some(i64::MIN),
            ..Default::default()
        });
        let err = resolve(
            ResourceClass::LambdaFunction,
            &config,
            &RuleOverrides::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("child_retention_days out of range"));
    }

    #[test]
    fn test_policy_summary() {
        let mut rules = RuleSet::for_class(ResourceClass::LogGroup);
        assert_eq!(
            rules.policy_summary(),
            "delete log_group resources older than 30 day(s)"
        );
        rules.delete_all = true;
        assert!(rules.policy_summary().contains("regardless of age"));
    }
}
