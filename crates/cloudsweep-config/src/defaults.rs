//! Per-class default rules.
//!
//! Values mirror what operators of the tool have historically relied on:
//! compute and volume cleanup only touch idle resources after a week, every
//! other class waits thirty days.

use crate::types::{MissingTimestampPolicy, ResourceClass, RuleConfig};

/// Hard cap on items per bulk-delete call imposed by the provider.
pub const PROVIDER_BATCH_CAP: usize = 1000;

pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Published function versions kept regardless of age.
pub const DEFAULT_KEEP_FUNCTION_VERSIONS: usize = 3;

pub const DEFAULT_CONFIG_FILE: &str = "cloudsweep.toml";

/// Environment variable that points at an alternative config file.
pub const CONFIG_ENV_VAR: &str = "CLOUDSWEEP_CONFIG";

pub fn class_defaults(class: ResourceClass) -> RuleConfig {
    let base = RuleConfig {
        enabled: Some(true),
        name_prefixes: Some(Vec::new()),
        name_patterns: Some(Vec::new()),
        targets: Some(Vec::new()),
        ignore: Some(Vec::new()),
        require_tag: None,
        states: Some(Vec::new()),
        retention_days: Some(DEFAULT_RETENTION_DAYS),
        child_retention_days: None,
        delete_all: Some(false),
        include_children: Some(false),
        remove_parent: Some(true),
        keep_newest_children: Some(0),
        delete_dependents: Some(false),
        missing_timestamp: Some(MissingTimestampPolicy::Eligible),
        batch_size: None,
    };

    match class {
        ResourceClass::S3Bucket => RuleConfig {
            include_children: Some(true),
            remove_parent: Some(false),
            ..base
        },
        ResourceClass::Ec2Instance => RuleConfig {
            states: Some(vec!["stopped".to_string()]),
            retention_days: Some(7),
            delete_dependents: Some(true),
            ..base
        },
        ResourceClass::EbsVolume => RuleConfig {
            states: Some(vec!["available".to_string()]),
            retention_days: Some(7),
            ..base
        },
        ResourceClass::LambdaFunction => RuleConfig {
            include_children: Some(true),
            keep_newest_children: Some(DEFAULT_KEEP_FUNCTION_VERSIONS),
            delete_dependents: Some(true),
            ..base
        },
        ResourceClass::LogGroup => RuleConfig {
            include_children: Some(true),
            ..base
        },
        ResourceClass::EbsSnapshot
        | ResourceClass::IamRole
        | ResourceClass::IamUser
        | ResourceClass::IamPolicy => base,
    }
}

impl RuleConfig {
    /// Layer `self` on top of `base`: any key set here wins.
    pub fn merged_over(&self, base: &RuleConfig) -> RuleConfig {
        RuleConfig {
            enabled: self.enabled.or(base.enabled),
            name_prefixes: self.name_prefixes.clone().or_else(|| base.name_prefixes.clone()),
            name_patterns: self.name_patterns.clone().or_else(|| base.name_patterns.clone()),
            targets: self.targets.clone().or_else(|| base.targets.clone()),
            ignore: self.ignore.clone().or_else(|| base.ignore.clone()),
            require_tag: self.require_tag.clone().or_else(|| base.require_tag.clone()),
            states: self.states.clone().or_else(|| base.states.clone()),
            retention_days: self.retention_days.or(base.retention_days),
            child_retention_days: self.child_retention_days.or(base.child_retention_days),
            delete_all: self.delete_all.or(base.delete_all),
            include_children: self.include_children.or(base.include_children),
            remove_parent: self.remove_parent.or(base.remove_parent),
            keep_newest_children: self.keep_newest_children.or(base.keep_newest_children),
            delete_dependents: self.delete_dependents.or(base.delete_dependents),
            missing_timestamp: self.missing_timestamp.or(base.missing_timestamp),
            batch_size: self.batch_size.or(base.batch_size),
        }
    }
}
