use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// One category of cloud entity managed uniformly by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    S3Bucket,
    Ec2Instance,
    EbsVolume,
    EbsSnapshot,
    LambdaFunction,
    LogGroup,
    IamRole,
    IamUser,
    IamPolicy,
}

impl ResourceClass {
    pub const ALL: [ResourceClass; 9] = [
        ResourceClass::S3Bucket,
        ResourceClass::Ec2Instance,
        ResourceClass::EbsVolume,
        ResourceClass::EbsSnapshot,
        ResourceClass::LambdaFunction,
        ResourceClass::LogGroup,
        ResourceClass::IamRole,
        ResourceClass::IamUser,
        ResourceClass::IamPolicy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceClass::S3Bucket => "s3_bucket",
            ResourceClass::Ec2Instance => "ec2_instance",
            ResourceClass::EbsVolume => "ebs_volume",
            ResourceClass::EbsSnapshot => "ebs_snapshot",
            ResourceClass::LambdaFunction => "lambda_function",
            ResourceClass::LogGroup => "log_group",
            ResourceClass::IamRole => "iam_role",
            ResourceClass::IamUser => "iam_user",
            ResourceClass::IamPolicy => "iam_policy",
        }
    }

    pub fn service(&self) -> Service {
        match self {
            ResourceClass::S3Bucket => Service::S3,
            ResourceClass::Ec2Instance => Service::Ec2,
            ResourceClass::EbsVolume | ResourceClass::EbsSnapshot => Service::Ebs,
            ResourceClass::LambdaFunction => Service::Lambda,
            ResourceClass::LogGroup => Service::Cloudwatch,
            ResourceClass::IamRole | ResourceClass::IamUser | ResourceClass::IamPolicy => {
                Service::Iam
            }
        }
    }

    /// Human label for the child entries of this class, if it has any.
    pub fn child_noun(&self) -> Option<&'static str> {
        match self {
            ResourceClass::S3Bucket => Some("object version"),
            ResourceClass::LambdaFunction => Some("function version"),
            ResourceClass::LogGroup => Some("log stream"),
            _ => None,
        }
    }

    /// Whether deleting a parent of this class also removes any child
    /// entries still attached to it. Buckets must be emptied first.
    pub fn parent_delete_removes_children(&self) -> bool {
        matches!(
            self,
            ResourceClass::LambdaFunction | ResourceClass::LogGroup
        )
    }
}

impl std::fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ResourceClass {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceClass::ALL
            .into_iter()
            .find(|class| class.as_str() == s.to_lowercase())
            .ok_or_else(|| ConfigError::UnknownResourceClass {
                name: s.to_string(),
                supported: ResourceClass::ALL
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Cloud service grouping used on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    S3,
    Ec2,
    Ebs,
    Lambda,
    Cloudwatch,
    Iam,
    All,
}

impl Service {
    pub const SELECTABLE: [Service; 7] = [
        Service::S3,
        Service::Ec2,
        Service::Ebs,
        Service::Lambda,
        Service::Cloudwatch,
        Service::Iam,
        Service::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Service::S3 => "s3",
            Service::Ec2 => "ec2",
            Service::Ebs => "ebs",
            Service::Lambda => "lambda",
            Service::Cloudwatch => "cloudwatch",
            Service::Iam => "iam",
            Service::All => "all",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Service::S3 => "S3 Storage",
            Service::Ec2 => "EC2 Compute",
            Service::Ebs => "EBS Storage",
            Service::Lambda => "Lambda Functions",
            Service::Cloudwatch => "CloudWatch",
            Service::Iam => "Identity & Access",
            Service::All => "All Services",
        }
    }

    /// Resource classes covered by this service, in discovery order.
    pub fn classes(&self) -> Vec<ResourceClass> {
        match self {
            Service::All => ResourceClass::ALL.to_vec(),
            service => ResourceClass::ALL
                .into_iter()
                .filter(|class| class.service() == *service)
                .collect(),
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Service {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Service::SELECTABLE
            .into_iter()
            .find(|service| service.as_str() == s.to_lowercase())
            .ok_or_else(|| {
                format!(
                    "Unknown service '{}'. Known services: s3, ec2, ebs, lambda, cloudwatch, iam, all",
                    s
                )
            })
    }
}

/// What the age gate does with a resource that carries no timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingTimestampPolicy {
    /// An untracked resource cannot be proven recent.
    #[default]
    Eligible,
    Excluded,
}

/// Required tag constraint. A `None` value only requires the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRequirement {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Raw per-class rule table as written in the config file.
///
/// Every field is optional so an absent key falls back to the class default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleConfig {
    pub enabled: Option<bool>,
    pub name_prefixes: Option<Vec<String>>,
    pub name_patterns: Option<Vec<String>>,
    pub targets: Option<Vec<String>>,
    pub ignore: Option<Vec<String>>,
    pub require_tag: Option<TagRequirement>,
    pub states: Option<Vec<String>>,
    pub retention_days: Option<i64>,
    pub child_retention_days: Option<i64>,
    pub delete_all: Option<bool>,
    pub include_children: Option<bool>,
    pub remove_parent: Option<bool>,
    pub keep_newest_children: Option<usize>,
    /// Also delete resources in other classes that hang off a deleted
    /// resource of this class (attached volumes, function log groups).
    pub delete_dependents: Option<bool>,
    pub missing_timestamp: Option<MissingTimestampPolicy>,
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RulesConfig {
    pub s3_bucket: Option<RuleConfig>,
    pub ec2_instance: Option<RuleConfig>,
    pub ebs_volume: Option<RuleConfig>,
    pub ebs_snapshot: Option<RuleConfig>,
    pub lambda_function: Option<RuleConfig>,
    pub log_group: Option<RuleConfig>,
    pub iam_role: Option<RuleConfig>,
    pub iam_user: Option<RuleConfig>,
    pub iam_policy: Option<RuleConfig>,
}

impl RulesConfig {
    pub fn get(&self, class: ResourceClass) -> Option<&RuleConfig> {
        match class {
            ResourceClass::S3Bucket => self.s3_bucket.as_ref(),
            ResourceClass::Ec2Instance => self.ec2_instance.as_ref(),
            ResourceClass::EbsVolume => self.ebs_volume.as_ref(),
            ResourceClass::EbsSnapshot => self.ebs_snapshot.as_ref(),
            ResourceClass::LambdaFunction => self.lambda_function.as_ref(),
            ResourceClass::LogGroup => self.log_group.as_ref(),
            ResourceClass::IamRole => self.iam_role.as_ref(),
            ResourceClass::IamUser => self.iam_user.as_ref(),
            ResourceClass::IamPolicy => self.iam_policy.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    pub region: Option<String>,
    pub batch_size: usize,
    pub retry: RetryConfig,
    pub rules: RulesConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            region: None,
            batch_size: crate::defaults::PROVIDER_BATCH_CAP,
            retry: RetryConfig::default(),
            rules: RulesConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_resource_class_round_trips_through_str() {
        for class in ResourceClass::ALL {
            assert_eq!(ResourceClass::from_str(class.as_str()).unwrap(), class);
        }
        assert_eq!(
            ResourceClass::from_str("S3_BUCKET").unwrap(),
            ResourceClass::S3Bucket
        );
    }

    #[test]
    fn test_resource_class_from_str_lists_supported() {
        let err = ResourceClass::from_str("rds_cluster").unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("Unknown resource class 'rds_cluster'"));
        assert!(msg.contains("s3_bucket"));
        assert!(msg.contains("iam_policy"));
    }

    #[test]
    fn test_service_classes() {
        assert_eq!(Service::S3.classes(), vec![ResourceClass::S3Bucket]);
        assert_eq!(
            Service::Ebs.classes(),
            vec![ResourceClass::EbsVolume, ResourceClass::EbsSnapshot]
        );
        assert_eq!(
            Service::Iam.classes(),
            vec![
                ResourceClass::IamRole,
                ResourceClass::IamUser,
                ResourceClass::IamPolicy
            ]
        );
        assert_eq!(Service::All.classes().len(), ResourceClass::ALL.len());
    }

    #[test]
    fn test_service_from_str() {
        assert_eq!(Service::from_str("cloudwatch"), Ok(Service::Cloudwatch));
        assert_eq!(Service::from_str("ALL"), Ok(Service::All));
        assert!(Service::from_str("rds").is_err());
    }

    #[test]
    fn test_rule_config_rejects_unknown_fields() {
        let result: Result<RuleConfig, _> = toml::from_str("retention = 3");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_timestamp_policy_parses_lowercase() {
        let rule: RuleConfig = toml::from_str(r#"missing_timestamp = "excluded""#).unwrap();
        assert_eq!(
            rule.missing_timestamp,
            Some(MissingTimestampPolicy::Excluded)
        );
    }

    #[test]
    fn test_parent_delete_removes_children() {
        assert!(ResourceClass::LambdaFunction.parent_delete_removes_children());
        assert!(ResourceClass::LogGroup.parent_delete_removes_children());
        assert!(!ResourceClass::S3Bucket.parent_delete_removes_children());
    }
}
