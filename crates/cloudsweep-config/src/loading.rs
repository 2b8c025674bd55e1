use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::defaults::{CONFIG_ENV_VAR, DEFAULT_CONFIG_FILE};
use crate::errors::ConfigError;
use crate::rules::{RuleOverrides, RuleSet, resolve, validate_batch_size};
use crate::types::{ResourceClass, SweepConfig};

/// Where the config file should be read from, and whether its absence is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub explicit: bool,
}

/// Priority: CLI flag > `CLOUDSWEEP_CONFIG` > `./cloudsweep.toml`.
pub fn resolve_config_path(cli_path: Option<&Path>) -> ConfigSource {
    if let Some(path) = cli_path {
        return ConfigSource {
            path: path.to_path_buf(),
            explicit: true,
        };
    }
    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR)
        && !env_path.trim().is_empty()
    {
        return ConfigSource {
            path: PathBuf::from(env_path),
            explicit: true,
        };
    }
    ConfigSource {
        path: PathBuf::from(DEFAULT_CONFIG_FILE),
        explicit: false,
    }
}

impl SweepConfig {
    /// Load configuration from `source`.
    ///
    /// A missing file is an error only when the path was asked for explicitly;
    /// otherwise the built-in defaults are used.
    pub fn load(source: &ConfigSource) -> Result<SweepConfig, ConfigError> {
        if !source.path.exists() {
            if source.explicit {
                return Err(ConfigError::ConfigNotFound {
                    path: source.path.display().to_string(),
                });
            }
            info!(
                event = "config.load_defaults",
                path = %source.path.display(),
                "No config file found, using built-in defaults"
            );
            return Ok(SweepConfig::default());
        }

        let content = std::fs::read_to_string(&source.path)?;
        let config = SweepConfig::from_toml(&content)?;
        debug!(
            event = "config.loaded",
            path = %source.path.display(),
            batch_size = config.batch_size
        );
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<SweepConfig, ConfigError> {
        let config: SweepConfig =
            toml::from_str(content).map_err(|e| ConfigError::ConfigParseError {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything that can be checked without knowing the overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_batch_size(self.batch_size)?;
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidConfiguration {
                message: "retry.max_attempts must be at least 1".to_string(),
            });
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::InvalidConfiguration {
                message: "retry.base_delay_ms must not exceed retry.max_delay_ms".to_string(),
            });
        }
        for class in ResourceClass::ALL {
            resolve(class, self, &RuleOverrides::default())?;
        }
        Ok(())
    }

    /// Freeze the rule set for one class.
    pub fn rule_set(
        &self,
        class: ResourceClass,
        overrides: &RuleOverrides,
    ) -> Result<RuleSet, ConfigError> {
        resolve(class, self, overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_resolve_config_path_prefers_cli() {
        temp_env::with_var(CONFIG_ENV_VAR, Some("/from/env.toml"), || {
            let source = resolve_config_path(Some(Path::new("/from/cli.toml")));
            assert_eq!(source.path, PathBuf::from("/from/cli.toml"));
            assert!(source.explicit);
        });
    }

    #[test]
    fn test_resolve_config_path_uses_env() {
        temp_env::with_var(CONFIG_ENV_VAR, Some("/from/env.toml"), || {
            let source = resolve_config_path(None);
            assert_eq!(source.path, PathBuf::from("/from/env.toml"));
            assert!(source.explicit);
        });
    }

    #[test]
    fn test_resolve_config_path_falls_back_to_default() {
        temp_env::with_var_unset(CONFIG_ENV_VAR, || {
            let source = resolve_config_path(None);
            assert_eq!(source.path, PathBuf::from(DEFAULT_CONFIG_FILE));
            assert!(!source.explicit);
        });
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let source = ConfigSource {
            path: PathBuf::from("/definitely/not/here/cloudsweep.toml"),
            explicit: true,
        };
        let err = SweepConfig::load(&source).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_load_missing_default_file_uses_defaults() {
        let source = ConfigSource {
            path: PathBuf::from("/definitely/not/here/cloudsweep.toml"),
            explicit: false,
        };
        let config = SweepConfig::load(&source).unwrap();
        assert_eq!(config, SweepConfig::default());
    }

    #[test]
    fn test_load_full_file() {
        let file = write_config(
            r#"
region = "eu-west-1"
batch_size = 500

[retry]
max_attempts = 5
base_delay_ms = 100
max_delay_ms = 1000

[rules.s3_bucket]
name_prefixes = ["tmp-", "scratch-"]
ignore = ["tmp-keep"]
require_tag = { key = "team", value = "data" }
retention_days = 14
child_retention_days = 3

[rules.iam_role]
name_patterns = ["ci-*"]
missing_timestamp = "excluded"
"#,
        );
        let source = ConfigSource {
            path: file.path().to_path_buf(),
            explicit: true,
        };
        let config = SweepConfig::load(&source).unwrap();
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.retry.max_attempts, 5);

        let s3 = config
            .rule_set(ResourceClass::S3Bucket, &RuleOverrides::default())
            .unwrap();
        assert_eq!(s3.name_prefixes, vec!["tmp-", "scratch-"]);
        assert!(s3.ignore.contains("tmp-keep"));
        assert_eq!(s3.retention, TimeDelta::days(14));
        assert_eq!(s3.child_retention, TimeDelta::days(3));
        assert_eq!(s3.batch_size, 500);
        assert_eq!(
            s3.require_tag.as_ref().and_then(|t| t.value.as_deref()),
            Some("data")
        );

        let role = config
            .rule_set(ResourceClass::IamRole, &RuleOverrides::default())
            .unwrap();
        assert_eq!(role.name_patterns.len(), 1);
        assert_eq!(
            role.missing_timestamp,
            crate::types::MissingTimestampPolicy::Excluded
        );
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = SweepConfig::from_toml("batch_size = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }

    #[test]
    fn test_batch_size_above_cap_is_invalid() {
        let err = SweepConfig::from_toml("batch_size = 5000").unwrap_err();
        assert!(err.to_string().contains("batch_size must be between 1 and 1000"));
    }

    #[test]
    fn test_zero_retry_attempts_is_invalid() {
        let err = SweepConfig::from_toml("[retry]\nmax_attempts = 0").unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_invalid_pattern_detected_at_load() {
        let err =
            SweepConfig::from_toml("[rules.log_group]\nname_patterns = [\"/aws/[\"]").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_huge_retention_is_invalid_not_a_panic() {
        let err = SweepConfig::from_toml("[rules.iam_role]\nretention_days = 200000000000\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("[rules.iam_role] retention_days out of range"));
    }

    #[test]
    fn test_delete_dependents_can_be_disabled() {
        let config =
            SweepConfig::from_toml("[rules.ec2_instance]\ndelete_dependents = false\n").unwrap();
        let rules = config
            .rule_set(ResourceClass::Ec2Instance, &RuleOverrides::default())
            .unwrap();
        assert!(!rules.delete_dependents);
        let lambda = config
            .rule_set(ResourceClass::LambdaFunction, &RuleOverrides::default())
            .unwrap();
        assert!(lambda.delete_dependents);
        assert_eq!(lambda.keep_newest_children, 3);
    }
}
