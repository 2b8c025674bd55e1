//! Configuration for cloudsweep.
//!
//! Loads the TOML config file, layers it over per-class defaults and
//! command-line overrides, and freezes the result into one [`RuleSet`] per
//! resource class.

pub mod defaults;
pub mod errors;
pub mod loading;
pub mod rules;
pub mod types;

pub use defaults::{CONFIG_ENV_VAR, DEFAULT_CONFIG_FILE, PROVIDER_BATCH_CAP};
pub use errors::ConfigError;
pub use loading::{ConfigSource, resolve_config_path};
pub use rules::{RuleOverrides, RuleSet};
pub use types::{
    MissingTimestampPolicy, ResourceClass, RetryConfig, RuleConfig, RulesConfig, Service,
    SweepConfig, TagRequirement,
};
