//! Configuration for repolift
//!
//! Read from `repolift.toml` or `.repoliftrc.json` in the repository root:
//! - scoring tiers and recommendation threshold
//! - risk approval threshold
//! - backup retention and size ceiling
//! - data locations
//! - exclusion globs

mod patterns;
mod settings;

pub use patterns::{compile_glob, compile_set, ExcludeMatcher, PatternError};
pub use settings::{
    load_config, ConfigError, ExcludeConfig, RepoliftConfig, RiskConfig, SafetyConfig,
    ScoringConfig, TrackerConfig,
};
