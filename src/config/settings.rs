//! `RepoliftConfig` and its loader
//!
//! ```toml
//! # repolift.toml
//!
//! [scoring]
//! tier_thresholds = [60, 70, 80, 90]
//! recommendation_threshold = 70.0
//!
//! [risk]
//! approval_threshold = 0.7
//!
//! [safety]
//! retention_days = 7
//! max_file_size = 1048576
//! backup_dir = "/var/tmp/repolift-backups"
//!
//! [tracker]
//! database = "/var/tmp/learning.redb"
//!
//! [exclude]
//! paths = ["generated/", "vendor/", "*.min.js"]
//! ```
//!
//! `.repoliftrc.json` holds the same tree as JSON. Every key is optional.

use super::patterns::{ExcludeMatcher, PatternError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("exclude.paths: {0}")]
    Pattern(#[from] PatternError),
}

/// Settings for every component, read from the repository root
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RepoliftConfig {
    pub scoring: ScoringConfig,
    pub risk: RiskConfig,
    pub safety: SafetyConfig,
    pub tracker: TrackerConfig,
    pub exclude: ExcludeConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Ascending poor/fair/good/excellent boundaries
    pub tier_thresholds: [f64; 4],
    /// A project dimension below this yields a recommendation
    pub recommendation_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            tier_thresholds: [60.0, 70.0, 80.0, 90.0],
            recommendation_threshold: 70.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Breaking-change probability above which approval is required
    pub approval_threshold: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            approval_threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Days finalized sessions are kept
    pub retention_days: u64,
    /// Largest content a validated apply will write, in bytes
    pub max_file_size: usize,
    pub backup_dir: Option<PathBuf>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            retention_days: 7,
            max_file_size: 1024 * 1024,
            backup_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TrackerConfig {
    pub database: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ExcludeConfig {
    /// Gitignore-style globs relative to the scored root
    pub paths: Vec<String>,
}

impl ExcludeConfig {
    pub fn matcher(&self) -> Result<ExcludeMatcher, PatternError> {
        ExcludeMatcher::new(&self.paths)
    }
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Toml,
    Json,
}

/// Candidate files, first readable and valid one wins
const SOURCES: [(&str, Format); 2] = [
    ("repolift.toml", Format::Toml),
    (".repoliftrc.json", Format::Json),
];

impl RepoliftConfig {
    /// Parse and check one config document
    fn parse(text: &str, format: Format) -> Result<Self, ConfigError> {
        let config: Self = match format {
            Format::Toml => toml::from_str(text)?,
            Format::Json => serde_json::from_str(text)?,
        };
        config.check()?;
        Ok(config)
    }

    fn read(path: &Path, format: Format) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, format)
    }

    /// Reject values the components cannot work with
    pub fn check(&self) -> Result<(), ConfigError> {
        let tiers = &self.scoring.tier_thresholds;
        if !tiers.iter().all(|t| (0.0..=100.0).contains(t)) || !tiers.windows(2).all(|w| w[0] <= w[1])
        {
            return Err(ConfigError::Invalid {
                key: "scoring.tier_thresholds",
                message: format!("{:?} must be ascending values in 0..=100", tiers),
            });
        }
        if !(0.0..=1.0).contains(&self.risk.approval_threshold) {
            return Err(ConfigError::Invalid {
                key: "risk.approval_threshold",
                message: format!("{} is outside 0..=1", self.risk.approval_threshold),
            });
        }
        self.exclude.matcher()?;
        Ok(())
    }
}

/// Load the configuration for `repo`
///
/// A file that cannot be read or fails its checks is skipped with a warning;
/// with nothing usable the defaults apply.
pub fn load_config(repo: &Path) -> RepoliftConfig {
    for (name, format) in SOURCES {
        let path = repo.join(name);
        if !path.is_file() {
            continue;
        }
        match RepoliftConfig::read(&path, format) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                return config;
            }
            Err(e) => warn!("Ignoring {}: {}", path.display(), e),
        }
    }
    debug!("No usable config under {}, using defaults", repo.display());
    RepoliftConfig::default()
}
