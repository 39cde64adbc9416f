//! Improvement tracker
//!
//! Records what happened after recommendations were acted on, keeps an EMA
//! success rate per `category:priority:risk_level` pattern, and predicts how
//! likely a new recommendation is to succeed.

mod report;
mod store;

pub use report::{classify_trend, ImprovementStats, LearningReport, RateStat, Trend};
pub use store::MetricSnapshot;

use crate::models::{
    Category, ImprovementOutcome, ImprovementRecommendation, Priority, QualityMetrics, RiskLevel,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use store::Store;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Only outcomes above this rate update success patterns
pub const PATTERN_THRESHOLD: f64 = 0.7;
/// EMA smoothing factor
pub const EMA_ALPHA: f64 = 0.2;
/// Matching outcomes considered by a prediction
pub const PREDICTION_WINDOW: usize = 20;
pub const BASE_PROBABILITY: f64 = 0.7;
pub const MIN_PROBABILITY: f64 = 0.3;
pub const MAX_PROBABILITY: f64 = 0.95;

pub const SUCCESS_RATE_METRIC: &str = "success_rate";
pub const QUALITY_IMPROVEMENT_METRIC: &str = "quality_improvement";

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type TrackerResult<T> = Result<T, TrackerError>;

/// One row of `improvement_outcomes`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRow {
    pub recommendation_id: String,
    pub category: Category,
    pub priority: Priority,
    pub risk_level: RiskLevel,
    pub breaking_change_probability: f64,
    pub implemented: bool,
    pub quality_before_overall: f64,
    pub quality_after_overall: Option<f64>,
    pub success_rate: f64,
    pub quality_improvement: f64,
    pub actual_vs_predicted_risk: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternDetails {
    pub category: Category,
    pub priority: Priority,
    pub risk_level: RiskLevel,
}

/// Aggregate success statistics for one pattern key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessPattern {
    pub pattern_key: String,
    pub details: PatternDetails,
    pub success_rate: f64,
    pub sample_count: u64,
    pub last_updated: DateTime<Utc>,
}

/// Result of [`ImprovementTracker::track_outcome`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackResult {
    pub success: bool,
    pub outcome_id: Option<u64>,
    pub success_rate: f64,
    pub quality_improvement: f64,
    pub error: Option<String>,
}

/// Fold one outcome into a pattern
///
/// Returns `None` when the outcome does not qualify (rate ≤ 0.7).
pub fn update_pattern(
    existing: Option<SuccessPattern>,
    rec: &ImprovementRecommendation,
    success_rate: f64,
    now: DateTime<Utc>,
) -> Option<SuccessPattern> {
    if success_rate <= PATTERN_THRESHOLD {
        return None;
    }
    Some(match existing {
        Some(mut pattern) => {
            pattern.success_rate = ((1.0 - EMA_ALPHA) * pattern.success_rate
                + EMA_ALPHA * success_rate)
                .clamp(0.0, 1.0);
            pattern.sample_count += 1;
            pattern.last_updated = now;
            pattern
        }
        None => SuccessPattern {
            pattern_key: rec.pattern_key(),
            details: PatternDetails {
                category: rec.category,
                priority: rec.priority,
                risk_level: rec.risk_level,
            },
            success_rate,
            sample_count: 1,
            last_updated: now,
        },
    })
}

// JSON has no NaN; keep stored rows readable
fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Prediction used when there is no history for a pattern
pub fn prior_probability(risk_level: RiskLevel) -> f64 {
    let delta = match risk_level {
        RiskLevel::Low => 0.1,
        RiskLevel::Medium => 0.0,
        RiskLevel::High => -0.1,
        RiskLevel::Critical => -0.2,
    };
    (BASE_PROBABILITY + delta).clamp(MIN_PROBABILITY, MAX_PROBABILITY)
}

/// Recency-weighted blend of matching outcomes (most recent first) and the
/// pattern EMA, clamped to `[0.3, 0.95]`
pub fn blend_prediction(
    recent: &[OutcomeRow],
    pattern: Option<&SuccessPattern>,
    risk_level: RiskLevel,
) -> f64 {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    for (rank, row) in recent.iter().enumerate() {
        let weight = 1.0 / (rank as f64 + 1.0);
        weighted += weight * row.success_rate;
        total_weight += weight;
    }
    if let Some(pattern) = pattern {
        let weight = 1.0 / (recent.len() as f64 + 1.0);
        weighted += weight * pattern.success_rate;
        total_weight += weight;
    }

    if total_weight == 0.0 {
        return prior_probability(risk_level);
    }
    (weighted / total_weight).clamp(MIN_PROBABILITY, MAX_PROBABILITY)
}

/// Learning loop over a redb statistics store
pub struct ImprovementTracker {
    store: Store,
    path: PathBuf,
}

impl ImprovementTracker {
    /// Open (or create) the store at `path`
    pub fn open(path: impl AsRef<Path>) -> TrackerResult<Self> {
        let path = path.as_ref().to_path_buf();
        let store = Store::open(&path)?;
        info!("Improvement tracker using {}", path.display());
        Ok(Self { store, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist an outcome and update statistics as one unit of work
    pub fn track_outcome(
        &self,
        rec: &ImprovementRecommendation,
        outcome: &ImprovementOutcome,
        quality_before: &QualityMetrics,
    ) -> TrackResult {
        let success_rate = outcome.success_rate(quality_before);
        let before = quality_before.overall_score();
        let after = outcome.quality_after.map(|m| m.overall_score());
        let quality_improvement = after.map(|a| a - before).unwrap_or(0.0);
        let now = Utc::now();

        let row = OutcomeRow {
            recommendation_id: outcome.recommendation_id.clone(),
            category: rec.category,
            priority: rec.priority,
            risk_level: rec.risk_level,
            breaking_change_probability: finite_or(rec.breaking_change_probability, 1.0)
                .clamp(0.0, 1.0),
            implemented: outcome.implemented,
            quality_before_overall: before,
            quality_after_overall: after,
            success_rate,
            quality_improvement,
            actual_vs_predicted_risk: finite_or(outcome.actual_vs_predicted_risk, 1.0)
                .clamp(-1.0, 1.0),
            timestamp: now,
        };
        let snapshots = [
            MetricSnapshot {
                metric_name: SUCCESS_RATE_METRIC.to_string(),
                metric_value: success_rate,
                confidence: 1.0,
                timestamp: now,
            },
            MetricSnapshot {
                metric_name: QUALITY_IMPROVEMENT_METRIC.to_string(),
                metric_value: quality_improvement,
                confidence: 1.0,
                timestamp: now,
            },
        ];

        let key = rec.pattern_key();
        match self.store.record_outcome(
            &row,
            &key,
            |existing| update_pattern(existing, rec, success_rate, now),
            &snapshots,
        ) {
            Ok(outcome_id) => {
                info!(
                    "Tracked outcome #{} for {} ({}): success rate {:.3}",
                    outcome_id, outcome.recommendation_id, key, success_rate
                );
                TrackResult {
                    success: true,
                    outcome_id: Some(outcome_id),
                    success_rate,
                    quality_improvement,
                    error: None,
                }
            }
            Err(e) => {
                error!(
                    "Failed to track outcome for {}: {}",
                    outcome.recommendation_id, e
                );
                TrackResult {
                    success: false,
                    outcome_id: None,
                    success_rate,
                    quality_improvement,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Likelihood that `rec` will succeed, in `[0.3, 0.95]`
    pub fn predict_success_probability(&self, rec: &ImprovementRecommendation) -> f64 {
        let history = self
            .store
            .recent_matching(rec.category, rec.priority, rec.risk_level, PREDICTION_WINDOW)
            .and_then(|recent| Ok((recent, self.store.pattern(&rec.pattern_key())?)));

        match history {
            Ok((recent, pattern)) => {
                let p = blend_prediction(&recent, pattern.as_ref(), rec.risk_level);
                debug!(
                    "Predicted {:.3} for {} from {} outcome(s)",
                    p,
                    rec.pattern_key(),
                    recent.len()
                );
                p
            }
            Err(e) => {
                warn!("Prediction falling back to the prior: {}", e);
                prior_probability(rec.risk_level)
            }
        }
    }

    /// Patterns with at least `min_samples` samples, best first
    pub fn get_success_patterns(&self, min_samples: u64) -> TrackerResult<Vec<SuccessPattern>> {
        let mut patterns: Vec<SuccessPattern> = self
            .store
            .patterns()?
            .into_iter()
            .filter(|p| p.sample_count >= min_samples)
            .collect();
        patterns.sort_by(|a, b| {
            b.success_rate
                .total_cmp(&a.success_rate)
                .then(b.sample_count.cmp(&a.sample_count))
        });
        Ok(patterns)
    }

    pub fn generate_learning_report(&self) -> TrackerResult<LearningReport> {
        let rows = self.store.outcomes()?;
        let patterns = self.store.patterns()?;
        let snapshots = self.store.metrics(SUCCESS_RATE_METRIC)?;
        Ok(report::build_report(&rows, patterns, &snapshots))
    }

    /// Append a metric snapshot
    pub fn record_metric(&self, name: &str, value: f64, confidence: f64) -> TrackerResult<u64> {
        let id = self.store.append_metric(&MetricSnapshot {
            metric_name: name.to_string(),
            metric_value: finite_or(value, 0.0),
            confidence: finite_or(confidence, 0.0).clamp(0.0, 1.0),
            timestamp: Utc::now(),
        })?;
        debug!("Recorded metric {} = {}", name, value);
        Ok(id)
    }

    /// Snapshots of one metric, oldest first
    pub fn metric_history(&self, name: &str) -> TrackerResult<Vec<MetricSnapshot>> {
        self.store.metrics(name)
    }

    /// All recorded outcomes, oldest first
    pub fn outcomes(&self) -> TrackerResult<Vec<OutcomeRow>> {
        self.store.outcomes()
    }
}
