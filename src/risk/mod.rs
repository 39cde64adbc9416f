//! Breaking-change risk assessment
//!
//! Four sub-scores in [0, 1] are combined into a probability:
//!
//! ```text
//! p = .35·api + .25·dependency + .20·complexity_delta + .10·test_impact
//!     (+ .05 for architecture/security recommendations), clamped and rounded
//! ```
//!
//! Assessment never fails outward. Internal errors and panics are turned
//! into a conservative fallback (p = 0.8, confidence = 0.3) flagged with
//! `fallback = true`.

mod factors;
mod mitigation;

pub use factors::{is_core_path, is_manifest};
pub use mitigation::{BACKUP_FIRST, MANUAL_APPROVAL};

use crate::config::RiskConfig;
use crate::diff::diff_stats;
use crate::models::{Category, ImprovementRecommendation, RiskAssessment};
use factors::{RawFactors, SurfacePair};
use mitigation::SubScores;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const FALLBACK_PROBABILITY: f64 = 0.8;
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Errors raised while assessing; never escape [`RiskAssessor`]
#[derive(Error, Debug)]
pub enum RiskError {
    #[error("sub-score {name} is not finite ({value})")]
    NonFinite { name: &'static str, value: f64 },

    #[error("assessment panicked: {0}")]
    Panicked(String),
}

/// One entry of a batch assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub id: String,
    pub path: PathBuf,
    pub original: String,
    pub modified: String,
    #[serde(default)]
    pub recommendation: Option<ImprovementRecommendation>,
}

/// Every batch id appears in `assessments`; ids whose assessment fell back
/// are also listed in `failures` with the reason
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchAssessment {
    pub assessments: BTreeMap<String, RiskAssessment>,
    pub failures: BTreeMap<String, String>,
}

/// Scores proposed edits for breaking-change risk
#[derive(Debug, Clone, Default)]
pub struct RiskAssessor {
    config: RiskConfig,
}

impl RiskAssessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn approval_threshold(&self) -> f64 {
        self.config.approval_threshold
    }

    /// Assess replacing `original` with `modified` at `path`
    pub fn assess_change(
        &self,
        path: &Path,
        original: &str,
        modified: &str,
        recommendation: Option<&ImprovementRecommendation>,
    ) -> RiskAssessment {
        match self.try_assess(path, original, modified, recommendation) {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!("Risk assessment for {} fell back: {}", path.display(), e);
                fallback_assessment()
            }
        }
    }

    /// Assess many changes in parallel
    pub fn batch_assess(&self, items: &[BatchItem]) -> BatchAssessment {
        let results: Vec<(String, Result<RiskAssessment, RiskError>)> = items
            .par_iter()
            .map(|item| {
                let result = self.try_assess(
                    &item.path,
                    &item.original,
                    &item.modified,
                    item.recommendation.as_ref(),
                );
                (item.id.clone(), result)
            })
            .collect();

        let mut batch = BatchAssessment::default();
        for (id, result) in results {
            match result {
                Ok(assessment) => {
                    batch.assessments.insert(id, assessment);
                }
                Err(e) => {
                    warn!("Risk assessment for {} fell back: {}", id, e);
                    batch.failures.insert(id.clone(), e.to_string());
                    batch.assessments.insert(id, fallback_assessment());
                }
            }
        }
        debug!(
            "Batch assessed {} items, {} fell back",
            batch.assessments.len(),
            batch.failures.len()
        );
        batch
    }

    /// Assess every code change of a recommendation and keep the riskiest.
    ///
    /// A change without `original_code` is compared against the current file
    /// content supplied by `read_file` (empty when that returns `None`).
    /// Returns `None` for a recommendation without code changes.
    pub fn assess_recommendation<F>(
        &self,
        recommendation: &ImprovementRecommendation,
        read_file: F,
    ) -> Option<RiskAssessment>
    where
        F: Fn(&Path) -> Option<String>,
    {
        recommendation
            .code_changes
            .iter()
            .map(|change| {
                let original = if change.original_code.is_empty() {
                    read_file(&change.file_path).unwrap_or_default()
                } else {
                    change.original_code.clone()
                };
                self.assess_change(
                    &change.file_path,
                    &original,
                    &change.modified_code,
                    Some(recommendation),
                )
            })
            .max_by(|a, b| {
                a.breaking_change_probability
                    .total_cmp(&b.breaking_change_probability)
            })
    }

    /// Run the assessment, converting a panic into an error
    fn try_assess(
        &self,
        path: &Path,
        original: &str,
        modified: &str,
        recommendation: Option<&ImprovementRecommendation>,
    ) -> Result<RiskAssessment, RiskError> {
        catch_unwind(AssertUnwindSafe(|| {
            self.compute(path, original, modified, recommendation)
        }))
        .unwrap_or_else(|panic_info| {
            Err(RiskError::Panicked(crate::panic_message(
                panic_info.as_ref(),
            )))
        })
    }

    fn compute(
        &self,
        path: &Path,
        original: &str,
        modified: &str,
        recommendation: Option<&ImprovementRecommendation>,
    ) -> Result<RiskAssessment, RiskError> {
        let mut raw = RawFactors::new();
        let pair = SurfacePair::of(path, original, modified);

        let scores = SubScores {
            api: finite("api_change", factors::api_change(&pair, &mut raw))?,
            dependency: finite("dependency", factors::dependency(path, &pair, &mut raw))?,
            complexity: finite(
                "complexity_delta",
                factors::complexity_delta(path, original, modified, &mut raw),
            )?,
            test_impact: finite("test_impact", factors::test_impact(path))?,
        };

        let sensitive = recommendation
            .map(|r| matches!(r.category, Category::Architecture | Category::Security))
            .unwrap_or(false);
        let mut probability = 0.35 * scores.api
            + 0.25 * scores.dependency
            + 0.20 * scores.complexity
            + 0.10 * scores.test_impact;
        if sensitive {
            probability += 0.05;
        }
        let probability = round3(probability.clamp(0.0, 1.0));

        let stats = diff_stats(original, modified);
        raw.insert("lines_changed".into(), stats.changed_lines() as f64);
        let confidence = confidence(pair.both_parsed, stats.changed_lines());

        let mut impact_analysis = BTreeMap::new();
        impact_analysis.insert("api_change".to_string(), scores.api);
        impact_analysis.insert("dependency".to_string(), scores.dependency);
        impact_analysis.insert("complexity_delta".to_string(), scores.complexity);
        impact_analysis.insert("test_impact".to_string(), scores.test_impact);

        let requires_approval = probability > self.config.approval_threshold;
        debug!(
            "Assessed {}: p={:.3} confidence={:.2} approval={}",
            path.display(),
            probability,
            confidence,
            requires_approval
        );

        Ok(RiskAssessment {
            breaking_change_probability: probability,
            impact_analysis,
            risk_factors: raw,
            mitigation_steps: mitigation::mitigation_steps(
                &scores,
                probability,
                self.config.approval_threshold,
            ),
            confidence_score: confidence,
            requires_approval,
            fallback: false,
        })
    }
}

/// The conservative result used whenever an assessment fails
pub fn fallback_assessment() -> RiskAssessment {
    RiskAssessment {
        breaking_change_probability: FALLBACK_PROBABILITY,
        impact_analysis: BTreeMap::new(),
        risk_factors: BTreeMap::new(),
        mitigation_steps: mitigation::fallback_steps(),
        confidence_score: FALLBACK_CONFIDENCE,
        requires_approval: true,
        fallback: true,
    }
}

/// 0.7 base, ±parse quality, ±diff size, clamped to [0.3, 0.95]
fn confidence(both_parsed: bool, changed_lines: usize) -> f64 {
    let mut c: f64 = 0.7;
    c += if both_parsed { 0.1 } else { -0.2 };
    if changed_lines <= 20 {
        c += 0.1;
    } else if changed_lines > 200 {
        c -= 0.1;
    }
    c.clamp(0.3, 0.95)
}

fn finite(name: &'static str, value: f64) -> Result<f64, RiskError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RiskError::NonFinite { name, value })
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
