//! Learning report aggregation

use super::store::MetricSnapshot;
use super::{OutcomeRow, SuccessPattern};
use crate::models::{Category, Priority};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const TREND_WINDOW: usize = 5;
pub const TREND_DELTA: f64 = 0.05;
pub const TOP_PATTERNS: usize = 5;
pub const MIN_OUTCOMES: usize = 10;

/// Direction of the success-rate snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
    InsufficientData,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Declining => "declining",
            Trend::InsufficientData => "insufficient_data",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateStat {
    pub success_rate: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImprovementStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Share of outcomes whose overall score went up
    pub positive_share: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningReport {
    pub generated_at: DateTime<Utc>,
    pub total_outcomes: usize,
    pub implemented_count: usize,
    pub overall_success_rate: Option<f64>,
    pub success_by_category: BTreeMap<Category, RateStat>,
    pub success_by_priority: BTreeMap<Priority, RateStat>,
    /// `1 − mean |actual_vs_predicted_risk|`
    pub risk_prediction_accuracy: Option<f64>,
    pub quality_improvement: Option<ImprovementStats>,
    pub trend: Trend,
    pub top_patterns: Vec<SuccessPattern>,
    pub recommendations: Vec<String>,
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn rate_by<K: Ord + Copy>(
    rows: &[OutcomeRow],
    key: impl Fn(&OutcomeRow) -> K,
) -> BTreeMap<K, RateStat> {
    let mut groups: BTreeMap<K, (f64, usize)> = BTreeMap::new();
    for row in rows {
        let entry = groups.entry(key(row)).or_insert((0.0, 0));
        entry.0 += row.success_rate;
        entry.1 += 1;
    }
    groups
        .into_iter()
        .map(|(k, (sum, count))| {
            (
                k,
                RateStat {
                    success_rate: sum / count as f64,
                    count,
                },
            )
        })
        .collect()
}

/// Compare the five most recent snapshots with the five before them
pub fn classify_trend(snapshots: &[MetricSnapshot]) -> Trend {
    if snapshots.len() < 2 * TREND_WINDOW {
        return Trend::InsufficientData;
    }
    let n = snapshots.len();
    let recent = mean(snapshots[n - TREND_WINDOW..].iter().map(|s| s.metric_value));
    let prior = mean(
        snapshots[n - 2 * TREND_WINDOW..n - TREND_WINDOW]
            .iter()
            .map(|s| s.metric_value),
    );
    match (recent, prior) {
        (Some(recent), Some(prior)) if recent - prior > TREND_DELTA => Trend::Improving,
        (Some(recent), Some(prior)) if recent - prior < -TREND_DELTA => Trend::Declining,
        _ => Trend::Stable,
    }
}

pub(super) fn build_report(
    rows: &[OutcomeRow],
    mut patterns: Vec<SuccessPattern>,
    success_snapshots: &[MetricSnapshot],
) -> LearningReport {
    let overall_success_rate = mean(rows.iter().map(|r| r.success_rate));
    let risk_prediction_accuracy = mean(
        rows.iter()
            .map(|r| r.actual_vs_predicted_risk.clamp(-1.0, 1.0).abs()),
    )
    .map(|error| 1.0 - error);

    let quality_improvement = mean(rows.iter().map(|r| r.quality_improvement)).map(|mean| {
        let positive = rows.iter().filter(|r| r.quality_improvement > 0.0).count();
        ImprovementStats {
            mean,
            min: rows
                .iter()
                .map(|r| r.quality_improvement)
                .fold(f64::INFINITY, f64::min),
            max: rows
                .iter()
                .map(|r| r.quality_improvement)
                .fold(f64::NEG_INFINITY, f64::max),
            positive_share: positive as f64 / rows.len() as f64,
        }
    });

    let success_by_category = rate_by(rows, |r| r.category);
    let success_by_priority = rate_by(rows, |r| r.priority);
    let trend = classify_trend(success_snapshots);

    patterns.sort_by(|a, b| {
        b.success_rate
            .total_cmp(&a.success_rate)
            .then(b.sample_count.cmp(&a.sample_count))
            .then_with(|| a.pattern_key.cmp(&b.pattern_key))
    });
    patterns.truncate(TOP_PATTERNS);

    let mut recommendations = Vec::new();
    if overall_success_rate.is_some_and(|rate| rate < 0.6) {
        recommendations.push(
            "Overall success rate is below 60%: prefer smaller, lower-risk recommendations"
                .to_string(),
        );
    }
    if risk_prediction_accuracy.is_some_and(|accuracy| accuracy < 0.7) {
        recommendations.push(
            "Risk predictions are less than 70% accurate: review the risk factor weights"
                .to_string(),
        );
    }
    for (category, stat) in &success_by_category {
        if stat.success_rate < 0.5 {
            recommendations.push(format!(
                "{} recommendations succeed {:.0}% of the time: add validation steps before applying them",
                category,
                stat.success_rate * 100.0
            ));
        }
    }
    if trend == Trend::Declining {
        recommendations.push(
            "Success rate is declining: compare recent outcomes against earlier ones".to_string(),
        );
    }
    if rows.len() < MIN_OUTCOMES {
        recommendations.push(format!(
            "Only {} outcome(s) recorded: track at least {} for reliable predictions",
            rows.len(),
            MIN_OUTCOMES
        ));
    }

    LearningReport {
        generated_at: Utc::now(),
        total_outcomes: rows.len(),
        implemented_count: rows.iter().filter(|r| r.implemented).count(),
        overall_success_rate,
        success_by_category,
        success_by_priority,
        risk_prediction_accuracy,
        quality_improvement,
        trend,
        top_patterns: patterns,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshots(values: &[f64]) -> Vec<MetricSnapshot> {
        values
            .iter()
            .map(|&v| MetricSnapshot {
                metric_name: "success_rate".to_string(),
                metric_value: v,
                confidence: 1.0,
                timestamp: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn test_trend_needs_ten_snapshots() {
        assert_eq!(
            classify_trend(&snapshots(&[0.5; 9])),
            Trend::InsufficientData
        );
        assert_eq!(classify_trend(&snapshots(&[0.5; 10])), Trend::Stable);
    }

    #[test]
    fn test_trend_direction() {
        let mut values = vec![0.4; 5];
        values.extend([0.8; 5]);
        assert_eq!(classify_trend(&snapshots(&values)), Trend::Improving);

        values.reverse();
        assert_eq!(classify_trend(&snapshots(&values)), Trend::Declining);

        // Only the last ten count
        let mut values = vec![0.0; 20];
        values.extend([0.7; 10]);
        assert_eq!(classify_trend(&snapshots(&values)), Trend::Stable);
    }

    #[test]
    fn test_small_delta_is_stable() {
        let mut values = vec![0.60; 5];
        values.extend([0.64; 5]);
        assert_eq!(classify_trend(&snapshots(&values)), Trend::Stable);
    }

    #[test]
    fn test_empty_report() {
        let report = build_report(&[], Vec::new(), &[]);
        assert_eq!(report.total_outcomes, 0);
        assert!(report.overall_success_rate.is_none());
        assert!(report.quality_improvement.is_none());
        assert_eq!(report.trend, Trend::InsufficientData);
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].starts_with("Only 0 outcome(s)"));
    }
}
