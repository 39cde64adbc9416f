//! Improvement tracker contract tests

use chrono::Utc;
use proptest::prelude::*;
use repolift::models::{
    Category, ImprovementOutcome, ImprovementRecommendation, Issue, Priority, QualityMetrics,
    RiskLevel, Severity,
};
use repolift::tracker::{update_pattern, ImprovementTracker, Trend, SUCCESS_RATE_METRIC};
use std::path::PathBuf;

fn store_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("data").join("learning.redb")
}

fn rec(id: &str, category: Category, risk_level: RiskLevel) -> ImprovementRecommendation {
    ImprovementRecommendation::new(id, category, Priority::High, risk_level)
}

fn outcome(id: &str, improved: bool, critical: bool, risk_error: f64) -> ImprovementOutcome {
    ImprovementOutcome {
        recommendation_id: id.to_string(),
        implemented: true,
        quality_after: Some(QualityMetrics::uniform(if improved { 80.0 } else { 40.0 })),
        issues_introduced: if critical {
            vec![Issue::new(Severity::Critical, "broke the build")]
        } else {
            Vec::new()
        },
        actual_vs_predicted_risk: risk_error,
    }
}

#[test]
fn test_critical_security_without_history_predicts_half() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ImprovementTracker::open(store_path(&dir)).unwrap();
    let r = rec("sec-1", Category::Security, RiskLevel::Critical);
    assert!((tracker.predict_success_probability(&r) - 0.5).abs() < 1e-9);
}

#[test]
fn test_outcomes_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let before = QualityMetrics::uniform(50.0);
    let r = rec("m-1", Category::Maintainability, RiskLevel::Low);
    {
        let tracker = ImprovementTracker::open(store_path(&dir)).unwrap();
        let result = tracker.track_outcome(&r, &outcome("m-1", true, false, 0.0), &before);
        assert!(result.success);
        assert_eq!(result.outcome_id, Some(1));
    }

    let tracker = ImprovementTracker::open(store_path(&dir)).unwrap();
    let outcomes = tracker.outcomes().unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].recommendation_id, "m-1");
    assert!((outcomes[0].quality_after_overall.unwrap() - 80.0).abs() < 1e-9);

    let patterns = tracker.get_success_patterns(1).unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].pattern_key, "maintainability:high:low");

    // Ids keep increasing after reopen
    let result = tracker.track_outcome(&r, &outcome("m-2", true, false, 0.0), &before);
    assert_eq!(result.outcome_id, Some(2));
}

#[test]
fn test_success_rate_formula() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ImprovementTracker::open(store_path(&dir)).unwrap();
    let before = QualityMetrics::uniform(50.0);
    let r = rec("p-1", Category::Performance, RiskLevel::Medium);

    // 0.5 improved + 0.3 no critical + 0.2 × (1 − 0.5)
    let result = tracker.track_outcome(&r, &outcome("p-1", true, false, 0.5), &before);
    assert!((result.success_rate - 0.9).abs() < 1e-9);
    assert!((result.quality_improvement - 30.0).abs() < 1e-9);

    // Not improved, critical issue, perfect prediction: 0.2
    let result = tracker.track_outcome(&r, &outcome("p-2", false, true, 0.0), &before);
    assert!((result.success_rate - 0.2).abs() < 1e-9);
    assert!((result.quality_improvement + 10.0).abs() < 1e-9);

    // Only the first outcome qualified for the pattern
    let patterns = tracker.get_success_patterns(0).unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].sample_count, 1);
    assert!((patterns[0].success_rate - 0.9).abs() < 1e-9);
}

#[test]
fn test_repeated_success_saturates_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ImprovementTracker::open(store_path(&dir)).unwrap();
    let before = QualityMetrics::uniform(50.0);
    let r = rec("t-1", Category::Testing, RiskLevel::Low);

    let mut last = 0.0;
    for i in 0..5 {
        let result =
            tracker.track_outcome(&r, &outcome(&format!("t-{}", i), true, false, 0.0), &before);
        assert!(result.success);
        let pattern = tracker.get_success_patterns(0).unwrap().remove(0);
        assert!(pattern.success_rate >= last);
        assert!(pattern.success_rate <= 1.0);
        assert_eq!(pattern.sample_count, i + 1);
        last = pattern.success_rate;
    }
}

#[test]
fn test_prediction_follows_history() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ImprovementTracker::open(store_path(&dir)).unwrap();
    let before = QualityMetrics::uniform(50.0);
    let r = rec("a-1", Category::Architecture, RiskLevel::High);
    let other = rec("a-2", Category::Architecture, RiskLevel::Low);

    for i in 0..3 {
        tracker.track_outcome(&r, &outcome(&format!("bad-{}", i), false, true, 1.0), &before);
    }
    // Three failures at 0.0 clamp to the floor
    assert!((tracker.predict_success_probability(&r) - 0.3).abs() < 1e-9);
    // Other risk levels are not affected
    assert!((tracker.predict_success_probability(&other) - 0.8).abs() < 1e-9);
}

#[test]
fn test_learning_report() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ImprovementTracker::open(store_path(&dir)).unwrap();
    let before = QualityMetrics::uniform(50.0);
    let sec = rec("s", Category::Security, RiskLevel::Medium);
    let perf = rec("p", Category::Performance, RiskLevel::Medium);

    tracker.track_outcome(&sec, &outcome("s-1", true, false, 0.0), &before);
    tracker.track_outcome(&perf, &outcome("p-1", false, true, 0.4), &before);

    let report = tracker.generate_learning_report().unwrap();
    assert_eq!(report.total_outcomes, 2);
    assert_eq!(report.implemented_count, 2);
    assert!((report.success_by_category[&Category::Security].success_rate - 1.0).abs() < 1e-9);
    assert_eq!(report.success_by_category[&Category::Performance].count, 1);
    assert!((report.risk_prediction_accuracy.unwrap() - 0.8).abs() < 1e-9);

    let q = report.quality_improvement.unwrap();
    assert!((q.max - 30.0).abs() < 1e-9);
    assert!((q.min + 10.0).abs() < 1e-9);
    assert!((q.positive_share - 0.5).abs() < 1e-9);

    assert_eq!(report.trend, Trend::InsufficientData);
    assert_eq!(report.top_patterns.len(), 1);
    // performance at 0.12 and fewer than ten outcomes
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.starts_with("performance recommendations")));
    assert!(report.recommendations.iter().any(|r| r.starts_with("Only 2")));
}

#[test]
fn test_trend_from_metric_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ImprovementTracker::open(store_path(&dir)).unwrap();
    for value in [0.9, 0.9, 0.9, 0.9, 0.9, 0.5, 0.5, 0.5, 0.5, 0.5] {
        tracker.record_metric(SUCCESS_RATE_METRIC, value, 1.0).unwrap();
    }
    let report = tracker.generate_learning_report().unwrap();
    assert_eq!(report.trend, Trend::Declining);
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.starts_with("Success rate is declining")));
}

proptest! {
    #[test]
    fn prop_ema_rises_without_exceeding_one(start in 0.71f64..=1.0, steps in 1usize..40) {
        let r = rec("e", Category::Testing, RiskLevel::Low);
        let now = Utc::now();
        let mut pattern = update_pattern(None, &r, start, now).unwrap();
        for _ in 0..steps {
            let next = update_pattern(Some(pattern.clone()), &r, 1.0, now).unwrap();
            prop_assert!(next.success_rate >= pattern.success_rate - 1e-12);
            prop_assert!(next.success_rate <= 1.0);
            prop_assert_eq!(next.sample_count, pattern.sample_count + 1);
            pattern = next;
        }
    }
}
