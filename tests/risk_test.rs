//! Risk assessment contract tests

use proptest::prelude::*;
use repolift::config::RiskConfig;
use repolift::models::{Category, CodeChange, ImprovementRecommendation, Priority, RiskLevel};
use repolift::risk::{fallback_assessment, BatchItem, RiskAssessor, MANUAL_APPROVAL};
use std::path::{Path, PathBuf};

const ORIGINAL: &str = r#"def parse(text):
    return text.split()


def render(items):
    return ", ".join(items)
"#;

#[test]
fn test_removed_function_is_an_api_break() {
    let modified = "def parse(text):\n    return text.split()\n";
    let assessment = RiskAssessor::new().assess_change(
        Path::new("pkg/format.py"),
        ORIGINAL,
        modified,
        None,
    );

    let api = assessment.impact_analysis["api_change"];
    assert!(api >= 0.9, "api sub-score {}", api);
    assert!(assessment.breaking_change_probability >= 0.315);
    assert!(!assessment.fallback);
    assert!((0.3..=0.95).contains(&assessment.confidence_score));
}

#[test]
fn test_identical_content_is_low_risk() {
    let assessment =
        RiskAssessor::new().assess_change(Path::new("pkg/format.py"), ORIGINAL, ORIGINAL, None);
    assert_eq!(assessment.impact_analysis["api_change"], 0.0);
    assert_eq!(assessment.impact_analysis["dependency"], 0.0);
    assert!(assessment.breaking_change_probability < 0.3);
    assert!(!assessment.requires_approval);
}

#[test]
fn test_security_recommendation_adds_weight() {
    let modified = ORIGINAL.replace("text.split()", "text.strip().split()");
    let path = Path::new("pkg/format.py");
    let assessor = RiskAssessor::new();
    let plain = assessor.assess_change(path, ORIGINAL, &modified, None);
    let rec = ImprovementRecommendation::new(
        "sec-1",
        Category::Security,
        Priority::High,
        RiskLevel::High,
    );
    let sensitive = assessor.assess_change(path, ORIGINAL, &modified, Some(&rec));
    assert!(
        (sensitive.breaking_change_probability - plain.breaking_change_probability - 0.05).abs()
            < 1e-6
    );
}

#[test]
fn test_low_threshold_requires_approval() {
    let assessor = RiskAssessor::with_config(RiskConfig {
        approval_threshold: 0.1,
    });
    let modified = "def parse(text):\n    return text.split()\n";
    let assessment = assessor.assess_change(Path::new("pkg/format.py"), ORIGINAL, modified, None);
    assert!(assessment.requires_approval);
    assert!(assessment
        .mitigation_steps
        .iter()
        .any(|s| s == MANUAL_APPROVAL));
}

#[test]
fn test_batch_reports_every_item() {
    let items: Vec<BatchItem> = (0..8)
        .map(|i| BatchItem {
            id: format!("change-{}", i),
            path: PathBuf::from(format!("pkg/m{}.py", i)),
            original: ORIGINAL.to_string(),
            modified: ORIGINAL.replace("render", &format!("render_{}", i)),
            recommendation: None,
        })
        .collect();

    let batch = RiskAssessor::new().batch_assess(&items);
    assert_eq!(batch.assessments.len(), 8);
    assert!(batch.failures.is_empty());
    for item in &items {
        let assessment = &batch.assessments[&item.id];
        // Renaming drops the old name from the public surface
        assert!(assessment.impact_analysis["api_change"] > 0.0);
    }
}

#[test]
fn test_recommendation_keeps_riskiest_change() {
    let mut rec = ImprovementRecommendation::new(
        "rec-1",
        Category::Maintainability,
        Priority::Medium,
        RiskLevel::Medium,
    );
    rec.code_changes = vec![
        CodeChange {
            file_path: PathBuf::from("pkg/a.py"),
            original_code: ORIGINAL.to_string(),
            modified_code: ORIGINAL.to_string(),
            description: "no-op".to_string(),
        },
        CodeChange {
            file_path: PathBuf::from("pkg/b.py"),
            original_code: String::new(),
            modified_code: "def parse(text):\n    return text\n".to_string(),
            description: "drop render".to_string(),
        },
    ];

    let assessor = RiskAssessor::new();
    let worst = assessor
        .assess_recommendation(&rec, |path| {
            (path == Path::new("pkg/b.py")).then(|| ORIGINAL.to_string())
        })
        .unwrap();
    assert!(worst.impact_analysis["api_change"] >= 0.9);

    rec.code_changes.clear();
    assert!(assessor.assess_recommendation(&rec, |_| None).is_none());
}

#[test]
fn test_fallback_is_conservative() {
    let fallback = fallback_assessment();
    assert_eq!(fallback.breaking_change_probability, 0.8);
    assert_eq!(fallback.confidence_score, 0.3);
    assert!(fallback.requires_approval);
    assert!(fallback.fallback);
    assert!(!fallback.mitigation_steps.is_empty());
}

proptest! {
    #[test]
    fn prop_assessment_is_bounded(
        original in "[a-z(): =\n]{0,120}",
        modified in "[a-z(): =\n]{0,120}",
    ) {
        let assessment = RiskAssessor::new()
            .assess_change(Path::new("gen.py"), &original, &modified, None);
        prop_assert!((0.0..=1.0).contains(&assessment.breaking_change_probability));
        prop_assert!((0.3..=0.95).contains(&assessment.confidence_score));
        for value in assessment.impact_analysis.values() {
            prop_assert!((0.0..=1.0).contains(value));
        }
    }
}
