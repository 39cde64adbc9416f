//! Mitigation steps, in a fixed order

pub const MANUAL_APPROVAL: &str = "Manual approval required";
pub const BACKUP_FIRST: &str = "Back up affected files before applying";

/// Sub-scores a mitigation decision looks at
#[derive(Debug, Clone, Copy)]
pub struct SubScores {
    pub api: f64,
    pub dependency: f64,
    pub complexity: f64,
    pub test_impact: f64,
}

pub fn mitigation_steps(scores: &SubScores, probability: f64, approval_threshold: f64) -> Vec<String> {
    let mut steps = Vec::new();

    if probability > approval_threshold {
        steps.push(MANUAL_APPROVAL.to_string());
    }
    if scores.api >= 0.5 {
        steps.push("Review every caller of removed or re-signed functions and classes".to_string());
    }
    if scores.dependency >= 0.5 {
        steps.push("Reinstall dependencies in a clean environment and re-run imports".to_string());
    }
    if scores.complexity >= 0.5 {
        steps.push("Add tests for the new control flow before applying".to_string());
    }
    if scores.test_impact >= 0.7 {
        steps.push("Run the full test suite: this file is a core module".to_string());
    }
    if probability >= 0.5 {
        steps.push("Roll out in stages and watch for regressions".to_string());
    }
    steps.push(BACKUP_FIRST.to_string());

    steps
}

/// Steps attached to the conservative fallback assessment
pub fn fallback_steps() -> Vec<String> {
    vec![MANUAL_APPROVAL.to_string(), BACKUP_FIRST.to_string()]
}
