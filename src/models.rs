//! Core data models for repolift
//!
//! These records flow between the scorer, the risk assessor, the safety
//! session and the improvement tracker. All of them serialize with serde so
//! callers can persist or relay them as JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Severity levels for issues introduced by a change
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// One of the seven scored quality facets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Maintainability,
    Complexity,
    Readability,
    TestCoverage,
    Documentation,
    Security,
    Performance,
}

impl Dimension {
    /// All dimensions, in weight-table order
    pub const ALL: [Dimension; 7] = [
        Dimension::Maintainability,
        Dimension::Complexity,
        Dimension::Readability,
        Dimension::TestCoverage,
        Dimension::Documentation,
        Dimension::Security,
        Dimension::Performance,
    ];

    /// Fixed weight in the overall score. The weights sum to 1.0.
    pub fn weight(self) -> f64 {
        match self {
            Dimension::Maintainability => 0.20,
            Dimension::Complexity => 0.15,
            Dimension::Readability => 0.15,
            Dimension::TestCoverage => 0.15,
            Dimension::Documentation => 0.10,
            Dimension::Security => 0.15,
            Dimension::Performance => 0.10,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Maintainability => "maintainability",
            Dimension::Complexity => "complexity",
            Dimension::Readability => "readability",
            Dimension::TestCoverage => "test_coverage",
            Dimension::Documentation => "documentation",
            Dimension::Security => "security",
            Dimension::Performance => "performance",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn clamp_score(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Seven 0-100 dimension scores.
///
/// The overall score is never stored: [`QualityMetrics::overall_score`]
/// recomputes it from the fixed weights on every call, and serialization
/// emits the recomputed value (a stored `overall_score` is ignored when
/// deserializing).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "MetricsRecord", from = "MetricsRecord")]
pub struct QualityMetrics {
    maintainability: f64,
    complexity: f64,
    readability: f64,
    test_coverage: f64,
    documentation: f64,
    security: f64,
    performance: f64,
}

impl QualityMetrics {
    /// Build metrics, clamping every dimension into [0, 100]
    pub fn new(
        maintainability: f64,
        complexity: f64,
        readability: f64,
        test_coverage: f64,
        documentation: f64,
        security: f64,
        performance: f64,
    ) -> Self {
        Self {
            maintainability: clamp_score(maintainability),
            complexity: clamp_score(complexity),
            readability: clamp_score(readability),
            test_coverage: clamp_score(test_coverage),
            documentation: clamp_score(documentation),
            security: clamp_score(security),
            performance: clamp_score(performance),
        }
    }

    /// Same score on every dimension
    pub fn uniform(score: f64) -> Self {
        Self::new(score, score, score, score, score, score, score)
    }

    /// Build from a dimension lookup
    pub fn from_fn(mut f: impl FnMut(Dimension) -> f64) -> Self {
        Self::new(
            f(Dimension::Maintainability),
            f(Dimension::Complexity),
            f(Dimension::Readability),
            f(Dimension::TestCoverage),
            f(Dimension::Documentation),
            f(Dimension::Security),
            f(Dimension::Performance),
        )
    }

    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Maintainability => self.maintainability,
            Dimension::Complexity => self.complexity,
            Dimension::Readability => self.readability,
            Dimension::TestCoverage => self.test_coverage,
            Dimension::Documentation => self.documentation,
            Dimension::Security => self.security,
            Dimension::Performance => self.performance,
        }
    }

    pub fn maintainability(&self) -> f64 {
        self.maintainability
    }
    pub fn complexity(&self) -> f64 {
        self.complexity
    }
    pub fn readability(&self) -> f64 {
        self.readability
    }
    pub fn test_coverage(&self) -> f64 {
        self.test_coverage
    }
    pub fn documentation(&self) -> f64 {
        self.documentation
    }
    pub fn security(&self) -> f64 {
        self.security
    }
    pub fn performance(&self) -> f64 {
        self.performance
    }

    /// Weighted sum of the seven dimensions
    pub fn overall_score(&self) -> f64 {
        Dimension::ALL
            .iter()
            .map(|d| self.get(*d) * d.weight())
            .sum()
    }

    /// Average each dimension across a set of metrics. `None` when empty.
    pub fn average<'a>(metrics: impl IntoIterator<Item = &'a QualityMetrics>) -> Option<Self> {
        let mut sums = [0.0f64; 7];
        let mut count = 0usize;
        for m in metrics {
            for (i, d) in Dimension::ALL.iter().enumerate() {
                sums[i] += m.get(*d);
            }
            count += 1;
        }
        if count == 0 {
            return None;
        }
        let n = count as f64;
        Some(Self::new(
            sums[0] / n,
            sums[1] / n,
            sums[2] / n,
            sums[3] / n,
            sums[4] / n,
            sums[5] / n,
            sums[6] / n,
        ))
    }
}

impl Default for QualityMetrics {
    fn default() -> Self {
        Self::uniform(0.0)
    }
}

/// Wire form of [`QualityMetrics`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MetricsRecord {
    #[serde(default)]
    maintainability: f64,
    #[serde(default)]
    complexity: f64,
    #[serde(default)]
    readability: f64,
    #[serde(default)]
    test_coverage: f64,
    #[serde(default)]
    documentation: f64,
    #[serde(default)]
    security: f64,
    #[serde(default)]
    performance: f64,
    #[serde(default)]
    overall_score: f64,
}

impl From<QualityMetrics> for MetricsRecord {
    fn from(m: QualityMetrics) -> Self {
        Self {
            maintainability: m.maintainability,
            complexity: m.complexity,
            readability: m.readability,
            test_coverage: m.test_coverage,
            documentation: m.documentation,
            security: m.security,
            performance: m.performance,
            overall_score: m.overall_score(),
        }
    }
}

impl From<MetricsRecord> for QualityMetrics {
    fn from(r: MetricsRecord) -> Self {
        QualityMetrics::new(
            r.maintainability,
            r.complexity,
            r.readability,
            r.test_coverage,
            r.documentation,
            r.security,
            r.performance,
        )
    }
}

/// Recommendation category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Maintainability,
    Performance,
    Security,
    Architecture,
    Testing,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Maintainability,
        Category::Performance,
        Category::Security,
        Category::Architecture,
        Category::Testing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Maintainability => "maintainability",
            Category::Performance => "performance",
            Category::Security => "security",
            Category::Architecture => "architecture",
            Category::Testing => "testing",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommendation priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    /// Multiplier applied in [`ImprovementRecommendation::impact_score`]
    pub fn weight(self) -> f64 {
        match self {
            Priority::Critical => 1.0,
            Priority::High => 0.75,
            Priority::Medium => 0.5,
            Priority::Low => 0.25,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk level declared on a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single file edit proposed by a recommendation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeChange {
    pub file_path: PathBuf,
    #[serde(default)]
    pub original_code: String,
    #[serde(default)]
    pub modified_code: String,
    #[serde(default)]
    pub description: String,
}

/// A proposed improvement, produced by an upstream generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImprovementRecommendation {
    pub id: String,
    pub category: Category,
    pub priority: Priority,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub breaking_change_probability: f64,
    #[serde(default)]
    pub expected_improvement: QualityMetrics,
    #[serde(default)]
    pub code_changes: Vec<CodeChange>,
    #[serde(default)]
    pub validation_steps: Vec<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

impl ImprovementRecommendation {
    pub fn new(
        id: impl Into<String>,
        category: Category,
        priority: Priority,
        risk_level: RiskLevel,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            priority,
            risk_level,
            breaking_change_probability: 0.0,
            expected_improvement: QualityMetrics::default(),
            code_changes: Vec::new(),
            validation_steps: Vec::new(),
            title: String::new(),
            description: String::new(),
            file_path: None,
        }
    }

    /// Key used for success-pattern statistics: `category:priority:risk_level`
    pub fn pattern_key(&self) -> String {
        format!("{}:{}:{}", self.category, self.priority, self.risk_level)
    }

    /// `priority_weight × expected.overall × (1 − 0.5 × p)`
    ///
    /// Non-increasing in the breaking-change probability.
    pub fn impact_score(&self) -> f64 {
        let p = if self.breaking_change_probability.is_finite() {
            self.breaking_change_probability.clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.priority.weight() * self.expected_improvement.overall_score() * (1.0 - 0.5 * p)
    }
}

/// Result of a risk assessment. Transient, never persisted by this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub breaking_change_probability: f64,
    /// Sub-score name -> value in [0, 1]
    pub impact_analysis: BTreeMap<String, f64>,
    /// Raw counts and deltas behind the sub-scores
    pub risk_factors: BTreeMap<String, f64>,
    pub mitigation_steps: Vec<String>,
    pub confidence_score: f64,
    pub requires_approval: bool,
    /// Set when the conservative fallback replaced a failed assessment
    #[serde(default)]
    pub fallback: bool,
}

/// An issue introduced by an implemented change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
}

impl Issue {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// What actually happened after a recommendation was acted on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImprovementOutcome {
    pub recommendation_id: String,
    pub implemented: bool,
    #[serde(default)]
    pub quality_after: Option<QualityMetrics>,
    #[serde(default)]
    pub issues_introduced: Vec<Issue>,
    /// Signed difference between observed and predicted risk, in [-1, 1]
    #[serde(default)]
    pub actual_vs_predicted_risk: f64,
}

impl ImprovementOutcome {
    /// `0.5×improved + 0.3×no_critical + 0.2×(1 − |risk error|)`
    pub fn success_rate(&self, quality_before: &QualityMetrics) -> f64 {
        let improved = self
            .quality_after
            .map(|after| after.overall_score() > quality_before.overall_score())
            .unwrap_or(false);
        let no_critical = !self
            .issues_introduced
            .iter()
            .any(|i| i.severity == Severity::Critical);
        let risk_error = if self.actual_vs_predicted_risk.is_finite() {
            self.actual_vs_predicted_risk.clamp(-1.0, 1.0).abs()
        } else {
            1.0
        };

        let mut rate = 0.2 * (1.0 - risk_error);
        if improved {
            rate += 0.5;
        }
        if no_critical {
            rate += 0.3;
        }
        rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> QualityMetrics {
        QualityMetrics::new(80.0, 70.0, 60.0, 40.0, 50.0, 100.0, 90.0)
    }

    #[test]
    fn test_weights_sum_to_one() {
        let sum: f64 = Dimension::ALL.iter().map(|d| d.weight()).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_overall_score_recomputed() {
        let m = metrics();
        let expected = 80.0 * 0.20
            + 70.0 * 0.15
            + 60.0 * 0.15
            + 40.0 * 0.15
            + 50.0 * 0.10
            + 100.0 * 0.15
            + 90.0 * 0.10;
        assert!((m.overall_score() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_dimensions_clamped() {
        let m = QualityMetrics::new(150.0, -5.0, f64::NAN, 50.0, 50.0, 50.0, 50.0);
        assert_eq!(m.maintainability(), 100.0);
        assert_eq!(m.complexity(), 0.0);
        assert_eq!(m.readability(), 0.0);
    }

    #[test]
    fn test_serialized_overall_is_fresh() {
        let json = serde_json::to_value(metrics()).unwrap();
        let overall = json["overall_score"].as_f64().unwrap();
        assert!((overall - metrics().overall_score()).abs() < 1e-9);

        let tampered = r#"{"maintainability":100,"complexity":100,"readability":100,
            "test_coverage":100,"documentation":100,"security":100,"performance":100,
            "overall_score":3.0}"#;
        let parsed: QualityMetrics = serde_json::from_str(tampered).unwrap();
        assert!((parsed.overall_score() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_impact_score_decreases_with_risk() {
        let mut rec = ImprovementRecommendation::new(
            "r1",
            Category::Performance,
            Priority::High,
            RiskLevel::Medium,
        );
        rec.expected_improvement = QualityMetrics::uniform(10.0);
        rec.breaking_change_probability = 0.0;
        let safe = rec.impact_score();
        rec.breaking_change_probability = 1.0;
        let risky = rec.impact_score();
        assert!((safe - 7.5).abs() < 1e-9);
        assert!((risky - 3.75).abs() < 1e-9);
    }

    #[test]
    fn test_outcome_success_rate() {
        let before = QualityMetrics::uniform(50.0);
        let outcome = ImprovementOutcome {
            recommendation_id: "r1".into(),
            implemented: true,
            quality_after: Some(QualityMetrics::uniform(60.0)),
            issues_introduced: vec![],
            actual_vs_predicted_risk: 0.0,
        };
        assert!((outcome.success_rate(&before) - 1.0).abs() < 1e-9);

        let failed = ImprovementOutcome {
            quality_after: None,
            issues_introduced: vec![Issue::new(Severity::Critical, "broke build")],
            actual_vs_predicted_risk: -0.5,
            ..outcome
        };
        assert!((failed.success_rate(&before) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_pattern_key() {
        let rec = ImprovementRecommendation::new(
            "r1",
            Category::Security,
            Priority::Critical,
            RiskLevel::High,
        );
        assert_eq!(rec.pattern_key(), "security:critical:high");
    }

    #[test]
    fn test_average_metrics() {
        let a = QualityMetrics::uniform(40.0);
        let b = QualityMetrics::uniform(60.0);
        let avg = QualityMetrics::average([&a, &b]).unwrap();
        assert!((avg.security() - 50.0).abs() < 1e-9);
        assert!(QualityMetrics::average(std::iter::empty()).is_none());
    }
}
