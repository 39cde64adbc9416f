//! Text (terminal) reporter with colors and formatting

use crate::models::{Dimension, RiskAssessment};
use crate::scoring::{ProjectScore, QualityTier};
use crate::tracker::{LearningReport, SuccessPattern, Trend};
use console::style;
use std::fmt::Write;

const RULE: &str = "──────────────────────────────────────";
const MAX_FILE_ROWS: usize = 10;

fn tier_style(tier: QualityTier, text: String) -> console::StyledObject<String> {
    match tier {
        QualityTier::Excellent => style(text).green(),
        QualityTier::Good => style(text).green().dim(),
        QualityTier::Fair => style(text).yellow(),
        QualityTier::Poor => style(text).red(),
        QualityTier::Critical => style(text).red().bold(),
    }
}

fn score_style(score: f64) -> console::StyledObject<String> {
    let text = format!("{:.1}", score);
    if score >= 80.0 {
        style(text).green()
    } else if score >= 60.0 {
        style(text).yellow()
    } else {
        style(text).red()
    }
}

fn percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.0}%", v * 100.0))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Truncate on char boundaries
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", head)
}

pub fn render_score(score: &ProjectScore) -> String {
    let mut out = String::new();
    let summary = &score.summary;

    let _ = writeln!(out, "\n{}", style("Quality Score").bold());
    let _ = writeln!(out, "{}", style(RULE).dim());
    let _ = writeln!(
        out,
        "Overall: {}/100  Files: {}  Failed: {}\n",
        score_style(summary.overall_score).bold(),
        summary.files_scored,
        summary.files_failed
    );

    let _ = writeln!(out, "{}", style("DIMENSIONS").bold());
    for dimension in Dimension::ALL {
        let marker = if summary.weakest_dimension == Some(dimension) {
            " <- weakest"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "  {:<16} {:>6}{}",
            dimension.name(),
            score_style(score.project_metrics.get(dimension)),
            style(marker).dim()
        );
    }

    let _ = writeln!(out, "\n{}", style("TIERS").bold());
    let tiers: Vec<String> = QualityTier::ALL
        .iter()
        .filter_map(|tier| {
            let count = summary.tiers.get(tier).copied().unwrap_or(0);
            (count > 0).then(|| tier_style(*tier, format!("{} {}", count, tier)).to_string())
        })
        .collect();
    if tiers.is_empty() {
        let _ = writeln!(out, "  {}", style("no files scored").dim());
    } else {
        let _ = writeln!(out, "  {}", tiers.join(" | "));
    }

    if !score.file_scores.is_empty() {
        let _ = writeln!(out, "\n{}", style("LOWEST SCORING FILES").bold());
        let mut files: Vec<_> = score.file_scores.iter().collect();
        files.sort_by(|a, b| a.1.overall_score().total_cmp(&b.1.overall_score()));
        for (path, metrics) in files.iter().take(MAX_FILE_ROWS) {
            let _ = writeln!(
                out,
                "  {:>6}  {}",
                score_style(metrics.overall_score()),
                truncate(&path.to_string_lossy(), 60)
            );
        }
    }

    if !score.recommendations.is_empty() {
        let _ = writeln!(out, "\n{}", style("RECOMMENDATIONS").bold());
        for rec in &score.recommendations {
            let _ = writeln!(out, "  - {}", rec);
        }
    }

    if !score.failures.is_empty() {
        let _ = writeln!(out, "\n{}", style("FAILED FILES").yellow().bold());
        for failure in &score.failures {
            let _ = writeln!(
                out,
                "  {}: {}",
                failure.path.display(),
                style(&failure.reason).dim()
            );
        }
    }

    out
}

pub fn render_assessment(assessment: &RiskAssessment) -> String {
    let mut out = String::new();
    let p = assessment.breaking_change_probability;
    let probability = format!("{:.3}", p);
    let probability = if p >= 0.7 {
        style(probability).red().bold()
    } else if p >= 0.4 {
        style(probability).yellow().bold()
    } else {
        style(probability).green().bold()
    };

    let _ = writeln!(out, "\n{}", style("Risk Assessment").bold());
    let _ = writeln!(out, "{}", style(RULE).dim());
    let _ = writeln!(
        out,
        "Breaking change probability: {}  Confidence: {:.2}",
        probability, assessment.confidence_score
    );
    if assessment.requires_approval {
        let _ = writeln!(out, "{}", style("Manual approval required").red());
    }
    if assessment.fallback {
        let _ = writeln!(
            out,
            "{}",
            style("Assessment failed; conservative defaults shown").yellow()
        );
    }

    if !assessment.impact_analysis.is_empty() {
        let _ = writeln!(out, "\n{}", style("IMPACT").bold());
        for (name, value) in &assessment.impact_analysis {
            let _ = writeln!(out, "  {:<14} {:.3}", name, value);
        }
    }
    if !assessment.risk_factors.is_empty() {
        let _ = writeln!(out, "\n{}", style("FACTORS").bold());
        for (name, value) in &assessment.risk_factors {
            let _ = writeln!(out, "  {:<24} {}", name, value);
        }
    }
    if !assessment.mitigation_steps.is_empty() {
        let _ = writeln!(out, "\n{}", style("MITIGATION").bold());
        for (i, step) in assessment.mitigation_steps.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, step);
        }
    }
    out
}

pub fn render_learning_report(report: &LearningReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", style("Learning Report").bold());
    let _ = writeln!(out, "{}", style(RULE).dim());
    let _ = writeln!(
        out,
        "Outcomes: {}  Implemented: {}  Success: {}  Risk accuracy: {}",
        report.total_outcomes,
        report.implemented_count,
        percent(report.overall_success_rate),
        percent(report.risk_prediction_accuracy)
    );

    let trend = match report.trend {
        Trend::Improving => style(report.trend.to_string()).green(),
        Trend::Declining => style(report.trend.to_string()).red(),
        _ => style(report.trend.to_string()).dim(),
    };
    let _ = writeln!(out, "Trend: {}", trend);

    if let Some(q) = &report.quality_improvement {
        let _ = writeln!(
            out,
            "Quality change: mean {:+.1}  min {:+.1}  max {:+.1}  improved {:.0}%",
            q.mean,
            q.min,
            q.max,
            q.positive_share * 100.0
        );
    }

    if !report.success_by_category.is_empty() {
        let _ = writeln!(out, "\n{}", style("BY CATEGORY").bold());
        for (category, stat) in &report.success_by_category {
            let _ = writeln!(
                out,
                "  {:<16} {:>4}  ({} outcomes)",
                category,
                percent(Some(stat.success_rate)),
                stat.count
            );
        }
    }
    if !report.success_by_priority.is_empty() {
        let _ = writeln!(out, "\n{}", style("BY PRIORITY").bold());
        for (priority, stat) in &report.success_by_priority {
            let _ = writeln!(
                out,
                "  {:<16} {:>4}  ({} outcomes)",
                priority,
                percent(Some(stat.success_rate)),
                stat.count
            );
        }
    }
    if !report.top_patterns.is_empty() {
        let _ = writeln!(out, "\n{}", style("TOP PATTERNS").bold());
        out.push_str(&render_pattern_rows(&report.top_patterns));
    }
    if !report.recommendations.is_empty() {
        let _ = writeln!(out, "\n{}", style("RECOMMENDATIONS").bold());
        for rec in &report.recommendations {
            let _ = writeln!(out, "  - {}", rec);
        }
    }
    out
}

pub fn render_patterns(patterns: &[SuccessPattern]) -> String {
    if patterns.is_empty() {
        return format!("{}\n", style("No success patterns recorded yet").dim());
    }
    render_pattern_rows(patterns)
}

fn render_pattern_rows(patterns: &[SuccessPattern]) -> String {
    let mut out = String::new();
    for pattern in patterns {
        let _ = writeln!(
            out,
            "  {:<36} {:>4}  n={}",
            pattern.pattern_key,
            percent(Some(pattern.success_rate)),
            pattern.sample_count
        );
    }
    out
}
