//! Output reporters for repolift results
//!
//! Supports two output formats:
//! - `text` - Terminal output with colors
//! - `json` - Machine-readable JSON

mod json;
mod text;

use crate::models::RiskAssessment;
use crate::scoring::ProjectScore;
use crate::tracker::{LearningReport, SuccessPattern};
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: text, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Render a project score
pub fn render_score(score: &ProjectScore, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_score(score)),
        OutputFormat::Json => json::render(score),
    }
}

/// Render a risk assessment
pub fn render_assessment(assessment: &RiskAssessment, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_assessment(assessment)),
        OutputFormat::Json => json::render(assessment),
    }
}

pub fn render_learning_report(report: &LearningReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_learning_report(report)),
        OutputFormat::Json => json::render(report),
    }
}

pub fn render_patterns(patterns: &[SuccessPattern], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_patterns(patterns)),
        OutputFormat::Json => json::render(&patterns),
    }
}
