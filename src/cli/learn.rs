//! Learning commands: `predict`, `track`, `report`, `patterns`

use super::read_json;
use crate::cache::get_learning_db_path;
use crate::config::load_config;
use crate::models::{ImprovementOutcome, ImprovementRecommendation, QualityMetrics};
use crate::reporters::{self, OutputFormat};
use crate::tracker::ImprovementTracker;
use anyhow::{bail, Context, Result};
use std::path::Path;

fn open_tracker(repo: &Path) -> Result<ImprovementTracker> {
    let config = load_config(repo);
    let path = get_learning_db_path(repo, &config);
    ImprovementTracker::open(&path)
        .with_context(|| format!("Failed to open learning store {}", path.display()))
}

pub fn predict(repo: &Path, recommendation: &Path) -> Result<()> {
    let rec: ImprovementRecommendation = read_json(recommendation)?;
    let tracker = open_tracker(repo)?;
    let p = tracker.predict_success_probability(&rec);
    println!(
        "{}: predicted success {:.1}% ({})",
        rec.id,
        p * 100.0,
        rec.pattern_key()
    );
    Ok(())
}

pub fn track(repo: &Path, recommendation: &Path, outcome: &Path, before: &Path) -> Result<()> {
    let rec: ImprovementRecommendation = read_json(recommendation)?;
    let outcome: ImprovementOutcome = read_json(outcome)?;
    let before: QualityMetrics = read_json(before)?;

    let tracker = open_tracker(repo)?;
    let result = tracker.track_outcome(&rec, &outcome, &before);
    if !result.success {
        bail!(
            "Failed to record outcome: {}",
            result.error.unwrap_or_default()
        );
    }
    println!(
        "Recorded outcome #{} for {}: success rate {:.2}, quality {:+.1}",
        result.outcome_id.unwrap_or_default(),
        outcome.recommendation_id,
        result.success_rate,
        result.quality_improvement
    );
    Ok(())
}

pub fn report(repo: &Path, format: &str) -> Result<()> {
    let format: OutputFormat = format.parse()?;
    let tracker = open_tracker(repo)?;
    let report = tracker.generate_learning_report()?;
    println!("{}", reporters::render_learning_report(&report, format)?);
    Ok(())
}

pub fn patterns(repo: &Path, min_samples: u64, format: &str) -> Result<()> {
    let format: OutputFormat = format.parse()?;
    let tracker = open_tracker(repo)?;
    let patterns = tracker.get_success_patterns(min_samples)?;
    println!("{}", reporters::render_patterns(&patterns, format)?);
    Ok(())
}
