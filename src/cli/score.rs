//! `repolift score`

use crate::config::load_config;
use crate::reporters::{self, OutputFormat};
use crate::scoring::{BanditScanner, QualityScorer};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

pub fn run(
    repo: &Path,
    path: &Path,
    patterns: &[String],
    format: &str,
    run_external: bool,
) -> Result<()> {
    let format: OutputFormat = format.parse()?;
    let config = load_config(repo);

    let mut scorer = QualityScorer::new().with_config(config);
    if run_external {
        scorer = scorer.with_security_scanner(Box::new(BanditScanner::new()));
    }

    let score = scorer
        .score_project(path, patterns)
        .with_context(|| format!("Failed to score {}", path.display()))?;
    info!(
        "Scored {} file(s), {} failed",
        score.summary.files_scored, score.summary.files_failed
    );

    println!("{}", reporters::render_score(&score, format)?);
    Ok(())
}
