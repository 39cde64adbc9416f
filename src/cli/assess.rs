//! `repolift assess`

use super::{read_json, read_text};
use crate::config::load_config;
use crate::models::ImprovementRecommendation;
use crate::reporters::{self, OutputFormat};
use crate::risk::RiskAssessor;
use anyhow::Result;
use std::path::Path;

pub fn run(
    repo: &Path,
    file: &Path,
    modified: &Path,
    recommendation: Option<&Path>,
    format: &str,
) -> Result<()> {
    let format: OutputFormat = format.parse()?;
    let config = load_config(repo);
    let assessor = RiskAssessor::with_config(config.risk);

    let original = if file.exists() {
        read_text(file)?
    } else {
        String::new()
    };
    let new_content = read_text(modified)?;
    let recommendation: Option<ImprovementRecommendation> =
        recommendation.map(read_json::<ImprovementRecommendation>).transpose()?;

    let assessment = assessor.assess_change(file, &original, &new_content, recommendation.as_ref());
    println!("{}", reporters::render_assessment(&assessment, format)?);
    Ok(())
}
