//! `repolift apply` - preview, then apply one change inside a session

use super::read_text;
use crate::cache::get_backup_dir;
use crate::config::load_config;
use crate::safety::{preview_changes, SafetyManager};
use anyhow::{bail, Result};
use console::{style, Term};
use std::path::Path;

pub fn run(repo: &Path, file: &Path, modified: &Path, validate: bool, dry_run: bool) -> Result<()> {
    let term = Term::stderr();
    let config = load_config(repo);

    let original = if file.exists() {
        read_text(file)?
    } else {
        String::new()
    };
    let new_content = read_text(modified)?;

    let preview = preview_changes(file, &original, &new_content);
    if preview.diff.is_empty() {
        term.write_line(&format!("{} No changes to apply.", style("✓").green()))?;
        return Ok(());
    }

    term.write_line(&format!("{}\n", style("Changes:").bold()))?;
    for line in preview.diff.lines() {
        if line.starts_with('+') && !line.starts_with("+++") {
            term.write_line(&format!("{}", style(line).green()))?;
        } else if line.starts_with('-') && !line.starts_with("---") {
            term.write_line(&format!("{}", style(line).red()))?;
        } else if line.starts_with("@@") {
            term.write_line(&format!("{}", style(line).cyan()))?;
        } else {
            term.write_line(line)?;
        }
    }
    term.write_line(&format!(
        "\n  {} +{} -{}  {} {}",
        style("Lines:").bold(),
        preview.stats.lines_added,
        preview.stats.lines_removed,
        style("Valid syntax:").bold(),
        if preview.syntax_valid {
            style("✓").green()
        } else {
            style("✗").red()
        }
    ))?;
    if !preview.affected_functions.is_empty() {
        term.write_line(&format!(
            "  {} {}",
            style("Affected functions:").bold(),
            preview.affected_functions.join(", ")
        ))?;
    }

    if dry_run {
        term.write_line(&format!(
            "\n{} Dry run, nothing was written.",
            style("Tip:").cyan().bold()
        ))?;
        return Ok(());
    }

    let mut manager = SafetyManager::with_config(get_backup_dir(repo, &config), &config.safety);
    let mut session = manager.start_session()?;

    let result = session.apply_change_safely(file, &new_content, validate)?;
    if !result.success {
        term.write_line(&format!(
            "\n{} Change rejected, {} left untouched:",
            style("Warning:").yellow().bold(),
            file.display()
        ))?;
        for issue in &result.issues {
            term.write_line(&format!("  - {}", issue.message))?;
        }
        // Roll back before reporting the failure
        drop(session);
        bail!(
            "change to {} rejected with {} validation issue(s)",
            file.display(),
            result.issues.len()
        );
    }

    let report = session.finalize_session()?;
    term.write_line(&format!(
        "\n{} Applied to {} (session {})",
        style("✓").green().bold(),
        file.display(),
        report.session_id
    ))?;
    if let Some(backup) = result.backup_path {
        term.write_line(&format!(
            "  {} {}",
            style("Backup:").dim(),
            backup.display()
        ))?;
    }
    Ok(())
}
