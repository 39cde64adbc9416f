//! CLI command definitions and handlers

mod apply;
mod assess;
mod learn;
mod score;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// repolift - score code, assess change risk, apply changes safely
///
/// 100% LOCAL - nothing leaves your machine.
#[derive(Parser, Debug)]
#[command(name = "repolift")]
#[command(
    version,
    about = "Code quality scoring, change risk assessment and safe modification sessions that learn from outcomes",
    after_help = "\
Examples:
  repolift score .                                   Score the current directory
  repolift score . --pattern 'src/**/*.py'           Score matching files only
  repolift assess app.py --modified app.new.py       Risk of replacing app.py
  repolift apply app.py --modified app.new.py        Apply with backup and rollback
  repolift predict rec.json                          Predicted success of a recommendation
  repolift report                                    Learning report"
)]
pub struct Cli {
    /// Repository root used for configuration and data locations
    #[arg(long, global = true, default_value = ".")]
    pub repo: PathBuf,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score every supported file under a directory
    Score {
        /// Directory to score
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Glob patterns relative to the directory (default: all supported files)
        #[arg(long, short = 'p')]
        pattern: Vec<String>,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// External security scanner (bandit): on (used when installed), off
        #[arg(long, default_value = "on", value_parser = ["on", "off"])]
        external: String,
    },

    /// Assess the risk of replacing a file with new content
    Assess {
        /// The current file
        file: PathBuf,

        /// File holding the proposed content
        #[arg(long, short = 'm')]
        modified: PathBuf,

        /// Recommendation JSON the change belongs to
        #[arg(long, short = 'r')]
        recommendation: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Apply new content to a file inside a modification session
    Apply {
        /// The file to change (created if missing)
        file: PathBuf,

        /// File holding the new content
        #[arg(long, short = 'm')]
        modified: PathBuf,

        /// Skip syntax, dangerous pattern and size validation
        #[arg(long)]
        no_validate: bool,

        /// Only show the preview, change nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Predict the success probability of a recommendation
    Predict {
        /// Recommendation JSON
        recommendation: PathBuf,
    },

    /// Record the outcome of an implemented recommendation
    Track {
        /// Recommendation JSON
        #[arg(long, short = 'r')]
        recommendation: PathBuf,

        /// Outcome JSON
        #[arg(long, short = 'o')]
        outcome: PathBuf,

        /// Quality metrics JSON from before the change
        #[arg(long, short = 'b')]
        before: PathBuf,
    },

    /// Show the learning report
    Report {
        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// List success patterns
    Patterns {
        /// Minimum number of samples
        #[arg(long, default_value = "1")]
        min_samples: u64,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
}

/// Run the CLI
pub fn run(cli: Cli) -> Result<()> {
    let repo = cli.repo;
    match cli.command {
        Commands::Score {
            path,
            pattern,
            format,
            external,
        } => score::run(&repo, &path, &pattern, &format, external != "off"),

        Commands::Assess {
            file,
            modified,
            recommendation,
            format,
        } => assess::run(&repo, &file, &modified, recommendation.as_deref(), &format),

        Commands::Apply {
            file,
            modified,
            no_validate,
            dry_run,
        } => apply::run(&repo, &file, &modified, !no_validate, dry_run),

        Commands::Predict { recommendation } => learn::predict(&repo, &recommendation),

        Commands::Track {
            recommendation,
            outcome,
            before,
        } => learn::track(&repo, &recommendation, &outcome, &before),

        Commands::Report { format } => learn::report(&repo, &format),

        Commands::Patterns {
            min_samples,
            format,
        } => learn::patterns(&repo, min_samples, &format),
    }
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = read_text(path)?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}
