//! Heuristic Quality Scoring
//!
//! Every file is scored on seven dimensions, each in 0-100. The overall
//! score is the fixed weighted sum defined on [`QualityMetrics`].
//!
//! # Dimensions
//!
//! ```text
//! Complexity      = band(2·branches + 3·loops + 2·exceptions + 4·max_nesting)
//! Maintainability = .30 complexity + .25 cognitive + .15 LOC + .15 duplication + .15 coupling
//! Readability     = .25 naming + .20 comments + .20 long lines + .20 nesting + .15 indentation
//! Documentation   = documented/(functions + classes + 1)·80 + min(comment density·100, 20)
//! Security        = band(catalogue tally + scanner tally)
//! Performance     = .7·max(0, 100 − penalties) + .3·min(100, 60 + 10·idioms)
//! Test coverage   = reporter figure, else 80 when a test file exists, else 40
//! ```
//!
//! Files that fail to parse still get a score: each dimension has a
//! documented fallback (neutral complexity, regex imports, density-only
//! documentation).

mod complexity;
mod coverage;
mod documentation;
mod maintainability;
mod performance;
mod project;
mod readability;
mod security;
mod text;

pub use coverage::{is_test_path, CoverageReporter, NoCoverage};
pub use performance::PerformanceFindings;
pub use project::{FileFailure, ProjectScore, ProjectSummary, QualityTier};
pub use security::{
    pattern_hits, vulnerability_tally, BanditScanner, NoopScanner, PatternHit, SecurityScanner,
};

use crate::config::RepoliftConfig;
use crate::models::QualityMetrics;
use crate::parsers::{parse_source, ParseOutcome, SourceLanguage};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors from scoring operations
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8")]
    InvalidUtf8 { path: PathBuf },

    #[error("invalid file pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed to walk {path}: {message}")]
    Walk { path: PathBuf, message: String },
}

pub type ScoringResult<T> = Result<T, ScoringError>;

/// Scores files and projects
///
/// Holds no per-call state, so one scorer can be shared across threads.
pub struct QualityScorer {
    scanner: Box<dyn SecurityScanner>,
    coverage: Box<dyn CoverageReporter>,
    config: RepoliftConfig,
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityScorer {
    pub fn new() -> Self {
        Self {
            scanner: Box::new(NoopScanner),
            coverage: Box::new(NoCoverage),
            config: RepoliftConfig::default(),
        }
    }

    /// Use project thresholds and exclusions
    pub fn with_config(mut self, config: RepoliftConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_security_scanner(mut self, scanner: Box<dyn SecurityScanner>) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn with_coverage_reporter(mut self, coverage: Box<dyn CoverageReporter>) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn config(&self) -> &RepoliftConfig {
        &self.config
    }

    /// Score one file. When `content` is `None` the file is read from disk.
    pub fn score_file(&self, path: &Path, content: Option<&str>) -> ScoringResult<QualityMetrics> {
        match content {
            Some(content) => Ok(self.score_source(path, content)),
            None => {
                let content = read_source(path)?;
                Ok(self.score_source(path, &content))
            }
        }
    }

    /// Score in-memory content as if it lived at `path`
    pub fn score_source(&self, path: &Path, content: &str) -> QualityMetrics {
        let language = SourceLanguage::from_path(path);
        let parsed = parse_source(path, content);
        if let ParseOutcome::Unparsed(reason) = &parsed {
            debug!("Scoring {} with fallbacks ({})", path.display(), reason);
        }
        let indent_unit = language.map(SourceLanguage::indent_unit).unwrap_or(4);

        QualityMetrics::new(
            maintainability::score(&parsed, content),
            complexity::score(&parsed),
            readability::score(language, content),
            coverage::score(path, self.coverage.as_ref()),
            documentation::score(language, &parsed, content),
            security::score(path, content, self.scanner.as_ref()),
            performance::score(&parsed, content, indent_unit),
        )
    }
}

/// Raw weighted decision-point total, or `None` when the content does not parse
pub fn complexity_total(path: &Path, content: &str) -> Option<u32> {
    parse_source(path, content)
        .outline()
        .map(|outline| outline.tally.weighted_total())
}

/// Read a file as UTF-8 text
pub(crate) fn read_source(path: &Path) -> ScoringResult<String> {
    let bytes = std::fs::read(path).map_err(|source| ScoringError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|_| ScoringError::InvalidUtf8 {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Dimension;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_score_is_bounded_and_consistent() {
        let scorer = QualityScorer::new();
        let source = "def add(a, b):\n    \"\"\"Add.\"\"\"\n    return a + b\n";
        let metrics = scorer.score_source(Path::new("add.py"), source);
        for d in Dimension::ALL {
            assert!((0.0..=100.0).contains(&metrics.get(d)), "{} out of range", d);
        }
        let expected: f64 = Dimension::ALL
            .iter()
            .map(|d| d.weight() * metrics.get(*d))
            .sum();
        assert!((metrics.overall_score() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_zero_branch_code_has_full_complexity() {
        let scorer = QualityScorer::new();
        let metrics = scorer.score_source(Path::new("flat.py"), "x = 1\ny = 2\n");
        assert_eq!(metrics.complexity(), 100.0);
    }

    #[test]
    fn test_unparseable_file_gets_neutral_complexity() {
        let scorer = QualityScorer::new();
        let metrics = scorer.score_source(Path::new("bad.py"), "def broken(:\n    pass\n");
        assert_eq!(metrics.complexity(), 50.0);
    }

    #[test]
    fn test_score_file_reads_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.py");
        fs::write(&path, "x = 1\n").unwrap();
        let scorer = QualityScorer::new();
        let from_disk = scorer.score_file(&path, None).unwrap();
        let in_memory = scorer.score_file(&path, Some("x = 1\n")).unwrap();
        assert_eq!(from_disk, in_memory);
    }

    #[test]
    fn test_score_file_missing_is_error() {
        let scorer = QualityScorer::new();
        let err = scorer
            .score_file(Path::new("/definitely/not/here.py"), None)
            .unwrap_err();
        assert!(matches!(err, ScoringError::Read { .. }));
    }

    #[test]
    fn test_complexity_total() {
        let source = "def f(x):\n    if x:\n        return 1\n    return 0\n";
        // one branch at nesting depth one
        assert_eq!(complexity_total(Path::new("f.py"), source), Some(2 + 4));
        assert_eq!(complexity_total(Path::new("f.py"), "def f(:\n"), None);
    }

    #[test]
    fn test_scorer_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<QualityScorer>();
    }
}
