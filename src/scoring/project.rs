//! Project-wide aggregation
//!
//! Walks the tree, scores matching files in parallel and reduces the
//! results into averages, tier counts and recommendations. One bad file
//! never sinks the run: it is logged and listed under `failures`.

use super::{read_source, QualityScorer, ScoringError, ScoringResult};
use crate::config::{compile_set, ExcludeMatcher, PatternError};
use crate::models::{Dimension, QualityMetrics};
use crate::parsers::supported_extensions;
use globset::GlobSet;
use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Directories never descended into
const IGNORED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "__pycache__",
    ".venv",
    "venv",
    ".repolift",
];

/// Quality band of a file's overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl QualityTier {
    pub const ALL: [QualityTier; 5] = [
        QualityTier::Excellent,
        QualityTier::Good,
        QualityTier::Fair,
        QualityTier::Poor,
        QualityTier::Critical,
    ];

    /// Classify against ascending thresholds `[poor, fair, good, excellent]`
    pub fn classify(score: f64, thresholds: &[f64; 4]) -> Self {
        if score >= thresholds[3] {
            QualityTier::Excellent
        } else if score >= thresholds[2] {
            QualityTier::Good
        } else if score >= thresholds[1] {
            QualityTier::Fair
        } else if score >= thresholds[0] {
            QualityTier::Poor
        } else {
            QualityTier::Critical
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityTier::Excellent => "excellent",
            QualityTier::Good => "good",
            QualityTier::Fair => "fair",
            QualityTier::Poor => "poor",
            QualityTier::Critical => "critical",
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file that could not be scored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub files_scored: usize,
    pub files_failed: usize,
    pub overall_score: f64,
    pub tiers: BTreeMap<QualityTier, usize>,
    /// Lowest-scoring project dimension, if any file was scored
    pub weakest_dimension: Option<Dimension>,
}

/// Result of scoring a whole tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectScore {
    pub project_metrics: QualityMetrics,
    /// Per-file metrics keyed by path relative to the project root
    pub file_scores: BTreeMap<PathBuf, QualityMetrics>,
    pub summary: ProjectSummary,
    pub recommendations: Vec<String>,
    pub failures: Vec<FileFailure>,
}

impl QualityScorer {
    /// Score every matching file under `root`
    ///
    /// `patterns` are glob patterns matched against root-relative paths. An
    /// empty list selects every file with a supported extension.
    pub fn score_project(&self, root: &Path, patterns: &[String]) -> ScoringResult<ProjectScore> {
        let matcher = build_matcher(patterns)?;
        let excludes = self.config.exclude.matcher().map_err(invalid_pattern)?;
        let files = self.collect_files(root, matcher.as_ref(), &excludes)?;
        info!("Scoring {} files under {}", files.len(), root.display());

        let results: Vec<(PathBuf, Result<QualityMetrics, String>)> = files
            .par_iter()
            .map(|rel| {
                let abs = root.join(rel);
                (rel.clone(), self.score_guarded(&abs))
            })
            .collect();

        let mut file_scores = BTreeMap::new();
        let mut failures = Vec::new();
        for (path, result) in results {
            match result {
                Ok(metrics) => {
                    file_scores.insert(path, metrics);
                }
                Err(reason) => {
                    warn!("Skipping {}: {}", path.display(), reason);
                    failures.push(FileFailure { path, reason });
                }
            }
        }

        Ok(self.aggregate(file_scores, failures))
    }

    /// Score one file, turning read errors and panics into a reason string
    fn score_guarded(&self, path: &Path) -> Result<QualityMetrics, String> {
        let content = read_source(path).map_err(|e| e.to_string())?;
        match catch_unwind(AssertUnwindSafe(|| self.score_source(path, &content))) {
            Ok(metrics) => Ok(metrics),
            Err(panic_info) => {
                let msg = crate::panic_message(panic_info.as_ref());
                error!("Scoring {} panicked: {}", path.display(), msg);
                Err(format!("Panic: {}", msg))
            }
        }
    }

    fn collect_files(
        &self,
        root: &Path,
        matcher: Option<&GlobSet>,
        excludes: &ExcludeMatcher,
    ) -> ScoringResult<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(ScoringError::Walk {
                path: root.to_path_buf(),
                message: "not a directory".to_string(),
            });
        }

        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .require_git(false)
            .add_custom_ignore_filename(".repoliftignore")
            .filter_entry(|entry| {
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                !(is_dir
                    && entry
                        .file_name()
                        .to_str()
                        .map(|name| IGNORED_DIRS.contains(&name))
                        .unwrap_or(false))
            });

        let mut files = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Walk error under {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(root) else {
                continue;
            };
            if excludes.is_excluded(rel) {
                debug!("Excluded by config: {}", rel.display());
                continue;
            }
            let selected = match matcher {
                Some(set) => set.is_match(rel),
                None => rel
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|ext| supported_extensions().contains(&ext))
                    .unwrap_or(false),
            };
            if selected {
                files.push(rel.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    fn aggregate(
        &self,
        file_scores: BTreeMap<PathBuf, QualityMetrics>,
        failures: Vec<FileFailure>,
    ) -> ProjectScore {
        let thresholds = &self.config.scoring.tier_thresholds;
        let mut tiers: BTreeMap<QualityTier, usize> =
            QualityTier::ALL.iter().map(|t| (*t, 0)).collect();
        for metrics in file_scores.values() {
            *tiers
                .entry(QualityTier::classify(metrics.overall_score(), thresholds))
                .or_default() += 1;
        }

        let averaged = QualityMetrics::average(file_scores.values());
        let weakest_dimension = averaged.as_ref().and_then(|m| {
            Dimension::ALL
                .iter()
                .copied()
                .min_by(|a, b| m.get(*a).total_cmp(&m.get(*b)))
        });
        let project_metrics = averaged.unwrap_or_default();

        let recommendations = if file_scores.is_empty() {
            Vec::new()
        } else {
            recommendations_for(&project_metrics, self.config.scoring.recommendation_threshold)
        };

        ProjectScore {
            summary: ProjectSummary {
                files_scored: file_scores.len(),
                files_failed: failures.len(),
                overall_score: project_metrics.overall_score(),
                tiers,
                weakest_dimension,
            },
            project_metrics,
            file_scores,
            recommendations,
            failures,
        }
    }
}

fn invalid_pattern(e: PatternError) -> ScoringError {
    ScoringError::InvalidPattern {
        pattern: e.pattern,
        source: e.source,
    }
}

fn build_matcher(patterns: &[String]) -> ScoringResult<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    compile_set(patterns.iter().map(String::as_str))
        .map(Some)
        .map_err(invalid_pattern)
}

/// One recommendation per project dimension under the threshold, weakest first
pub fn recommendations_for(metrics: &QualityMetrics, threshold: f64) -> Vec<String> {
    let mut weak: Vec<Dimension> = Dimension::ALL
        .iter()
        .copied()
        .filter(|d| metrics.get(*d) < threshold)
        .collect();
    weak.sort_by(|a, b| metrics.get(*a).total_cmp(&metrics.get(*b)));

    weak.into_iter()
        .map(|d| {
            let advice = match d {
                Dimension::Maintainability => {
                    "split large modules, remove duplicated lines and trim imports"
                }
                Dimension::Complexity => "flatten nested control flow and extract helper functions",
                Dimension::Readability => {
                    "keep lines under 80 columns, use one naming style and consistent indentation"
                }
                Dimension::TestCoverage => "add tests for modules without a matching test file",
                Dimension::Documentation => "document public functions, classes and modules",
                Dimension::Security => {
                    "remove dynamic eval/exec, shell invocations and hardcoded credentials"
                }
                Dimension::Performance => {
                    "hoist regex compilation and file handles out of loops and avoid nested loops"
                }
            };
            format!(
                "{} is {:.1} (below {:.0}): {}",
                d.name(),
                metrics.get(d),
                threshold,
                advice
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepoliftConfig;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_classify_tiers() {
        let t = [60.0, 70.0, 80.0, 90.0];
        assert_eq!(QualityTier::classify(95.0, &t), QualityTier::Excellent);
        assert_eq!(QualityTier::classify(90.0, &t), QualityTier::Excellent);
        assert_eq!(QualityTier::classify(85.0, &t), QualityTier::Good);
        assert_eq!(QualityTier::classify(70.0, &t), QualityTier::Fair);
        assert_eq!(QualityTier::classify(65.0, &t), QualityTier::Poor);
        assert_eq!(QualityTier::classify(10.0, &t), QualityTier::Critical);
    }

    #[test]
    fn test_score_project_skips_ignored_dirs_and_bad_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "pkg/good.py", "def f():\n    return 1\n");
        write(root, "pkg/other.js", "function g() { return 2; }\n");
        write(root, "node_modules/lib/index.js", "function h() {}\n");
        write(root, "notes.txt", "not code\n");
        fs::write(root.join("pkg/binary.py"), [0xff, 0xfe, 0x00, 0x41]).unwrap();

        let result = QualityScorer::new().score_project(root, &[]).unwrap();

        let scored: Vec<&Path> = result.file_scores.keys().map(|p| p.as_path()).collect();
        assert_eq!(
            scored,
            vec![Path::new("pkg/good.py"), Path::new("pkg/other.js")]
        );
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].path, PathBuf::from("pkg/binary.py"));
        assert_eq!(result.summary.files_scored, 2);
        assert_eq!(result.summary.files_failed, 1);
        assert_eq!(result.summary.tiers.values().sum::<usize>(), 2);

        let avg = QualityMetrics::average(result.file_scores.values()).unwrap();
        assert_eq!(result.project_metrics, avg);
    }

    #[test]
    fn test_patterns_and_config_excludes() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "src/a.py", "x = 1\n");
        write(root, "src/b.js", "let y = 1;\n");
        write(root, "generated/c.py", "z = 1\n");

        let config: RepoliftConfig = toml::from_str("[exclude]\npaths = [\"generated/\"]\n").unwrap();
        let scorer = QualityScorer::new().with_config(config);
        let result = scorer
            .score_project(root, &["**/*.py".to_string()])
            .unwrap();
        let scored: Vec<&Path> = result.file_scores.keys().map(|p| p.as_path()).collect();
        assert_eq!(scored, vec![Path::new("src/a.py")]);
    }

    #[test]
    fn test_excludes_respect_segments() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "src/a.py", "x = 1\n");
        write(root, "src/a/b.py", "x = 1\n");
        write(root, "gen/c.py", "x = 1\n");
        write(root, "generated/d.py", "x = 1\n");
        write(root, "genomics.py", "x = 1\n");

        let config: RepoliftConfig =
            toml::from_str("[exclude]\npaths = [\"src/*.py\", \"gen\"]\n").unwrap();
        let result = QualityScorer::new()
            .with_config(config)
            .score_project(root, &[])
            .unwrap();
        let scored: Vec<&Path> = result.file_scores.keys().map(|p| p.as_path()).collect();
        assert_eq!(
            scored,
            vec![
                Path::new("generated/d.py"),
                Path::new("genomics.py"),
                Path::new("src/a/b.py"),
            ]
        );
    }

    #[test]
    fn test_invalid_exclude_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut config = RepoliftConfig::default();
        config.exclude.paths = vec!["src/[".to_string()];
        let err = QualityScorer::new()
            .with_config(config)
            .score_project(dir.path(), &[])
            .unwrap_err();
        assert!(matches!(err, ScoringError::InvalidPattern { .. }));
    }

    #[test]
    fn test_invalid_glob_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = QualityScorer::new()
            .score_project(dir.path(), &["src/[".to_string()])
            .unwrap_err();
        assert!(matches!(err, ScoringError::InvalidPattern { .. }));
    }

    #[test]
    fn test_recommendations_for_weak_dimensions() {
        let metrics = QualityMetrics::new(90.0, 90.0, 90.0, 40.0, 20.0, 90.0, 90.0);
        let recs = recommendations_for(&metrics, 70.0);
        assert_eq!(recs.len(), 2);
        assert!(recs[0].starts_with("documentation"));
        assert!(recs[1].starts_with("test_coverage"));
        assert!(recommendations_for(&QualityMetrics::uniform(100.0), 70.0).is_empty());
    }

    #[test]
    fn test_empty_project() {
        let dir = TempDir::new().unwrap();
        let result = QualityScorer::new().score_project(dir.path(), &[]).unwrap();
        assert!(result.file_scores.is_empty());
        assert!(result.recommendations.is_empty());
        assert!(result.summary.weakest_dimension.is_none());
    }
}
