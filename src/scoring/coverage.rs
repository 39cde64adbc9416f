//! Test coverage dimension
//!
//! A real coverage figure comes from an injected [`CoverageReporter`]. Without
//! one the score falls back to whether a conventionally named test exists.

use std::path::{Component, Path, PathBuf};

/// Score when a matching test file exists (or the file is itself a test)
pub const TESTED_SCORE: f64 = 80.0;
/// Score when no test file is found
pub const UNTESTED_SCORE: f64 = 40.0;

/// Source of measured line coverage
pub trait CoverageReporter: Send + Sync {
    /// Coverage percentage (0-100) for a file, if known
    fn coverage(&self, path: &Path) -> Option<f64>;
}

/// Reporter with no data
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCoverage;

impl CoverageReporter for NoCoverage {
    fn coverage(&self, _path: &Path) -> Option<f64> {
        None
    }
}

pub fn score(path: &Path, reporter: &dyn CoverageReporter) -> f64 {
    if let Some(pct) = reporter.coverage(path) {
        return pct;
    }
    if is_test_path(path) || has_test_file(path) {
        TESTED_SCORE
    } else {
        UNTESTED_SCORE
    }
}

/// Whether a path names a test file or lives in a test directory
pub fn is_test_path(path: &Path) -> bool {
    let in_test_dir = path.components().any(|c| match c {
        Component::Normal(part) => matches!(
            part.to_str(),
            Some("tests") | Some("test") | Some("__tests__")
        ),
        _ => false,
    });
    if in_test_dir {
        return true;
    }

    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    stem.starts_with("test_")
        || stem.ends_with("_test")
        || name.contains(".test.")
        || name.contains(".spec.")
}

/// Look for `test_{stem}`, `{stem}_test`, `{stem}.test`, `{stem}.spec` next to the
/// file, under `tests/` or `test/`, or under a `tests/` beside the parent dir
pub fn has_test_file(path: &Path) -> bool {
    candidate_test_files(path).iter().any(|p| p.is_file())
}

fn candidate_test_files(path: &Path) -> Vec<PathBuf> {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return Vec::new();
    };
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    let names = [
        format!("test_{}{}", stem, ext),
        format!("{}_test{}", stem, ext),
        format!("{}.test{}", stem, ext),
        format!("{}.spec{}", stem, ext),
    ];

    let mut dirs = vec![
        parent.to_path_buf(),
        parent.join("tests"),
        parent.join("test"),
    ];
    if let Some(grandparent) = parent.parent() {
        dirs.push(grandparent.join("tests"));
    }

    dirs.iter()
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .collect()
}
