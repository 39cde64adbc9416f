//! Glob matching for `exclude.paths` and `score --pattern`
//!
//! Both go through globset with `*` confined to one path segment. Exclude
//! entries follow gitignore conventions:
//!
//! - `name` or `*.ext` (no `/`) matches at any depth, as a file or a directory
//! - `dir/` matches everything under the root-level `dir`
//! - anything else containing `/` is anchored at the root: `src/*.py`
//!   matches `src/a.py` but not `src/a/b.py`

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("invalid glob '{pattern}': {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: globset::Error,
}

/// Compile one glob with `*` and `?` not crossing `/`
pub fn compile_glob(pattern: &str) -> Result<Glob, PatternError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| PatternError {
            pattern: pattern.to_string(),
            source,
        })
}

/// Compile a list of globs into one set
pub fn compile_set<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Result<GlobSet, PatternError> {
    let mut builder = GlobSetBuilder::new();
    let mut all = Vec::new();
    for pattern in patterns {
        builder.add(compile_glob(pattern)?);
        all.push(pattern);
    }
    builder.build().map_err(|source| PatternError {
        pattern: all.join(", "),
        source,
    })
}

/// Globs one exclude entry stands for
fn expand_exclude(entry: &str) -> Vec<String> {
    let entry = entry.trim().trim_start_matches("./");
    if entry.is_empty() {
        return Vec::new();
    }
    if let Some(dir) = entry.strip_suffix('/') {
        return vec![format!("{}/**", dir.trim_end_matches('/'))];
    }
    let anchored = if entry.contains('/') {
        entry.to_string()
    } else {
        format!("**/{}", entry)
    };
    if anchored.ends_with("/**") {
        vec![anchored]
    } else {
        vec![format!("{}/**", anchored), anchored]
    }
}

/// Compiled `exclude.paths`
#[derive(Debug, Clone)]
pub struct ExcludeMatcher {
    set: GlobSet,
}

impl ExcludeMatcher {
    pub fn new(entries: &[String]) -> Result<Self, PatternError> {
        let globs: Vec<String> = entries.iter().flat_map(|e| expand_exclude(e)).collect();
        let set = compile_set(globs.iter().map(String::as_str))?;
        Ok(Self { set })
    }

    /// Whether a root-relative path is excluded
    pub fn is_excluded(&self, rel: &Path) -> bool {
        !self.set.is_empty() && self.set.is_match(rel)
    }
}
