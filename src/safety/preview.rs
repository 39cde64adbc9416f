//! Change previews
//!
//! Pure: nothing is read from or written to disk.

use crate::diff::{diff_stats, unified_diff, DiffStats};
use crate::parsers::{is_valid_syntax, parse_source, regex_outline, FunctionSig};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePreview {
    pub diff: String,
    /// Functions added, removed or re-signed, sorted
    pub affected_functions: Vec<String>,
    pub syntax_valid: bool,
    pub stats: DiffStats,
}

pub fn preview_changes(path: &Path, original: &str, modified: &str) -> ChangePreview {
    let label = path.to_string_lossy();
    ChangePreview {
        diff: unified_diff(&label, original, modified),
        affected_functions: affected_functions(path, original, modified),
        syntax_valid: is_valid_syntax(path, modified),
        stats: diff_stats(original, modified),
    }
}

fn affected_functions(path: &Path, original: &str, modified: &str) -> Vec<String> {
    let before = parse_source(path, original);
    let after = parse_source(path, modified);

    let (old_fns, new_fns) = match (before.outline(), after.outline()) {
        (Some(b), Some(a)) => (signatures(&b.functions), signatures(&a.functions)),
        _ => (
            signatures(&regex_outline(original).functions),
            signatures(&regex_outline(modified).functions),
        ),
    };

    let old_names: BTreeSet<&String> = old_fns.keys().collect();
    let new_names: BTreeSet<&String> = new_fns.keys().collect();

    let mut affected: BTreeSet<String> = old_names
        .symmetric_difference(&new_names)
        .map(|name| (*name).clone())
        .collect();
    for (name, params) in &old_fns {
        if new_fns.get(name).is_some_and(|p| p != params) {
            affected.insert(name.clone());
        }
    }
    affected.into_iter().collect()
}

fn signatures(functions: &[FunctionSig]) -> BTreeMap<String, String> {
    functions
        .iter()
        .map(|f| (f.name.clone(), f.params.clone()))
        .collect()
}
