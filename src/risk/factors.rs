//! Sub-scores that feed the breaking-change probability
//!
//! Each function returns a value in [0, 1] and records the raw numbers it
//! used into the `risk_factors` map.

use crate::parsers::{parse_source, regex_imports, regex_outline, FunctionSig, ParseOutcome};
use crate::scoring::{complexity_total, is_test_path};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path};

pub type RawFactors = BTreeMap<String, f64>;

/// Files whose edits change what gets installed
const MANIFEST_FILES: &[&str] = &[
    "pyproject.toml",
    "setup.py",
    "setup.cfg",
    "Pipfile",
    "Pipfile.lock",
    "poetry.lock",
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "Cargo.toml",
    "Cargo.lock",
    "go.mod",
];

/// Entry points and package roots
const CORE_FILES: &[&str] = &[
    "__init__.py",
    "main.py",
    "lib.rs",
    "main.rs",
    "mod.rs",
    "index.js",
    "app.py",
    "models.py",
    "settings.py",
];

/// Functions and classes on one side of a change
pub struct Surface {
    pub functions: Vec<FunctionSig>,
    pub classes: BTreeSet<String>,
    pub imports: BTreeSet<String>,
    pub parsed: bool,
}

impl Surface {
    pub fn of(path: &Path, content: &str) -> Self {
        match parse_source(path, content) {
            ParseOutcome::Parsed(outline) => Surface {
                functions: outline.functions,
                classes: outline.classes.into_iter().map(|c| c.name).collect(),
                imports: outline.imports.into_iter().collect(),
                parsed: true,
            },
            ParseOutcome::Unparsed(_) => Self::from_regex(content),
        }
    }

    pub fn from_regex(content: &str) -> Self {
        let fallback = regex_outline(content);
        Surface {
            functions: fallback.functions,
            classes: fallback.classes.into_iter().collect(),
            imports: regex_imports(content).into_iter().collect(),
            parsed: false,
        }
    }

    /// Parameter lists of every definition, grouped by name
    fn signatures(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut by_name: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for f in &self.functions {
            by_name.entry(f.name.as_str()).or_default().push(f.params.as_str());
        }
        by_name
    }
}

/// Both sides of a change, compared on the same footing
pub struct SurfacePair {
    pub before: Surface,
    pub after: Surface,
    /// Whether both sides parsed with tree-sitter
    pub both_parsed: bool,
}

impl SurfacePair {
    /// When either side fails to parse both sides use the regex outline, so
    /// qualified and unqualified names are never compared
    pub fn of(path: &Path, original: &str, modified: &str) -> Self {
        let before = Surface::of(path, original);
        let after = Surface::of(path, modified);
        let both_parsed = before.parsed && after.parsed;
        if both_parsed {
            SurfacePair {
                before,
                after,
                both_parsed,
            }
        } else {
            SurfacePair {
                before: Surface::from_regex(original),
                after: Surface::from_regex(modified),
                both_parsed,
            }
        }
    }
}

/// 0.9 per removed function, 0.3 per changed signature, 0.5 if any class is removed
pub fn api_change(pair: &SurfacePair, factors: &mut RawFactors) -> f64 {
    let before = pair.before.signatures();
    let after = pair.after.signatures();

    // Redefinitions count separately: dropping one of two `f`s removes a function
    let mut removed = 0;
    let mut changed = 0;
    for (name, old) in &before {
        let new = after.get(name).map(Vec::as_slice).unwrap_or_default();
        removed += old.len().saturating_sub(new.len());
        let mut unmatched_new = new.to_vec();
        let mut unmatched_old = 0;
        for params in old {
            match unmatched_new.iter().position(|p| p == params) {
                Some(i) => {
                    unmatched_new.swap_remove(i);
                }
                None => unmatched_old += 1,
            }
        }
        changed += unmatched_old.min(unmatched_new.len());
    }
    let classes_removed = pair.before.classes.difference(&pair.after.classes).count();

    factors.insert("functions_removed".into(), removed as f64);
    factors.insert("signatures_changed".into(), changed as f64);
    factors.insert("classes_removed".into(), classes_removed as f64);

    let mut score = 0.9 * removed as f64 + 0.3 * changed as f64;
    if classes_removed > 0 {
        score += 0.5;
    }
    score.min(1.0)
}

pub fn is_manifest(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    MANIFEST_FILES.contains(&name) || (name.starts_with("requirements") && name.ends_with(".txt"))
}

/// 0.9 for manifests, 0.6 when the import set changes, else 0
pub fn dependency(path: &Path, pair: &SurfacePair, factors: &mut RawFactors) -> f64 {
    let added = pair.after.imports.difference(&pair.before.imports).count();
    let removed = pair.before.imports.difference(&pair.after.imports).count();
    factors.insert("imports_added".into(), added as f64);
    factors.insert("imports_removed".into(), removed as f64);

    if is_manifest(path) {
        0.9
    } else if added + removed > 0 {
        0.6
    } else {
        0.0
    }
}

pub fn complexity_delta_band(delta: i64) -> f64 {
    if delta > 10 {
        0.8
    } else if delta > 5 {
        0.5
    } else if delta > 0 {
        0.3
    } else {
        0.1
    }
}

/// Banded increase in weighted complexity; 0.5 when either side does not parse
pub fn complexity_delta(
    path: &Path,
    original: &str,
    modified: &str,
    factors: &mut RawFactors,
) -> f64 {
    match (
        complexity_total(path, original),
        complexity_total(path, modified),
    ) {
        (Some(before), Some(after)) => {
            let delta = after as i64 - before as i64;
            factors.insert("complexity_before".into(), before as f64);
            factors.insert("complexity_after".into(), after as f64);
            factors.insert("complexity_delta".into(), delta as f64);
            complexity_delta_band(delta)
        }
        _ => 0.5,
    }
}

pub fn is_core_path(path: &Path) -> bool {
    let in_core_dir = path
        .components()
        .any(|c| matches!(c, Component::Normal(part) if part == "core"));
    let core_file = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|name| CORE_FILES.contains(&name))
        .unwrap_or(false);
    in_core_dir || core_file
}

/// 0.2 for tests, 0.7 for core modules, 0.4 otherwise
pub fn test_impact(path: &Path) -> f64 {
    if is_test_path(path) {
        0.2
    } else if is_core_path(path) {
        0.7
    } else {
        0.4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_function() {
        let path = Path::new("m.py");
        let pair = SurfacePair::of(
            path,
            "def keep():\n    pass\n\ndef gone():\n    pass\n",
            "def keep():\n    pass\n",
        );
        let mut factors = RawFactors::new();
        assert!(api_change(&pair, &mut factors) >= 0.9);
        assert_eq!(factors["functions_removed"], 1.0);
    }

    #[test]
    fn test_removing_a_redefinition_is_an_api_change() {
        let path = Path::new("m.py");
        let pair = SurfacePair::of(
            path,
            "def f(a):\n    pass\n\ndef f(a, b):\n    pass\n",
            "def f(a, b):\n    pass\n",
        );
        let mut factors = RawFactors::new();
        assert!(api_change(&pair, &mut factors) >= 0.9);
        assert_eq!(factors["functions_removed"], 1.0);
        assert_eq!(factors["signatures_changed"], 0.0);

        let pair = SurfacePair::of(
            path,
            "def f(a):\n    pass\n\ndef f(a, b):\n    pass\n",
            "def f(a):\n    pass\n\ndef f(a, c):\n    pass\n",
        );
        let mut factors = RawFactors::new();
        assert!((api_change(&pair, &mut factors) - 0.3).abs() < 1e-9);
        assert_eq!(factors["functions_removed"], 0.0);
        assert_eq!(factors["signatures_changed"], 1.0);
    }

    #[test]
    fn test_signature_change_and_class_removal() {
        let path = Path::new("m.py");
        let pair = SurfacePair::of(
            path,
            "class A:\n    pass\n\ndef f(a):\n    pass\n",
            "def f(a, b):\n    pass\n",
        );
        let mut factors = RawFactors::new();
        let score = api_change(&pair, &mut factors);
        assert!((score - 0.8).abs() < 1e-9);
        assert_eq!(factors["signatures_changed"], 1.0);
        assert_eq!(factors["classes_removed"], 1.0);
    }

    #[test]
    fn test_unparsed_side_uses_regex_outline() {
        let path = Path::new("m.py");
        let pair = SurfacePair::of(
            path,
            "def a(x):\n    pass\n\ndef b():\n    pass\n",
            "def a(x):\n    pass(\n",
        );
        assert!(!pair.both_parsed);
        let mut factors = RawFactors::new();
        assert!(api_change(&pair, &mut factors) >= 0.9);
    }

    #[test]
    fn test_manifests() {
        assert!(is_manifest(Path::new("requirements-dev.txt")));
        assert!(is_manifest(Path::new("web/package.json")));
        assert!(is_manifest(Path::new("Cargo.lock")));
        assert!(!is_manifest(Path::new("src/requirements.py")));
    }

    #[test]
    fn test_dependency_import_change() {
        let path = Path::new("m.py");
        let pair = SurfacePair::of(path, "import os\n", "import os\nimport sys\n");
        let mut factors = RawFactors::new();
        assert_eq!(dependency(path, &pair, &mut factors), 0.6);
        assert_eq!(factors["imports_added"], 1.0);
    }

    #[test]
    fn test_complexity_delta_bands() {
        assert_eq!(complexity_delta_band(11), 0.8);
        assert_eq!(complexity_delta_band(6), 0.5);
        assert_eq!(complexity_delta_band(1), 0.3);
        assert_eq!(complexity_delta_band(0), 0.1);
        assert_eq!(complexity_delta_band(-4), 0.1);
    }

    #[test]
    fn test_test_impact() {
        assert_eq!(test_impact(Path::new("tests/test_api.py")), 0.2);
        assert_eq!(test_impact(Path::new("pkg/core/engine.py")), 0.7);
        assert_eq!(test_impact(Path::new("pkg/__init__.py")), 0.7);
        assert_eq!(test_impact(Path::new("pkg/helpers.py")), 0.4);
    }
}
