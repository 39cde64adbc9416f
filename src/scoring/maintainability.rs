//! Maintainability dimension
//!
//! Blend of complexity, cognitive load, size, duplication and coupling.

use super::complexity;
use crate::parsers::{regex_imports, ParseOutcome};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

static COGNITIVE: OnceLock<Regex> = OnceLock::new();

fn cognitive_pattern() -> &'static Regex {
    COGNITIVE.get_or_init(|| {
        Regex::new(
            r"\b(?:if|elif|else|for|while|try|except|catch|case|match|switch|and|or|not)\b|&&|\|\|",
        )
        .expect("valid regex: cognitive keyword pattern")
    })
}

/// Minimum stripped length for a line to count toward duplication
const DUPLICATE_MIN_LEN: usize = 10;

pub fn score(parsed: &ParseOutcome, content: &str) -> f64 {
    let imports = match parsed.outline() {
        Some(outline) => outline.imports.len(),
        None => regex_imports(content).len(),
    };

    0.30 * complexity::score(parsed)
        + 0.25 * cognitive_score(content)
        + 0.15 * loc_band(super::text::non_blank_lines(content).count())
        + 0.15 * duplicate_score(content)
        + 0.15 * coupling_band(imports)
}

/// Control keywords and boolean operators, two points each
pub fn cognitive_score(content: &str) -> f64 {
    let count = cognitive_pattern().find_iter(content).count();
    (100.0 - 2.0 * count as f64).max(0.0)
}

pub fn loc_band(lines: usize) -> f64 {
    match lines {
        0..=100 => 100.0,
        101..=300 => 85.0,
        301..=500 => 70.0,
        501..=1000 => 50.0,
        _ => 30.0,
    }
}

pub fn duplicate_score(content: &str) -> f64 {
    let mut seen = HashSet::new();
    let mut considered = 0usize;
    let mut duplicates = 0usize;

    for line in content.lines() {
        let stripped = line.trim();
        if stripped.len() < DUPLICATE_MIN_LEN {
            continue;
        }
        considered += 1;
        if !seen.insert(stripped) {
            duplicates += 1;
        }
    }

    if considered == 0 {
        return 100.0;
    }
    let ratio = duplicates as f64 / considered as f64;
    (100.0 * (1.0 - 2.0 * ratio)).max(0.0)
}

pub fn coupling_band(imports: usize) -> f64 {
    match imports {
        0..=5 => 100.0,
        6..=10 => 85.0,
        11..=20 => 70.0,
        _ => 50.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse_source;
    use std::path::Path;

    #[test]
    fn test_duplicate_score() {
        assert_eq!(duplicate_score("short\nshort\n"), 100.0);
        let dup = "value = compute(1)\nvalue = compute(1)\n";
        // one of two considered lines is a repeat
        assert_eq!(duplicate_score(dup), 0.0);
        let quarter = "alpha = compute(1)\nbeta = compute(2)\ngamma = compute(3)\nalpha = compute(1)\n";
        assert!((duplicate_score(quarter) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_cognitive_score_counts_keywords_and_operators() {
        assert_eq!(cognitive_score("x = 1"), 100.0);
        assert_eq!(cognitive_score("if a and b:\n    pass"), 96.0);
        assert_eq!(cognitive_score("if (a && b || c) {}"), 94.0);
    }

    #[test]
    fn test_bands() {
        assert_eq!(loc_band(100), 100.0);
        assert_eq!(loc_band(101), 85.0);
        assert_eq!(loc_band(5000), 30.0);
        assert_eq!(coupling_band(5), 100.0);
        assert_eq!(coupling_band(21), 50.0);
    }

    #[test]
    fn test_simple_file_is_maintainable() {
        let source = "def add(a, b):\n    return a + b\n";
        let parsed = parse_source(Path::new("m.py"), source);
        assert!((score(&parsed, source) - 100.0).abs() < 1e-9);
    }
}
