//! Pre-write validation of new content

use crate::parsers::{parse_source, ParseOutcome, UnparsedReason};
use crate::scoring::pattern_hits;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Syntax,
    DangerousPattern,
    SizeLimit,
}

/// Why a change was refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
}

impl ValidationIssue {
    fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Check `new` before it replaces `old` at `path`
pub fn validate_change(path: &Path, old: &str, new: &str, max_size: usize) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    match parse_source(path, new) {
        ParseOutcome::Unparsed(UnparsedReason::Syntax { line }) => issues.push(ValidationIssue::new(
            IssueKind::Syntax,
            format!("syntax error near line {}", line),
        )),
        ParseOutcome::Unparsed(UnparsedReason::Parser { message }) => {
            issues.push(ValidationIssue::new(IssueKind::Syntax, message))
        }
        _ => {}
    }

    // Only patterns the change introduces count
    let before: HashMap<&str, usize> = pattern_hits(old)
        .into_iter()
        .map(|hit| (hit.name, hit.count))
        .collect();
    for hit in pattern_hits(new) {
        let previous = before.get(hit.name).copied().unwrap_or(0);
        if hit.count > previous {
            issues.push(ValidationIssue::new(
                IssueKind::DangerousPattern,
                format!("introduces {} ({} new)", hit.name, hit.count - previous),
            ));
        }
    }

    if new.len() > max_size {
        issues.push(ValidationIssue::new(
            IssueKind::SizeLimit,
            format!("{} bytes exceeds the {} byte limit", new.len(), max_size),
        ));
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_change_passes() {
        let issues = validate_change(Path::new("a.py"), "x = 1\n", "x = 2\n", 1024);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_syntax_error() {
        let issues = validate_change(Path::new("a.py"), "x = 1\n", "def f(:\n", 1024);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::Syntax);
    }

    #[test]
    fn test_existing_danger_is_not_reported_again() {
        let old = "eval(a)\n";
        assert!(validate_change(Path::new("a.py"), old, "eval(a)\nx = 1\n", 1024).is_empty());
        let issues = validate_change(Path::new("a.py"), old, "eval(a)\neval(b)\n", 1024);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::DangerousPattern);
    }

    #[test]
    fn test_size_limit() {
        let big = "x = 1\n".repeat(100);
        let issues = validate_change(Path::new("a.py"), "", &big, 64);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::SizeLimit);
    }
}
