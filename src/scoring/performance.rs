//! Performance dimension
//!
//! Anti-pattern penalties plus a small bonus for idiomatic constructs.
//! Loop regions are tracked by indentation so the same rules work on files
//! that fail to parse.

use super::text::indent_width;
use crate::parsers::ParseOutcome;
use regex::Regex;
use std::sync::OnceLock;

static LOOP_HEADER: OnceLock<Regex> = OnceLock::new();
static REGEX_CALL: OnceLock<Regex> = OnceLock::new();
static BARE_OPEN: OnceLock<Regex> = OnceLock::new();
static GLOBAL: OnceLock<Regex> = OnceLock::new();
static IDIOMS: OnceLock<Vec<Regex>> = OnceLock::new();

fn loop_header() -> &'static Regex {
    LOOP_HEADER.get_or_init(|| {
        Regex::new(r"^\s*(?:async\s+)?(?:for\b|while\b|loop\s*\{|do\s*\{)|\.forEach\s*\(")
            .expect("valid regex: loop header")
    })
}

fn regex_call() -> &'static Regex {
    REGEX_CALL.get_or_init(|| {
        Regex::new(
            r"\bre\.(?:compile|match|search|findall|finditer|fullmatch|sub|split)\s*\(|Regex::new\s*\(|new RegExp\s*\(",
        )
        .expect("valid regex: regex call")
    })
}

/// `open(` as a free function call; methods and paths (`File::open(`) don't count
fn bare_open() -> &'static Regex {
    BARE_OPEN.get_or_init(|| Regex::new(r"(?:^|[^.:\w])open\s*\(").expect("valid regex: open call"))
}

fn global_statement() -> &'static Regex {
    GLOBAL.get_or_init(|| Regex::new(r"^\s*global\s+\w").expect("valid regex: global statement"))
}

/// Comprehension, enumerate, with, join, generator expression, f-string
fn idioms() -> &'static [Regex] {
    IDIOMS.get_or_init(|| {
        [
            r"\[[^\[\]\n]+\bfor\b[^\[\]\n]+\bin\b[^\[\]\n]*\]",
            r"\benumerate\s*\(",
            r"(?m)^\s*(?:async\s+)?with\s",
            r"\.join\s*\(",
            r"\(\s*[^()\n]+\bfor\b[^()\n]+\bin\b[^()\n]*\)",
            r#"\bf["']"#,
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid regex: performance idiom"))
        .collect()
    })
}

const NESTED_LOOP_PENALTY: f64 = 15.0;
const REGEX_IN_LOOP_PENALTY: f64 = 10.0;
const BARE_OPEN_PENALTY: f64 = 5.0;
const GLOBAL_PENALTY: f64 = 5.0;

/// Counts behind the performance score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerformanceFindings {
    pub nested_loops: u32,
    pub regex_in_loop: u32,
    pub bare_open: u32,
    pub globals: u32,
    pub idioms: u32,
}

impl PerformanceFindings {
    pub fn penalty(&self) -> f64 {
        NESTED_LOOP_PENALTY * self.nested_loops as f64
            + REGEX_IN_LOOP_PENALTY * self.regex_in_loop as f64
            + BARE_OPEN_PENALTY * self.bare_open as f64
            + GLOBAL_PENALTY * self.globals as f64
    }

    pub fn score(&self) -> f64 {
        let anti = (100.0 - self.penalty()).max(0.0);
        let idiom = (60.0 + 10.0 * self.idioms as f64).min(100.0);
        0.7 * anti + 0.3 * idiom
    }
}

pub fn score(parsed: &ParseOutcome, content: &str, indent_unit: usize) -> f64 {
    analyze(parsed, content, indent_unit).score()
}

pub fn analyze(parsed: &ParseOutcome, content: &str, indent_unit: usize) -> PerformanceFindings {
    let mut findings = PerformanceFindings::default();

    // Open loops, as the indentation of their header lines
    let mut open_loops: Vec<usize> = Vec::new();
    let mut heuristic_nested = 0u32;

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }
        let indent = indent_width(line, indent_unit);
        while open_loops.last().is_some_and(|top| indent <= *top) {
            open_loops.pop();
        }
        let in_loop = !open_loops.is_empty();

        if in_loop && regex_call().is_match(line) {
            findings.regex_in_loop += 1;
        }
        if bare_open().is_match(line) && !is_with_line(trimmed) && !is_definition(trimmed) {
            findings.bare_open += 1;
        }
        if global_statement().is_match(line) {
            findings.globals += 1;
        }
        if loop_header().is_match(line) {
            if in_loop {
                heuristic_nested += 1;
            }
            open_loops.push(indent);
        }
    }

    findings.nested_loops = match parsed.outline() {
        Some(outline) => outline.tally.nested_loops,
        None => heuristic_nested,
    };
    findings.idioms = idioms().iter().filter(|re| re.is_match(content)).count() as u32;
    findings
}

fn is_with_line(trimmed: &str) -> bool {
    trimmed.starts_with("with ") || trimmed.starts_with("async with ")
}

fn is_definition(trimmed: &str) -> bool {
    let rest = trimmed.strip_prefix("pub ").unwrap_or(trimmed);
    let rest = rest.strip_prefix("async ").unwrap_or(rest);
    ["def ", "fn ", "function "]
        .iter()
        .any(|kw| rest.starts_with(kw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse_source;
    use std::path::Path;

    fn findings(source: &str) -> PerformanceFindings {
        let parsed = parse_source(Path::new("p.py"), source);
        analyze(&parsed, source, 4)
    }

    #[test]
    fn test_nested_loop_and_regex_in_loop() {
        let source = "import re\nfor a in xs:\n    for b in ys:\n        re.match(p, b)\n";
        let f = findings(source);
        assert_eq!(f.nested_loops, 1);
        assert_eq!(f.regex_in_loop, 1);
        assert_eq!(f.penalty(), 25.0);
    }

    #[test]
    fn test_regex_outside_loop_is_fine() {
        let source = "import re\nPAT = re.compile('x')\nfor a in xs:\n    PAT.match(a)\n";
        let f = findings(source);
        assert_eq!(f.regex_in_loop, 0);
    }

    #[test]
    fn test_open_and_global() {
        let source = "def f():\n    global counter\n    fh = open('x')\n    with open('y') as g:\n        pass\n";
        let f = findings(source);
        assert_eq!(f.bare_open, 1);
        assert_eq!(f.globals, 1);
        assert!(f.idioms >= 1);
    }

    #[test]
    fn test_path_and_method_open_are_not_bare() {
        let source = "use std::fs::File;\nfn load() {\n    let f = File::open(\"x\");\n    let g = std::fs::OpenOptions::new().read(true).open(\"y\");\n}\nfn open(p: &str) {}\n";
        let parsed = parse_source(Path::new("p.rs"), source);
        assert_eq!(analyze(&parsed, source, 4).bare_open, 0);

        let python = "class Store:\n    def open(self):\n        return self.fs.open('z')\n";
        assert_eq!(findings(python).bare_open, 0);
    }

    #[test]
    fn test_idioms_raise_score() {
        let plain = findings("x = 1\n");
        assert_eq!(plain.idioms, 0);
        assert!((plain.score() - 88.0).abs() < 1e-9);

        let idiomatic = findings(
            "names = [n for n in xs]\nfor i, n in enumerate(names):\n    print(f\"{i}\")\nline = ', '.join(names)\n",
        );
        assert_eq!(idiomatic.idioms, 4);
        assert!(idiomatic.score() > plain.score());
    }

    #[test]
    fn test_heuristic_nesting_on_unparsed_code() {
        let source = "for a in xs:\n    for b in ys:\n        print(a b\n";
        let parsed = parse_source(Path::new("p.py"), source);
        assert!(!parsed.is_parsed());
        assert_eq!(analyze(&parsed, source, 4).nested_loops, 1);
    }
}
