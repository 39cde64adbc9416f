//! Regex outline used when a file does not parse
//!
//! Coarser than the tree-sitter outline: names are unqualified and docs are
//! not detected, but it still lets previews and API diffs say something
//! useful about broken code.

use super::FunctionSig;
use regex::Regex;
use std::sync::OnceLock;

static FUNCTION: OnceLock<Regex> = OnceLock::new();
static CLASS: OnceLock<Regex> = OnceLock::new();
static IMPORT: OnceLock<Regex> = OnceLock::new();

fn function_pattern() -> &'static Regex {
    FUNCTION.get_or_init(|| {
        Regex::new(
            r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?(?:export[ \t]+)?(?:async[ \t]+)?(?:def|fn|function)[ \t]+([A-Za-z_][A-Za-z0-9_]*)[ \t]*(?:<[^>\n]*>)?[ \t]*(\([^)\n]*\)?)",
        )
        .expect("valid regex: function signature pattern")
    })
}

fn class_pattern() -> &'static Regex {
    CLASS.get_or_init(|| {
        Regex::new(
            r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?(?:export[ \t]+)?(?:class|struct|enum|trait)[ \t]+([A-Za-z_][A-Za-z0-9_]*)",
        )
        .expect("valid regex: class pattern")
    })
}

fn import_pattern() -> &'static Regex {
    IMPORT.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*((?:import[ \t]+.+)|(?:from[ \t]+\S+[ \t]+import[ \t]+.+)|(?:use[ \t]+[^;]+;))")
            .expect("valid regex: import pattern")
    })
}

/// Names and signatures recovered by line regexes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackOutline {
    pub functions: Vec<FunctionSig>,
    pub classes: Vec<String>,
    pub imports: Vec<String>,
}

/// Extract function/class names and imports without a parser
pub fn regex_outline(content: &str) -> FallbackOutline {
    let functions = function_pattern()
        .captures_iter(content)
        .filter_map(|caps| {
            let name = caps.get(1)?;
            let params = caps
                .get(2)
                .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
                .unwrap_or_default();
            let line = content[..name.start()].matches('\n').count() + 1;
            Some(FunctionSig {
                name: name.as_str().to_string(),
                params,
                documented: false,
                line,
            })
        })
        .collect();

    let classes = class_pattern()
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect();

    FallbackOutline {
        functions,
        classes,
        imports: regex_imports(content),
    }
}

/// Import statements found by line regex
pub fn regex_imports(content: &str) -> Vec<String> {
    import_pattern()
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .collect()
}
