//! Source parsing using tree-sitter
//!
//! Parsing never fails loudly. A parse attempt yields either a
//! [`SourceOutline`] or a typed [`UnparsedReason`], and every consumer branches
//! on that marker to pick its documented fallback.

mod fallback;
mod grammar;
mod outline;

pub use fallback::{regex_imports, regex_outline, FallbackOutline};
pub use grammar::{grammar_for, Grammar};

use serde::{Deserialize, Serialize};
use std::path::Path;
use tree_sitter::{Language, Node, Parser};

/// Languages with a tree-sitter grammar wired in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLanguage {
    Python,
    JavaScript,
    Rust,
}

impl SourceLanguage {
    /// Detect the language from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "py" | "pyi" => Some(SourceLanguage::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(SourceLanguage::JavaScript),
            "rs" => Some(SourceLanguage::Rust),
            _ => None,
        }
    }

    /// Expected indentation width for the language's conventional style
    pub fn indent_unit(self) -> usize {
        match self {
            SourceLanguage::JavaScript => 2,
            SourceLanguage::Python | SourceLanguage::Rust => 4,
        }
    }

    fn tree_sitter_language(self) -> Language {
        match self {
            SourceLanguage::Python => tree_sitter_python::LANGUAGE.into(),
            SourceLanguage::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            SourceLanguage::Rust => tree_sitter_rust::LANGUAGE.into(),
        }
    }
}

/// Get all supported file extensions
pub fn supported_extensions() -> &'static [&'static str] {
    &[
        "py", "pyi", // Python
        "js", "jsx", "mjs", "cjs", // JavaScript
        "rs",  // Rust
    ]
}

/// Why a source could not be turned into an outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnparsedReason {
    /// No grammar for this file type
    Unsupported,
    /// The tree contains ERROR or MISSING nodes
    Syntax { line: usize },
    /// The grammar could not be loaded or the parser gave up
    Parser { message: String },
}

impl std::fmt::Display for UnparsedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnparsedReason::Unsupported => write!(f, "unsupported language"),
            UnparsedReason::Syntax { line } => write!(f, "syntax error near line {}", line),
            UnparsedReason::Parser { message } => write!(f, "parser failure: {}", message),
        }
    }
}

/// A function or method signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSig {
    /// Name, qualified by enclosing class/impl (`Class.method`)
    pub name: String,
    /// Parameter list text with whitespace collapsed
    pub params: String,
    pub documented: bool,
    pub line: usize,
}

/// A class-like declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    pub documented: bool,
    pub line: usize,
}

/// Decision points gathered while walking the tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionTally {
    pub branches: u32,
    pub loops: u32,
    pub exceptions: u32,
    pub max_nesting: u32,
    /// Loops that sit inside another loop
    pub nested_loops: u32,
}

impl DecisionTally {
    /// Weighted total: branch=2, loop=3, exception=2, max nesting=4
    pub fn weighted_total(&self) -> u32 {
        2 * self.branches + 3 * self.loops + 2 * self.exceptions + 4 * self.max_nesting
    }
}

/// Structural summary of a successfully parsed source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceOutline {
    pub language: SourceLanguage,
    pub functions: Vec<FunctionSig>,
    pub classes: Vec<ClassInfo>,
    pub imports: Vec<String>,
    pub module_documented: bool,
    pub tally: DecisionTally,
}

impl SourceOutline {
    /// Functions plus classes plus the module itself
    pub fn documentable_count(&self) -> usize {
        self.functions.len() + self.classes.len() + 1
    }

    pub fn documented_count(&self) -> usize {
        self.functions.iter().filter(|f| f.documented).count()
            + self.classes.iter().filter(|c| c.documented).count()
            + usize::from(self.module_documented)
    }
}

/// Result of a parse attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(SourceOutline),
    Unparsed(UnparsedReason),
}

impl ParseOutcome {
    pub fn outline(&self) -> Option<&SourceOutline> {
        match self {
            ParseOutcome::Parsed(outline) => Some(outline),
            ParseOutcome::Unparsed(_) => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseOutcome::Parsed(_))
    }
}

/// Parse source content for the language implied by `path`
pub fn parse_source(path: &Path, content: &str) -> ParseOutcome {
    let Some(language) = SourceLanguage::from_path(path) else {
        return ParseOutcome::Unparsed(UnparsedReason::Unsupported);
    };

    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&language.tree_sitter_language()) {
        return ParseOutcome::Unparsed(UnparsedReason::Parser {
            message: e.to_string(),
        });
    }

    let Some(tree) = parser.parse(content, None) else {
        return ParseOutcome::Unparsed(UnparsedReason::Parser {
            message: "parser returned no tree".to_string(),
        });
    };

    let root = tree.root_node();
    if root.has_error() {
        let line = first_error_line(&root).unwrap_or(1);
        return ParseOutcome::Unparsed(UnparsedReason::Syntax { line });
    }

    ParseOutcome::Parsed(outline::build(language, &root, content.as_bytes()))
}

/// Whether `content` parses cleanly. Files without a grammar are accepted.
pub fn is_valid_syntax(path: &Path, content: &str) -> bool {
    !matches!(
        parse_source(path, content),
        ParseOutcome::Unparsed(UnparsedReason::Syntax { .. })
            | ParseOutcome::Unparsed(UnparsedReason::Parser { .. })
    )
}

/// 1-based line of the first ERROR/MISSING node
fn first_error_line(node: &Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    if !node.has_error() {
        return None;
    }
    for child in node.children(&mut node.walk()) {
        if let Some(line) = first_error_line(&child) {
            return Some(line);
        }
    }
    None
}
