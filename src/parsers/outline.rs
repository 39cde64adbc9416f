//! Outline extraction
//!
//! A single recursive walk fills an [`OutlineAccumulator`] that is passed
//! down explicitly. Nothing is captured by closures, so outlines for
//! different files can be built on different threads.

use super::grammar::{grammar_for, Grammar};
use super::{ClassInfo, DecisionTally, FunctionSig, SourceLanguage, SourceOutline};
use tree_sitter::Node;

/// Walk state that changes per level of the tree
#[derive(Debug, Clone, Copy, Default)]
struct Depth {
    nesting: u32,
    loops: u32,
}

/// Mutable results threaded through the walk
struct OutlineAccumulator<'s> {
    source: &'s [u8],
    language: SourceLanguage,
    grammar: &'static Grammar,
    functions: Vec<FunctionSig>,
    classes: Vec<ClassInfo>,
    imports: Vec<String>,
    tally: DecisionTally,
}

/// Build an outline from a parsed, error-free tree
pub(super) fn build(language: SourceLanguage, root: &Node, source: &[u8]) -> SourceOutline {
    let mut acc = OutlineAccumulator {
        source,
        language,
        grammar: grammar_for(language),
        functions: Vec::new(),
        classes: Vec::new(),
        imports: Vec::new(),
        tally: DecisionTally::default(),
    };

    visit(root, &mut acc, Depth::default(), "");

    let module_documented = module_has_doc(language, root, source);

    SourceOutline {
        language,
        functions: acc.functions,
        classes: acc.classes,
        imports: acc.imports,
        module_documented,
        tally: acc.tally,
    }
}

fn visit(node: &Node, acc: &mut OutlineAccumulator, depth: Depth, scope: &str) {
    let kind = node.kind();
    let grammar = acc.grammar;
    let mut depth = depth;

    if grammar.is_branch(kind) {
        acc.tally.branches += 1;
    }
    if grammar.is_exception(kind) {
        acc.tally.exceptions += 1;
    }
    if grammar.is_loop(kind) {
        acc.tally.loops += 1;
        if depth.loops > 0 {
            acc.tally.nested_loops += 1;
        }
        depth.loops += 1;
    }
    if grammar.is_nesting(kind) {
        depth.nesting += 1;
        acc.tally.max_nesting = acc.tally.max_nesting.max(depth.nesting);
    }

    if grammar.is_import(kind) {
        if let Some(text) = node_text(node, acc.source) {
            acc.imports.push(collapse_whitespace(text));
        }
    }

    if grammar.is_function(kind) {
        if let Some(sig) = function_sig(node, acc, scope) {
            acc.functions.push(sig);
        }
    }

    if grammar.is_class(kind) {
        if let Some(name) = field_text(node, "name", acc.source) {
            acc.classes.push(ClassInfo {
                name: qualify(scope, name),
                documented: has_doc(acc.language, node, acc.source),
                line: node.start_position().row + 1,
            });
        }
    }

    // Names declared inside a class or impl are qualified by it
    let child_scope = if grammar.is_scope(kind) {
        scope_name(node, acc.source)
            .map(|name| qualify(scope, name))
            .unwrap_or_else(|| scope.to_string())
    } else {
        scope.to_string()
    };

    for child in node.children(&mut node.walk()) {
        visit(&child, acc, depth, &child_scope);
    }
}

fn function_sig(node: &Node, acc: &OutlineAccumulator, scope: &str) -> Option<FunctionSig> {
    let name = field_text(node, "name", acc.source)?;
    let params = field_text(node, "parameters", acc.source)
        .map(collapse_whitespace)
        .unwrap_or_default();

    Some(FunctionSig {
        name: qualify(scope, name),
        params,
        documented: has_doc(acc.language, node, acc.source),
        line: node.start_position().row + 1,
    })
}

/// Name used to qualify members of a class/impl/trait
fn scope_name<'a>(node: &Node, source: &'a [u8]) -> Option<&'a str> {
    field_text(node, "name", source).or_else(|| field_text(node, "type", source))
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope, name)
    }
}

fn field_text<'a>(node: &Node, field: &str, source: &'a [u8]) -> Option<&'a str> {
    node.child_by_field_name(field)
        .and_then(|n| n.utf8_text(source).ok())
}

fn node_text<'a>(node: &Node, source: &'a [u8]) -> Option<&'a str> {
    node.utf8_text(source).ok()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a definition carries a doc comment/docstring in its language's convention
fn has_doc(language: SourceLanguage, node: &Node, source: &[u8]) -> bool {
    match language {
        SourceLanguage::Python => node
            .child_by_field_name("body")
            .map(|body| starts_with_docstring(&body))
            .unwrap_or(false),
        SourceLanguage::JavaScript => {
            let anchor = match node.parent() {
                Some(parent) if parent.kind() == "export_statement" => parent,
                _ => *node,
            };
            preceding_comment(&anchor, source)
                .map(|text| text.starts_with("/**"))
                .unwrap_or(false)
        }
        SourceLanguage::Rust => {
            let mut prev = node.prev_sibling();
            while let Some(sibling) = prev {
                match sibling.kind() {
                    "attribute_item" => prev = sibling.prev_sibling(),
                    "line_comment" | "block_comment" => {
                        let text = sibling.utf8_text(source).unwrap_or("");
                        return text.starts_with("///") || text.starts_with("/**");
                    }
                    _ => return false,
                }
            }
            false
        }
    }
}

/// Python: first statement of a block is a bare string
fn starts_with_docstring(block: &Node) -> bool {
    let mut cursor = block.walk();
    let first = block.named_children(&mut cursor).next();
    match first {
        Some(stmt) if stmt.kind() == "expression_statement" => {
            let mut inner = stmt.walk();
            let expr = stmt.named_children(&mut inner).next();
            matches!(expr, Some(e) if e.kind() == "string")
        }
        _ => false,
    }
}

fn preceding_comment<'a>(node: &Node, source: &'a [u8]) -> Option<&'a str> {
    let prev = node.prev_named_sibling()?;
    if prev.kind() == "comment" {
        prev.utf8_text(source).ok()
    } else {
        None
    }
}

fn module_has_doc(language: SourceLanguage, root: &Node, source: &[u8]) -> bool {
    match language {
        SourceLanguage::Python => starts_with_docstring(root),
        SourceLanguage::JavaScript => {
            let mut cursor = root.walk();
            let first = root.named_children(&mut cursor).next();
            matches!(first, Some(n) if n.kind() == "comment"
                && n.utf8_text(source).map(|t| t.starts_with("/**")).unwrap_or(false))
        }
        SourceLanguage::Rust => {
            let mut cursor = root.walk();
            let found = root.children(&mut cursor).any(|n| {
                (n.kind() == "line_comment" || n.kind() == "block_comment")
                    && n.utf8_text(source)
                        .map(|t| t.starts_with("//!") || t.starts_with("/*!"))
                        .unwrap_or(false)
            });
            found
        }
    }
}
