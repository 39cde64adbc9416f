//! Per-language node-kind tables
//!
//! The outline walker is language-agnostic; everything it needs to know about
//! a grammar lives in one of these tables.

use super::SourceLanguage;

/// Node kinds the outline walker cares about for one tree-sitter grammar
#[derive(Debug)]
pub struct Grammar {
    /// Decision points weighted as branches
    pub branch_kinds: &'static [&'static str],
    /// Decision points weighted as loops
    pub loop_kinds: &'static [&'static str],
    /// Decision points weighted as exception handlers
    pub exception_kinds: &'static [&'static str],
    /// Kinds that open a nesting level
    pub nesting_kinds: &'static [&'static str],
    pub function_kinds: &'static [&'static str],
    /// Class-like declarations (classes, structs, enums, traits)
    pub class_kinds: &'static [&'static str],
    /// Kinds that scope nested function names (classes plus e.g. Rust `impl`)
    pub scope_kinds: &'static [&'static str],
    pub import_kinds: &'static [&'static str],
    pub comment_kinds: &'static [&'static str],
}

impl Grammar {
    pub fn is_branch(&self, kind: &str) -> bool {
        self.branch_kinds.contains(&kind)
    }
    pub fn is_loop(&self, kind: &str) -> bool {
        self.loop_kinds.contains(&kind)
    }
    pub fn is_exception(&self, kind: &str) -> bool {
        self.exception_kinds.contains(&kind)
    }
    pub fn is_nesting(&self, kind: &str) -> bool {
        self.nesting_kinds.contains(&kind)
    }
    pub fn is_function(&self, kind: &str) -> bool {
        self.function_kinds.contains(&kind)
    }
    pub fn is_class(&self, kind: &str) -> bool {
        self.class_kinds.contains(&kind)
    }
    pub fn is_scope(&self, kind: &str) -> bool {
        self.scope_kinds.contains(&kind)
    }
    pub fn is_import(&self, kind: &str) -> bool {
        self.import_kinds.contains(&kind)
    }
    pub fn is_comment(&self, kind: &str) -> bool {
        self.comment_kinds.contains(&kind)
    }
}

static PYTHON: Grammar = Grammar {
    branch_kinds: &[
        "if_statement",
        "elif_clause",
        "conditional_expression",
        "case_clause",
    ],
    loop_kinds: &["for_statement", "while_statement"],
    exception_kinds: &["except_clause", "except_group_clause"],
    nesting_kinds: &[
        "if_statement",
        "for_statement",
        "while_statement",
        "try_statement",
        "with_statement",
        "match_statement",
    ],
    function_kinds: &["function_definition", "async_function_definition"],
    class_kinds: &["class_definition"],
    scope_kinds: &["class_definition"],
    import_kinds: &[
        "import_statement",
        "import_from_statement",
        "future_import_statement",
    ],
    comment_kinds: &["comment"],
};

static JAVASCRIPT: Grammar = Grammar {
    branch_kinds: &["if_statement", "ternary_expression", "switch_case"],
    loop_kinds: &[
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
    ],
    exception_kinds: &["catch_clause"],
    nesting_kinds: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "try_statement",
        "switch_statement",
    ],
    function_kinds: &[
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
    ],
    class_kinds: &["class_declaration"],
    scope_kinds: &["class_declaration"],
    import_kinds: &["import_statement"],
    comment_kinds: &["comment"],
};

static RUST: Grammar = Grammar {
    branch_kinds: &["if_expression", "match_expression"],
    loop_kinds: &["for_expression", "while_expression", "loop_expression"],
    exception_kinds: &[],
    nesting_kinds: &[
        "if_expression",
        "match_expression",
        "for_expression",
        "while_expression",
        "loop_expression",
    ],
    function_kinds: &["function_item"],
    class_kinds: &["struct_item", "enum_item", "trait_item"],
    scope_kinds: &["impl_item", "trait_item"],
    import_kinds: &["use_declaration"],
    comment_kinds: &["line_comment", "block_comment"],
};

/// Node-kind table for a language
pub fn grammar_for(language: SourceLanguage) -> &'static Grammar {
    match language {
        SourceLanguage::Python => &PYTHON,
        SourceLanguage::JavaScript => &JAVASCRIPT,
        SourceLanguage::Rust => &RUST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loops_open_nesting() {
        for lang in [
            SourceLanguage::Python,
            SourceLanguage::JavaScript,
            SourceLanguage::Rust,
        ] {
            let g = grammar_for(lang);
            for kind in g.loop_kinds {
                assert!(g.is_nesting(kind), "{:?}: {} should nest", lang, kind);
            }
        }
    }
}
