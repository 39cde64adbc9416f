//! Line-level measurements shared by several dimensions

use crate::parsers::SourceLanguage;

/// Whether a trimmed line is a comment in the given language
pub fn is_comment_line(language: Option<SourceLanguage>, trimmed: &str) -> bool {
    match language {
        Some(SourceLanguage::Python) => trimmed.starts_with('#'),
        Some(SourceLanguage::JavaScript) | Some(SourceLanguage::Rust) => {
            trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
        }
        None => trimmed.starts_with('#') || trimmed.starts_with("//"),
    }
}

/// Share of non-blank lines that are comments (0.0 for empty content)
pub fn comment_density(language: Option<SourceLanguage>, content: &str) -> f64 {
    let mut code = 0usize;
    let mut comments = 0usize;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        code += 1;
        if is_comment_line(language, trimmed) {
            comments += 1;
        }
    }
    if code == 0 {
        0.0
    } else {
        comments as f64 / code as f64
    }
}

/// Leading indentation width, counting a tab as one indent unit
pub fn indent_width(line: &str, unit: usize) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += unit,
            _ => break,
        }
    }
    width
}

pub fn non_blank_lines(content: &str) -> impl Iterator<Item = &str> {
    content.lines().filter(|l| !l.trim().is_empty())
}
