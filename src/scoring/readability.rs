//! Readability dimension

use super::text::{comment_density, indent_width, non_blank_lines};
use crate::parsers::SourceLanguage;
use regex::Regex;
use std::sync::OnceLock;

static SNAKE: OnceLock<Regex> = OnceLock::new();
static CAMEL: OnceLock<Regex> = OnceLock::new();

fn snake_case() -> &'static Regex {
    SNAKE.get_or_init(|| {
        Regex::new(r"\b[a-z][a-z0-9]*(?:_[a-z0-9]+)+\b").expect("valid regex: snake_case identifier")
    })
}

fn camel_case() -> &'static Regex {
    CAMEL.get_or_init(|| {
        Regex::new(r"\b[a-z][a-z0-9]*(?:[A-Z][a-z0-9]*)+\b").expect("valid regex: camelCase identifier")
    })
}

const LONG_LINE: usize = 80;

pub fn score(language: Option<SourceLanguage>, content: &str) -> f64 {
    let unit = language.map(SourceLanguage::indent_unit).unwrap_or(4);

    0.25 * naming_consistency(content)
        + 0.20 * comment_score(language, content)
        + 0.20 * long_line_score(content)
        + 0.20 * nesting_band(max_indent_depth(content, unit))
        + 0.15 * indent_consistency(content, unit)
}

/// How strongly the file commits to one naming style
pub fn naming_consistency(content: &str) -> f64 {
    let snake = snake_case().find_iter(content).count();
    let camel = camel_case().find_iter(content).count();
    if snake + camel == 0 {
        return 100.0;
    }
    let r = snake as f64 / (snake + camel) as f64;
    100.0 * r.max(1.0 - r)
}

pub fn comment_score(language: Option<SourceLanguage>, content: &str) -> f64 {
    (comment_density(language, content) / 0.2).min(1.0) * 100.0
}

pub fn long_line_score(content: &str) -> f64 {
    let total = content.lines().count();
    if total == 0 {
        return 100.0;
    }
    let long = content
        .lines()
        .filter(|l| l.chars().count() > LONG_LINE)
        .count();
    100.0 * (1.0 - long as f64 / total as f64)
}

/// Deepest indentation level, in language indent units
pub fn max_indent_depth(content: &str, unit: usize) -> usize {
    non_blank_lines(content)
        .map(|l| indent_width(l, unit) / unit.max(1))
        .max()
        .unwrap_or(0)
}

pub fn nesting_band(depth: usize) -> f64 {
    match depth {
        0..=3 => 100.0,
        4..=5 => 80.0,
        6..=7 => 60.0,
        _ => 40.0,
    }
}

/// Share of indented lines whose width is a multiple of the indent unit
pub fn indent_consistency(content: &str, unit: usize) -> f64 {
    let widths: Vec<usize> = non_blank_lines(content)
        .map(|l| indent_width(l, unit))
        .filter(|w| *w > 0)
        .collect();
    if widths.is_empty() {
        return 100.0;
    }
    let aligned = widths.iter().filter(|w| *w % unit.max(1) == 0).count();
    100.0 * aligned as f64 / widths.len() as f64
}
