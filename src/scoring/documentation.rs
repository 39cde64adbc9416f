//! Documentation dimension

use super::text::comment_density;
use crate::parsers::{ParseOutcome, SourceLanguage};

pub fn score(language: Option<SourceLanguage>, parsed: &ParseOutcome, content: &str) -> f64 {
    let density = comment_density(language, content);

    match parsed.outline() {
        Some(outline) => {
            let documented = outline.documented_count() as f64;
            let documentable = outline.documentable_count() as f64;
            (documented / documentable * 80.0 + (density * 100.0).min(20.0)).min(100.0)
        }
        None => (density * 200.0).min(100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse_source;
    use std::path::Path;

    #[test]
    fn test_fully_documented_python() {
        let source = "\"\"\"Module.\"\"\"\n# helpers\n\ndef f():\n    \"\"\"Doc.\"\"\"\n    return 1\n";
        let parsed = parse_source(Path::new("d.py"), source);
        let s = score(Some(SourceLanguage::Python), &parsed, source);
        // 2/2 documented plus 1 comment among 5 non-blank lines
        assert!((s - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_undocumented_python() {
        let source = "def f():\n    return 1\n";
        let parsed = parse_source(Path::new("d.py"), source);
        assert_eq!(score(Some(SourceLanguage::Python), &parsed, source), 0.0);
    }

    #[test]
    fn test_unparsed_uses_density_only() {
        let source = "# note\ndef broken(:\n";
        let parsed = parse_source(Path::new("d.py"), source);
        assert!(!parsed.is_parsed());
        assert_eq!(score(Some(SourceLanguage::Python), &parsed, source), 100.0);
    }
}
