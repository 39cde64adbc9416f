//! JSON reporter
//!
//! Pretty-printed JSON for piping to jq or further processing.

use anyhow::Result;
use serde::Serialize;

pub fn render<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_score;
    use crate::risk::fallback_assessment;

    #[test]
    fn test_score_json_emits_overall() {
        let score = test_score();
        let json_str = render(&score).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        assert!(parsed["project_metrics"]["overall_score"].is_number());
        assert!(parsed["file_scores"]["src/good.py"].is_object());
    }

    #[test]
    fn test_assessment_json() {
        let json_str = render(&fallback_assessment()).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        assert_eq!(parsed["fallback"], true);
        assert_eq!(parsed["requires_approval"], true);
    }
}
