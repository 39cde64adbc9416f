//! Complexity dimension
//!
//! Decision points come from the outline tally. The weighted total maps onto
//! a fixed breakpoint table.

use crate::parsers::ParseOutcome;

/// Score used when the file cannot be parsed
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Map a weighted decision-point total onto the 0-100 complexity scale
pub fn band(total: u32) -> f64 {
    match total {
        0 => 100.0,
        1..=5 => 95.0,
        6..=10 => 90.0,
        11..=20 => 80.0,
        21..=30 => 70.0,
        31..=45 => 60.0,
        46..=59 => 50.0,
        _ => (100.0 - total as f64).max(30.0),
    }
}

pub fn score(parsed: &ParseOutcome) -> f64 {
    match parsed.outline() {
        Some(outline) => band(outline.tally.weighted_total()),
        None => NEUTRAL_SCORE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse_source;
    use std::path::Path;

    #[test]
    fn test_band_breakpoints() {
        assert_eq!(band(0), 100.0);
        assert_eq!(band(5), 95.0);
        assert_eq!(band(6), 90.0);
        assert_eq!(band(20), 80.0);
        assert_eq!(band(30), 70.0);
        assert_eq!(band(45), 60.0);
        assert_eq!(band(59), 50.0);
        assert_eq!(band(60), 40.0);
        assert_eq!(band(65), 35.0);
        assert_eq!(band(500), 30.0);
    }

    #[test]
    fn test_band_is_non_increasing() {
        let mut prev = band(0);
        for total in 1..200 {
            let current = band(total);
            assert!(current <= prev, "band({}) rose above band({})", total, total - 1);
            prev = current;
        }
    }

    #[test]
    fn test_unparsed_is_neutral() {
        let parsed = parse_source(Path::new("x.py"), "def broken(:\n");
        assert_eq!(score(&parsed), NEUTRAL_SCORE);
    }
}
