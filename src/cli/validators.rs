//! CLI argument validators.
//!
//! Shared validation functions for CLI argument parsing.

use chrono::{Month, NaiveDate};

/// Parse and validate confidence value (0.0-1.0).
pub fn parse_confidence(s: &str) -> Result<f64, String> {
    parse_bounded_float(s, 0.0, 1.0, "confidence")
}

/// Parse and validate a bounded float value.
///
/// # Arguments
///
/// * `s` - The string to parse
/// * `min` - Minimum allowed value (inclusive)
/// * `max` - Maximum allowed value (inclusive)
/// * `name` - Name of the parameter for error messages
pub fn parse_bounded_float(s: &str, min: f64, max: f64, name: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(min..=max).contains(&value) {
        return Err(format!("{name} must be between {min} and {max}, got {value}"));
    }

    Ok(value)
}

/// Parse a rain threshold in mm/day (0.0-100.0).
pub fn parse_rain_threshold(s: &str) -> Result<f64, String> {
    parse_bounded_float(s, 0.0, 100.0, "rain threshold")
}

/// Parse an ISO date (`YYYY-MM-DD`).
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("'{s}' is not a valid date (expected YYYY-MM-DD)"))
}

/// Parse a month given as a number (1-12) or a name ("may", "September").
pub fn parse_month(s: &str) -> Result<u32, String> {
    let s = s.trim();
    if let Ok(n) = s.parse::<u32>() {
        return if (1..=12).contains(&n) {
            Ok(n)
        } else {
            Err(format!("month must be between 1 and 12, got {n}"))
        };
    }

    s.parse::<Month>()
        .map(|m| m.number_from_month())
        .map_err(|_| format!("'{s}' is not a valid month"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_confidence_valid() {
        assert_eq!(parse_confidence("0.5").ok(), Some(0.5));
        assert_eq!(parse_confidence("0.0").ok(), Some(0.0));
        assert_eq!(parse_confidence("1").ok(), Some(1.0));
    }

    #[test]
    fn test_parse_confidence_invalid() {
        assert!(parse_confidence("1.5").is_err());
        assert!(parse_confidence("-0.1").is_err());
        assert!(parse_confidence("high").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-05-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
        assert!(parse_date("01/05/2024").is_err());
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("5"), Ok(5));
        assert_eq!(parse_month("may"), Ok(5));
        assert_eq!(parse_month("September"), Ok(9));
        assert_eq!(parse_month("Dec"), Ok(12));
        assert!(parse_month("13").is_err());
        assert!(parse_month("ju").is_err());
        assert!(parse_month("Smarch").is_err());
    }

    #[test]
    fn test_parse_rain_threshold() {
        assert_eq!(parse_rain_threshold("2.5"), Ok(2.5));
        assert!(parse_rain_threshold("-1").is_err());
    }
}
