//! Shared parsing for loosely formatted export values.
//!
//! Every numeric field goes through [`parse_decimal`] or [`parse_count`] before it is
//! stored or hashed, so `1.234,56` and `1,234.56` end up as the same number.

use chrono::NaiveDate;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Parses a decimal written with either `.` or `,` as the decimal separator.
///
/// When both separators appear the last one is the decimal separator. A separator that
/// appears more than once is a thousands separator. A single separator is a decimal
/// separator. Blank or unparseable input is `0.0`.
pub fn parse_decimal(value: &str) -> f64 {
    let cleaned = strip_to_numeric(value);
    if cleaned.is_empty() {
        return 0.0;
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');
    let canonical = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) => {
            if dot > comma {
                cleaned.replace(',', "")
            } else {
                cleaned.replace('.', "").replace(',', ".")
            }
        }
        (Some(_), None) => single_separator(&cleaned, '.'),
        (None, Some(_)) => single_separator(&cleaned, ','),
        (None, None) => cleaned,
    };

    canonical
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
        .unwrap_or(0.0)
}

/// Parses a whole count. `.` and `,` are thousands separators unless both appear, in
/// which case the value is parsed as a decimal and rounded.
pub fn parse_count(value: &str) -> u64 {
    let cleaned = strip_to_numeric(value);
    if cleaned.contains('.') && cleaned.contains(',') {
        return round_count(parse_decimal(&cleaned));
    }

    let digits = cleaned.replace(['.', ','], "");
    digits.parse::<u64>().unwrap_or(0)
}

pub fn round_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

/// Normalizes a day to ISO `YYYY-MM-DD`. Timestamps keep only their date part.
pub fn normalize_day(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let date_part = trimmed
        .split(['T', ' '])
        .next()
        .unwrap_or(trimmed);

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
}

/// Trims and collapses internal whitespace runs to a single space.
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<&str>>().join(" ")
}

fn strip_to_numeric(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|character| character.is_ascii_digit() || matches!(character, '.' | ',' | '-'))
        .collect()
}

fn single_separator(cleaned: &str, separator: char) -> String {
    if cleaned.matches(separator).count() > 1 {
        cleaned.replace(separator, "")
    } else {
        cleaned.replace(separator, ".")
    }
}

#[cfg(test)]
mod tests {
    use super::{collapse_whitespace, normalize_day, parse_count, parse_decimal};

    #[test]
    fn locale_formats_parse_to_the_same_value() {
        assert_eq!(parse_decimal("1.234,56"), 1234.56);
        assert_eq!(parse_decimal("1,234.56"), 1234.56);
        assert_eq!(parse_decimal("1234.56"), 1234.56);
        assert_eq!(parse_decimal("12,5"), 12.5);
        assert_eq!(parse_decimal("1.234.567"), 1_234_567.0);
        assert_eq!(parse_decimal("€ 45,10"), 45.1);
        assert_eq!(parse_decimal("-3,5"), -3.5);
    }

    #[test]
    fn blanks_and_garbage_parse_to_zero() {
        assert_eq!(parse_decimal(""), 0.0);
        assert_eq!(parse_decimal("n/a"), 0.0);
        assert_eq!(parse_decimal("1-2-3"), 0.0);
        assert_eq!(parse_count("  "), 0);
        assert_eq!(parse_count("lots"), 0);
    }

    #[test]
    fn counts_treat_single_separators_as_thousands() {
        assert_eq!(parse_count("1.234"), 1234);
        assert_eq!(parse_count("12,345"), 12_345);
        assert_eq!(parse_count("1.234,6"), 1235);
        assert_eq!(parse_count("87"), 87);
    }

    #[test]
    fn days_normalize_to_iso() {
        assert_eq!(normalize_day("2026-03-07").as_deref(), Some("2026-03-07"));
        assert_eq!(normalize_day("07/03/2026").as_deref(), Some("2026-03-07"));
        assert_eq!(normalize_day("2026/03/07").as_deref(), Some("2026-03-07"));
        assert_eq!(
            normalize_day("2026-03-07T00:00:00+0000").as_deref(),
            Some("2026-03-07")
        );
        assert_eq!(normalize_day("31/02/2026"), None);
        assert_eq!(normalize_day(""), None);
    }

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(collapse_whitespace("  Summer \t Sale  v2 "), "Summer Sale v2");
    }
}
