//! Number formatting for display
//!
//! Figures are shown the way the platform's French-speaking audience reads
//! them: `1 234 567,5`, with a narrow no-break space between thousands groups.

use serde_json::Value;

use crate::coerce_number;

/// Thousands separator (U+202F NARROW NO-BREAK SPACE)
pub const GROUP_SEPARATOR: char = '\u{202f}';

/// Decimal separator
pub const DECIMAL_SEPARATOR: char = ',';

/// Fraction digit bounds for [`safe_format_number`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NumberFormat {
    pub min_fraction_digits: usize,
    pub max_fraction_digits: usize,
    pub grouping: bool,
}

impl Default for NumberFormat {
    fn default() -> Self {
        NumberFormat {
            min_fraction_digits: 0,
            max_fraction_digits: 3,
            grouping: true,
        }
    }
}

impl NumberFormat {
    /// Fixed number of fraction digits
    pub fn fixed(digits: usize) -> Self {
        NumberFormat {
            min_fraction_digits: digits,
            max_fraction_digits: digits,
            grouping: true,
        }
    }
}

/// Format a dynamic value as a number; unusable input formats as zero
pub fn safe_format_number(value: &Value, format: &NumberFormat) -> String {
    let number = coerce_number(value, 0.0);
    format_number(number, format)
}

/// Format a number with grouping and a decimal comma
pub fn format_number(number: f64, format: &NumberFormat) -> String {
    if !number.is_finite() {
        return "0".to_string();
    }

    let max = format.max_fraction_digits.min(20);
    let min = format.min_fraction_digits.min(max);

    let rendered = format!("{:.*}", max, number.abs());
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i, f),
        None => (rendered.as_str(), ""),
    };

    let mut frac = frac_part.trim_end_matches('0');
    if frac.len() < min {
        frac = &frac_part[..min];
    }

    let mut out = String::with_capacity(rendered.len() + 8);
    let negative = number < 0.0 && (int_part.bytes().any(|b| b != b'0') || !frac.is_empty());
    if negative {
        out.push('-');
    }

    if format.grouping {
        let len = int_part.len();
        for (i, c) in int_part.chars().enumerate() {
            if i > 0 && (len - i) % 3 == 0 {
                out.push(GROUP_SEPARATOR);
            }
            out.push(c);
        }
    } else {
        out.push_str(int_part);
    }

    if !frac.is_empty() {
        out.push(DECIMAL_SEPARATOR);
        out.push_str(frac);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_grouping_and_decimals() {
        let fmt = NumberFormat::default();
        assert_eq!(format_number(1234567.5, &fmt), "1\u{202f}234\u{202f}567,5");
        assert_eq!(format_number(999.0, &fmt), "999");
        assert_eq!(format_number(1000.0, &fmt), "1\u{202f}000");
        assert_eq!(format_number(0.12345, &fmt), "0,123");
        assert_eq!(format_number(-42.25, &fmt), "-42,25");
    }

    #[test]
    fn test_format_fixed_digits() {
        assert_eq!(format_number(3.0, &NumberFormat::fixed(2)), "3,00");
        assert_eq!(format_number(2.499, &NumberFormat::fixed(1)), "2,5");
    }

    #[test]
    fn test_negative_zero_after_rounding() {
        assert_eq!(format_number(-0.0001, &NumberFormat::default()), "0");
    }

    #[test]
    fn test_safe_format_number() {
        let fmt = NumberFormat::default();
        assert_eq!(safe_format_number(&json!("1500"), &fmt), "1\u{202f}500");
        assert_eq!(safe_format_number(&json!("n/a"), &fmt), "0");
        assert_eq!(safe_format_number(&json!(null), &fmt), "0");

        let plain = NumberFormat {
            grouping: false,
            ..NumberFormat::default()
        };
        assert_eq!(safe_format_number(&json!(12345), &plain), "12345");
    }
}
