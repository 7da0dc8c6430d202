//! Coercion primitives - untrusted dynamic values into well-typed values
//!
//! Every coercion takes a dynamic value and a fallback and returns a value of
//! exactly the target shape. Nothing in here panics and nothing is logged: a
//! shape mismatch is an expected input condition, not a failure.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Number, Value};
use url::Url;

use crate::EntityId;

/// Best-effort conversion from a dynamic value
pub trait Coerce: Sized {
    /// Convert `value` if it has, or can plausibly be turned into, this shape.
    /// `None` means the caller's fallback applies.
    fn coerce(value: &Value) -> Option<Self>;
}

/// Coerce `value` into `T`, substituting `fallback` when it does not fit
#[inline]
pub fn coerce<T: Coerce>(value: &Value, fallback: T) -> T {
    T::coerce(value).unwrap_or(fallback)
}

impl Coerce for String {
    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(number_to_string(n)),
            Value::Array(_) | Value::Object(_) => Some(value.to_string()),
        }
    }
}

impl Coerce for f64 {
    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().filter(|f| !f.is_nan()),
            Value::String(s) => parse_float_prefix(s),
            _ => None,
        }
    }
}

impl Coerce for Vec<Value> {
    fn coerce(value: &Value) -> Option<Self> {
        value.as_array().cloned()
    }
}

impl Coerce for Map<String, Value> {
    fn coerce(value: &Value) -> Option<Self> {
        value.as_object().cloned()
    }
}

impl Coerce for DateTime<Utc> {
    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => parse_date(s),
            Value::Number(n) => {
                let millis = n.as_f64()?;
                if millis > 0.0 && millis.is_finite() {
                    DateTime::from_timestamp_millis(millis as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl Coerce for EntityId {
    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => {
                if let Some(id) = n.as_u64() {
                    return EntityId::new(id);
                }
                let f = n.as_f64()?;
                if f > 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
                    EntityId::new(f as u64)
                } else {
                    None
                }
            }
            Value::String(s) => parse_id_prefix(s).and_then(EntityId::new),
            _ => None,
        }
    }
}

/// Get a string, stringifying any non-null value
pub fn coerce_string(value: &Value, fallback: &str) -> String {
    String::coerce(value).unwrap_or_else(|| fallback.to_string())
}

/// Get a finite number; numeric strings are parsed by their leading number
pub fn coerce_number(value: &Value, fallback: f64) -> f64 {
    coerce(value, fallback)
}

/// Get an array (type guard only, elements are not coerced)
pub fn coerce_array(value: &Value, fallback: Vec<Value>) -> Vec<Value> {
    coerce(value, fallback)
}

/// Get a plain object (arrays are not objects here)
pub fn coerce_object(value: &Value, fallback: Map<String, Value>) -> Map<String, Value> {
    coerce(value, fallback)
}

/// Get a date from an ISO-like string or a positive millisecond timestamp
pub fn coerce_date(value: &Value, fallback: DateTime<Utc>) -> DateTime<Utc> {
    coerce(value, fallback)
}

/// Get a positive integer id, accepting numeric strings
pub fn coerce_id(value: &Value, fallback: EntityId) -> EntityId {
    coerce(value, fallback)
}

/// Get a URL, resolving relative input against `base` when given
pub fn coerce_url(value: &Value, base: Option<&Url>, fallback: Url) -> Url {
    match value {
        Value::String(s) => parse_url(s, base).unwrap_or(fallback),
        _ => fallback,
    }
}

/// Parse an absolute URL, or a relative one against `base`
pub fn parse_url(input: &str, base: Option<&Url>) -> Option<Url> {
    match base {
        Some(base) => base.join(input).ok(),
        None => Url::parse(input).ok(),
    }
}

/// Check whether a value is a valid entity id
pub fn is_valid_id(value: &Value) -> bool {
    EntityId::coerce(value).is_some()
}

/// Check that a value is present (not null)
#[inline]
pub fn is_defined(value: &Value) -> bool {
    !value.is_null()
}

/// Parse the longest leading decimal number of a string.
///
/// Leading whitespace is skipped and trailing garbage ignored, so `"3.14abc"`
/// parses as `3.14`. Non-finite results are rejected.
pub fn parse_float_prefix(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        // A bare "e" is trailing garbage, not an exponent
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Parse the leading base-10 integer of a string, positive values only
fn parse_id_prefix(input: &str) -> Option<u64> {
    let s = input.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = rest
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(rest.len());
    let parsed = rest[..end].parse::<u64>().ok()?;

    if negative || parsed == 0 {
        None
    } else {
        Some(parsed)
    }
}

fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // Offset-less timestamps are taken as UTC
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn number_to_string(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) => format_f64(f),
        None => n.to_string(),
    }
}

/// Shortest round-trip form. Magnitudes of at least 1e21 or below 1e-6
/// switch to exponent notation with a signed exponent (`1e+21`, `1.5e-7`);
/// integral values print without a fraction.
pub(crate) fn format_f64(f: f64) -> String {
    if f == 0.0 {
        return "0".to_string();
    }

    let magnitude = f.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let text = format!("{:e}", f);
        return match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => text,
        };
    }

    if f.fract() == 0.0 {
        format!("{:.0}", f)
    } else {
        format!("{}", f)
    }
}
