//! Typed state cells with fixed sanitizer/validator pairs

use rampart_core::{coerce_array, coerce_object, Map, Value};

use crate::SafeState;

/// String cell truncated to `max_len` characters
pub fn safe_string_state(initial: impl Into<String>, max_len: Option<usize>) -> SafeState<String> {
    SafeState::new(initial.into())
        .with_sanitizer(move |value: String| match max_len {
            Some(max) if value.chars().count() > max => value.chars().take(max).collect(),
            _ => value,
        })
        .with_validator(move |value: &String| {
            max_len.map_or(true, |max| value.chars().count() <= max)
        })
}

/// Number cell restricted to `[min, max]`.
///
/// Non-finite proposals become `0` before the range check. Proposals outside
/// the range are rejected and the previous value kept.
pub fn safe_number_state(initial: f64, min: Option<f64>, max: Option<f64>) -> SafeState<f64> {
    SafeState::new(initial)
        .with_sanitizer(|value: f64| if value.is_finite() { value } else { 0.0 })
        .with_validator(move |value: &f64| {
            min.map_or(true, |min| *value >= min) && max.map_or(true, |max| *value <= max)
        })
}

/// Cell that always holds a JSON array; non-arrays become `[]`
pub fn safe_array_state(initial: Vec<Value>) -> SafeState<Value> {
    SafeState::new(Value::Array(initial))
        .with_sanitizer(|value: Value| Value::Array(coerce_array(&value, Vec::new())))
        .with_validator(Value::is_array)
}

/// Cell that always holds a JSON object; non-objects become `fallback`
pub fn safe_object_state(initial: Map<String, Value>, fallback: Map<String, Value>) -> SafeState<Value> {
    SafeState::new(Value::Object(initial))
        .with_sanitizer(move |value: Value| Value::Object(coerce_object(&value, fallback.clone())))
        .with_validator(Value::is_object)
}
