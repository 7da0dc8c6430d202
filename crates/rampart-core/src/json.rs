//! Failure-tolerant JSON helpers

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Literal used when a value cannot be serialized
pub const EMPTY_OBJECT: &str = "{}";

/// Parse JSON text into `T`, returning `fallback` on any error
pub fn safe_json_parse<T: DeserializeOwned>(json: &str, fallback: T) -> T {
    serde_json::from_str(json).unwrap_or(fallback)
}

/// Serialize to JSON text, returning `"{}"` on failure
pub fn safe_json_stringify<T: Serialize + ?Sized>(value: &T) -> String {
    safe_json_stringify_or(value, EMPTY_OBJECT)
}

/// Serialize to JSON text, returning `fallback` on failure
pub fn safe_json_stringify_or<T: Serialize + ?Sized>(value: &T, fallback: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| fallback.to_string())
}

/// Structural copy through a serialize/deserialize round trip.
///
/// When the value does not survive the round trip (for example a map with
/// non-string keys) the result is a plain `Clone` of the input instead, so
/// callers must not rely on the copy having been normalised.
pub fn safe_clone<T>(value: &T) -> T
where
    T: Serialize + DeserializeOwned + Clone,
{
    serde_json::to_value(value)
        .and_then(serde_json::from_value)
        .unwrap_or_else(|_| value.clone())
}
