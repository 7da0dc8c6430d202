//! Typed access into schema-less values

use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;

use crate::{coerce_string, Coerce};

/// Follow a dotted path (`"project.owner.name"`, `"items.0.id"`) through
/// objects and arrays. Missing segments and null leaves yield `None`.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for key in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Read a dotted path and coerce the leaf, substituting `fallback` on a miss
pub fn safe_get<T: Coerce>(value: &Value, path: &str, fallback: T) -> T {
    lookup(value, path)
        .and_then(T::coerce)
        .unwrap_or(fallback)
}

/// Bounds-checked array access; non-arrays, negative and out-of-range
/// indices give `fallback`
pub fn safe_index(value: &Value, index: i64, fallback: Value) -> Value {
    let Ok(index) = usize::try_from(index) else {
        return fallback;
    };
    match value.as_array().and_then(|items| items.get(index)) {
        Some(item) if !item.is_null() => item.clone(),
        _ => fallback,
    }
}

fn contained<R>(op: impl FnOnce() -> R) -> Option<R> {
    panic::catch_unwind(AssertUnwindSafe(op)).ok()
}

/// Map over an untrusted array. A non-array or a panicking callback gives
/// `fallback`.
pub fn safe_map<T>(
    value: &Value,
    mut f: impl FnMut(&Value, usize) -> T,
    fallback: Vec<T>,
) -> Vec<T> {
    let Some(items) = value.as_array() else {
        return fallback;
    };
    contained(|| items.iter().enumerate().map(|(i, item)| f(item, i)).collect())
        .unwrap_or(fallback)
}

/// Elements of an untrusted array matching `pred`, or `fallback`
pub fn safe_filter(
    value: &Value,
    mut pred: impl FnMut(&Value) -> bool,
    fallback: Vec<Value>,
) -> Vec<Value> {
    let Some(items) = value.as_array() else {
        return fallback;
    };
    contained(|| items.iter().filter(|item| pred(item)).cloned().collect())
        .unwrap_or(fallback)
}

/// First element matching `pred`. No match, a null match, a non-array or a
/// panicking predicate give `fallback`.
pub fn safe_find(value: &Value, mut pred: impl FnMut(&Value) -> bool, fallback: Value) -> Value {
    let Some(items) = value.as_array() else {
        return fallback;
    };
    match contained(|| items.iter().find(|item| pred(item)).cloned()) {
        Some(Some(found)) if !found.is_null() => found,
        _ => fallback,
    }
}

/// Fold an untrusted array from `initial`; a non-array or a panicking
/// callback gives `fallback`
pub fn safe_reduce<U>(
    value: &Value,
    mut f: impl FnMut(U, &Value, usize) -> U,
    initial: U,
    fallback: U,
) -> U {
    let Some(items) = value.as_array() else {
        return fallback;
    };
    contained(|| {
        items
            .iter()
            .enumerate()
            .fold(initial, |acc, (i, item)| f(acc, item, i))
    })
    .unwrap_or(fallback)
}

/// Truncate to at most `max_len` characters, ending with `suffix` when cut
pub fn safe_truncate(value: &Value, max_len: usize, suffix: &str) -> String {
    let text = coerce_string(value, "");
    if text.chars().count() <= max_len {
        return text;
    }

    let keep = max_len.saturating_sub(suffix.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(suffix);
    out
}
