//! Sanitizers and validators for form input and display
//!
//! All predicates here are total: malformed input yields `false` or an
//! escaped string, never a panic.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use url::Url;

/// Maximum length kept by [`sanitize_input`], in characters
pub const MAX_INPUT_LEN: usize = 10_000;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).ok()).as_ref()
}

/// Validate email format
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_some_and(|re| re.is_match(email))
}

/// Validate absolute URL format
pub fn is_valid_url(url: &str) -> bool {
    Url::parse(url).is_ok()
}

/// Escape the HTML-significant characters of a string for safe display.
///
/// Single left-to-right pass; existing entities are escaped again rather than
/// recognised, so the output never depends on prior escaping.
pub fn sanitize_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            _ => out.push(c),
        }
    }
    out
}

/// Normalise free-text input: non-strings become empty, whitespace is
/// trimmed and the length capped at [`MAX_INPUT_LEN`] characters
pub fn sanitize_input(input: &Value) -> String {
    match input {
        Value::String(s) => s.trim().chars().take(MAX_INPUT_LEN).collect(),
        _ => String::new(),
    }
}

/// Outcome of a required-field check
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequiredCheck {
    /// Every missing field, in the order requested
    pub missing_fields: Vec<String>,
}

impl RequiredCheck {
    pub fn is_valid(&self) -> bool {
        self.missing_fields.is_empty()
    }
}

/// Check that every listed field is present and non-empty.
///
/// A field is missing when it is absent or null, a string that trims to
/// empty, or an empty array.
pub fn validate_required(data: &Map<String, Value>, fields: &[&str]) -> RequiredCheck {
    let missing_fields = fields
        .iter()
        .filter(|field| is_missing(data.get(**field)))
        .map(|field| field.to_string())
        .collect();

    RequiredCheck { missing_fields }
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("ada@example.org"));
        assert!(is_valid_email("a.b+c@sub.example.co"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada example@org.com"));
        assert!(!is_valid_email("@example.org"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_url_validation() {
        assert!(is_valid_url("https://vote.example.org/projects/1"));
        assert!(is_valid_url("mailto:jury@example.org"));
        assert!(!is_valid_url("/projects/1"));
        assert!(!is_valid_url("http://[::1"));
    }

    #[test]
    fn test_sanitize_string() {
        assert_eq!(
            sanitize_string(r#"<a href="/x">it's</a>"#),
            "&lt;a href=&quot;&#x2F;x&quot;&gt;it&#x27;s&lt;&#x2F;a&gt;"
        );
        // Ampersands are left alone and entities are not re-expanded
        assert_eq!(sanitize_string("&lt;"), "&lt;");
        assert_eq!(sanitize_string("plain"), "plain");
    }

    #[test]
    fn test_sanitize_input() {
        assert_eq!(sanitize_input(&json!("  hello  ")), "hello");
        assert_eq!(sanitize_input(&json!(42)), "");
        assert_eq!(sanitize_input(&Value::Null), "");

        let long = "é".repeat(MAX_INPUT_LEN + 5);
        assert_eq!(sanitize_input(&json!(long)).chars().count(), MAX_INPUT_LEN);
    }

    #[test]
    fn test_validate_required_reports_all_missing() {
        let data = json!({
            "title": "Solar benches",
            "summary": "   ",
            "tags": [],
            "budget": 0,
            "owner": null,
        });
        let data = data.as_object().unwrap();

        let check = validate_required(data, &["title", "summary", "tags", "budget", "owner", "city"]);
        assert!(!check.is_valid());
        assert_eq!(check.missing_fields, vec!["summary", "tags", "owner", "city"]);

        let ok = validate_required(data, &["title", "budget"]);
        assert!(ok.is_valid());
    }
}
