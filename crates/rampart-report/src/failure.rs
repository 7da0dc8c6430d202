//! Failure values - every shape a caught failure can take
//!
//! Failures reach the log from typed Rust errors, from panics, and from
//! dynamic payloads handed over by the HTTP client. They are normalised into
//! one sum type and then narrowed with a match instead of probing fields.

use std::any::Any;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use rampart_core::{coerce_string, Coerce, RampartError};

/// Message used when a failure carries nothing readable
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// A caught failure
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Failure {
    /// Structured error raised by Rust code (or a panic)
    Error {
        message: String,
        code: Option<String>,
        status: Option<u16>,
    },
    /// Bare message
    Message(String),
    /// Dynamic object, typically an HTTP client failure payload
    Object(Map<String, Value>),
    /// Anything else
    Other(Value),
}

impl Failure {
    /// Structured error with a message only
    pub fn error(message: impl Into<String>) -> Self {
        Failure::Error {
            message: message.into(),
            code: None,
            status: None,
        }
    }

    /// Attach a machine code to a structured error; other shapes are unchanged
    pub fn with_code(self, code: impl Into<String>) -> Self {
        match self {
            Failure::Error {
                message, status, ..
            } => Failure::Error {
                message,
                code: Some(code.into()),
                status,
            },
            other => other,
        }
    }

    /// Attach an HTTP status to a structured error; other shapes are unchanged
    pub fn with_status(self, status: u16) -> Self {
        match self {
            Failure::Error { message, code, .. } => Failure::Error {
                message,
                code,
                status: Some(status),
            },
            other => other,
        }
    }

    /// Structured failure from any error, keeping its display text
    pub fn from_error<E: std::error::Error + ?Sized>(err: &E) -> Self {
        Failure::error(err.to_string())
    }

    /// Failure from a caught panic payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => message.to_string(),
                Err(_) => UNKNOWN_ERROR_MESSAGE.to_string(),
            },
        };
        Failure::error(message).with_code("panic")
    }

    /// Human-readable message
    pub fn message(&self) -> String {
        match self {
            Failure::Error { message, .. } => message.clone(),
            Failure::Message(text) => text.clone(),
            Failure::Object(map) => match map.get("message") {
                Some(message) => coerce_string(message, "null"),
                None => UNKNOWN_ERROR_MESSAGE.to_string(),
            },
            Failure::Other(_) => UNKNOWN_ERROR_MESSAGE.to_string(),
        }
    }

    /// Whether [`Failure::message`] found a real message
    pub fn has_message(&self) -> bool {
        match self {
            Failure::Error { .. } | Failure::Message(_) => true,
            Failure::Object(map) => map.contains_key("message"),
            Failure::Other(_) => false,
        }
    }

    /// Machine code: `code`, else `error.code`
    pub fn code(&self) -> Option<String> {
        match self {
            Failure::Error { code, .. } => code.clone(),
            Failure::Object(map) => map
                .get("code")
                .or_else(|| map.get("error").and_then(|e| e.as_object()?.get("code")))
                .map(|code| coerce_string(code, "null")),
            Failure::Message(_) | Failure::Other(_) => None,
        }
    }

    /// HTTP status: numeric `status`, else numeric `response.status`
    pub fn status(&self) -> Option<u16> {
        match self {
            Failure::Error { status, .. } => *status,
            Failure::Object(map) => map
                .get("status")
                .and_then(status_from)
                .or_else(|| map.get("response")?.get("status").and_then(status_from)),
            Failure::Message(_) | Failure::Other(_) => None,
        }
    }
}

fn status_from(value: &Value) -> Option<u16> {
    let n = f64::coerce(value)?;
    if n.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(&n) {
        Some(n as u16)
    } else {
        None
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Failure::Message(message.to_string())
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Failure::Message(message)
    }
}

impl From<Value> for Failure {
    fn from(value: Value) -> Self {
        match value {
            Value::String(message) => Failure::Message(message),
            Value::Object(map) => Failure::Object(map),
            other => Failure::Other(other),
        }
    }
}

impl From<Map<String, Value>> for Failure {
    fn from(map: Map<String, Value>) -> Self {
        Failure::Object(map)
    }
}

impl From<RampartError> for Failure {
    fn from(err: RampartError) -> Self {
        Failure::error(err.to_string()).with_code(err.code())
    }
}

impl From<std::io::Error> for Failure {
    fn from(err: std::io::Error) -> Self {
        Failure::error(err.to_string()).with_code(format!("{:?}", err.kind()))
    }
}

impl From<serde_json::Error> for Failure {
    fn from(err: serde_json::Error) -> Self {
        Failure::from(RampartError::from(err))
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for Failure {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Failure::from_error(err.as_ref())
    }
}
