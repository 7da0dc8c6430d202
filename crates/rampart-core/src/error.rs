//! Error types for Rampart

use thiserror::Error;

/// Core Rampart errors
///
/// These never cross a boundary operation: the safe wrappers turn them into
/// logged failures and fallback values.
#[derive(Error, Debug)]
pub enum RampartError {
    // Serialization errors
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    // Storage errors
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage quota exceeded: needed {needed} bytes, limit {limit}")]
    QuotaExceeded { needed: usize, limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Scheduling errors
    #[error("No async runtime available to schedule work")]
    NoRuntime,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    // State errors
    #[error("Invalid state value: {value}")]
    Rejected { context: String, value: String },
}

impl RampartError {
    /// Stable machine-readable code for the error log
    pub fn code(&self) -> &'static str {
        match self {
            RampartError::InvalidJson(_) => "invalid_json",
            RampartError::Serialization(_) => "serialization",
            RampartError::StorageUnavailable(_) => "storage_unavailable",
            RampartError::QuotaExceeded { .. } => "quota_exceeded",
            RampartError::Io(_) => "io",
            RampartError::NoRuntime => "no_runtime",
            RampartError::Config(_) => "config",
            RampartError::Rejected { .. } => "rejected",
        }
    }
}

impl From<serde_json::Error> for RampartError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_eof() {
            RampartError::InvalidJson(err.to_string())
        } else {
            RampartError::Serialization(err.to_string())
        }
    }
}

/// Result type for Rampart operations
pub type RampartResult<T> = Result<T, RampartError>;
