//! Bounded error log
//!
//! Every captured failure becomes one immutable [`ErrorRecord`]. The log keeps
//! the most recent records only, evicting the oldest first once full. One
//! process-wide log exists (see [`global`]); owned logs can be created for
//! isolated components and tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{Failure, UserMessages};

/// Default number of records retained
pub const MAX_ERRORS: usize = 100;

/// A captured failure. Immutable once created.
#[derive(Clone, Debug, Serialize)]
pub struct ErrorRecord {
    message: String,
    code: Option<String>,
    status: Option<u16>,
    details: Failure,
    context: Option<String>,
    timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    fn capture(details: Failure, context: Option<&str>) -> Self {
        ErrorRecord {
            message: details.message(),
            code: details.code(),
            status: details.status(),
            details,
            context: context.map(str::to_string),
            timestamp: Utc::now(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// The raw failure as it was caught
    pub fn details(&self) -> &Failure {
        &self.details
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Error log configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorLogConfig {
    /// Number of records retained (at least 1)
    pub capacity: usize,
    /// Texts returned by [`ErrorLog::user_message`]
    pub messages: UserMessages,
}

impl Default for ErrorLogConfig {
    fn default() -> Self {
        ErrorLogConfig {
            capacity: MAX_ERRORS,
            messages: UserMessages::default(),
        }
    }
}

/// Bounded, insertion-ordered log of captured failures
#[derive(Debug)]
pub struct ErrorLog {
    records: Mutex<VecDeque<ErrorRecord>>,
    capacity: usize,
    messages: UserMessages,
    /// Failures captured since creation, evicted ones included
    captured: AtomicU64,
}

impl ErrorLog {
    /// Create a log with the default capacity and messages
    pub fn new() -> Self {
        Self::with_config(ErrorLogConfig::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(ErrorLogConfig {
            capacity,
            ..ErrorLogConfig::default()
        })
    }

    pub fn with_config(config: ErrorLogConfig) -> Self {
        let capacity = config.capacity.max(1);
        ErrorLog {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            messages: config.messages,
            captured: AtomicU64::new(0),
        }
    }

    /// Record a failure and return the record.
    ///
    /// The record is emitted to the tracing subscriber (tagged with `context`
    /// when given) and appended to the log, evicting the oldest record when
    /// the log is full.
    pub fn log_error(&self, failure: impl Into<Failure>, context: Option<&str>) -> ErrorRecord {
        let record = ErrorRecord::capture(failure.into(), context);

        match record.context() {
            Some(context) => tracing::error!(
                context,
                error = %record.message,
                code = ?record.code,
                status = ?record.status,
                "[{}] captured failure",
                context
            ),
            None => tracing::error!(
                error = %record.message,
                code = ?record.code,
                status = ?record.status,
                "captured failure"
            ),
        }

        let mut records = self.records.lock();
        records.push_back(record.clone());
        while records.len() > self.capacity {
            records.pop_front();
        }
        drop(records);

        self.captured.fetch_add(1, Ordering::Relaxed);
        record
    }

    /// Snapshot of the retained records, oldest first
    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.records.lock().iter().cloned().collect()
    }

    /// Most recent record
    pub fn last(&self) -> Option<ErrorRecord> {
        self.records.lock().back().cloned()
    }

    /// Drop every retained record
    pub fn clear(&self) {
        self.records.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn total_captured(&self) -> u64 {
        self.captured.load(Ordering::Relaxed)
    }

    /// User-facing text for a failure
    pub fn user_message(&self, failure: &Failure) -> String {
        self.messages.for_failure(failure)
    }

    pub fn messages(&self) -> &UserMessages {
        &self.messages
    }
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: OnceLock<Arc<ErrorLog>> = OnceLock::new();

/// The process-wide error log, created with defaults on first use
pub fn global() -> Arc<ErrorLog> {
    GLOBAL.get_or_init(|| Arc::new(ErrorLog::new())).clone()
}

/// Create the process-wide error log from configuration.
///
/// Only the first initialisation takes effect; later calls (or a call after
/// [`global`] already created the log) keep the existing log.
pub fn init(config: ErrorLogConfig) -> Arc<ErrorLog> {
    let mut created = false;
    let log = GLOBAL.get_or_init(|| {
        created = true;
        Arc::new(ErrorLog::with_config(config))
    });

    if !created {
        tracing::warn!(
            capacity = log.capacity(),
            "process-wide error log already initialised, keeping it"
        );
    }
    log.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fifo_eviction() {
        let log = ErrorLog::new();
        for i in 0..150 {
            log.log_error(format!("failure {}", i), None);
        }

        let errors = log.errors();
        assert_eq!(errors.len(), MAX_ERRORS);
        assert_eq!(errors.first().unwrap().message(), "failure 50");
        assert_eq!(errors.last().unwrap().message(), "failure 149");
        assert_eq!(log.total_captured(), 150);
    }

    #[test]
    fn test_record_fields() {
        let log = ErrorLog::new();
        let failure = json!({
            "message": "Request failed",
            "code": "ERR_BAD_RESPONSE",
            "response": {"status": 500},
        });
        let record = log.log_error(failure.clone(), Some("Fetch Admin Stats"));

        assert_eq!(record.message(), "Request failed");
        assert_eq!(record.code(), Some("ERR_BAD_RESPONSE"));
        assert_eq!(record.status(), Some(500));
        assert_eq!(record.context(), Some("Fetch Admin Stats"));
        assert_eq!(record.details(), &Failure::from(failure));
    }

    #[test]
    fn test_messages_match_source() {
        let log = ErrorLog::new();
        assert_eq!(log.log_error("plain", None).message(), "plain");
        assert_eq!(log.log_error(Failure::error("typed"), None).message(), "typed");
        assert_eq!(log.log_error(json!({"message": "object"}), None).message(), "object");
    }

    #[test]
    fn test_errors_is_a_copy() {
        let log = ErrorLog::new();
        log.log_error("one", None);

        let mut snapshot = log.errors();
        snapshot.clear();
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_clear() {
        let log = ErrorLog::with_capacity(3);
        log.log_error("a", None);
        log.log_error("b", None);
        log.clear();
        assert!(log.is_empty());
        assert!(log.last().is_none());
        assert_eq!(log.total_captured(), 2);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let log = ErrorLog::with_capacity(0);
        log.log_error("a", None);
        log.log_error("b", None);
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.last().unwrap().message(), "b");
    }

    #[test]
    fn test_concurrent_logging_stays_bounded() {
        let log = Arc::new(ErrorLog::with_capacity(50));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        log.log_error(format!("t{} #{}", t, i), None);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(log.len(), 50);
        assert_eq!(log.total_captured(), 400);
    }
}
