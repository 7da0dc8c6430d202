//! Rampart Report - Failure capture, classification and containment
//!
//! This crate implements the failure side of the safety layer:
//! - Failure normalisation (typed errors, panics, dynamic payloads)
//! - Classification and user-facing messages
//! - The bounded, process-wide error log
//! - Safe call wrappers and error boundaries
//!
//! Nothing exported here raises: every operation returns a value.

pub mod failure;
pub mod classify;
pub mod log;
pub mod guard;

pub use failure::*;
pub use classify::*;
pub use log::*;
pub use guard::*;

/// Record a failure in the process-wide log
pub fn log_error(failure: impl Into<Failure>, context: Option<&str>) -> ErrorRecord {
    global().log_error(failure, context)
}

/// User-facing text for a failure, from the process-wide log's messages
pub fn user_message(failure: &Failure) -> String {
    global().user_message(failure)
}

/// Snapshot of the process-wide log
pub fn errors() -> Vec<ErrorRecord> {
    global().errors()
}

/// Empty the process-wide log
pub fn clear_errors() {
    global().clear()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_global_log_lifecycle() {
        clear_errors();
        log_error("first", Some("lifecycle"));
        log_error("second", None);

        let snapshot = errors();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].context(), Some("lifecycle"));

        clear_errors();
        assert!(errors().is_empty());
    }

    #[test]
    #[serial]
    fn test_init_after_use_keeps_existing_log() {
        let existing = global();
        let again = init(ErrorLogConfig {
            capacity: 5,
            ..ErrorLogConfig::default()
        });
        assert!(std::sync::Arc::ptr_eq(&existing, &again));
    }

    #[test]
    fn test_user_message_uses_defaults() {
        let text = user_message(&Failure::error("Network Error"));
        assert_eq!(text, UserMessages::default().network);
    }
}
