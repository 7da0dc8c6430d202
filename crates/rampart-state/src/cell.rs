//! Validated state cell
//!
//! A [`SafeState`] holds one value and publishes every committed change to
//! its subscribers. Each proposal is resolved against the current value,
//! sanitized, then validated; a proposal the validator rejects is logged and
//! dropped, so observers only ever see values that passed validation.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use rampart_core::RampartError;
use rampart_report::{global, ErrorLog, Failure};
use tokio::sync::watch;

/// Context attached to every record a state cell logs
pub const STATE_CONTEXT: &str = "safe state";

pub type Validator<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
pub type Sanitizer<T> = Arc<dyn Fn(T) -> T + Send + Sync>;

/// A proposed change
pub enum Update<T> {
    /// Replace the value outright
    Replace(T),
    /// Derive the new value from the current one
    Apply(Box<dyn FnOnce(&T) -> T + Send>),
}

impl<T> Update<T> {
    pub fn apply<F>(f: F) -> Self
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        Update::Apply(Box::new(f))
    }
}

impl<T> From<T> for Update<T> {
    fn from(value: T) -> Self {
        Update::Replace(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Update<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Replace(value) => f.debug_tuple("Replace").field(value).finish(),
            Update::Apply(_) => f.write_str("Apply(..)"),
        }
    }
}

/// Result of a proposal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Proposal {
    /// The value changed and subscribers were notified
    Committed,
    /// The validator refused the candidate
    Rejected,
    /// The updater, sanitizer or validator panicked
    Failed,
}

impl Proposal {
    pub fn is_committed(&self) -> bool {
        matches!(self, Proposal::Committed)
    }
}

enum Refusal {
    Invalid(String),
    Panicked(Box<dyn Any + Send>),
}

/// State cell with an optional sanitizer and validator.
///
/// The initial value is taken as given. Sanitizers and validators run while
/// the cell is locked and must not read the same cell.
pub struct SafeState<T> {
    tx: watch::Sender<T>,
    validator: Option<Validator<T>>,
    sanitizer: Option<Sanitizer<T>>,
    log: Arc<ErrorLog>,
}

impl<T: fmt::Debug> SafeState<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        SafeState {
            tx,
            validator: None,
            sanitizer: None,
            log: global(),
        }
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn with_sanitizer<F>(mut self, sanitizer: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.sanitizer = Some(Arc::new(sanitizer));
        self
    }

    /// Report rejections to `log` instead of the process-wide log
    pub fn with_log(mut self, log: Arc<ErrorLog>) -> Self {
        self.log = log;
        self
    }

    /// Current value
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.tx.borrow().clone()
    }

    /// Run `f` against the current value without cloning it
    pub fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Receiver notified on every committed change
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    pub fn set(&self, value: T) -> Proposal {
        self.propose(Update::Replace(value))
    }

    pub fn update<F>(&self, f: F) -> Proposal
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        self.propose(Update::apply(f))
    }

    /// Resolve, sanitize and validate `update`, committing it when valid
    pub fn propose(&self, update: impl Into<Update<T>>) -> Proposal {
        let update = update.into();
        let mut refusal = None;

        self.tx.send_if_modified(|current| {
            let checked = panic::catch_unwind(AssertUnwindSafe(|| {
                let candidate = match update {
                    Update::Replace(value) => value,
                    Update::Apply(f) => f(&*current),
                };
                let candidate = match &self.sanitizer {
                    Some(sanitize) => sanitize(candidate),
                    None => candidate,
                };
                match &self.validator {
                    Some(validate) if !validate(&candidate) => {
                        Err(format!("{:?}", candidate))
                    }
                    _ => Ok(candidate),
                }
            }));

            match checked {
                Ok(Ok(candidate)) => {
                    *current = candidate;
                    true
                }
                Ok(Err(value)) => {
                    refusal = Some(Refusal::Invalid(value));
                    false
                }
                Err(payload) => {
                    refusal = Some(Refusal::Panicked(payload));
                    false
                }
            }
        });

        match refusal {
            None => Proposal::Committed,
            Some(Refusal::Invalid(value)) => {
                tracing::warn!(value = %value, "state update rejected");
                let err = RampartError::Rejected {
                    context: STATE_CONTEXT.to_string(),
                    value,
                };
                self.log.log_error(err, Some(STATE_CONTEXT));
                Proposal::Rejected
            }
            Some(Refusal::Panicked(payload)) => {
                self.log
                    .log_error(Failure::from_panic(payload), Some(STATE_CONTEXT));
                Proposal::Failed
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SafeState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafeState")
            .field("value", &*self.tx.borrow())
            .field("validated", &self.validator.is_some())
            .field("sanitized", &self.sanitizer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn isolated<T: fmt::Debug>(initial: T) -> (Arc<ErrorLog>, SafeState<T>) {
        let log = Arc::new(ErrorLog::new());
        let state = SafeState::new(initial).with_log(log.clone());
        (log, state)
    }

    #[test]
    fn test_plain_cell_accepts_everything() {
        let (log, state) = isolated(1);
        assert_eq!(state.set(5), Proposal::Committed);
        assert_eq!(state.update(|v| v * 2), Proposal::Committed);
        assert_eq!(state.get(), 10);
        assert!(log.is_empty());
    }

    #[test]
    fn test_rejected_value_is_logged_and_dropped() {
        let (log, state) = isolated(2);
        let state = state.with_validator(|v: &i32| v % 2 == 0);

        assert_eq!(state.set(3), Proposal::Rejected);
        assert_eq!(state.get(), 2);

        let record = log.last().unwrap();
        assert_eq!(record.message(), "Invalid state value: 3");
        assert_eq!(record.context(), Some(STATE_CONTEXT));
        assert_eq!(record.code(), Some("rejected"));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_sanitizer_runs_before_validator() {
        let (log, state) = isolated(String::new());
        let state = state
            .with_sanitizer(|s: String| s.trim().to_string())
            .with_validator(|s: &String| !s.is_empty());

        assert!(state.set("  hi  ".to_string()).is_committed());
        assert_eq!(state.get(), "hi");

        assert_eq!(state.set("   ".to_string()), Proposal::Rejected);
        assert_eq!(state.get(), "hi");
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_updater_sees_current_value() {
        let (_, state) = isolated(vec![1]);
        state.update(|v| {
            let mut next = v.clone();
            next.push(2);
            next
        });
        assert_eq!(state.with_value(|v| v.len()), 2);
    }

    #[test]
    fn test_panicking_updater_is_contained() {
        let (log, state) = isolated(7);
        let outcome = state.update(|_| panic!("updater blew up"));

        assert_eq!(outcome, Proposal::Failed);
        assert_eq!(state.get(), 7);
        let record = log.last().unwrap();
        assert_eq!(record.message(), "updater blew up");
        assert_eq!(record.context(), Some(STATE_CONTEXT));
    }

    #[test]
    fn test_panicking_validator_is_contained() {
        let (log, state) = isolated(0);
        let state = state.with_validator(|_: &i32| panic!("validator blew up"));

        assert_eq!(state.set(1), Proposal::Failed);
        assert_eq!(state.get(), 0);
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_only_committed_values() {
        let (_, state) = isolated(0);
        let state = state.with_validator(|v: &i32| *v >= 0);
        let mut rx = state.subscribe();

        state.set(-1);
        assert!(!rx.has_changed().unwrap());

        state.set(4);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 4);
    }
}
