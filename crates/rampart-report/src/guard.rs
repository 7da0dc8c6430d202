//! Safe call wrappers
//!
//! A wrapped operation either succeeds or is turned into a logged record plus
//! a fallback value. Errors and panics alike stop at the wrapper, including
//! panics raised while an async operation is being polled.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::{global, ErrorLog, ErrorRecord, Failure};

pub const SAFE_CALL_CONTEXT: &str = "Safe Call";
pub const SAFE_ASYNC_CALL_CONTEXT: &str = "Safe Async Call";
pub const NAVIGATE_CONTEXT: &str = "Safe Navigate";
pub const BOUNDARY_CONTEXT: &str = "Component Error Boundary";

/// Routes longer than this are refused by [`ErrorLog::safe_navigate`]
pub const MAX_ROUTE_LEN: usize = 500;

/// Run `op`, folding its error or panic into a [`Failure`]
fn capture<T, E, F>(op: F) -> Result<T, Failure>
where
    F: FnOnce() -> Result<T, E>,
    E: Into<Failure>,
{
    match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(err.into()),
        Err(payload) => Err(Failure::from_panic(payload)),
    }
}

/// Future adapter that converts a panic during `poll` into an error
struct CatchUnwind<F> {
    inner: Pin<Box<F>>,
}

impl<F: Future> Future for CatchUnwind<F> {
    type Output = Result<F::Output, Box<dyn Any + Send>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let inner = self.inner.as_mut();
        match panic::catch_unwind(AssertUnwindSafe(|| inner.poll(cx))) {
            Ok(Poll::Ready(output)) => Poll::Ready(Ok(output)),
            Ok(Poll::Pending) => Poll::Pending,
            Err(payload) => Poll::Ready(Err(payload)),
        }
    }
}

/// Run an async operation, folding errors and panics into a [`Failure`]
async fn capture_async<T, E, F, Fut>(op: F) -> Result<T, Failure>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Failure>,
{
    let fut = match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(fut) => fut,
        Err(payload) => return Err(Failure::from_panic(payload)),
    };

    let guarded = CatchUnwind {
        inner: Box::pin(fut),
    };
    match guarded.await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(err.into()),
        Err(payload) => Err(Failure::from_panic(payload)),
    }
}

impl ErrorLog {
    /// Run `op`; on error or panic log it and return `fallback`
    pub fn safe_call<T, E, F>(&self, op: F, fallback: T, context: Option<&str>) -> T
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Failure>,
    {
        match capture(op) {
            Ok(value) => value,
            Err(failure) => {
                self.log_error(failure, Some(context.unwrap_or(SAFE_CALL_CONTEXT)));
                fallback
            }
        }
    }

    /// Async counterpart of [`ErrorLog::safe_call`]
    pub async fn safe_call_async<T, E, F, Fut>(&self, op: F, fallback: T, context: Option<&str>) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<Failure>,
    {
        match capture_async(op).await {
            Ok(value) => value,
            Err(failure) => {
                self.log_error(failure, Some(context.unwrap_or(SAFE_ASYNC_CALL_CONTEXT)));
                fallback
            }
        }
    }

    /// Like [`ErrorLog::safe_call`] with an optional fallback and no default
    /// context
    pub fn safe_sync<T, E, F>(&self, op: F, fallback: Option<T>, context: Option<&str>) -> Option<T>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Failure>,
    {
        match capture(op) {
            Ok(value) => Some(value),
            Err(failure) => {
                self.log_error(failure, context);
                fallback
            }
        }
    }

    /// Async counterpart of [`ErrorLog::safe_sync`]
    pub async fn safe_async<T, E, F, Fut>(
        &self,
        op: F,
        fallback: Option<T>,
        context: Option<&str>,
    ) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<Failure>,
    {
        match capture_async(op).await {
            Ok(value) => Some(value),
            Err(failure) => {
                self.log_error(failure, context);
                fallback
            }
        }
    }

    /// Navigate to `path`, or to `fallback` when the path is unusable or the
    /// navigation fails
    pub fn safe_navigate<N, E>(&self, mut navigate: N, path: &str, fallback: &str)
    where
        N: FnMut(&str) -> Result<(), E>,
        E: Into<Failure>,
    {
        let target = if !path.is_empty() && path.len() < MAX_ROUTE_LEN {
            path
        } else {
            fallback
        };

        if let Err(failure) = capture(|| navigate(target)) {
            self.log_error(failure, Some(NAVIGATE_CONTEXT));
            if let Err(failure) = capture(|| navigate(fallback)) {
                self.log_error(failure, Some(NAVIGATE_CONTEXT));
            }
        }
    }
}

/// [`ErrorLog::safe_call`] on the process-wide log
pub fn safe_call<T, E, F>(op: F, fallback: T, context: Option<&str>) -> T
where
    F: FnOnce() -> Result<T, E>,
    E: Into<Failure>,
{
    global().safe_call(op, fallback, context)
}

/// [`ErrorLog::safe_call_async`] on the process-wide log
pub async fn safe_call_async<T, E, F, Fut>(op: F, fallback: T, context: Option<&str>) -> T
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Failure>,
{
    global().safe_call_async(op, fallback, context).await
}

/// [`ErrorLog::safe_sync`] on the process-wide log
pub fn safe_sync<T, E, F>(op: F, fallback: Option<T>, context: Option<&str>) -> Option<T>
where
    F: FnOnce() -> Result<T, E>,
    E: Into<Failure>,
{
    global().safe_sync(op, fallback, context)
}

/// [`ErrorLog::safe_async`] on the process-wide log
pub async fn safe_async<T, E, F, Fut>(op: F, fallback: Option<T>, context: Option<&str>) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Failure>,
{
    global().safe_async(op, fallback, context).await
}

/// [`ErrorLog::safe_navigate`] on the process-wide log
pub fn safe_navigate<N, E>(navigate: N, path: &str, fallback: &str)
where
    N: FnMut(&str) -> Result<(), E>,
    E: Into<Failure>,
{
    global().safe_navigate(navigate, path, fallback)
}

/// Guard around a section of work that trips on its first failure.
///
/// Once tripped, guarded sections are skipped and the captured record stays
/// available (for an error panel, say) until [`ErrorBoundary::reset`].
pub struct ErrorBoundary {
    log: Arc<ErrorLog>,
    context: String,
    error: Option<ErrorRecord>,
}

impl ErrorBoundary {
    pub fn new(log: Arc<ErrorLog>) -> Self {
        ErrorBoundary {
            log,
            context: BOUNDARY_CONTEXT.to_string(),
            error: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Run a guarded section; `None` when it failed or the boundary is tripped
    pub fn run<T, E, F>(&mut self, op: F) -> Option<T>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Failure>,
    {
        if self.error.is_some() {
            return None;
        }

        match capture(op) {
            Ok(value) => Some(value),
            Err(failure) => {
                let record = self.log.log_error(failure, Some(&self.context));
                self.error = Some(record);
                None
            }
        }
    }

    pub fn error(&self) -> Option<&ErrorRecord> {
        self.error.as_ref()
    }

    pub fn is_tripped(&self) -> bool {
        self.error.is_some()
    }

    /// Forget the captured failure and resume running sections
    pub fn reset(&mut self) {
        self.error = None;
    }
}

impl Default for ErrorBoundary {
    fn default() -> Self {
        Self::new(global())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_safe_call_returns_fallback_and_logs_once() {
        let log = ErrorLog::new();
        let result = log.safe_call(|| Err::<i32, _>(Failure::error("x")), 42, None);

        assert_eq!(result, 42);
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().unwrap().context(), Some(SAFE_CALL_CONTEXT));
    }

    #[test]
    fn test_safe_call_success_logs_nothing() {
        let log = ErrorLog::new();
        let result = log.safe_call(|| Ok::<_, Failure>(7), 0, Some("votes"));
        assert_eq!(result, 7);
        assert!(log.is_empty());
    }

    #[test]
    fn test_safe_call_catches_panic() {
        let log = ErrorLog::new();
        let result = log.safe_call(
            || -> Result<u8, Failure> { panic!("index out of range") },
            1,
            Some("render list"),
        );

        assert_eq!(result, 1);
        let record = log.last().unwrap();
        assert_eq!(record.message(), "index out of range");
        assert_eq!(record.context(), Some("render list"));
    }

    #[tokio::test]
    async fn test_safe_call_async_rejection() {
        let log = ErrorLog::new();
        let result = log
            .safe_call_async(
                || async { Err::<Vec<u32>, _>("Network Error") },
                Vec::new(),
                None,
            )
            .await;

        assert!(result.is_empty());
        let record = log.last().unwrap();
        assert_eq!(record.message(), "Network Error");
        assert_eq!(record.context(), Some(SAFE_ASYNC_CALL_CONTEXT));
    }

    #[tokio::test]
    async fn test_safe_call_async_panic_after_await() {
        let log = ErrorLog::new();
        let result = log
            .safe_call_async(
                || async {
                    tokio::task::yield_now().await;
                    if true {
                        panic!("late failure");
                    }
                    Ok::<_, Failure>(5)
                },
                -1,
                Some("load feed"),
            )
            .await;

        assert_eq!(result, -1);
        assert_eq!(log.last().unwrap().message(), "late failure");
    }

    #[tokio::test]
    async fn test_safe_async_optional_fallback() {
        let log = ErrorLog::new();
        let ok = log.safe_async(|| async { Ok::<_, Failure>(3) }, None, None).await;
        assert_eq!(ok, Some(3));

        let failed = log
            .safe_async(|| async { Err::<u8, _>("boom") }, None, None)
            .await;
        assert_eq!(failed, None);
        assert_eq!(log.last().unwrap().context(), None);
    }

    #[test]
    fn test_safe_sync() {
        let log = ErrorLog::new();
        assert_eq!(log.safe_sync(|| Err::<u8, _>("bad"), Some(9), Some("parse")), Some(9));
        assert_eq!(log.last().unwrap().context(), Some("parse"));
    }

    #[test]
    fn test_safe_navigate() {
        let log = ErrorLog::new();
        let mut visited = Vec::new();

        log.safe_navigate(
            |p: &str| {
                visited.push(p.to_string());
                Ok::<_, Failure>(())
            },
            "/projects/3",
            "/",
        );
        log.safe_navigate(
            |p: &str| {
                visited.push(p.to_string());
                Ok::<_, Failure>(())
            },
            "",
            "/",
        );
        let long = "/x".repeat(MAX_ROUTE_LEN);
        log.safe_navigate(
            |p: &str| {
                visited.push(p.to_string());
                Ok::<_, Failure>(())
            },
            &long,
            "/",
        );

        assert_eq!(visited, vec!["/projects/3", "/", "/"]);
        assert!(log.is_empty());
    }

    #[test]
    fn test_safe_navigate_failure_uses_fallback() {
        let log = ErrorLog::new();
        let mut visited = Vec::new();

        log.safe_navigate(
            |p: &str| {
                visited.push(p.to_string());
                if p == "/broken" {
                    Err("route not registered")
                } else {
                    Ok(())
                }
            },
            "/broken",
            "/home",
        );

        assert_eq!(visited, vec!["/broken", "/home"]);
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().unwrap().context(), Some(NAVIGATE_CONTEXT));
    }

    #[test]
    fn test_error_boundary_trips_and_resets() {
        let log = Arc::new(ErrorLog::new());
        let mut boundary = ErrorBoundary::new(log.clone());

        assert_eq!(boundary.run(|| Ok::<_, Failure>(1)), Some(1));
        assert_eq!(boundary.run(|| Err::<u8, _>("widget crashed")), None);
        assert!(boundary.is_tripped());
        assert_eq!(boundary.error().unwrap().context(), Some(BOUNDARY_CONTEXT));

        // Skipped while tripped
        assert_eq!(boundary.run(|| Ok::<_, Failure>(2)), None);
        assert_eq!(log.len(), 1);

        boundary.reset();
        assert_eq!(boundary.run(|| Ok::<_, Failure>(3)), Some(3));
    }

    #[test]
    #[serial]
    fn test_global_safe_call() {
        let before = global().total_captured();
        let result = safe_call(|| Err::<i32, _>("x"), 42, None);
        assert_eq!(result, 42);
        assert_eq!(global().total_captured(), before + 1);
    }
}
