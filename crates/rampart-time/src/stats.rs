//! Limiter counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a limiter's activity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LimiterStats {
    /// Invocations received
    pub calls: u64,
    /// Invocations that reached the wrapped function
    pub fired: u64,
    /// Invocations dropped (throttle) or superseded (debounce)
    pub suppressed: u64,
    /// Runs whose wrapped function panicked
    pub panicked: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    calls: AtomicU64,
    fired: AtomicU64,
    suppressed: AtomicU64,
    panicked: AtomicU64,
}

impl Counters {
    pub(crate) fn call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn fire(&self) {
        self.fired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn suppress(&self) {
        self.suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn panic(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> LimiterStats {
        LimiterStats {
            calls: self.calls.load(Ordering::Relaxed),
            fired: self.fired.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
        }
    }
}
