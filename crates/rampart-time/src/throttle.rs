//! Leading-edge throttle
//!
//! The first call in an idle window runs immediately and opens a cooldown.
//! Calls arriving during the cooldown are dropped: they are neither queued
//! nor replayed when the window closes. A limit too large to add to the
//! clock opens a cooldown that never ends.

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::stats::{Counters, LimiterStats};

/// Throttle state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleState {
    Idle,
    /// `until` is `None` when the cooldown does not end
    CoolingDown { until: Option<Instant> },
}

/// Leading-edge throttle around a callback
pub struct Throttle<A> {
    f: Box<dyn Fn(A) + Send + Sync>,
    limit: Duration,
    state: Mutex<ThrottleState>,
    counters: Counters,
}

impl<A> Throttle<A> {
    /// Throttle `f` to at most one run per `limit`
    pub fn new<F>(limit: Duration, f: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Throttle {
            f: Box::new(f),
            limit,
            state: Mutex::new(ThrottleState::Idle),
            counters: Counters::default(),
        }
    }

    /// Invoke the callback unless a cooldown is running.
    /// Returns `true` when the callback ran.
    pub fn call(&self, args: A) -> bool {
        self.counters.call();
        let now = Instant::now();

        {
            let mut state = self.state.lock();
            if let ThrottleState::CoolingDown { until } = *state {
                if until.map_or(true, |until| now < until) {
                    self.counters.suppress();
                    tracing::trace!(until = ?until, "throttled call dropped");
                    return false;
                }
            }
            *state = ThrottleState::CoolingDown {
                until: now.checked_add(self.limit),
            };
        }

        self.counters.fire();
        (self.f)(args);
        true
    }

    /// Current state; an elapsed cooldown reads as idle
    pub fn state(&self) -> ThrottleState {
        let state = *self.state.lock();
        match state {
            ThrottleState::CoolingDown { until: Some(until) } if Instant::now() >= until => {
                ThrottleState::Idle
            }
            other => other,
        }
    }

    pub fn is_cooling_down(&self) -> bool {
        matches!(self.state(), ThrottleState::CoolingDown { .. })
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn stats(&self) -> LimiterStats {
        self.counters.snapshot()
    }
}

impl<A> fmt::Debug for Throttle<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttle")
            .field("limit", &self.limit)
            .field("state", &self.state())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |n| sink.lock().push(n))
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_drops_burst() {
        let (seen, f) = recorder();
        let throttle = Throttle::new(Duration::from_millis(100), f);

        for n in 1..=5 {
            throttle.call(n);
            tokio::time::advance(Duration::from_millis(2)).await;
        }
        assert_eq!(*seen.lock(), vec![1]);

        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(throttle.call(6));
        assert_eq!(*seen.lock(), vec![1, 6]);

        let stats = throttle.stats();
        assert_eq!(stats.calls, 6);
        assert_eq!(stats.fired, 2);
        assert_eq!(stats.suppressed, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_does_not_fire_trailing_call() {
        let (seen, f) = recorder();
        let throttle = Throttle::new(Duration::from_millis(100), f);

        assert!(throttle.call(1));
        assert!(!throttle.call(2));
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(*seen.lock(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_state_transitions() {
        let (_, f) = recorder();
        let throttle = Throttle::new(Duration::from_millis(50), f);
        assert_eq!(throttle.state(), ThrottleState::Idle);

        throttle.call(1);
        assert!(throttle.is_cooling_down());

        tokio::time::advance(Duration::from_millis(50)).await;
        assert_eq!(throttle.state(), ThrottleState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_unbounded_limit() {
        let (seen, f) = recorder();
        let throttle = Throttle::new(Duration::MAX, f);

        assert!(throttle.call(1));
        assert_eq!(throttle.state(), ThrottleState::CoolingDown { until: None });

        tokio::time::advance(Duration::from_secs(365 * 24 * 3600)).await;
        assert!(!throttle.call(2));
        assert!(throttle.is_cooling_down());
        assert_eq!(*seen.lock(), vec![1]);
    }

    #[test]
    fn test_throttle_without_runtime() {
        let (seen, f) = recorder();
        let throttle = Throttle::new(Duration::from_secs(60), f);
        assert!(throttle.call(1));
        assert!(!throttle.call(2));
        assert_eq!(*seen.lock(), vec![1]);
    }
}
