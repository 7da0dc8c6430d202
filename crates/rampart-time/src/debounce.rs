//! Trailing-edge debounce
//!
//! Each call cancels the pending run and schedules a new one `wait` later,
//! so a burst collapses into a single run carrying the last call's
//! arguments. A panic in the callback is caught, logged and counted; it
//! does not take the timer task down with it.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rampart_core::{RampartError, RampartResult};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::stats::{Counters, LimiterStats};

enum DebounceState {
    Idle,
    Scheduled { generation: u64, task: JoinHandle<()> },
}

struct Schedule {
    state: DebounceState,
    next_generation: u64,
}

struct Shared<A> {
    f: Box<dyn Fn(A) + Send + Sync>,
    schedule: Mutex<Schedule>,
    counters: Counters,
}

/// Trailing-edge debounce around a callback
pub struct Debounce<A> {
    shared: Arc<Shared<A>>,
    wait: Duration,
    handle: Handle,
}

impl<A: Send + 'static> Debounce<A> {
    /// Debounce `f` on the current tokio runtime
    pub fn new<F>(wait: Duration, f: F) -> RampartResult<Self>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        let handle = Handle::try_current().map_err(|_| RampartError::NoRuntime)?;
        Ok(Self::with_handle(handle, wait, f))
    }

    /// Debounce `f`, scheduling timers on `handle`
    pub fn with_handle<F>(handle: Handle, wait: Duration, f: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Debounce {
            shared: Arc::new(Shared {
                f: Box::new(f),
                schedule: Mutex::new(Schedule {
                    state: DebounceState::Idle,
                    next_generation: 0,
                }),
                counters: Counters::default(),
            }),
            wait,
            handle,
        }
    }

    /// Schedule a run with `args`, replacing any pending run
    pub fn call(&self, args: A) {
        self.shared.counters.call();

        let mut schedule = self.shared.schedule.lock();
        schedule.next_generation += 1;
        let generation = schedule.next_generation;

        if let DebounceState::Scheduled { task, .. } =
            std::mem::replace(&mut schedule.state, DebounceState::Idle)
        {
            task.abort();
            self.shared.counters.suppress();
        }

        let shared = Arc::clone(&self.shared);
        let wait = self.wait;
        let task = self.handle.spawn(async move {
            tokio::time::sleep(wait).await;

            let is_current = {
                let mut schedule = shared.schedule.lock();
                let is_current = matches!(
                    schedule.state,
                    DebounceState::Scheduled { generation: g, .. } if g == generation
                );
                if is_current {
                    schedule.state = DebounceState::Idle;
                }
                is_current
            };

            if is_current {
                shared.counters.fire();
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| (shared.f)(args))) {
                    shared.counters.panic();
                    tracing::error!(panic = panic_message(&*payload), "debounced callback panicked");
                }
            }
        });

        schedule.state = DebounceState::Scheduled { generation, task };
    }

    /// Drop the pending run, if any. Returns `true` when one was pending.
    pub fn cancel(&self) -> bool {
        let mut schedule = self.shared.schedule.lock();
        match std::mem::replace(&mut schedule.state, DebounceState::Idle) {
            DebounceState::Scheduled { task, .. } => {
                task.abort();
                self.shared.counters.suppress();
                true
            }
            DebounceState::Idle => false,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

impl<A> Debounce<A> {
    pub fn is_pending(&self) -> bool {
        matches!(
            self.shared.schedule.lock().state,
            DebounceState::Scheduled { .. }
        )
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    pub fn stats(&self) -> LimiterStats {
        self.shared.counters.snapshot()
    }
}

impl<A> Drop for Debounce<A> {
    fn drop(&mut self) {
        if let DebounceState::Scheduled { task, .. } =
            std::mem::replace(&mut self.shared.schedule.lock().state, DebounceState::Idle)
        {
            task.abort();
        }
    }
}

impl<A> fmt::Debug for Debounce<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debounce")
            .field("wait", &self.wait)
            .field("pending", &self.is_pending())
            .field("stats", &self.stats())
            .finish()
    }
}
