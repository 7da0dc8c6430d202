//! Rampart Time - Rate limiting on the tokio timer
//!
//! This crate implements the rate limiters:
//! - Debounce: trailing-edge, last call wins, needs a runtime handle
//! - Throttle: leading-edge, drops calls during the cooldown
//! - Per-limiter activity counters

pub mod debounce;
pub mod stats;
pub mod throttle;

pub use debounce::*;
pub use stats::LimiterStats;
pub use throttle::*;
