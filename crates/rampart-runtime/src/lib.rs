//! Rampart Runtime - Start-up wiring for the safety layer
//!
//! This crate implements:
//! - Configuration (JSON, human-readable durations)
//! - Tracing subscriber setup
//! - The backend health cache
//! - The `Rampart` context owning the error log, storage areas and limiter
//!   settings

pub mod config;
pub mod context;
pub mod health;
pub mod observability;

pub use config::*;
pub use context::*;
pub use health::*;
pub use observability::*;
