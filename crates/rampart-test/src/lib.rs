//! Rampart Test Harness - Hostile-input validation
//!
//! This crate provides:
//! - Seeded generation of hostile dynamic values
//! - Cross-crate invariant checks (coercion, sanitization, error log,
//!   validated state, storage)
//! - Property helpers reusable from other test suites

pub mod value_fuzzer;

pub use value_fuzzer::*;
