//! Rampart Storage - Key/value storage that never fails the caller
//!
//! This crate implements:
//! - The raw `KeyValueStore` seam and its backends (memory with quota,
//!   JSON file, disabled)
//! - `SafeStorage`: JSON values with fallbacks over any backend
//! - Storage areas (local, session)

pub mod backend;
pub mod safe;

pub use backend::*;
pub use safe::*;
