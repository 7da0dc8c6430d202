//! Rampart State - Validated reactive state
//!
//! This crate implements the state side of the safety layer:
//! - `SafeState`: a watched cell whose writes are sanitized and validated
//! - Typed cells for strings, numbers, arrays and objects
//!
//! Rejected and failed writes are recorded in the error log; the cell keeps
//! its previous value.

pub mod cell;
pub mod typed;

pub use cell::*;
pub use typed::*;
