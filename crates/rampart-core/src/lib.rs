//! Rampart Core - Fundamental coercions and input hygiene
//!
//! This crate defines the leaf primitives used throughout Rampart:
//! - Coercion of untrusted dynamic values into well-typed values
//! - Identifiers (EntityId)
//! - Sanitizers and validators for display and form input
//! - Failure-tolerant JSON helpers and typed path access
//! - Display formatting for numbers
//! - The crate-wide error type

pub mod id;
pub mod coerce;
pub mod validate;
pub mod json;
pub mod access;
pub mod format;
pub mod error;

pub use id::*;
pub use coerce::*;
pub use validate::*;
pub use json::*;
pub use access::*;
pub use format::*;
pub use error::*;

pub use serde_json::{Map, Value};
