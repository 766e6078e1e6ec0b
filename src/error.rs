//! Error types for attribute configuration and mutation.
//!
//! Computation itself never fails; every error here is raised at a
//! construction or mutation boundary before state changes.

use crate::ids::AttributeId;
use thiserror::Error;

/// Errors raised by configuration, mutation and persistence boundaries.
///
/// # Examples
///
/// ```rust
/// use attrstat::{AttributeError, AttributeId};
///
/// let err = AttributeError::UnknownAttribute(AttributeId::new("speed"));
/// assert_eq!(err.to_string(), "Unknown attribute: speed");
/// ```
#[derive(Debug, Error)]
pub enum AttributeError {
    /// A cap configuration whose maximum is below its minimum.
    #[error("Invalid cap: max {max} is below min {min}")]
    InvalidCap { min: f64, max: f64 },

    /// A modifier key that does not match `<owner>.<name>`.
    #[error("Invalid modifier key: {0:?} (expected <owner>.<name>)")]
    InvalidModifierKey(String),

    /// A persisted modifier operation other than add or multiply.
    #[error("Unknown modifier operation: {0:?}")]
    UnknownOperation(String),

    /// A mutation against an attribute id that was never registered.
    ///
    /// Only write paths return this; computing an unknown attribute
    /// yields a zero-valued result instead.
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(AttributeId),

    /// Encoding or decoding of a definition or persisted document failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
