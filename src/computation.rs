//! Computation results.
//!
//! `AttributeComputation` carries the six ordered stage values produced
//! by one run of the engine.

use serde::{Deserialize, Serialize};

/// The six stage values of one attribute computation.
///
/// Read-only, copyable and serializable. `current_final` is the value a
/// game bridge pushes into the live attribute system.
///
/// # Examples
///
/// ```rust
/// use attrstat::AttributeComputation;
///
/// let zero = AttributeComputation::zero();
/// assert_eq!(zero.current_final, 0.0);
/// assert_eq!(zero.stages(), [0.0; 6]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AttributeComputation {
    /// Clamped default-layer baseline.
    pub raw_default: f64,
    /// Default layer after permanent modifiers.
    pub default_permanent: f64,
    /// Default layer after permanent and temporary modifiers.
    pub default_final: f64,
    /// Clamped current-layer baseline (external value for dynamic attributes).
    pub raw_current: f64,
    /// Current layer after permanent modifiers.
    pub current_permanent: f64,
    /// Current layer after permanent and temporary modifiers.
    pub current_final: f64,
}

impl AttributeComputation {
    /// The result reported for an attribute that is not registered.
    pub const fn zero() -> Self {
        Self {
            raw_default: 0.0,
            default_permanent: 0.0,
            default_final: 0.0,
            raw_current: 0.0,
            current_permanent: 0.0,
            current_final: 0.0,
        }
    }

    /// All six stages in order.
    pub fn stages(&self) -> [f64; 6] {
        [
            self.raw_default,
            self.default_permanent,
            self.default_final,
            self.raw_current,
            self.current_permanent,
            self.current_final,
        ]
    }
}
