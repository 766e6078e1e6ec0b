//! Cap configuration.
//!
//! `CapConfig` bounds every computed stage of an attribute. It carries a
//! global `[min, max]` range plus optional per-scope maxima keyed by a
//! cap-override key (usually an entity id).

use crate::error::AttributeError;
use std::collections::HashMap;

/// Min/max clamping with per-scope override maxima.
///
/// Construction rejects `max < min`. Override keys are lower-cased; a key
/// without an override falls back to the global maximum.
///
/// # Examples
///
/// ```rust
/// use attrstat::CapConfig;
///
/// let cap = CapConfig::new(0.0, 100.0)
///     .unwrap()
///     .with_override_max("Player-1", 5.0);
///
/// assert_eq!(cap.clamp(150.0, None), 100.0);
/// assert_eq!(cap.clamp(-3.0, None), 0.0);
/// assert_eq!(cap.clamp(12.0, Some("player-1")), 5.0);
/// assert_eq!(cap.clamp(12.0, Some("player-2")), 12.0);
///
/// assert!(CapConfig::new(10.0, 1.0).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CapConfig {
    global_min: f64,
    global_max: f64,
    override_max_values: HashMap<String, f64>,
}

impl CapConfig {
    /// Create a cap with the given global bounds.
    ///
    /// # Errors
    ///
    /// `AttributeError::InvalidCap` when `max < min`.
    pub fn new(min: f64, max: f64) -> Result<Self, AttributeError> {
        if max < min {
            return Err(AttributeError::InvalidCap { min, max });
        }
        Ok(Self {
            global_min: min,
            global_max: max,
            override_max_values: HashMap::new(),
        })
    }

    /// A cap that never restricts a finite value.
    pub fn unbounded() -> Self {
        Self {
            global_min: f64::NEG_INFINITY,
            global_max: f64::INFINITY,
            override_max_values: HashMap::new(),
        }
    }

    /// Add (or replace) an override maximum for a scope key.
    pub fn with_override_max(mut self, key: impl AsRef<str>, max: f64) -> Self {
        self.override_max_values
            .insert(key.as_ref().to_lowercase(), max);
        self
    }

    pub fn global_min(&self) -> f64 {
        self.global_min
    }

    pub fn global_max(&self) -> f64 {
        self.global_max
    }

    /// All override maxima, keyed by normalized scope key.
    pub fn override_max_values(&self) -> &HashMap<String, f64> {
        &self.override_max_values
    }

    /// Resolve the maximum for a scope key.
    ///
    /// Returns the override when one exists for `key`, otherwise the
    /// global maximum.
    pub fn resolve_max(&self, key: Option<&str>) -> f64 {
        key.and_then(|k| self.lookup_override(k))
            .unwrap_or(self.global_max)
    }

    /// Clamp `value` into `[global_min, resolve_max(key)]`.
    ///
    /// The minimum wins when an override maximum sits below it.
    pub fn clamp(&self, value: f64, key: Option<&str>) -> f64 {
        value.min(self.resolve_max(key)).max(self.global_min)
    }

    fn lookup_override(&self, key: &str) -> Option<f64> {
        if let Some(max) = self.override_max_values.get(key) {
            return Some(*max);
        }
        self.override_max_values.get(&key.to_lowercase()).copied()
    }
}

impl Default for CapConfig {
    fn default() -> Self {
        Self::unbounded()
    }
}
