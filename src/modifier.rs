//! Modifier entries.
//!
//! A modifier is a uniquely keyed numeric contribution to an attribute.
//! It is either additive or multiplicative, permanent or temporary, and
//! applies to the default layer, the current layer, both or neither.
//! Keys are validated when the entry is built, so a malformed key never
//! reaches an instance or the engine.

use crate::error::AttributeError;
use crate::ids::ModifierKey;
use serde::{Deserialize, Serialize};

/// Modifier operation kind.
///
/// For `Multiply`, the amount is the literal factor: `2.0` doubles,
/// `0.5` halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModifierOperation {
    Add,
    Multiply,
}

impl ModifierOperation {
    /// Parse an operation name, case-insensitively.
    ///
    /// Accepts `add`/`additive` and `multiply`/`multiplicative`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "add" | "additive" => Some(Self::Add),
            "multiply" | "multiplicative" => Some(Self::Multiply),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Multiply => "MULTIPLY",
        }
    }
}

/// Which value layer a modifier contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    /// The configuration-level value.
    Default,
    /// The live, per-session value.
    Current,
}

/// Whether a modifier survives a temporary purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permanence {
    Permanent,
    Temporary,
}

/// Which multipliers an additive modifier is scaled by.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MultiplierScope {
    /// Every multiplier that qualifies for the attribute.
    #[default]
    All,
    /// Only the listed multiplier keys (lower-cased, insertion ordered).
    Explicit(Vec<String>),
}

impl MultiplierScope {
    /// Whether the multiplier identified by `key` may scale this modifier.
    pub fn allows(&self, key: &str) -> bool {
        match self {
            Self::All => true,
            Self::Explicit(keys) => keys.iter().any(|k| k.eq_ignore_ascii_case(key)),
        }
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, Self::Explicit(_))
    }

    pub fn keys(&self) -> &[String] {
        match self {
            Self::All => &[],
            Self::Explicit(keys) => keys,
        }
    }
}

/// A single named contribution to an attribute.
///
/// Entries start out permanent, applying to both layers and scaled by all
/// qualifying multipliers; the chained setters narrow that down.
///
/// # Examples
///
/// ```rust
/// use attrstat::{Layer, ModifierEntry, ModifierOperation};
///
/// let haste = ModifierEntry::multiply("potions.haste", 1.25)
///     .unwrap()
///     .temporary()
///     .current_layer_only();
///
/// assert_eq!(haste.operation, ModifierOperation::Multiply);
/// assert!(haste.temporary);
/// assert!(haste.applies_to(Layer::Current));
/// assert!(!haste.applies_to(Layer::Default));
///
/// let ring = ModifierEntry::add("gear.ring", 4.0)
///     .unwrap()
///     .scaled_by(["potions.haste"]);
/// assert!(ring.multiplier_scope.allows("potions.haste"));
/// assert!(!ring.multiplier_scope.allows("class.berserk"));
///
/// assert!(ModifierEntry::add("ring", 4.0).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ModifierEntry {
    pub key: ModifierKey,
    pub operation: ModifierOperation,
    pub amount: f64,
    pub temporary: bool,
    pub applies_to_default: bool,
    pub applies_to_current: bool,
    pub multiplier_scope: MultiplierScope,
}

impl ModifierEntry {
    /// Build an entry from an already validated key.
    pub fn with_key(key: ModifierKey, operation: ModifierOperation, amount: f64) -> Self {
        Self {
            key,
            operation,
            amount,
            temporary: false,
            applies_to_default: true,
            applies_to_current: true,
            multiplier_scope: MultiplierScope::All,
        }
    }

    /// Build an entry, validating `key`.
    ///
    /// # Errors
    ///
    /// `AttributeError::InvalidModifierKey` for a malformed key.
    pub fn new(key: &str, operation: ModifierOperation, amount: f64) -> Result<Self, AttributeError> {
        Ok(Self::with_key(ModifierKey::parse(key)?, operation, amount))
    }

    /// Additive entry contributing `amount`.
    pub fn add(key: &str, amount: f64) -> Result<Self, AttributeError> {
        Self::new(key, ModifierOperation::Add, amount)
    }

    /// Multiplicative entry scaling by the literal `factor`.
    pub fn multiply(key: &str, factor: f64) -> Result<Self, AttributeError> {
        Self::new(key, ModifierOperation::Multiply, factor)
    }

    /// Mark the entry as temporary (removed by a temporary purge).
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    /// Set the temporary flag explicitly.
    pub fn with_temporary(mut self, temporary: bool) -> Self {
        self.temporary = temporary;
        self
    }

    /// Choose the layers the entry applies to. Both `false` is allowed:
    /// the entry is stored but contributes to no stage.
    pub fn on_layers(mut self, default: bool, current: bool) -> Self {
        self.applies_to_default = default;
        self.applies_to_current = current;
        self
    }

    pub fn default_layer_only(self) -> Self {
        self.on_layers(true, false)
    }

    pub fn current_layer_only(self) -> Self {
        self.on_layers(false, true)
    }

    /// Restrict the multipliers that scale this entry to `keys`.
    ///
    /// Keys are lower-cased; duplicates are dropped, first occurrence
    /// order is kept.
    pub fn scaled_by<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ordered: Vec<String> = Vec::new();
        for key in keys {
            let key = key.as_ref().trim().to_lowercase();
            if !ordered.contains(&key) {
                ordered.push(key);
            }
        }
        self.multiplier_scope = MultiplierScope::Explicit(ordered);
        self
    }

    /// Scale this entry by every qualifying multiplier (the default).
    pub fn scaled_by_all(mut self) -> Self {
        self.multiplier_scope = MultiplierScope::All;
        self
    }

    pub fn permanence(&self) -> Permanence {
        if self.temporary {
            Permanence::Temporary
        } else {
            Permanence::Permanent
        }
    }

    pub fn applies_to(&self, layer: Layer) -> bool {
        match layer {
            Layer::Default => self.applies_to_default,
            Layer::Current => self.applies_to_current,
        }
    }
}
