//! Identifier types.
//!
//! Provides `AttributeId`, `EntityId` and `ModifierKey`. The first two are
//! interned, case-insensitive string identifiers backed by `Arc<str>`;
//! `ModifierKey` additionally enforces the namespaced `<owner>.<name>`
//! format required of every modifier.

use crate::error::AttributeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Create a new identifier. The input is lower-cased.
            pub fn new(s: &str) -> Self {
                Self(Arc::from(s.to_lowercase()))
            }

            /// Get the normalized string representation.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(&s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                self.0.as_ref().serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Ok(Self::new(&s))
            }
        }
    };
}

interned_id!(
    /// Case-insensitive attribute identifier.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use attrstat::AttributeId;
    ///
    /// let a = AttributeId::new("Max_Health");
    /// let b: AttributeId = "max_health".into();
    /// assert_eq!(a, b);
    /// assert_eq!(a.as_str(), "max_health");
    /// ```
    AttributeId
);

interned_id!(
    /// Identifier of a game entity that owns scoped attribute instances.
    ///
    /// Its normalized string form doubles as the entity's cap-override key.
    EntityId
);

/// A validated, namespaced modifier key of the form `<owner>.<name>`.
///
/// The owner segment accepts `[a-z0-9_-]`, the name segment accepts
/// `[a-z0-9_.-]`. Input is lower-cased before validation, so keys compare
/// case-insensitively.
///
/// # Examples
///
/// ```rust
/// use attrstat::ModifierKey;
///
/// let key = ModifierKey::parse("Potions.Strength_Boost").unwrap();
/// assert_eq!(key.as_str(), "potions.strength_boost");
/// assert_eq!(key.owner(), "potions");
/// assert_eq!(key.name(), "strength_boost");
///
/// assert!(ModifierKey::parse("no-namespace").is_err());
/// assert!(ModifierKey::parse(".missing-owner").is_err());
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ModifierKey(Arc<str>);

impl ModifierKey {
    /// Parse and validate a modifier key.
    ///
    /// # Errors
    ///
    /// Returns `AttributeError::InvalidModifierKey` when the key does not
    /// match `<owner>.<name>`.
    pub fn parse(raw: &str) -> Result<Self, AttributeError> {
        let normalized = raw.trim().to_lowercase();
        if !is_valid_key(&normalized) {
            return Err(AttributeError::InvalidModifierKey(raw.to_string()));
        }
        Ok(Self(Arc::from(normalized)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The namespace segment before the first `.`.
    pub fn owner(&self) -> &str {
        self.split().0
    }

    /// Everything after the first `.`.
    pub fn name(&self) -> &str {
        self.split().1
    }

    fn split(&self) -> (&str, &str) {
        // validated at construction: the separator is always present
        self.0.split_once('.').unwrap_or((&self.0, ""))
    }
}

fn is_owner_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'
}

fn is_name_char(c: char) -> bool {
    is_owner_char(c) || c == '.'
}

fn is_valid_key(key: &str) -> bool {
    match key.split_once('.') {
        Some((owner, name)) => {
            !owner.is_empty()
                && !name.is_empty()
                && owner.chars().all(is_owner_char)
                && name.chars().all(is_name_char)
        }
        None => false,
    }
}

impl std::str::FromStr for ModifierKey {
    type Err = AttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ModifierKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ModifierKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ModifierKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ModifierKey::parse(&s).map_err(serde::de::Error::custom)
    }
}
