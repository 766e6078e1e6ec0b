//! Attribute definitions.
//!
//! A definition is the immutable configuration of one attribute: its id,
//! whether its current layer is sourced from the live game state, its
//! default baselines, its cap and its multiplier policy. Definitions are
//! built once at configuration load and replaced wholesale on reload.

use crate::cap::CapConfig;
use crate::error::AttributeError;
use crate::ids::AttributeId;
use crate::multiplier::MultiplierApplicability;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Immutable attribute configuration.
///
/// # Examples
///
/// ```rust
/// use attrstat::{AttributeDefinition, CapConfig};
///
/// let strength = AttributeDefinition::builder("strength")
///     .default_base(20.0)
///     .cap(CapConfig::new(0.0, 100.0).unwrap())
///     .build();
///
/// assert_eq!(strength.id().as_str(), "strength");
/// assert!(!strength.is_dynamic());
/// assert_eq!(strength.default_current_value(), 20.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDefinition {
    id: AttributeId,
    dynamic: bool,
    default_base_value: f64,
    default_current_value: f64,
    cap: CapConfig,
    multipliers: MultiplierApplicability,
}

impl AttributeDefinition {
    /// Start building a definition for `id`.
    pub fn builder(id: impl Into<AttributeId>) -> AttributeDefinitionBuilder {
        AttributeDefinitionBuilder {
            id: id.into(),
            dynamic: false,
            default_base: 0.0,
            default_current: None,
            cap: CapConfig::unbounded(),
            multipliers: MultiplierApplicability::default(),
        }
    }

    /// Parse a single definition from a JSON [`DefinitionConfig`] document.
    pub fn from_json(json: &str) -> Result<Self, AttributeError> {
        let config: DefinitionConfig = serde_json::from_str(json)?;
        Self::try_from(config)
    }

    pub fn id(&self) -> &AttributeId {
        &self.id
    }

    /// Whether the current layer is sourced from an external provider.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn default_base_value(&self) -> f64 {
        self.default_base_value
    }

    pub fn default_current_value(&self) -> f64 {
        self.default_current_value
    }

    pub fn cap(&self) -> &CapConfig {
        &self.cap
    }

    pub fn multipliers(&self) -> &MultiplierApplicability {
        &self.multipliers
    }
}

/// Builder for [`AttributeDefinition`].
pub struct AttributeDefinitionBuilder {
    id: AttributeId,
    dynamic: bool,
    default_base: f64,
    default_current: Option<f64>,
    cap: CapConfig,
    multipliers: MultiplierApplicability,
}

impl AttributeDefinitionBuilder {
    /// Mark the attribute as dynamic.
    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }

    pub fn with_dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    pub fn default_base(mut self, value: f64) -> Self {
        self.default_base = value;
        self
    }

    /// Default current-layer baseline. Falls back to the default base.
    pub fn default_current(mut self, value: f64) -> Self {
        self.default_current = Some(value);
        self
    }

    pub fn cap(mut self, cap: CapConfig) -> Self {
        self.cap = cap;
        self
    }

    pub fn multipliers(mut self, policy: MultiplierApplicability) -> Self {
        self.multipliers = policy;
        self
    }

    pub fn build(self) -> AttributeDefinition {
        AttributeDefinition {
            id: self.id,
            dynamic: self.dynamic,
            default_base_value: self.default_base,
            default_current_value: self.default_current.unwrap_or(self.default_base),
            cap: self.cap,
            multipliers: self.multipliers,
        }
    }
}

/// Serializable form of a definition, as supplied by a configuration
/// loader.
///
/// ```rust
/// use attrstat::AttributeDefinition;
///
/// let json = r#"{
///     "id": "Speed",
///     "dynamic": true,
///     "default-base": 0.1,
///     "min": 0.0,
///     "max": 1.0,
///     "override-max": { "vip-player": 2.0 },
///     "multipliers": { "mode": "ignore-list", "keys": ["debuff.slow"] }
/// }"#;
///
/// let def = AttributeDefinition::from_json(json).unwrap();
/// assert!(def.is_dynamic());
/// assert_eq!(def.cap().resolve_max(Some("VIP-Player")), 2.0);
/// assert!(!def.multipliers().can_apply("debuff.slow"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DefinitionConfig {
    pub id: AttributeId,
    #[serde(default)]
    pub dynamic: bool,
    #[serde(default)]
    pub default_base: f64,
    #[serde(default)]
    pub default_current: Option<f64>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub override_max: BTreeMap<String, f64>,
    #[serde(default)]
    pub multipliers: MultiplierConfig,
}

/// Serializable multiplier policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MultiplierConfig {
    #[serde(default)]
    pub mode: MultiplierMode,
    /// Allowed keys for `allow-list`, ignored keys for `ignore-list`.
    #[serde(default)]
    pub keys: Vec<String>,
    /// Additional ignored keys, honored by every mode.
    #[serde(default)]
    pub ignored: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MultiplierMode {
    #[default]
    ApplyAll,
    AllowList,
    IgnoreList,
}

impl From<MultiplierConfig> for MultiplierApplicability {
    fn from(config: MultiplierConfig) -> Self {
        let policy = match config.mode {
            MultiplierMode::ApplyAll => MultiplierApplicability::apply_all(),
            MultiplierMode::AllowList => MultiplierApplicability::allow_only(&config.keys),
            MultiplierMode::IgnoreList => MultiplierApplicability::ignore(&config.keys),
        };
        if config.ignored.is_empty() {
            policy
        } else {
            policy.with_ignored(config.ignored)
        }
    }
}

impl From<&MultiplierApplicability> for MultiplierConfig {
    fn from(policy: &MultiplierApplicability) -> Self {
        fn list(set: &BTreeSet<String>) -> Vec<String> {
            set.iter().cloned().collect()
        }
        match policy {
            MultiplierApplicability::ApplyAll { ignored } => Self {
                mode: MultiplierMode::ApplyAll,
                keys: Vec::new(),
                ignored: list(ignored),
            },
            MultiplierApplicability::AllowList { allowed, ignored } => Self {
                mode: MultiplierMode::AllowList,
                keys: list(allowed),
                ignored: list(ignored),
            },
            MultiplierApplicability::IgnoreList { ignored } => Self {
                mode: MultiplierMode::IgnoreList,
                keys: list(ignored),
                ignored: Vec::new(),
            },
        }
    }
}

impl TryFrom<DefinitionConfig> for AttributeDefinition {
    type Error = AttributeError;

    fn try_from(config: DefinitionConfig) -> Result<Self, Self::Error> {
        let mut cap = CapConfig::new(
            config.min.unwrap_or(f64::NEG_INFINITY),
            config.max.unwrap_or(f64::INFINITY),
        )?;
        for (key, max) in &config.override_max {
            cap = cap.with_override_max(key, *max);
        }

        let mut builder = AttributeDefinition::builder(config.id)
            .with_dynamic(config.dynamic)
            .default_base(config.default_base)
            .cap(cap)
            .multipliers(config.multipliers.into());
        if let Some(current) = config.default_current {
            builder = builder.default_current(current);
        }
        Ok(builder.build())
    }
}

impl From<&AttributeDefinition> for DefinitionConfig {
    fn from(def: &AttributeDefinition) -> Self {
        let finite = |v: f64| if v.is_finite() { Some(v) } else { None };
        Self {
            id: def.id.clone(),
            dynamic: def.dynamic,
            default_base: def.default_base_value,
            default_current: Some(def.default_current_value),
            min: finite(def.cap.global_min()),
            max: finite(def.cap.global_max()),
            override_max: def
                .cap
                .override_max_values()
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            multipliers: MultiplierConfig::from(&def.multipliers),
        }
    }
}
