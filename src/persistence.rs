//! Per-entity persistence.
//!
//! A saved entity is an [`EntityDocument`]: one [`PersistedAttribute`] per
//! attribute with a scoped instance, carrying both baselines, the
//! default-final sentinel and every modifier keyed by its modifier key.
//!
//! ```json
//! {
//!   "strength": {
//!     "default-base": 20.0,
//!     "current-base": 26.4,
//!     "default-final-baseline": 26.4,
//!     "modifiers": {
//!       "gear.gloves": {
//!         "operation": "ADD",
//!         "amount": 2.0,
//!         "temporary": false,
//!         "applies-to-default": true,
//!         "applies-to-current": true,
//!         "uses-explicit-multiplier-keys": false,
//!         "multiplier-keys": []
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Loading is lenient: an unregistered attribute or a malformed modifier
//! is dropped with a warning and the rest of the document still loads.

use crate::error::AttributeError;
use crate::ids::{AttributeId, EntityId};
use crate::instance::AttributeInstance;
use crate::modifier::{ModifierEntry, ModifierOperation};
use crate::registry::AttributeRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Saved state of every scoped instance of one entity.
pub type EntityDocument = BTreeMap<AttributeId, PersistedAttribute>;

/// Saved state of one scoped instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PersistedAttribute {
    pub default_base: f64,
    pub current_base: f64,
    /// Last default-final seen by static synchronization. `None` means the
    /// instance was never computed.
    #[serde(default)]
    pub default_final_baseline: Option<f64>,
    #[serde(default)]
    pub modifiers: BTreeMap<String, PersistedModifier>,
}

/// Saved form of a [`ModifierEntry`]; the key lives in the enclosing map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PersistedModifier {
    pub operation: String,
    pub amount: f64,
    #[serde(default)]
    pub temporary: bool,
    #[serde(default = "default_true")]
    pub applies_to_default: bool,
    #[serde(default = "default_true")]
    pub applies_to_current: bool,
    #[serde(default)]
    pub uses_explicit_multiplier_keys: bool,
    #[serde(default)]
    pub multiplier_keys: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl From<&ModifierEntry> for PersistedModifier {
    fn from(entry: &ModifierEntry) -> Self {
        Self {
            operation: entry.operation.as_str().to_string(),
            amount: entry.amount,
            temporary: entry.temporary,
            applies_to_default: entry.applies_to_default,
            applies_to_current: entry.applies_to_current,
            uses_explicit_multiplier_keys: entry.multiplier_scope.is_explicit(),
            multiplier_keys: entry.multiplier_scope.keys().to_vec(),
        }
    }
}

impl PersistedModifier {
    /// Rebuild the entry stored under `key`.
    ///
    /// # Errors
    ///
    /// `InvalidModifierKey` or `UnknownOperation` when the saved data does
    /// not describe a valid modifier.
    pub fn to_entry(&self, key: &str) -> Result<ModifierEntry, AttributeError> {
        let operation = ModifierOperation::parse(&self.operation)
            .ok_or_else(|| AttributeError::UnknownOperation(self.operation.clone()))?;
        let mut entry = ModifierEntry::new(key, operation, self.amount)?
            .with_temporary(self.temporary)
            .on_layers(self.applies_to_default, self.applies_to_current);
        if self.uses_explicit_multiplier_keys {
            entry = entry.scaled_by(self.multiplier_keys.iter().map(String::as_str));
        }
        Ok(entry)
    }
}

impl PersistedAttribute {
    pub fn from_instance(instance: &AttributeInstance) -> Self {
        Self {
            default_base: instance.default_base_value(),
            current_base: instance.current_base_value(),
            default_final_baseline: instance.last_known_default_final(),
            modifiers: instance
                .modifiers()
                .iter()
                .map(|entry| (entry.key.as_str().to_string(), PersistedModifier::from(entry)))
                .collect(),
        }
    }
}

/// What [`AttributeRegistry::restore_entity`] installed and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: Vec<AttributeId>,
    pub skipped_attributes: Vec<AttributeId>,
    pub skipped_modifiers: Vec<String>,
}

impl AttributeRegistry {
    /// Capture every scoped instance of `entity`.
    pub fn snapshot_entity(&self, entity: &EntityId) -> EntityDocument {
        self.entity_attributes(entity)
            .into_iter()
            .filter_map(|id| {
                let instance = self.entity_instance(entity, &id)?;
                let persisted = PersistedAttribute::from_instance(&instance.read());
                Some((id, persisted))
            })
            .collect()
    }

    /// Install saved instances for `entity`.
    ///
    /// Each attribute in the document replaces the entity's scoped instance
    /// with a fresh one. Baselines are re-clamped using the entity's cap
    /// override key. Unregistered attributes and modifiers that fail to
    /// rebuild are skipped with a warning.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use attrstat::*;
    ///
    /// let registry = AttributeRegistry::new();
    /// registry.register_definition(AttributeDefinition::builder("armor").default_base(5.0).build());
    ///
    /// let hero = EntityId::new("hero");
    /// let armor = AttributeId::new("armor");
    /// registry
    ///     .set_entity_modifier(&hero, &armor, ModifierEntry::add("gear.plate", 3.0).unwrap())
    ///     .unwrap();
    ///
    /// let saved = registry.snapshot_entity(&hero);
    /// registry.purge_entity(&hero);
    ///
    /// let report = registry.restore_entity(&hero, &saved);
    /// assert_eq!(report.restored, vec![armor.clone()]);
    /// assert_eq!(registry.compute(&armor, Some(&hero)).current_final, 8.0);
    /// ```
    pub fn restore_entity(&self, entity: &EntityId, document: &EntityDocument) -> RestoreReport {
        let mut report = RestoreReport::default();
        let cap_key = entity.as_str();

        for (id, persisted) in document {
            let Some(definition) = self.definition(id) else {
                warn!(attribute = %id, entity = %entity, "skipping persisted state of unknown attribute");
                report.skipped_attributes.push(id.clone());
                continue;
            };

            let cap = definition.cap();
            let mut instance = AttributeInstance::new(
                cap.clamp(persisted.default_base, Some(cap_key)),
                cap.clamp(persisted.current_base, Some(cap_key)),
            )
            .with_cap_override_key(cap_key);
            instance.set_last_known_default_final(persisted.default_final_baseline);

            for (key, modifier) in &persisted.modifiers {
                match modifier.to_entry(key) {
                    Ok(entry) => {
                        instance.add_modifier(entry);
                    }
                    Err(err) => {
                        warn!(attribute = %id, entity = %entity, key = %key, error = %err, "skipping persisted modifier");
                        report.skipped_modifiers.push(key.clone());
                    }
                }
            }

            self.install_entity_instance(entity, id, instance);
            report.restored.push(id.clone());
        }

        debug!(
            entity = %entity,
            restored = report.restored.len(),
            skipped = report.skipped_attributes.len() + report.skipped_modifiers.len(),
            "restored entity"
        );
        report
    }
}

/// Encode a document as pretty-printed JSON.
pub fn to_json(document: &EntityDocument) -> Result<String, AttributeError> {
    Ok(serde_json::to_string_pretty(document)?)
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct LooseAttribute {
    default_base: f64,
    current_base: f64,
    #[serde(default)]
    default_final_baseline: Option<f64>,
    #[serde(default)]
    modifiers: BTreeMap<String, serde_json::Value>,
}

/// Decode a document from JSON.
///
/// Each attribute and each modifier is decoded on its own, so a malformed
/// entry is dropped with a warning instead of failing the whole load.
///
/// # Errors
///
/// `Serialization` if the input is not JSON or not a JSON object.
pub fn from_json(json: &str) -> Result<EntityDocument, AttributeError> {
    let attributes: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
    let mut document = EntityDocument::new();

    for (id, value) in attributes {
        let loose: LooseAttribute = match serde_json::from_value(value) {
            Ok(loose) => loose,
            Err(err) => {
                warn!(attribute = %id, error = %err, "skipping malformed persisted attribute");
                continue;
            }
        };

        let mut modifiers = BTreeMap::new();
        for (key, value) in loose.modifiers {
            match serde_json::from_value::<PersistedModifier>(value) {
                Ok(modifier) => {
                    modifiers.insert(key, modifier);
                }
                Err(err) => {
                    warn!(attribute = %id, key = %key, error = %err, "skipping malformed persisted modifier");
                }
            }
        }

        document.insert(
            AttributeId::new(&id),
            PersistedAttribute {
                default_base: loose.default_base,
                current_base: loose.current_base,
                default_final_baseline: loose.default_final_baseline,
                modifiers,
            },
        );
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cap::CapConfig;
    use crate::definition::AttributeDefinition;
    use crate::modifier::MultiplierScope;

    #[test]
    fn test_modifier_round_trip_keeps_scope() {
        let entry = ModifierEntry::add("gear.ring", 4.0)
            .unwrap()
            .temporary()
            .current_layer_only()
            .scaled_by(["potions.haste", "class.rage"]);
        let persisted = PersistedModifier::from(&entry);
        assert_eq!(persisted.operation, "ADD");
        assert!(persisted.uses_explicit_multiplier_keys);
        assert_eq!(persisted.multiplier_keys, vec!["potions.haste", "class.rage"]);

        assert_eq!(persisted.to_entry("gear.ring").unwrap(), entry);
    }

    #[test]
    fn test_explicit_empty_scope_survives() {
        let entry = ModifierEntry::add("gear.ring", 4.0)
            .unwrap()
            .scaled_by(Vec::<String>::new());
        let restored = PersistedModifier::from(&entry).to_entry("gear.ring").unwrap();
        assert_eq!(restored.multiplier_scope, MultiplierScope::Explicit(Vec::new()));
    }

    #[test]
    fn test_bad_operation_rejected() {
        let mut persisted = PersistedModifier::from(&ModifierEntry::add("a.b", 1.0).unwrap());
        persisted.operation = "divide".into();
        assert!(matches!(
            persisted.to_entry("a.b"),
            Err(AttributeError::UnknownOperation(op)) if op == "divide"
        ));
    }

    #[test]
    fn test_loose_json_drops_only_bad_entries() {
        let json = r#"{
            "Armor": {
                "default-base": 5.0,
                "current-base": 7.0,
                "modifiers": {
                    "gear.plate": { "operation": "add", "amount": 3.0 },
                    "gear.broken": { "operation": "add", "amount": "lots" }
                }
            },
            "speed": { "default-base": "fast" }
        }"#;
        let document = from_json(json).unwrap();
        assert_eq!(document.len(), 1);
        let armor = &document[&AttributeId::new("armor")];
        assert_eq!(armor.current_base, 7.0);
        assert_eq!(armor.default_final_baseline, None);
        assert_eq!(armor.modifiers.len(), 1);
        assert!(armor.modifiers["gear.plate"].applies_to_current);
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(matches!(from_json("[1, 2]"), Err(AttributeError::Serialization(_))));
    }

    #[test]
    fn test_restore_reclamps_with_entity_key() {
        let registry = AttributeRegistry::new();
        registry.register_definition(
            AttributeDefinition::builder("armor")
                .default_base(5.0)
                .cap(CapConfig::new(0.0, 100.0).unwrap().with_override_max("hero", 10.0))
                .build(),
        );
        let hero = EntityId::new("hero");
        let mut document = EntityDocument::new();
        document.insert(
            AttributeId::new("armor"),
            PersistedAttribute {
                default_base: 50.0,
                current_base: 60.0,
                ..Default::default()
            },
        );

        registry.restore_entity(&hero, &document);
        let instance = registry.entity_instance(&hero, &AttributeId::new("armor")).unwrap();
        assert_eq!(instance.read().default_base_value(), 10.0);
        assert_eq!(instance.read().current_base_value(), 10.0);
        assert_eq!(instance.read().cap_override_key(), Some("hero"));
    }
}
