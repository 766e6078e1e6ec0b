//! Attribute instances.
//!
//! An instance is the mutable, scope-bound state of one attribute: either
//! the global instance shared by every entity, or a scoped instance owned
//! by a single entity. It holds the two baselines, the cap-override key,
//! the last known default-final value and the modifier buckets.

use crate::definition::AttributeDefinition;
use crate::ids::ModifierKey;
use crate::modifier::{Layer, ModifierEntry, ModifierOperation, Permanence};
use std::collections::HashMap;

/// Identifies one of the eight modifier buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    pub layer: Layer,
    pub permanence: Permanence,
    pub operation: ModifierOperation,
}

impl BucketKey {
    pub const fn new(layer: Layer, permanence: Permanence, operation: ModifierOperation) -> Self {
        Self {
            layer,
            permanence,
            operation,
        }
    }

    /// All eight buckets, in a fixed order.
    pub const ALL: [BucketKey; 8] = [
        Self::new(Layer::Default, Permanence::Permanent, ModifierOperation::Add),
        Self::new(Layer::Default, Permanence::Permanent, ModifierOperation::Multiply),
        Self::new(Layer::Default, Permanence::Temporary, ModifierOperation::Add),
        Self::new(Layer::Default, Permanence::Temporary, ModifierOperation::Multiply),
        Self::new(Layer::Current, Permanence::Permanent, ModifierOperation::Add),
        Self::new(Layer::Current, Permanence::Permanent, ModifierOperation::Multiply),
        Self::new(Layer::Current, Permanence::Temporary, ModifierOperation::Add),
        Self::new(Layer::Current, Permanence::Temporary, ModifierOperation::Multiply),
    ];

    fn index(self) -> usize {
        let layer = match self.layer {
            Layer::Default => 0,
            Layer::Current => 4,
        };
        let permanence = match self.permanence {
            Permanence::Permanent => 0,
            Permanence::Temporary => 2,
        };
        let operation = match self.operation {
            ModifierOperation::Add => 0,
            ModifierOperation::Multiply => 1,
        };
        layer + permanence + operation
    }
}

/// Mutable per-scope state of one attribute.
///
/// Adding a modifier whose key is already present replaces the old entry
/// everywhere; it never stacks. Accessors hand out copies, so callers can
/// not reach into the buckets.
///
/// # Examples
///
/// ```rust
/// use attrstat::{AttributeInstance, BucketKey, Layer, ModifierEntry, ModifierOperation, Permanence};
///
/// let mut instance = AttributeInstance::new(10.0, 10.0);
/// instance.add_modifier(ModifierEntry::add("gear.ring", 2.0).unwrap());
/// instance.add_modifier(ModifierEntry::add("gear.ring", 5.0).unwrap());
///
/// assert_eq!(instance.len(), 1);
/// let bucket = instance.bucket(BucketKey::new(
///     Layer::Current,
///     Permanence::Permanent,
///     ModifierOperation::Add,
/// ));
/// assert_eq!(bucket.len(), 1);
/// assert_eq!(bucket[0].amount, 5.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeInstance {
    default_base_value: f64,
    current_base_value: f64,
    cap_override_key: Option<String>,
    last_known_default_final: Option<f64>,
    modifiers: HashMap<ModifierKey, ModifierEntry>,
    buckets: [Vec<ModifierEntry>; 8],
}

impl AttributeInstance {
    pub fn new(default_base_value: f64, current_base_value: f64) -> Self {
        Self {
            default_base_value,
            current_base_value,
            cap_override_key: None,
            last_known_default_final: None,
            modifiers: HashMap::new(),
            buckets: Default::default(),
        }
    }

    /// Fresh instance seeded with a definition's default baselines.
    pub fn from_definition(definition: &AttributeDefinition) -> Self {
        Self::new(
            definition.default_base_value(),
            definition.default_current_value(),
        )
    }

    /// Builder-style cap-override key.
    pub fn with_cap_override_key(mut self, key: impl Into<String>) -> Self {
        self.set_cap_override_key(Some(key.into()));
        self
    }

    pub fn default_base_value(&self) -> f64 {
        self.default_base_value
    }

    pub fn set_default_base_value(&mut self, value: f64) {
        self.default_base_value = value;
    }

    pub fn current_base_value(&self) -> f64 {
        self.current_base_value
    }

    pub fn set_current_base_value(&mut self, value: f64) {
        self.current_base_value = value;
    }

    pub fn cap_override_key(&self) -> Option<&str> {
        self.cap_override_key.as_deref()
    }

    /// Set the key used to select an override maximum. Lower-cased.
    pub fn set_cap_override_key(&mut self, key: Option<String>) {
        self.cap_override_key = key.map(|k| k.to_lowercase());
    }

    /// The default-final value seen by the last static synchronization,
    /// or `None` if this instance has never been computed.
    pub fn last_known_default_final(&self) -> Option<f64> {
        self.last_known_default_final
    }

    pub fn set_last_known_default_final(&mut self, value: Option<f64>) {
        self.last_known_default_final = value;
    }

    /// Insert `entry`, replacing any existing entry with the same key.
    ///
    /// Returns the replaced entry, if any.
    pub fn add_modifier(&mut self, entry: ModifierEntry) -> Option<ModifierEntry> {
        let previous = self.remove_modifier(&entry.key);

        for layer in [Layer::Default, Layer::Current] {
            if entry.applies_to(layer) {
                let bucket = BucketKey::new(layer, entry.permanence(), entry.operation);
                self.buckets[bucket.index()].push(entry.clone());
            }
        }
        self.modifiers.insert(entry.key.clone(), entry);
        previous
    }

    /// Remove the entry with `key` from the flat map and every bucket.
    ///
    /// A missing key is a no-op.
    pub fn remove_modifier(&mut self, key: &ModifierKey) -> Option<ModifierEntry> {
        let removed = self.modifiers.remove(key)?;
        for bucket in self.buckets.iter_mut() {
            bucket.retain(|e| &e.key != key);
        }
        Some(removed)
    }

    /// Drop every temporary entry. Permanent entries are untouched.
    ///
    /// Returns how many entries were removed.
    pub fn purge_temporary_modifiers(&mut self) -> usize {
        let before = self.modifiers.len();
        self.modifiers.retain(|_, e| !e.temporary);
        for key in BucketKey::ALL {
            if key.permanence == Permanence::Temporary {
                self.buckets[key.index()].clear();
            }
        }
        before - self.modifiers.len()
    }

    pub fn clear_modifiers(&mut self) {
        self.modifiers.clear();
        for bucket in self.buckets.iter_mut() {
            bucket.clear();
        }
    }

    pub fn modifier(&self, key: &ModifierKey) -> Option<ModifierEntry> {
        self.modifiers.get(key).cloned()
    }

    pub fn contains_modifier(&self, key: &ModifierKey) -> bool {
        self.modifiers.contains_key(key)
    }

    /// Copy of every entry, ordered by key.
    pub fn modifiers(&self) -> Vec<ModifierEntry> {
        let mut entries: Vec<ModifierEntry> = self.modifiers.values().cloned().collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Copy of one bucket, in insertion order.
    pub fn bucket(&self, key: BucketKey) -> Vec<ModifierEntry> {
        self.buckets[key.index()].clone()
    }

    pub(crate) fn bucket_slice(&self, key: BucketKey) -> &[ModifierEntry] {
        &self.buckets[key.index()]
    }

    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }
}
