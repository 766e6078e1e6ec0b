//! External baseline providers.
//!
//! A dynamic attribute sources its current-layer raw value from the live
//! game state. A `BaselineProvider` is the bridge that supplies that value.
//! Implementations must exclude this system's own previous contributions
//! so they are not counted twice.

use crate::ids::{AttributeId, EntityId};
use std::collections::HashMap;

/// Supplies the engine-external baseline of a dynamic attribute.
///
/// Providers are queried synchronously from within a computation and must
/// not call back into the registry.
///
/// # Examples
///
/// ```rust
/// use attrstat::{AttributeId, BaselineProvider, EntityId};
///
/// // Closures implement the trait directly.
/// let equipment_speed = |_entity: &EntityId, _attr: &AttributeId| 0.35;
///
/// let value = equipment_speed.baseline(&EntityId::new("p1"), &AttributeId::new("speed"));
/// assert_eq!(value, 0.35);
/// ```
pub trait BaselineProvider: Send + Sync {
    /// The live baseline of `attribute` for `entity`.
    fn baseline(&self, entity: &EntityId, attribute: &AttributeId) -> f64;
}

impl<F> BaselineProvider for F
where
    F: Fn(&EntityId, &AttributeId) -> f64 + Send + Sync,
{
    fn baseline(&self, entity: &EntityId, attribute: &AttributeId) -> f64 {
        self(entity, attribute)
    }
}

/// A provider that reports the same value for every entity.
#[derive(Debug, Clone)]
pub struct ConstantBaseline(pub f64);

impl BaselineProvider for ConstantBaseline {
    fn baseline(&self, _entity: &EntityId, _attribute: &AttributeId) -> f64 {
        self.0
    }
}

/// A table of per-entity baselines with a fallback for unknown entities.
///
/// # Examples
///
/// ```rust
/// use attrstat::{AttributeId, BaselineProvider, EntityId, MapBaseline};
///
/// let mut table = MapBaseline::with_fallback(1.0);
/// table.insert(EntityId::new("p1"), 4.0);
///
/// let attr = AttributeId::new("armor");
/// assert_eq!(table.baseline(&EntityId::new("P1"), &attr), 4.0);
/// assert_eq!(table.baseline(&EntityId::new("p2"), &attr), 1.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapBaseline {
    values: HashMap<EntityId, f64>,
    fallback: f64,
}

impl MapBaseline {
    pub fn new(values: HashMap<EntityId, f64>) -> Self {
        Self {
            values,
            fallback: 0.0,
        }
    }

    pub fn with_fallback(fallback: f64) -> Self {
        Self {
            values: HashMap::new(),
            fallback,
        }
    }

    pub fn insert(&mut self, entity: EntityId, value: f64) {
        self.values.insert(entity, value);
    }
}

impl BaselineProvider for MapBaseline {
    fn baseline(&self, entity: &EntityId, _attribute: &AttributeId) -> f64 {
        self.values.get(entity).copied().unwrap_or(self.fallback)
    }
}
