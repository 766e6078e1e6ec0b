//! Attribute registry.
//!
//! The registry is the session object that owns every definition and
//! instance. It validates mutations, dispatches refresh notifications and
//! runs the [`ComputationEngine`] against the right pair of instances.
//! It is an ordinary value: create one per hosting session and share it
//! as `Arc<AttributeRegistry>`.

use crate::computation::AttributeComputation;
use crate::definition::AttributeDefinition;
use crate::engine::{ComputationEngine, ComputeContext};
use crate::error::AttributeError;
use crate::ids::{AttributeId, EntityId, ModifierKey};
use crate::instance::AttributeInstance;
use crate::modifier::ModifierEntry;
use crate::provider::BaselineProvider;
use crate::refresh::RefreshListener;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// An instance shared between the registry and its callers.
pub type SharedInstance = Arc<RwLock<AttributeInstance>>;

type ScopedInstances = Arc<DashMap<AttributeId, SharedInstance>>;

/// Owner of attribute definitions and instances.
///
/// # Concurrency
///
/// All maps are concurrent, and every instance sits behind its own lock,
/// so each individual call is safe from any thread. There is **no**
/// atomicity across calls: a [`compute`](Self::compute) running alongside
/// a modifier mutation on the same instance sees the instance either
/// before or after that mutation, and a read-modify-write sequence built
/// from several calls can interleave with other writers. Callers that
/// need a consistent view must serialize their own access, typically by
/// computing from the single simulation thread.
///
/// Computations lock the global instance before the entity instance.
///
/// # Examples
///
/// ```rust
/// use attrstat::*;
///
/// let registry = AttributeRegistry::new();
/// registry.register_definition(
///     AttributeDefinition::builder("strength")
///         .default_base(20.0)
///         .cap(CapConfig::new(0.0, 100.0).unwrap())
///         .build(),
/// );
///
/// let hero = EntityId::new("hero");
/// let strength = AttributeId::new("strength");
/// registry
///     .set_entity_modifier(&hero, &strength, ModifierEntry::add("gear.gloves", 5.0).unwrap())
///     .unwrap();
///
/// assert_eq!(registry.compute(&strength, Some(&hero)).current_final, 25.0);
/// assert_eq!(registry.compute(&strength, None).current_final, 20.0);
///
/// // Unknown attributes read as zero; writing to them is an error.
/// let missing = AttributeId::new("missing");
/// assert_eq!(registry.compute(&missing, None), AttributeComputation::zero());
/// assert!(registry.get_or_create_entity_instance(&hero, &missing).is_err());
/// ```
pub struct AttributeRegistry {
    engine: ComputationEngine,
    definitions: DashMap<AttributeId, Arc<AttributeDefinition>>,
    global_instances: DashMap<AttributeId, SharedInstance>,
    entity_instances: DashMap<EntityId, ScopedInstances>,
    providers: DashMap<AttributeId, Arc<dyn BaselineProvider>>,
    listeners: RwLock<Vec<Arc<dyn RefreshListener>>>,
}

impl AttributeRegistry {
    pub fn new() -> Self {
        Self {
            engine: ComputationEngine::new(),
            definitions: DashMap::new(),
            global_instances: DashMap::new(),
            entity_instances: DashMap::new(),
            providers: DashMap::new(),
            listeners: RwLock::new(Vec::new()),
        }
    }

    // ------------------------------------------------------------------
    // Definitions
    // ------------------------------------------------------------------

    /// Register a definition, or replace the one with the same id.
    ///
    /// The first registration creates the global instance. On replacement,
    /// every instance whose default baseline still equals the previous
    /// configured default follows the new default; for dynamic attributes
    /// the same applies to the current baseline. Instances with manual
    /// baselines keep them.
    ///
    /// Returns the replaced definition, if any.
    pub fn register_definition(
        &self,
        definition: AttributeDefinition,
    ) -> Option<Arc<AttributeDefinition>> {
        let id = definition.id().clone();
        let definition = Arc::new(definition);
        let previous = self.definitions.insert(id.clone(), Arc::clone(&definition));

        match &previous {
            None => {
                self.global_instances.entry(id.clone()).or_insert_with(|| {
                    Arc::new(RwLock::new(AttributeInstance::from_definition(&definition)))
                });
                debug!(attribute = %id, dynamic = definition.is_dynamic(), "registered attribute");
            }
            Some(old) => {
                let followed = self.follow_reloaded_defaults(old, &definition);
                debug!(attribute = %id, followed, "replaced attribute definition");
                self.notify_all(&id);
            }
        }
        previous
    }

    fn follow_reloaded_defaults(&self, old: &AttributeDefinition, new: &AttributeDefinition) -> usize {
        let id = new.id();
        let mut instances: Vec<SharedInstance> = self
            .global_instances
            .get(id)
            .map(|r| vec![Arc::clone(r.value())])
            .unwrap_or_default();
        for scoped in self.entity_instances.iter() {
            if let Some(instance) = scoped.value().get(id) {
                instances.push(Arc::clone(instance.value()));
            }
        }

        let mut followed = 0;
        for instance in instances {
            let mut instance = instance.write();
            if instance.default_base_value() == old.default_base_value() {
                instance.set_default_base_value(new.default_base_value());
                followed += 1;
            }
            if new.is_dynamic() && instance.current_base_value() == old.default_current_value() {
                instance.set_current_base_value(new.default_current_value());
            }
        }
        followed
    }

    pub fn definition(&self, id: &AttributeId) -> Option<Arc<AttributeDefinition>> {
        self.definitions.get(id).map(|r| Arc::clone(r.value()))
    }

    pub fn is_registered(&self, id: &AttributeId) -> bool {
        self.definitions.contains_key(id)
    }

    /// All registered definitions, sorted by id.
    pub fn definitions(&self) -> Vec<Arc<AttributeDefinition>> {
        let mut definitions: Vec<Arc<AttributeDefinition>> =
            self.definitions.iter().map(|r| Arc::clone(r.value())).collect();
        definitions.sort_by(|a, b| a.id().cmp(b.id()));
        definitions
    }

    /// All registered attribute ids, sorted.
    pub fn attribute_ids(&self) -> Vec<AttributeId> {
        let mut ids: Vec<AttributeId> = self.definitions.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    fn require(&self, id: &AttributeId) -> Result<Arc<AttributeDefinition>, AttributeError> {
        self.definition(id)
            .ok_or_else(|| AttributeError::UnknownAttribute(id.clone()))
    }

    // ------------------------------------------------------------------
    // Collaborators
    // ------------------------------------------------------------------

    /// Install the live baseline source for a dynamic attribute.
    pub fn register_baseline_provider(&self, id: AttributeId, provider: Arc<dyn BaselineProvider>) {
        self.providers.insert(id, provider);
    }

    pub fn remove_baseline_provider(&self, id: &AttributeId) -> bool {
        self.providers.remove(id).is_some()
    }

    pub fn add_refresh_listener(&self, listener: Arc<dyn RefreshListener>) {
        self.listeners.write().push(listener);
    }

    fn notify_entity(&self, entity: &EntityId, attribute: &AttributeId) {
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            listener.notify_entity(entity, attribute);
        }
    }

    fn notify_all(&self, attribute: &AttributeId) {
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            listener.notify_all(attribute);
        }
    }

    // ------------------------------------------------------------------
    // Instances
    // ------------------------------------------------------------------

    /// The global instance of a registered attribute.
    ///
    /// # Errors
    ///
    /// `AttributeError::UnknownAttribute` if `id` is not registered.
    pub fn global_instance(&self, id: &AttributeId) -> Result<SharedInstance, AttributeError> {
        let definition = self.require(id)?;
        let instance = self
            .global_instances
            .entry(id.clone())
            .or_insert_with(|| Arc::new(RwLock::new(AttributeInstance::from_definition(&definition))));
        Ok(Arc::clone(instance.value()))
    }

    /// The scoped instance of `id` for `entity`, created on first access.
    ///
    /// New instances start from the definition's defaults and use the
    /// entity id as their cap-override key.
    ///
    /// # Errors
    ///
    /// `AttributeError::UnknownAttribute` if `id` is not registered.
    pub fn get_or_create_entity_instance(
        &self,
        entity: &EntityId,
        id: &AttributeId,
    ) -> Result<SharedInstance, AttributeError> {
        let definition = self.require(id)?;
        let scoped = self.scoped(entity);
        let instance = scoped.entry(id.clone()).or_insert_with(|| {
            debug!(attribute = %id, entity = %entity, "created scoped instance");
            Arc::new(RwLock::new(
                AttributeInstance::from_definition(&definition).with_cap_override_key(entity.as_str()),
            ))
        });
        Ok(Arc::clone(instance.value()))
    }

    /// The scoped instance if it already exists. Never creates one.
    pub fn entity_instance(&self, entity: &EntityId, id: &AttributeId) -> Option<SharedInstance> {
        self.entity_instances
            .get(entity)
            .and_then(|scoped| scoped.value().get(id).map(|r| Arc::clone(r.value())))
    }

    /// Replace the scoped instance of `id` for `entity` wholesale.
    ///
    /// The caller has already checked that `id` is registered.
    pub(crate) fn install_entity_instance(
        &self,
        entity: &EntityId,
        id: &AttributeId,
        instance: AttributeInstance,
    ) {
        self.scoped(entity)
            .insert(id.clone(), Arc::new(RwLock::new(instance)));
        self.notify_entity(entity, id);
    }

    fn scoped(&self, entity: &EntityId) -> ScopedInstances {
        let entry = self.entity_instances.entry(entity.clone()).or_default();
        Arc::clone(entry.value())
    }

    /// Entities that currently own scoped instances, sorted.
    pub fn entities(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.entity_instances.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Attributes with a scoped instance for `entity`, sorted.
    pub fn entity_attributes(&self, entity: &EntityId) -> Vec<AttributeId> {
        let mut ids: Vec<AttributeId> = self
            .entity_instances
            .get(entity)
            .map(|scoped| scoped.value().iter().map(|r| r.key().clone()).collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Drop every scoped instance of `entity` (despawn or session end).
    ///
    /// Returns whether anything was dropped.
    pub fn purge_entity(&self, entity: &EntityId) -> bool {
        let removed = self.entity_instances.remove(entity).is_some();
        if removed {
            debug!(entity = %entity, "purged scoped instances");
        }
        removed
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Add or replace a modifier on the global instance of `attribute`.
    ///
    /// The entry's key was validated when the entry was built. Notifies
    /// every listener with `notify_all`. Returns the replaced entry.
    pub fn set_global_modifier(
        &self,
        attribute: &AttributeId,
        entry: ModifierEntry,
    ) -> Result<Option<ModifierEntry>, AttributeError> {
        let instance = self.global_instance(attribute)?;
        debug!(attribute = %attribute, key = %entry.key, "set global modifier");
        let previous = instance.write().add_modifier(entry);
        self.notify_all(attribute);
        Ok(previous)
    }

    /// Add or replace a modifier on the scoped instance of `attribute` for
    /// `entity`, creating the instance if needed.
    pub fn set_entity_modifier(
        &self,
        entity: &EntityId,
        attribute: &AttributeId,
        entry: ModifierEntry,
    ) -> Result<Option<ModifierEntry>, AttributeError> {
        let instance = self.get_or_create_entity_instance(entity, attribute)?;
        debug!(attribute = %attribute, entity = %entity, key = %entry.key, "set entity modifier");
        let previous = instance.write().add_modifier(entry);
        self.notify_entity(entity, attribute);
        Ok(previous)
    }

    /// Remove a global modifier by raw key.
    ///
    /// # Errors
    ///
    /// `InvalidModifierKey` for a malformed key (nothing changes),
    /// `UnknownAttribute` for an unregistered attribute.
    pub fn remove_global_modifier(
        &self,
        attribute: &AttributeId,
        key: &str,
    ) -> Result<Option<ModifierEntry>, AttributeError> {
        let key = ModifierKey::parse(key)?;
        let instance = self.global_instance(attribute)?;
        let removed = instance.write().remove_modifier(&key);
        if removed.is_some() {
            debug!(attribute = %attribute, key = %key, "removed global modifier");
            self.notify_all(attribute);
        }
        Ok(removed)
    }

    /// Remove a scoped modifier by raw key. Does not create an instance.
    pub fn remove_entity_modifier(
        &self,
        entity: &EntityId,
        attribute: &AttributeId,
        key: &str,
    ) -> Result<Option<ModifierEntry>, AttributeError> {
        let key = ModifierKey::parse(key)?;
        self.require(attribute)?;
        let Some(instance) = self.entity_instance(entity, attribute) else {
            return Ok(None);
        };
        let removed = instance.write().remove_modifier(&key);
        if removed.is_some() {
            debug!(attribute = %attribute, entity = %entity, key = %key, "removed entity modifier");
            self.notify_entity(entity, attribute);
        }
        Ok(removed)
    }

    /// Drop temporary modifiers from every scoped instance of `entity`.
    ///
    /// Notifies once per attribute that lost at least one entry and
    /// returns the total number of entries removed.
    pub fn purge_temporary_modifiers(&self, entity: &EntityId) -> usize {
        let Some(scoped) = self.entity_instances.get(entity).map(|r| Arc::clone(r.value())) else {
            return 0;
        };
        let instances: Vec<(AttributeId, SharedInstance)> = scoped
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();

        let mut total = 0;
        for (attribute, instance) in instances {
            let removed = instance.write().purge_temporary_modifiers();
            if removed > 0 {
                total += removed;
                self.notify_entity(entity, &attribute);
            }
        }
        total
    }

    /// Drop temporary modifiers from the global instance of `attribute`.
    pub fn purge_global_temporary_modifiers(&self, attribute: &AttributeId) -> Result<usize, AttributeError> {
        let instance = self.global_instance(attribute)?;
        let removed = instance.write().purge_temporary_modifiers();
        if removed > 0 {
            self.notify_all(attribute);
        }
        Ok(removed)
    }

    /// Set both baselines of the global instance.
    pub fn set_global_base(
        &self,
        attribute: &AttributeId,
        default_base: f64,
        current_base: f64,
    ) -> Result<(), AttributeError> {
        let instance = self.global_instance(attribute)?;
        {
            let mut instance = instance.write();
            instance.set_default_base_value(default_base);
            instance.set_current_base_value(current_base);
        }
        self.notify_all(attribute);
        Ok(())
    }

    /// Set the default baseline of an entity's scoped instance.
    pub fn set_entity_default_base(
        &self,
        entity: &EntityId,
        attribute: &AttributeId,
        value: f64,
    ) -> Result<(), AttributeError> {
        let instance = self.get_or_create_entity_instance(entity, attribute)?;
        instance.write().set_default_base_value(value);
        self.notify_entity(entity, attribute);
        Ok(())
    }

    /// Set the current baseline of an entity's scoped instance.
    ///
    /// The stored value is not clamped; caps apply at computation time.
    pub fn set_entity_current_base(
        &self,
        entity: &EntityId,
        attribute: &AttributeId,
        value: f64,
    ) -> Result<(), AttributeError> {
        let instance = self.get_or_create_entity_instance(entity, attribute)?;
        instance.write().set_current_base_value(value);
        self.notify_entity(entity, attribute);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Computation
    // ------------------------------------------------------------------

    /// Compute `attribute`, for `entity` or for the global view.
    ///
    /// An unregistered attribute yields [`AttributeComputation::zero`] and
    /// a warning; read paths may be called speculatively. Computing never
    /// creates a scoped instance.
    pub fn compute(&self, attribute: &AttributeId, entity: Option<&EntityId>) -> AttributeComputation {
        let Some(definition) = self.definition(attribute) else {
            warn!(attribute = %attribute, "compute requested for unknown attribute");
            return AttributeComputation::zero();
        };

        let global = self.global_instances.get(attribute).map(|r| Arc::clone(r.value()));
        let scoped = entity.and_then(|e| self.entity_instance(e, attribute));
        let provider = self.providers.get(attribute).map(|r| Arc::clone(r.value()));

        let mut global_guard = global.as_ref().map(|instance| instance.write());
        let mut entity_guard = scoped.as_ref().map(|instance| instance.write());

        let context = ComputeContext {
            entity,
            provider: provider.as_deref(),
        };
        self.engine.compute(
            &definition,
            global_guard.as_deref_mut(),
            entity_guard.as_deref_mut(),
            context,
        )
    }

    /// Compute every registered attribute for `entity`.
    pub fn compute_all(&self, entity: &EntityId) -> BTreeMap<AttributeId, AttributeComputation> {
        self.attribute_ids()
            .into_iter()
            .map(|id| {
                let result = self.compute(&id, Some(entity));
                (id, result)
            })
            .collect()
    }
}

impl Default for AttributeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
