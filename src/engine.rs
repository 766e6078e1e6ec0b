//! Attribute computation engine.
//!
//! Turns a definition and up to two instances (global and entity scoped)
//! into the six stage values of an [`AttributeComputation`]:
//!
//! ```text
//! raw_default ─┬─ permanent ──────────────► default_permanent
//!              └─ permanent + temporary ──► default_final ──┐
//!                                     (static sync of the   │
//!                                      current baseline) ◄──┘
//! raw_current ─┬─ permanent ──────────────► current_permanent
//!              └─ permanent + temporary ──► current_final
//! ```
//!
//! Modifier buckets of the global and the entity instance are merged for
//! every stage, so both scopes contribute to the same number. The engine
//! keeps no references to instances between calls.

use crate::computation::AttributeComputation;
use crate::definition::AttributeDefinition;
use crate::ids::EntityId;
use crate::instance::{AttributeInstance, BucketKey};
use crate::modifier::{Layer, ModifierEntry, ModifierOperation, Permanence};
use crate::provider::BaselineProvider;
use tracing::trace;

/// Smallest default-final change that is propagated to the current baseline.
pub const SYNC_EPSILON: f64 = 1e-9;

/// Per-call inputs besides the definition and instances.
///
/// Mirrors what the live game bridge knows about the computation: which
/// entity it is for and, for dynamic attributes, where the live value
/// comes from.
#[derive(Clone, Copy, Default)]
pub struct ComputeContext<'a> {
    /// Entity the computation is for. `None` computes the global view.
    pub entity: Option<&'a EntityId>,
    /// Live baseline source for dynamic attributes.
    pub provider: Option<&'a dyn BaselineProvider>,
}

impl<'a> ComputeContext<'a> {
    pub fn global() -> Self {
        Self::default()
    }

    pub fn for_entity(entity: &'a EntityId) -> Self {
        Self {
            entity: Some(entity),
            provider: None,
        }
    }

    pub fn with_provider(mut self, provider: &'a dyn BaselineProvider) -> Self {
        self.provider = Some(provider);
        self
    }
}

/// Stateless six-stage attribute calculator.
///
/// # Examples
///
/// ```rust
/// use attrstat::*;
///
/// let def = AttributeDefinition::builder("strength")
///     .default_base(10.0)
///     .cap(CapConfig::new(0.0, 100.0).unwrap())
///     .build();
///
/// let mut global = AttributeInstance::from_definition(&def);
/// global.add_modifier(ModifierEntry::add("gear.belt", 5.0).unwrap());
/// global.add_modifier(ModifierEntry::multiply("class.brute", 2.0).unwrap().temporary());
///
/// let engine = ComputationEngine::new();
/// let result = engine.compute(&def, Some(&mut global), None, ComputeContext::global());
///
/// assert_eq!(result.default_permanent, 15.0); // 10 + 5
/// assert_eq!(result.default_final, 30.0); // 10 * 2 + 5 * 2
/// assert_eq!(result.current_final, 30.0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputationEngine;

impl ComputationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run the six-stage computation.
    ///
    /// For a non-dynamic attribute this may adjust the current baseline
    /// and the last-known default-final value of the target instance (the
    /// entity instance if present, else the global one). Nothing else is
    /// mutated.
    pub fn compute(
        &self,
        definition: &AttributeDefinition,
        mut global: Option<&mut AttributeInstance>,
        mut entity: Option<&mut AttributeInstance>,
        context: ComputeContext<'_>,
    ) -> AttributeComputation {
        if let (Some(instance), Some(id)) = (entity.as_deref_mut(), context.entity) {
            if instance.cap_override_key().is_none() {
                instance.set_cap_override_key(Some(id.as_str().to_string()));
            }
        }

        let cap_key: Option<String> = entity
            .as_deref()
            .and_then(AttributeInstance::cap_override_key)
            .or_else(|| global.as_deref().and_then(AttributeInstance::cap_override_key))
            .map(str::to_owned);
        let key = cap_key.as_deref();
        let clamp = |value: f64| definition.cap().clamp(value, key);

        // stage 1
        let default_base = entity
            .as_deref()
            .or(global.as_deref())
            .map(AttributeInstance::default_base_value)
            .unwrap_or_else(|| definition.default_base_value());
        let raw_default = clamp(default_base);

        // stages 2-3
        let (default_permanent, default_final) = layer_stages(
            definition,
            key,
            [global.as_deref(), entity.as_deref()],
            Layer::Default,
            raw_default,
        );

        // stage 4
        if !definition.is_dynamic() {
            if let Some(target) = entity.as_deref_mut().or(global.as_deref_mut()) {
                synchronize_static_baseline(target, default_final, clamp);
            }
        }

        // stage 5
        let holder_current = entity
            .as_deref()
            .or(global.as_deref())
            .map(AttributeInstance::current_base_value);
        let raw_current = if definition.is_dynamic() {
            let live = match (context.provider, context.entity) {
                (Some(provider), Some(id)) => provider.baseline(id, definition.id()),
                _ => definition.default_current_value(),
            };
            let nudge = holder_current
                .map(|current| current - definition.default_current_value())
                .unwrap_or(0.0);
            clamp(live + nudge)
        } else {
            clamp(holder_current.unwrap_or_else(|| definition.default_current_value()))
        };

        // stage 6
        let (current_permanent, current_final) = layer_stages(
            definition,
            key,
            [global.as_deref(), entity.as_deref()],
            Layer::Current,
            raw_current,
        );

        let result = AttributeComputation {
            raw_default,
            default_permanent,
            default_final,
            raw_current,
            current_permanent,
            current_final,
        };
        trace!(
            attribute = %definition.id(),
            entity = ?context.entity.map(EntityId::as_str),
            ?result,
            "computed attribute"
        );
        result
    }

    /// Apply a set of modifiers to `start`.
    ///
    /// Multipliers rejected by the definition's policy are dropped. The
    /// product of the rest scales `start`; each additive entry is then
    /// added, scaled by the product of those remaining multipliers it is
    /// eligible for. The result is clamped.
    pub fn apply(
        definition: &AttributeDefinition,
        cap_key: Option<&str>,
        start: f64,
        entries: &[&ModifierEntry],
    ) -> f64 {
        let policy = definition.multipliers();
        let mut additive: Vec<&ModifierEntry> = Vec::new();
        let mut multipliers: Vec<&ModifierEntry> = Vec::new();
        for &entry in entries {
            match entry.operation {
                ModifierOperation::Add => additive.push(entry),
                ModifierOperation::Multiply => {
                    if policy.can_apply(entry.key.as_str()) {
                        multipliers.push(entry);
                    }
                }
            }
        }

        let base_multiplier: f64 = multipliers.iter().map(|m| m.amount).product();
        let mut value = start * base_multiplier;
        for entry in &additive {
            let scale: f64 = multipliers
                .iter()
                .filter(|m| entry.multiplier_scope.allows(m.key.as_str()))
                .map(|m| m.amount)
                .product();
            value += entry.amount * scale;
        }
        definition.cap().clamp(value, cap_key)
    }
}

/// Permanent and final values of one layer.
///
/// The final stage applies permanent and temporary modifiers together to
/// the raw value, so temporary multipliers also scale permanent additives.
fn layer_stages(
    definition: &AttributeDefinition,
    cap_key: Option<&str>,
    scopes: [Option<&AttributeInstance>; 2],
    layer: Layer,
    raw: f64,
) -> (f64, f64) {
    let mut entries: Vec<&ModifierEntry> = Vec::new();
    gather(scopes, layer, Permanence::Permanent, &mut entries);
    let permanent = ComputationEngine::apply(definition, cap_key, raw, &entries);

    gather(scopes, layer, Permanence::Temporary, &mut entries);
    let final_value = ComputationEngine::apply(definition, cap_key, raw, &entries);

    (permanent, final_value)
}

fn gather<'a>(
    scopes: [Option<&'a AttributeInstance>; 2],
    layer: Layer,
    permanence: Permanence,
    out: &mut Vec<&'a ModifierEntry>,
) {
    for operation in [ModifierOperation::Add, ModifierOperation::Multiply] {
        let bucket = BucketKey::new(layer, permanence, operation);
        for instance in scopes.into_iter().flatten() {
            out.extend(instance.bucket_slice(bucket).iter());
        }
    }
}

fn synchronize_static_baseline(
    target: &mut AttributeInstance,
    default_final: f64,
    clamp: impl Fn(f64) -> f64,
) {
    let Some(last) = target.last_known_default_final() else {
        target.set_last_known_default_final(Some(default_final));
        return;
    };

    let delta = default_final - last;
    if delta.abs() > SYNC_EPSILON {
        let shifted = clamp(target.current_base_value() + delta);
        trace!(delta, shifted, "propagating default-final drift");
        target.set_current_base_value(shifted);
        target.set_last_known_default_final(Some(default_final));
    }
}
