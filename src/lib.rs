//! # attrstat - Layered, Scope-Aware Attribute Engine
//!
//! Computes numeric entity attributes (strength, armor, speed, ...) from a
//! definition, a global instance and an optional per-entity instance:
//! - **Two layers**: a *default* layer (the reference value) and a
//!   *current* layer (the live value)
//! - **Two scopes**: global modifiers reach every entity, scoped ones a
//!   single entity
//! - **Named modifiers**: every modifier has a namespaced
//!   `<owner>.<name>` key, and re-adding a key replaces it
//! - **Caps**: global min/max plus per-key maximum overrides
//!
//! ## Core Concepts
//!
//! ### Stage Pipeline
//!
//! ```text
//! raw_default → default_permanent → default_final
//!                                        │ (drift sync)
//! raw_current → current_permanent → current_final
//! ```
//!
//! Each layer applies its permanent modifiers, then permanent and temporary
//! modifiers together. For non-dynamic attributes a change in the default
//! final value is carried over into the current baseline, so a live value
//! that has been spent (damage, resource use) keeps its offset.
//!
//! Dynamic attributes take their current raw value from a
//! [`BaselineProvider`] instead.
//!
//! ## Example
//!
//! ```rust
//! use attrstat::*;
//!
//! let registry = AttributeRegistry::new();
//! registry.register_definition(
//!     AttributeDefinition::builder("strength")
//!         .default_base(20.0)
//!         .cap(CapConfig::new(0.0, 100.0).unwrap())
//!         .build(),
//! );
//!
//! let hero = EntityId::new("hero");
//! let strength = AttributeId::new("strength");
//!
//! registry
//!     .set_entity_modifier(&hero, &strength, ModifierEntry::add("gear.belt", 4.0).unwrap())
//!     .unwrap();
//! registry
//!     .set_entity_modifier(
//!         &hero,
//!         &strength,
//!         ModifierEntry::multiply("potions.might", 1.5).unwrap().temporary(),
//!     )
//!     .unwrap();
//!
//! let result = registry.compute(&strength, Some(&hero));
//! assert_eq!(result.default_permanent, 24.0); // 20 + 4
//! assert_eq!(result.default_final, 36.0); // (20 + 4) * 1.5
//! ```
//!
//! ## Modules
//!
//! - [`ids`] - Attribute, entity and modifier identifiers
//! - [`cap`] - Value caps
//! - [`multiplier`] - Multiplier applicability policy
//! - [`modifier`] - Modifier entries
//! - [`definition`] - Attribute definitions and their JSON config
//! - [`instance`] - Per-scope mutable state
//! - [`provider`] - External baselines for dynamic attributes
//! - [`engine`] - The six-stage computation
//! - [`computation`] - Computation results
//! - [`refresh`] - Change notifications
//! - [`registry`] - The session registry
//! - [`persistence`] - Per-entity save and load
//! - [`error`] - Error types

pub mod cap;
pub mod computation;
pub mod definition;
pub mod engine;
pub mod error;
pub mod ids;
pub mod instance;
pub mod modifier;
pub mod multiplier;
pub mod persistence;
pub mod provider;
pub mod refresh;
pub mod registry;

// Re-export main types for convenience
pub use computation::AttributeComputation;
pub use engine::{ComputationEngine, ComputeContext, SYNC_EPSILON};
pub use error::AttributeError;
pub use ids::{AttributeId, EntityId, ModifierKey};
pub use registry::{AttributeRegistry, SharedInstance};

pub use cap::CapConfig;
pub use definition::{
    AttributeDefinition, AttributeDefinitionBuilder, DefinitionConfig, MultiplierConfig,
    MultiplierMode,
};
pub use instance::{AttributeInstance, BucketKey};
pub use modifier::{Layer, ModifierEntry, ModifierOperation, MultiplierScope, Permanence};
pub use multiplier::MultiplierApplicability;

pub use persistence::{EntityDocument, PersistedAttribute, PersistedModifier, RestoreReport};
pub use provider::{BaselineProvider, ConstantBaseline, MapBaseline};
pub use refresh::{RecordingRefresh, RefreshEvent, RefreshListener};
