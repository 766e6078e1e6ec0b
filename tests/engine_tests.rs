use attrstat::*;
use std::sync::Arc;

fn approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

fn strength_registry() -> AttributeRegistry {
    let registry = AttributeRegistry::new();
    registry.register_definition(
        AttributeDefinition::builder("strength")
            .default_base(20.0)
            .cap(CapConfig::new(0.0, 1000.0).unwrap())
            .build(),
    );
    registry
}

/// Global and scoped modifiers on both layers, with drift carried into the
/// current baseline.
#[test]
fn test_layered_scenario() {
    let registry = strength_registry();
    let hero = EntityId::new("hero");
    let strength = AttributeId::new("strength");

    registry.get_or_create_entity_instance(&hero, &strength).unwrap();
    let seeded = registry.compute(&strength, Some(&hero));
    assert_eq!(seeded.default_final, 20.0);
    assert_eq!(seeded.current_final, 20.0);

    // Global: default layer only
    registry
        .set_global_modifier(
            &strength,
            ModifierEntry::add("training.base", 4.0).unwrap().default_layer_only(),
        )
        .unwrap();
    registry
        .set_global_modifier(
            &strength,
            ModifierEntry::multiply("aura.blessing", 1.1)
                .unwrap()
                .temporary()
                .default_layer_only(),
        )
        .unwrap();

    // Entity: current layer only
    let scoped = [
        ModifierEntry::add("gear.gloves", 2.0).unwrap(),
        ModifierEntry::add("potions.might", 3.0).unwrap().temporary(),
        ModifierEntry::multiply("class.brute", 1.05).unwrap(),
        ModifierEntry::multiply("potions.rage", 1.2).unwrap().temporary(),
    ];
    for entry in scoped {
        registry
            .set_entity_modifier(&hero, &strength, entry.current_layer_only())
            .unwrap();
    }

    let result = registry.compute(&strength, Some(&hero));
    approx(result.raw_default, 20.0);
    approx(result.default_permanent, 24.0);
    approx(result.default_final, 26.4);
    approx(result.raw_current, 26.4);
    approx(result.current_permanent, 29.82);
    approx(result.current_final, 39.564);

    // Drift is applied once; recomputing is stable.
    let again = registry.compute(&strength, Some(&hero));
    assert_eq!(again, result);
    let instance = registry.entity_instance(&hero, &strength).unwrap();
    approx(instance.read().current_base_value(), 26.4);

    // The global view never saw the entity's drift.
    let global = registry.global_instance(&strength).unwrap();
    assert_eq!(global.read().current_base_value(), 20.0);
}

#[test]
fn test_cap_override_is_presentation_only() {
    let registry = AttributeRegistry::new();
    registry.register_definition(
        AttributeDefinition::builder("armor")
            .default_base(10.0)
            .cap(CapConfig::new(0.0, 100.0).unwrap().with_override_max("hero", 5.0))
            .build(),
    );
    let hero = EntityId::new("hero");
    let armor = AttributeId::new("armor");
    registry.set_entity_current_base(&hero, &armor, 12.0).unwrap();

    let result = registry.compute(&armor, Some(&hero));
    assert_eq!(result.default_final, 5.0);
    assert_eq!(result.current_final, 5.0);

    let instance = registry.entity_instance(&hero, &armor).unwrap();
    assert_eq!(instance.read().current_base_value(), 12.0);

    // Other entities use the global maximum.
    let rogue = EntityId::new("rogue");
    assert_eq!(registry.compute(&armor, Some(&rogue)).current_final, 10.0);
}

#[test]
fn test_spent_value_keeps_offset_through_drift() {
    let registry = strength_registry();
    let hero = EntityId::new("hero");
    let strength = AttributeId::new("strength");

    registry.compute(&strength, Some(&hero));
    registry.get_or_create_entity_instance(&hero, &strength).unwrap();
    registry.compute(&strength, Some(&hero));
    // Spend 5 of the live value.
    registry.set_entity_current_base(&hero, &strength, 15.0).unwrap();

    registry
        .set_entity_modifier(
            &hero,
            &strength,
            ModifierEntry::add("level.up", 10.0).unwrap().default_layer_only(),
        )
        .unwrap();
    let result = registry.compute(&strength, Some(&hero));

    assert_eq!(result.default_final, 30.0);
    assert_eq!(result.current_final, 25.0);
}

#[test]
fn test_removal_restores_previous_result() {
    let registry = strength_registry();
    let hero = EntityId::new("hero");
    let strength = AttributeId::new("strength");

    let before = registry.compute(&strength, Some(&hero));
    registry
        .set_entity_modifier(
            &hero,
            &strength,
            ModifierEntry::multiply("potions.rage", 1.5).unwrap().current_layer_only(),
        )
        .unwrap();
    assert_eq!(registry.compute(&strength, Some(&hero)).current_final, 30.0);

    registry
        .remove_entity_modifier(&hero, &strength, "Potions.Rage")
        .unwrap()
        .expect("modifier was present");
    assert_eq!(registry.compute(&strength, Some(&hero)), before);
}

#[test]
fn test_replacing_a_key_does_not_stack() {
    let registry = strength_registry();
    let strength = AttributeId::new("strength");

    for amount in [5.0, 7.0, 3.0] {
        registry
            .set_global_modifier(&strength, ModifierEntry::add("gear.belt", amount).unwrap())
            .unwrap();
    }
    assert_eq!(registry.compute(&strength, None).default_final, 23.0);
}

#[test]
fn test_global_modifier_reaches_every_entity() {
    let registry = strength_registry();
    let strength = AttributeId::new("strength");
    let hero = EntityId::new("hero");
    let rogue = EntityId::new("rogue");
    registry
        .set_entity_modifier(&hero, &strength, ModifierEntry::add("gear.belt", 1.0).unwrap().current_layer_only())
        .unwrap();

    registry
        .set_global_modifier(&strength, ModifierEntry::add("event.festival", 5.0).unwrap().current_layer_only())
        .unwrap();

    assert_eq!(registry.compute(&strength, Some(&hero)).current_final, 26.0);
    assert_eq!(registry.compute(&strength, Some(&rogue)).current_final, 25.0);
    assert_eq!(registry.compute(&strength, None).current_final, 25.0);
}

#[test]
fn test_explicit_multiplier_keys() {
    let registry = strength_registry();
    let strength = AttributeId::new("strength");
    let hero = EntityId::new("hero");

    let entries = [
        ModifierEntry::multiply("class.brute", 2.0).unwrap(),
        ModifierEntry::multiply("potions.rage", 3.0).unwrap(),
        ModifierEntry::add("gear.ring", 1.0).unwrap().scaled_by(["potions.rage"]),
        ModifierEntry::add("gear.charm", 1.0).unwrap().scaled_by(Vec::<&str>::new()),
    ];
    for entry in entries {
        registry
            .set_entity_modifier(&hero, &strength, entry.current_layer_only())
            .unwrap();
    }

    // 20 * 6 + 1 * 3 + 1 * 1
    assert_eq!(registry.compute(&strength, Some(&hero)).current_final, 124.0);
}

#[test]
fn test_multiplier_policy_allow_list() {
    let registry = AttributeRegistry::new();
    registry.register_definition(
        AttributeDefinition::builder("crit")
            .default_base(10.0)
            .multipliers(MultiplierApplicability::allow_only(["class.assassin"]))
            .build(),
    );
    let crit = AttributeId::new("crit");
    registry
        .set_global_modifier(&crit, ModifierEntry::multiply("class.assassin", 2.0).unwrap())
        .unwrap();
    registry
        .set_global_modifier(&crit, ModifierEntry::multiply("potions.luck", 5.0).unwrap())
        .unwrap();

    assert_eq!(registry.compute(&crit, None).default_final, 20.0);
}

#[test]
fn test_dynamic_attribute_uses_provider() {
    let registry = AttributeRegistry::new();
    registry.register_definition(
        AttributeDefinition::builder("speed")
            .dynamic()
            .default_base(0.1)
            .cap(CapConfig::new(0.0, 1.0).unwrap())
            .build(),
    );
    let speed = AttributeId::new("speed");
    let hero = EntityId::new("hero");

    let mut table = MapBaseline::with_fallback(0.1);
    table.insert(hero.clone(), 0.25);
    registry.register_baseline_provider(speed.clone(), Arc::new(table));

    // Default-layer changes do not touch the live value.
    registry
        .set_entity_modifier(&hero, &speed, ModifierEntry::add("gear.boots", 0.5).unwrap().default_layer_only())
        .unwrap();
    let result = registry.compute(&speed, Some(&hero));
    approx(result.default_final, 0.6);
    approx(result.raw_current, 0.25);

    // Manual nudge on top of the live value.
    registry.set_entity_current_base(&hero, &speed, 0.15).unwrap();
    approx(registry.compute(&speed, Some(&hero)).raw_current, 0.30);

    let instance = registry.entity_instance(&hero, &speed).unwrap();
    assert_eq!(instance.read().last_known_default_final(), None);
    approx(instance.read().current_base_value(), 0.15);
}

#[test]
fn test_unknown_attribute_reads_zero() {
    let registry = AttributeRegistry::new();
    let hero = EntityId::new("hero");
    assert_eq!(
        registry.compute(&AttributeId::new("ghost"), Some(&hero)),
        AttributeComputation::zero()
    );
}

#[test]
fn test_engine_without_registry() {
    let definition = AttributeDefinition::builder("focus")
        .default_base(50.0)
        .build();
    let mut global = AttributeInstance::from_definition(&definition);
    let mut scoped = AttributeInstance::from_definition(&definition);
    scoped.add_modifier(ModifierEntry::multiply("potions.calm", 2.0).unwrap().temporary());
    let entity = EntityId::new("mage");

    let engine = ComputationEngine::new();
    let result = engine.compute(
        &definition,
        Some(&mut global),
        Some(&mut scoped),
        ComputeContext::for_entity(&entity),
    );

    assert_eq!(result.default_permanent, 50.0);
    assert_eq!(result.default_final, 100.0);
    assert_eq!(scoped.last_known_default_final(), Some(100.0));
    assert_eq!(scoped.cap_override_key(), Some("mage"));
}

#[test]
fn test_dynamic_ignores_global_current_base() {
    let registry = AttributeRegistry::new();
    registry.register_definition(
        AttributeDefinition::builder("speed")
            .dynamic()
            .default_base(0.1)
            .build(),
    );
    let speed = AttributeId::new("speed");
    let hero = EntityId::new("hero");
    registry.register_baseline_provider(speed.clone(), Arc::new(ConstantBaseline(0.2)));
    registry.get_or_create_entity_instance(&hero, &speed).unwrap();

    let before = registry.compute(&speed, Some(&hero)).raw_current;
    registry.set_global_base(&speed, 0.1, 0.9).unwrap();
    let after = registry.compute(&speed, Some(&hero)).raw_current;

    assert_eq!(before, after);
    approx(after, 0.2);
}

/// A global default-layer change shifts every initialized entity once.
#[test]
fn test_global_drift_reaches_each_entity() {
    let registry = strength_registry();
    let strength = AttributeId::new("strength");
    let entities = [EntityId::new("a"), EntityId::new("b")];

    for (offset, entity) in entities.iter().enumerate() {
        registry.get_or_create_entity_instance(entity, &strength).unwrap();
        registry.compute(&strength, Some(entity));
        registry
            .set_entity_current_base(entity, &strength, 10.0 + offset as f64)
            .unwrap();
    }

    registry
        .set_global_modifier(&strength, ModifierEntry::add("season.winter", 3.0).unwrap().default_layer_only())
        .unwrap();

    for _ in 0..3 {
        for (offset, entity) in entities.iter().enumerate() {
            let result = registry.compute(&strength, Some(entity));
            assert_eq!(result.default_final, 23.0);
            assert_eq!(result.current_final, 13.0 + offset as f64);
        }
    }
}
