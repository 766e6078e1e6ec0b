use attrstat::persistence;
use attrstat::*;
use std::sync::Arc;
use std::thread;

fn armor_definition(base: f64) -> AttributeDefinition {
    AttributeDefinition::builder("armor")
        .default_base(base)
        .cap(CapConfig::new(0.0, 500.0).unwrap())
        .build()
}

#[test]
fn test_unknown_attribute_write_paths() {
    let registry = AttributeRegistry::new();
    let hero = EntityId::new("hero");
    let ghost = AttributeId::new("ghost");

    assert!(matches!(
        registry.global_instance(&ghost),
        Err(AttributeError::UnknownAttribute(_))
    ));
    assert!(registry.set_entity_current_base(&hero, &ghost, 1.0).is_err());
    assert!(registry.remove_entity_modifier(&hero, &ghost, "a.b").is_err());
    assert!(registry.purge_global_temporary_modifiers(&ghost).is_err());
    assert!(registry.entities().is_empty());
}

#[test]
fn test_malformed_key_changes_nothing() {
    let registry = AttributeRegistry::new();
    registry.register_definition(armor_definition(5.0));
    let hero = EntityId::new("hero");
    let armor = AttributeId::new("armor");
    let recorder = Arc::new(RecordingRefresh::new());
    registry.add_refresh_listener(recorder.clone());

    for bad in ["", "nodot", ".name", "owner.", "own er.name", "owner.na!me"] {
        assert!(
            matches!(
                registry.remove_entity_modifier(&hero, &armor, bad),
                Err(AttributeError::InvalidModifierKey(_))
            ),
            "{bad:?} should be rejected"
        );
        assert!(ModifierEntry::add(bad, 1.0).is_err());
    }
    assert!(recorder.is_empty());
    assert!(registry.entities().is_empty());
}

#[test]
fn test_definition_from_config_json() {
    let json = r#"{
        "id": "Health",
        "default-base": 100.0,
        "min": 0.0,
        "max": 1000.0,
        "override-max": { "boss": 5000.0 },
        "multipliers": { "mode": "ignore-list", "keys": ["curse.weakness"] }
    }"#;
    let registry = AttributeRegistry::new();
    registry.register_definition(AttributeDefinition::from_json(json).unwrap());
    let health = AttributeId::new("health");
    let boss = EntityId::new("boss");

    registry
        .set_global_modifier(&health, ModifierEntry::multiply("curse.weakness", 0.5).unwrap())
        .unwrap();
    registry
        .set_global_modifier(&health, ModifierEntry::add("gear.plate", 9900.0).unwrap())
        .unwrap();

    assert_eq!(registry.compute(&health, None).default_final, 1000.0);
    // The override applies once the boss has its own instance.
    registry.get_or_create_entity_instance(&boss, &health).unwrap();
    assert_eq!(registry.compute(&health, Some(&boss)).default_final, 5000.0);
}

#[test]
fn test_reload_notifies_and_follows_default() {
    let registry = AttributeRegistry::new();
    registry.register_definition(armor_definition(5.0));
    let recorder = Arc::new(RecordingRefresh::new());
    registry.add_refresh_listener(recorder.clone());
    let armor = AttributeId::new("armor");

    registry.compute(&armor, None);
    registry.register_definition(armor_definition(9.0));

    assert_eq!(recorder.drain(), vec![RefreshEvent::All(armor.clone())]);
    // The raised default flows through drift into the live value.
    let result = registry.compute(&armor, None);
    assert_eq!(result.default_final, 9.0);
    assert_eq!(result.current_final, 9.0);
}

#[test]
fn test_purge_temporary_keeps_permanent() {
    let registry = AttributeRegistry::new();
    registry.register_definition(armor_definition(5.0));
    let hero = EntityId::new("hero");
    let armor = AttributeId::new("armor");

    registry
        .set_entity_modifier(&hero, &armor, ModifierEntry::add("gear.plate", 10.0).unwrap().current_layer_only())
        .unwrap();
    registry
        .set_entity_modifier(
            &hero,
            &armor,
            ModifierEntry::multiply("spell.stoneskin", 2.0).unwrap().temporary().current_layer_only(),
        )
        .unwrap();
    assert_eq!(registry.compute(&armor, Some(&hero)).current_final, 30.0);

    assert_eq!(registry.purge_temporary_modifiers(&hero), 1);
    assert_eq!(registry.compute(&armor, Some(&hero)).current_final, 15.0);
}

#[test]
fn test_concurrent_mutation_from_many_threads() {
    let registry = Arc::new(AttributeRegistry::new());
    registry.register_definition(armor_definition(5.0));
    let armor = AttributeId::new("armor");

    thread::scope(|scope| {
        for worker in 0..8 {
            let registry = Arc::clone(&registry);
            let armor = armor.clone();
            scope.spawn(move || {
                let entity = EntityId::new(&format!("npc-{worker}"));
                for step in 0..50 {
                    let key = format!("worker{worker}.buff-{}", step % 5);
                    registry
                        .set_entity_modifier(&entity, &armor, ModifierEntry::add(&key, 1.0).unwrap().current_layer_only())
                        .unwrap();
                    registry
                        .set_global_modifier(&armor, ModifierEntry::add("aura.shared", 0.0).unwrap())
                        .unwrap();
                    registry.compute(&armor, Some(&entity));
                }
            });
        }
    });

    assert_eq!(registry.entities().len(), 8);
    for worker in 0..8 {
        let entity = EntityId::new(&format!("npc-{worker}"));
        // Five distinct keys per worker, each replaced rather than stacked.
        assert_eq!(registry.compute(&armor, Some(&entity)).current_final, 10.0);
    }
}

#[test]
fn test_persistence_json_round_trip() {
    let registry = AttributeRegistry::new();
    registry.register_definition(armor_definition(5.0));
    registry.register_definition(AttributeDefinition::builder("speed").dynamic().default_base(1.0).build());
    let hero = EntityId::new("hero");
    let armor = AttributeId::new("armor");

    registry.get_or_create_entity_instance(&hero, &armor).unwrap();
    registry.compute(&armor, Some(&hero));
    registry
        .set_entity_modifier(&hero, &armor, ModifierEntry::add("gear.plate", 4.0).unwrap().default_layer_only())
        .unwrap();
    registry
        .set_entity_modifier(
            &hero,
            &armor,
            ModifierEntry::multiply("spell.ward", 1.5)
                .unwrap()
                .temporary()
                .current_layer_only(),
        )
        .unwrap();
    let before = registry.compute(&armor, Some(&hero));

    let json = persistence::to_json(&registry.snapshot_entity(&hero)).unwrap();
    assert!(json.contains("\"default-final-baseline\""));
    assert!(json.contains("\"gear.plate\""));

    let fresh = AttributeRegistry::new();
    fresh.register_definition(armor_definition(5.0));
    let report = fresh.restore_entity(&hero, &persistence::from_json(&json).unwrap());
    assert_eq!(report.restored, vec![armor.clone()]);

    assert_eq!(fresh.compute(&armor, Some(&hero)), before);
}

#[test]
fn test_restore_skips_unknown_and_bad_entries() {
    let json = r#"{
        "armor": {
            "default-base": 5.0,
            "current-base": 5.0,
            "modifiers": {
                "gear.plate": { "operation": "ADD", "amount": 2.0 },
                "nodot": { "operation": "ADD", "amount": 2.0 },
                "gear.cursed": { "operation": "DIVIDE", "amount": 2.0 }
            }
        },
        "mana": { "default-base": 1.0, "current-base": 1.0 }
    }"#;
    let registry = AttributeRegistry::new();
    registry.register_definition(armor_definition(5.0));
    let hero = EntityId::new("hero");

    let report = registry.restore_entity(&hero, &persistence::from_json(json).unwrap());
    assert_eq!(report.restored, vec![AttributeId::new("armor")]);
    assert_eq!(report.skipped_attributes, vec![AttributeId::new("mana")]);
    assert_eq!(report.skipped_modifiers, vec!["gear.cursed".to_string(), "nodot".to_string()]);

    assert_eq!(registry.compute(&AttributeId::new("armor"), Some(&hero)).current_final, 7.0);
}
