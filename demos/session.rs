//! A short hosting session: register attributes, equip and buff an entity,
//! take damage, level up, save and reload.
//!
//! Run with: `RUST_LOG=attrstat=debug cargo run --example session`

use attrstat::persistence;
use attrstat::*;
use std::sync::Arc;

fn print(label: &str, result: &AttributeComputation) {
    println!(
        "{label:<28} default {:>7.2} -> {:>7.2}   current {:>7.2} -> {:>7.2}",
        result.raw_default, result.default_final, result.raw_current, result.current_final
    );
}

fn main() -> Result<(), AttributeError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let registry = AttributeRegistry::new();
    let recorder = Arc::new(RecordingRefresh::new());
    registry.add_refresh_listener(recorder.clone());

    registry.register_definition(AttributeDefinition::from_json(
        r#"{ "id": "health", "default-base": 100.0, "min": 0.0, "max": 500.0 }"#,
    )?);
    registry.register_definition(
        AttributeDefinition::builder("speed")
            .dynamic()
            .default_base(0.1)
            .cap(CapConfig::new(0.0, 1.0)?)
            .build(),
    );
    registry.register_baseline_provider(AttributeId::new("speed"), Arc::new(ConstantBaseline(0.12)));

    let hero = EntityId::new("hero");
    let health = AttributeId::new("health");
    let speed = AttributeId::new("speed");

    registry.get_or_create_entity_instance(&hero, &health)?;
    print("spawned", &registry.compute(&health, Some(&hero)));

    registry.set_entity_modifier(&hero, &health, ModifierEntry::add("gear.chestplate", 40.0)?)?;
    registry.set_entity_modifier(
        &hero,
        &health,
        ModifierEntry::multiply("potions.vigor", 1.25)?.temporary(),
    )?;
    print("equipped and buffed", &registry.compute(&health, Some(&hero)));

    let live = registry.compute(&health, Some(&hero)).current_final;
    let instance = registry.get_or_create_entity_instance(&hero, &health)?;
    let spent = instance.read().current_base_value() - 30.0;
    registry.set_entity_current_base(&hero, &health, spent)?;
    println!("took 30 damage (was {live:.2})");
    print("after damage", &registry.compute(&health, Some(&hero)));

    registry.set_global_modifier(
        &health,
        ModifierEntry::add("world.blessing", 10.0)?.default_layer_only(),
    )?;
    print("world blessing", &registry.compute(&health, Some(&hero)));

    registry.set_entity_modifier(&hero, &speed, ModifierEntry::multiply("potions.haste", 1.5)?.temporary())?;
    print("speed with haste", &registry.compute(&speed, Some(&hero)));

    let saved = persistence::to_json(&registry.snapshot_entity(&hero))?;
    registry.purge_temporary_modifiers(&hero);
    print("buffs expired", &registry.compute(&health, Some(&hero)));

    registry.purge_entity(&hero);
    let report = registry.restore_entity(&hero, &persistence::from_json(&saved)?);
    println!("restored {} attributes", report.restored.len());
    print("reloaded", &registry.compute(&health, Some(&hero)));

    println!("{} refresh notifications delivered", recorder.len());
    Ok(())
}
