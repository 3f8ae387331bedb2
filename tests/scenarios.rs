//! Crate-level checks for the named scenarios S1-S6, driven through the public `World`/`App`
//! API end to end rather than through a single module's internals.

use archetype_ecs::inspector;
use archetype_ecs::prelude::*;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Velocity {
    dx: f32,
    dy: f32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Frozen;

/// Wraps its single field, so a bare `{x, y}` payload fails direct construction but succeeds
/// once the inspector's compatibility shim wraps it as `{value: {x, y}}`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Wrapped {
    value: Position,
}

/// S1: adding a component to an entity promotes it from its current archetype to the archetype
/// whose signature is the union of the old signature and the new component, and it shows up in
/// queries for the new signature immediately.
#[test]
fn s1_signature_promotion() {
    let mut world = World::new();
    let e = world.create_entity_with((Position { x: 0.0, y: 0.0 },)).unwrap();

    let pos_id = world.registry().lookup_by_type::<Position>().unwrap();
    let vel_id = world.registry_mut().register::<Velocity>();

    let before = world.resolve_query(&Query::new().require(pos_id).require(vel_id));
    assert_eq!(before.iter().map(|&a| world.archetype_entities(a).len()).sum::<usize>(), 0);

    world.add_component(e, Velocity { dx: 1.0, dy: 1.0 }).unwrap();

    let after = world.resolve_query(&Query::new().require(pos_id).require(vel_id));
    let matched: Vec<_> = after.iter().flat_map(|&a| world.archetype_entities(a).to_vec()).collect();
    assert_eq!(matched, vec![e]);
}

/// S2: a query that excludes a marker component never matches an archetype that carries it, even
/// though the archetype still satisfies every `required` clause.
#[test]
fn s2_exclusion() {
    let mut world = World::new();
    let moving = world.create_entity_with((Position { x: 0.0, y: 0.0 },)).unwrap();
    let frozen = world
        .create_entity_with((Position { x: 1.0, y: 1.0 }, Frozen))
        .unwrap();

    let pos_id = world.registry().lookup_by_type::<Position>().unwrap();
    let frozen_id = world.registry().lookup_by_type::<Frozen>().unwrap();

    let query = Query::new().require(pos_id).exclude(frozen_id);
    let archetype_ids = world.resolve_query(&query);
    let matched: Vec<_> = archetype_ids
        .iter()
        .flat_map(|&a| world.archetype_entities(a).to_vec())
        .collect();

    assert!(matched.contains(&moving));
    assert!(!matched.contains(&frozen));
}

/// S3: destroying the middle of three co-located entities swap-removes its row, and a fresh
/// query still finds exactly the two survivors with their original component values intact.
#[test]
fn s3_destroy_swap_preserves_siblings() {
    let mut world = World::new();
    let first = world.create_entity_with((Position { x: 1.0, y: 1.0 },)).unwrap();
    let middle = world.create_entity_with((Position { x: 2.0, y: 2.0 },)).unwrap();
    let last = world.create_entity_with((Position { x: 3.0, y: 3.0 },)).unwrap();

    world.destroy_entity(middle).unwrap();

    let pos_id = world.registry().lookup_by_type::<Position>().unwrap();
    let archetype_ids = world.resolve_query(&Query::new().require(pos_id));
    let mut survivors: Vec<_> = archetype_ids
        .iter()
        .flat_map(|&a| world.archetype_entities(a).to_vec())
        .collect();
    survivors.sort_by_key(|e| format!("{e:?}"));
    let mut expected = vec![first, last];
    expected.sort_by_key(|e| format!("{e:?}"));

    assert_eq!(survivors, expected);
    assert_eq!(world.get_component::<Position>(first).unwrap().x, 1.0);
    assert_eq!(world.get_component::<Position>(last).unwrap().x, 3.0);
}

/// S4: once an entity is destroyed, any further operation against the stale handle — not just a
/// second `destroy_entity` — rejects it with `StaleEntity` rather than silently no-oping or
/// operating on whatever entity now occupies the freed slot.
#[test]
fn s4_stale_handle_rejected() {
    let mut world = World::new();
    let e = world.create_entity_with((Position { x: 5.0, y: 5.0 },)).unwrap();
    world.destroy_entity(e).unwrap();

    // A new entity may reuse the same slot index with a bumped generation; the old handle must
    // not be confused for it.
    let _reused_slot = world.create_entity_with((Position { x: 9.0, y: 9.0 },)).unwrap();

    assert!(matches!(world.get_component::<Position>(e), Err(EcsError::StaleEntity)));
    assert!(matches!(
        world.add_component(e, Velocity { dx: 0.0, dy: 0.0 }),
        Err(EcsError::StaleEntity)
    ));
}

/// S5: a dynamic component defined at runtime (no Rust type backing it) round-trips through
/// `set_dynamic`/`get_dynamic` with its field map intact, and survives a save/load cycle.
#[test]
fn s5_dynamic_component_round_trip() {
    let mut world = World::new();
    let type_id = world.registry_mut().define_dynamic("Inventory", serde_json::Map::new()).unwrap();
    let e = world.create_entity().unwrap();
    let mut fields = serde_json::Map::new();
    fields.insert("gold".to_string(), serde_json::Value::from(100));
    world.set_dynamic(e, type_id, fields).unwrap();

    assert_eq!(
        world.get_dynamic(e, type_id).unwrap().get("gold"),
        Some(&serde_json::Value::from(100))
    );

    let doc = archetype_ecs::serialization::save_world(&world).unwrap();
    let restored = archetype_ecs::serialization::load_world(&doc).unwrap();
    let restored_entity = restored.entities().next().unwrap();
    let restored_type_id = restored.registry().lookup_by_name("Inventory").unwrap();
    assert_eq!(
        restored.get_dynamic(restored_entity, restored_type_id).unwrap().get("gold"),
        Some(&serde_json::Value::from(100))
    );
}

/// S6: the inspector's `set_component_by_name` accepts a bare payload for a single-field wrapper
/// type by retrying construction with the payload wrapped as `{value: payload}`.
#[test]
fn s6_compatibility_shim() {
    let mut app = App::new();
    app.world.registry_mut().register_reflectable::<Wrapped>();
    let e = inspector::create_entity(&mut app).unwrap();

    let bare_payload = serde_json::json!({ "x": 1.0, "y": 2.0 });
    inspector::set_component_by_name(&mut app, e, "Wrapped", bare_payload).unwrap();

    let type_id = app.world.registry().lookup_by_type::<Wrapped>().unwrap();
    let described = app.world.describe_component(e, type_id).unwrap().unwrap();
    assert_eq!(described["value"]["x"], serde_json::json!(1.0));
    assert_eq!(described["value"]["y"], serde_json::json!(2.0));
}
