//! Crate-level checks for the quantified invariants P1-P9, driven entirely through the public
//! `World`/`App` API rather than the colocated `#[cfg(test)]` unit tests, which exercise the
//! same invariants from inside individual modules.

use archetype_ecs::prelude::*;
use archetype_ecs::serialization;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct Marker;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct Frozen;

/// P1: for every archetype and every row, the entity at that row reports exactly the component
/// values it was given, including after churn that swap-removes rows out from under it.
#[test]
fn p1_archetype_rows_stay_consistent_after_churn() {
    let mut world = World::new();
    let mut entities = Vec::new();
    for i in 0..5 {
        let e = world
            .create_entity_with((Position {
                x: i as f32,
                y: 0.0,
                z: 0.0,
            },))
            .unwrap();
        entities.push(e);
    }
    // Destroy every other entity, forcing repeated swap-removes inside the same archetype.
    world.destroy_entity(entities[1]).unwrap();
    world.destroy_entity(entities[3]).unwrap();

    for (i, &e) in entities.iter().enumerate() {
        if i == 1 || i == 3 {
            assert!(!world.is_alive(e));
        } else {
            assert_eq!(world.get_component::<Position>(e).unwrap().x, i as f32);
        }
    }
}

/// P2: every live entity shows up in exactly one matching archetype for a query over its own
/// component set.
#[test]
fn p2_every_live_entity_appears_in_exactly_one_matching_archetype() {
    let mut world = World::new();
    let a = world.create_entity_with((Position { x: 0.0, y: 0.0, z: 0.0 },)).unwrap();
    let b = world
        .create_entity_with((Position { x: 1.0, y: 0.0, z: 0.0 }, Marker))
        .unwrap();

    let pos_id = world.registry().lookup_by_type::<Position>().unwrap();
    let query = Query::new().require(pos_id);
    let archetype_ids = world.resolve_query(&query);

    let mut seen = Vec::new();
    for &archetype_id in &archetype_ids {
        for &entity in world.archetype_entities(archetype_id) {
            seen.push(entity);
        }
    }
    seen.sort_by_key(|e| format!("{e:?}"));
    let mut expected = vec![a, b];
    expected.sort_by_key(|e| format!("{e:?}"));
    assert_eq!(seen, expected);
}

/// P3: an entity carries a component type iff that type is a member of its archetype's
/// signature, as observed through `has_component`/`get_component`.
#[test]
fn p3_signature_fidelity_matches_has_component() {
    let mut world = World::new();
    let e = world.create_entity().unwrap();
    assert!(!world.has_component::<Position>(e).unwrap());
    world.add_component(e, Position { x: 1.0, y: 2.0, z: 3.0 }).unwrap();
    assert!(world.has_component::<Position>(e).unwrap());
    world.remove_component::<Position>(e).unwrap();
    assert!(!world.has_component::<Position>(e).unwrap());
}

/// P4: once destroyed, an entity handle never resolves again, no matter what else happens to
/// the world afterward.
#[test]
fn p4_generation_safety_after_destroy() {
    let mut world = World::new();
    let e = world.create_entity().unwrap();
    world.destroy_entity(e).unwrap();

    // Unrelated churn afterward must not resurrect the old handle.
    let _other = world.create_entity().unwrap();
    world.create_entity_with((Position { x: 0.0, y: 0.0, z: 0.0 },)).unwrap();

    assert!(!world.is_alive(e));
    assert!(matches!(world.get_component::<Position>(e), Err(EcsError::StaleEntity)));
    assert!(matches!(world.destroy_entity(e), Err(EcsError::StaleEntity)));
}

/// P5: an archetype appears in a query's result iff its signature is a superset of `required`
/// and disjoint from `excluded`.
#[test]
fn p5_query_correctness_matches_signature_rules() {
    let mut world = World::new();
    world.create_entity_with((Position { x: 0.0, y: 0.0, z: 0.0 },)).unwrap();
    world
        .create_entity_with((Position { x: 1.0, y: 0.0, z: 0.0 }, Frozen))
        .unwrap();

    let pos_id = world.registry().lookup_by_type::<Position>().unwrap();
    let frozen_id = world.registry().lookup_by_type::<Frozen>().unwrap();

    let unfiltered = world.resolve_query(&Query::new().require(pos_id));
    let total: usize = unfiltered.iter().map(|&a| world.archetype_entities(a).len()).sum();
    assert_eq!(total, 2);

    let excluding_frozen = world.resolve_query(&Query::new().require(pos_id).exclude(frozen_id));
    let filtered: usize = excluding_frozen
        .iter()
        .map(|&a| world.archetype_entities(a).len())
        .sum();
    assert_eq!(filtered, 1);
}

/// P6: round-tripping through the neutral document preserves every entity's component values
/// (as a dynamic component, since `load_world` builds a fresh registry) and every relationship
/// edge with its attributes.
#[test]
fn p6_round_trip_preserves_components_and_edges() {
    let mut world = World::new();
    let a = world.create_entity_with((Position { x: 1.0, y: 2.0, z: 3.0 },)).unwrap();
    let b = world.create_entity().unwrap();
    let mut attrs = serde_json::Map::new();
    attrs.insert("label".to_string(), serde_json::Value::from("linked"));
    world.relationships_mut().add_undirected(a, b, attrs).unwrap();

    let doc = serialization::save_world(&world).unwrap();
    let restored = serialization::load_world(&doc).unwrap();

    assert_eq!(restored.entity_count(), 2);
    let position_id = restored.registry().lookup_by_name("Position").unwrap();
    let restored_entities: Vec<_> = restored.entities().collect();
    let with_position = restored_entities
        .iter()
        .find(|&&e| restored.has_component_dynamic(e, position_id))
        .copied()
        .unwrap();
    let dynamic = restored.get_dynamic(with_position, position_id).unwrap();
    assert_eq!(dynamic.get("x"), Some(&serde_json::Value::from(1.0)));
    assert_eq!(restored.relationships().neighbors(with_position).len(), 1);
}

/// P7: adding the same component type twice with the same value is equivalent to a single add
/// — no duplicate row, no archetype churn.
#[test]
fn p7_idempotent_add_overwrites_not_duplicates() {
    let mut world = World::new();
    let e = world.create_entity().unwrap();
    world.add_component(e, Position { x: 1.0, y: 2.0, z: 3.0 }).unwrap();
    let archetype_before = world.archetype_count();
    world.add_component(e, Position { x: 1.0, y: 2.0, z: 3.0 }).unwrap();
    assert_eq!(world.archetype_count(), archetype_before);
    assert_eq!(world.get_component::<Position>(e).unwrap().x, 1.0);
}

/// P8: destroying (or otherwise swap-removing) a row updates the moved entity's row index and
/// leaves every other surviving entity's row untouched.
#[test]
fn p8_swap_remove_preserves_siblings() {
    let mut world = World::new();
    let e1 = world.create_entity_with((Marker,)).unwrap();
    let e2 = world.create_entity_with((Marker,)).unwrap();
    let e3 = world.create_entity_with((Marker,)).unwrap();

    world.destroy_entity(e2).unwrap();

    assert!(!world.is_alive(e2));
    assert!(world.is_alive(e1));
    assert!(world.is_alive(e3));
    assert!(world.has_component::<Marker>(e1).unwrap());
    assert!(world.has_component::<Marker>(e3).unwrap());
}

/// P9: destroying an entity removes every relationship edge that touched it.
#[test]
fn p9_destroy_detaches_graph_edges() {
    let mut world = World::new();
    let a = world.create_entity().unwrap();
    let b = world.create_entity().unwrap();
    let c = world.create_entity().unwrap();
    world.relationships_mut().add_undirected(a, b, serde_json::Map::new()).unwrap();
    world.relationships_mut().add_directed(a, c, serde_json::Map::new()).unwrap();

    world.destroy_entity(a).unwrap();

    assert!(world.relationships().neighbors(b).is_empty());
    assert!(world.relationships().neighbors(c).is_empty());
    assert_eq!(world.relationships().edge_count(), 0);
}
