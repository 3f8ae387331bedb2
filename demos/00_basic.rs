//! Spawning entities, attaching components and running a query over them.

use archetype_ecs::prelude::*;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Velocity {
    x: f32,
    y: f32,
}

fn main() -> Result<()> {
    let mut world = World::new();

    for i in 0..10 {
        world.create_entity_with((
            Position { x: i as f32, y: 0.0 },
            Velocity { x: 0.1, y: 0.0 },
        ))?;
    }
    println!("spawned {} entities", world.entity_count());

    let position_id = world.registry().lookup_by_type::<Position>().unwrap();
    let velocity_id = world.registry().lookup_by_type::<Velocity>().unwrap();
    let query = Query::new().require(position_id).require(velocity_id);
    let archetypes = world.resolve_query(&query);

    let mut moved = 0;
    world.for_each_mut(&query, &archetypes, position_id, |_entity, component| {
        let pos = component.as_any_mut().downcast_mut::<Position>().unwrap();
        pos.x += 1.0;
        moved += 1;
    });
    println!("advanced {moved} positions");

    Ok(())
}
