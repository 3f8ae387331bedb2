//! Round-tripping a world through the neutral JSON document and poking it via the inspector.

use archetype_ecs::prelude::*;
use archetype_ecs::{inspector, serialization};

fn main() -> Result<()> {
    let mut world = World::new();
    let health_id = world.registry_mut().define_dynamic("Health", serde_json::Map::new())?;

    let hero = world.create_entity()?;
    let mut fields = serde_json::Map::new();
    fields.insert("hp".to_string(), serde_json::json!(100));
    world.set_dynamic(hero, health_id, fields)?;

    let document = serialization::save_world(&world)?;
    println!("{}", serde_json::to_string_pretty(&document).unwrap());

    let restored = serialization::load_world(&document)?;
    println!("restored {} entities", restored.entity_count());

    let mut app = App::new();
    app.world = restored;
    let status = inspector::world_status(&app);
    println!("{status:?}");

    Ok(())
}
