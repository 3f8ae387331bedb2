//! A plugin that registers a component type, a system, and a service, driven through `App`.

use archetype_ecs::prelude::*;
use archetype_ecs::schedule::SystemGroup;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Health {
    hp: i32,
}

struct DecaySystem;

impl System for DecaySystem {
    fn access(&self) -> SystemAccess {
        SystemAccess::empty()
    }

    fn name(&self) -> &'static str {
        "decay_health"
    }

    fn run(&mut self, world: &World, commands: &mut CommandBuffer) -> Result<()> {
        let Some(health_id) = world.registry().lookup_by_type::<Health>() else {
            return Ok(());
        };
        let query = Query::new().require(health_id);
        let archetype_ids = world.resolve_query(&query);
        world.for_each(&query, &archetype_ids, health_id, |entity, component| {
            let health = component.as_any().downcast_ref::<Health>().expect("queried for Health");
            if health.hp <= 0 {
                commands.despawn(entity);
            }
        });
        Ok(())
    }
}

struct HealthPlugin;

impl Plugin for HealthPlugin {
    fn name(&self) -> &str {
        "health"
    }

    fn build(&self, app: &mut App) {
        app.add_system_in(Box::new(DecaySystem), SystemGroup::Simulation, 0);
        app.add_service("health_ticks", 0u64);
    }
}

fn main() -> Result<()> {
    let mut app = App::new();
    app.add_plugin(HealthPlugin);

    let alive = app.world.create_entity_with((Health { hp: 10 },))?;
    let dead = app.world.create_entity_with((Health { hp: 0 },))?;

    app.update()?;

    println!("alive entity still present: {}", app.world.is_alive(alive));
    println!("dead entity removed: {}", !app.world.is_alive(dead));

    Ok(())
}
