// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Inspection interface (§6.2): the surface a REST/debug-panel layer drives the world through,
//! by name and by generic JSON payload rather than by static Rust type.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::app::App;
use crate::entity::EntityId;
use crate::error::{EcsError, Result};
use crate::schedule::SystemGroup;

#[derive(Debug, Clone, Serialize)]
pub struct WorldStatus {
    pub tick: u64,
    pub delta: f64,
    pub paused: bool,
    pub entity_count: usize,
    pub archetype_count: usize,
    pub component_type_count: usize,
    pub system_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemRow {
    pub name: String,
    pub enabled: bool,
    pub group: SystemGroupName,
    pub order_within_group: usize,
    pub owner: Option<String>,
}

/// `SystemGroup` mirrored as a serializable display name, so the inspector's rows don't depend
/// on `SystemGroup`'s internal `#[derive(Serialize)]` surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemGroupName {
    Initialization,
    Simulation,
    Presentation,
}

impl From<SystemGroup> for SystemGroupName {
    fn from(group: SystemGroup) -> Self {
        match group {
            SystemGroup::Initialization => SystemGroupName::Initialization,
            SystemGroup::Simulation => SystemGroupName::Simulation,
            SystemGroup::Presentation => SystemGroupName::Presentation,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentTypeRow {
    pub name: String,
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentRow {
    pub type_name: String,
    pub data: Option<Value>,
    pub is_dynamic: bool,
    pub owner: Option<String>,
}

/// `world_status()` (§6.2): a frame-level snapshot for the inspector's header panel.
pub fn world_status(app: &App) -> WorldStatus {
    let world = &app.world;
    WorldStatus {
        tick: world.tick_count(),
        delta: world.elapsed_secs(),
        paused: world.is_paused(),
        entity_count: world.entity_count(),
        archetype_count: world.archetype_count(),
        component_type_count: world.registry().len(),
        system_count: app.schedule().system_count(),
    }
}

/// `list_systems()` (§6.2), with each row's position within its own group — the order the
/// scheduler actually runs them in, not insertion order.
pub fn list_systems(app: &mut App) -> Vec<SystemRow> {
    let order = app.schedule_mut().ordered_indices();
    let summaries = app.schedule().list_systems();
    let mut within_group: HashMap<SystemGroupName, usize> = HashMap::new();
    let mut rows = Vec::with_capacity(summaries.len());
    for idx in order {
        let summary = &summaries[idx];
        let group: SystemGroupName = summary.group.into();
        let counter = within_group.entry(group).or_insert(0usize);
        rows.push(SystemRow {
            name: summary.name.to_string(),
            enabled: summary.enabled,
            group,
            order_within_group: *counter,
            owner: summary.owner.clone(),
        });
        *counter += 1;
    }
    rows
}

/// `enable_system(name)` (§6.2). Returns `false` if no system carries that name.
pub fn enable_system(app: &mut App, name: &str) -> bool {
    set_system_enabled(app, name, true)
}

/// `disable_system(name)` (§6.2). Returns `false` if no system carries that name.
pub fn disable_system(app: &mut App, name: &str) -> bool {
    set_system_enabled(app, name, false)
}

fn set_system_enabled(app: &mut App, name: &str, enabled: bool) -> bool {
    let Some(id) = app.schedule().find_by_name(name) else {
        return false;
    };
    let result = if enabled {
        app.schedule_mut().enable_system(id)
    } else {
        app.schedule_mut().disable_system(id)
    };
    result.is_ok()
}

/// `list_component_types()` (§6.2).
pub fn list_component_types(app: &App) -> Vec<ComponentTypeRow> {
    app.world
        .registry()
        .iter()
        .map(|(_, info)| ComponentTypeRow {
            name: info.name.clone(),
            owner: info.owner.clone(),
        })
        .collect()
}

/// `list_entities()` (§6.2).
pub fn list_entities(app: &App) -> Vec<EntityId> {
    app.world.entities().collect()
}

/// `entity_components(id)` (§6.2): `data` is omitted (rather than erroring) for a value that
/// failed to serialize, per the spec's `data?`.
pub fn entity_components(app: &App, entity: EntityId) -> Result<Vec<ComponentRow>> {
    if !app.world.is_alive(entity) {
        return Err(EcsError::StaleEntity);
    }
    let mut rows = Vec::new();
    for (type_id, info) in app.world.registry().iter() {
        if app.world.has_component_dynamic(entity, type_id)? {
            let data = app.world.describe_component(entity, type_id)?;
            rows.push(ComponentRow {
                type_name: info.name.clone(),
                data,
                is_dynamic: info.is_dynamic,
                owner: info.owner.clone(),
            });
        }
    }
    Ok(rows)
}

/// `create_entity()` (§6.2).
pub fn create_entity(app: &mut App) -> Result<EntityId> {
    app.world.create_entity()
}

/// `destroy_entity(id)` (§6.2).
pub fn destroy_entity(app: &mut App, entity: EntityId) -> Result<()> {
    app.world.destroy_entity(entity)
}

/// `set_component_by_name(id, type_name, payload)` (§6.2).
///
/// Applies the compatibility shim: if `payload` fails to construct as-is but wrapping it as
/// `{value: payload}` does succeed, the wrapped form is used instead. This covers a type whose
/// sole field is `value` (e.g. a `{x, y, z}` payload for a type shaped `{value: {x, y, z}}})`
/// without requiring the registry to track which types look like that ahead of time.
pub fn set_component_by_name(app: &mut App, entity: EntityId, type_name: &str, payload: Value) -> Result<()> {
    let type_id = app
        .world
        .registry()
        .lookup_by_name(type_name)
        .ok_or_else(|| EcsError::UnknownComponentType(type_name.to_string()))?;
    if !app.world.registry().is_constructible(type_id) {
        return Err(EcsError::TypeMismatch(format!(
            "component type `{type_name}` has no registered constructor"
        )));
    }
    let value = match app.world.registry().construct(type_id, payload.clone()) {
        Ok(value) => value,
        Err(direct_err) => {
            let already_wrapped = matches!(&payload, Value::Object(map) if map.contains_key("value"));
            if already_wrapped {
                return Err(direct_err);
            }
            let mut wrapper = Map::new();
            wrapper.insert("value".to_string(), payload);
            app.world.registry().construct(type_id, Value::Object(wrapper)).map_err(|_| direct_err)?
        }
    };
    app.world.add_component_dynamic(entity, type_id, value)
}

/// `remove_component_by_name(id, type_name)` (§6.2). Returns `false` if the name is unknown.
pub fn remove_component_by_name(app: &mut App, entity: EntityId, type_name: &str) -> Result<bool> {
    let Some(type_id) = app.world.registry().lookup_by_name(type_name) else {
        return Ok(false);
    };
    app.world.remove_component_dynamic(entity, type_id)?;
    Ok(true)
}

/// `set_dynamic(id, name, payload)` (§6.2).
pub fn set_dynamic(app: &mut App, entity: EntityId, name: &str, payload: Map<String, Value>) -> Result<()> {
    let type_id = app
        .world
        .registry()
        .lookup_by_name(name)
        .ok_or_else(|| EcsError::UnknownComponentType(name.to_string()))?;
    app.world.set_dynamic(entity, type_id, payload)
}

/// `get_dynamic(id, name)` (§6.2).
pub fn get_dynamic(app: &App, entity: EntityId, name: &str) -> Result<Map<String, Value>> {
    let type_id = app
        .world
        .registry()
        .lookup_by_name(name)
        .ok_or_else(|| EcsError::UnknownComponentType(name.to_string()))?;
    Ok(app.world.get_dynamic(entity, type_id)?.clone().into_map())
}

/// `remove_dynamic(id, name)` (§6.2).
pub fn remove_dynamic(app: &mut App, entity: EntityId, name: &str) -> Result<()> {
    let type_id = app
        .world
        .registry()
        .lookup_by_name(name)
        .ok_or_else(|| EcsError::UnknownComponentType(name.to_string()))?;
    app.world.remove_dynamic(entity, type_id)
}

/// `query_dynamic(names[])` (§6.2): every live entity carrying every named dynamic component,
/// paired with the requested components' current field maps, in `names` order.
pub fn query_dynamic(app: &mut App, names: &[String]) -> Result<Vec<(EntityId, Vec<Map<String, Value>>)>> {
    let mut type_ids = Vec::with_capacity(names.len());
    for name in names {
        let type_id = app
            .world
            .registry()
            .lookup_by_name(name)
            .ok_or_else(|| EcsError::UnknownComponentType(name.clone()))?;
        type_ids.push(type_id);
    }
    let mut query = crate::query::Query::new();
    for &type_id in &type_ids {
        query = query.require(type_id);
    }
    let archetype_ids = app.world.resolve_query(&query);
    let mut out = Vec::new();
    for &archetype_id in &archetype_ids {
        for &entity in app.world.archetype_entities(archetype_id) {
            let mut fields = Vec::with_capacity(type_ids.len());
            for &type_id in &type_ids {
                fields.push(app.world.get_dynamic(entity, type_id)?.clone().into_map());
            }
            out.push((entity, fields));
        }
    }
    Ok(out)
}
