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

//! Serialization format (§6.3): round-trips a `World` through one neutral JSON document built
//! entirely on `Component::describe()` and `ComponentRegistry::construct()` — no reflection, no
//! per-type codegen. A component type the caller never made constructible (via
//! `register_reflectable`) round-trips as a dynamic component instead of being dropped, so no
//! data is silently lost even when the caller forgot to pre-register a static type.

use std::collections::HashMap;

use serde_json::{json, Map, Value};

use crate::entity::{entity_parts, EntityId};
use crate::error::{EcsError, Result};
use crate::relationship::EdgeKind;
use crate::world::World;

/// Builds the neutral document for `world` (§6.3).
pub fn save_world(world: &World) -> Result<Value> {
    let component_definitions: Vec<Value> = world
        .registry()
        .iter()
        .filter(|(_, info)| info.is_dynamic)
        .map(|(_, info)| {
            json!({
                "name": info.name,
                "default_value_map": Value::Object(info.default_value.clone().unwrap_or_default()),
            })
        })
        .collect();

    let mut entities = Vec::new();
    let mut next_index = 0u32;
    for entity in world.entities() {
        let (index, _generation) = entity_parts(entity);
        next_index = next_index.max(index.wrapping_add(1));

        let mut components = Vec::new();
        for (type_id, info) in world.registry().iter() {
            if !world.has_component_dynamic(entity, type_id)? {
                continue;
            }
            if let Some(data) = world.describe_component(entity, type_id)? {
                components.push(json!({ "type": info.name, "data": data }));
            }
        }
        entities.push(json!({ "id": entity_id_to_json(entity), "components": components }));
    }

    let mut nodes = Vec::new();
    for node in world.relationships().node_ids() {
        nodes.push(entity_id_to_json(node));
    }
    let mut edges = Vec::new();
    let mut has_directed = false;
    let mut has_undirected = false;
    for edge in world.relationships().all_edges() {
        match edge.kind {
            EdgeKind::Directed => has_directed = true,
            EdgeKind::Undirected => has_undirected = true,
        }
        edges.push(json!({
            "u": entity_id_to_json(edge.u),
            "v": entity_id_to_json(edge.v),
            "directed": matches!(edge.kind, EdgeKind::Directed),
            "attrs": Value::Object(edge.attrs.clone()),
        }));
    }
    let kind = match (has_directed, has_undirected) {
        (true, false) => "directed",
        (false, true) => "undirected",
        _ => "mixed",
    };

    Ok(json!({
        "next_entity_id": next_index,
        "component_definitions": component_definitions,
        "entities": entities,
        "graph": { "kind": kind, "nodes": nodes, "edges": edges },
    }))
}

/// Rebuilds a `World` from a document produced by [`save_world`] (§6.3).
///
/// Static component types must already be constructible in the target registry (via
/// `register_reflectable`) for their values to come back as that concrete type; anything else —
/// dynamic components, and static types the caller didn't pre-register — comes back as a dynamic
/// component under the same name, so `load_world` never silently drops data.
pub fn load_world(doc: &Value) -> Result<World> {
    let mut world = World::new();
    let obj = doc
        .as_object()
        .ok_or_else(|| EcsError::Deserialization("expected a JSON object at the document root".to_string()))?;

    if let Some(defs) = obj.get("component_definitions").and_then(Value::as_array) {
        for def in defs {
            let name = def
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| EcsError::Deserialization("component_definitions[].name is missing".to_string()))?;
            let default = def
                .get("default_value_map")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            if world.registry().lookup_by_name(name).is_none() {
                world.define_dynamic(name, default)?;
            }
        }
    }

    let mut id_map: HashMap<(u32, u32), EntityId> = HashMap::new();
    let entities = obj
        .get("entities")
        .and_then(Value::as_array)
        .ok_or_else(|| EcsError::Deserialization("entities must be an array".to_string()))?;
    for entry in entities {
        let (old_index, old_generation) = entity_id_from_json(entry.get("id"))?;
        let new_entity = world.create_entity()?;
        id_map.insert((old_index, old_generation), new_entity);

        let components = entry.get("components").and_then(Value::as_array).cloned().unwrap_or_default();
        for comp in components {
            let type_name = comp
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| EcsError::Deserialization("components[].type is missing".to_string()))?
                .to_string();
            let data = comp.get("data").cloned().unwrap_or(Value::Null);
            apply_component(&mut world, new_entity, &type_name, data)?;
        }
    }

    if let Some(graph) = obj.get("graph").and_then(Value::as_object) {
        for edge in graph.get("edges").and_then(Value::as_array).into_iter().flatten() {
            let (u_index, u_generation) = entity_id_from_json(edge.get("u"))?;
            let (v_index, v_generation) = entity_id_from_json(edge.get("v"))?;
            let directed = edge.get("directed").and_then(Value::as_bool).unwrap_or(false);
            let attrs = edge.get("attrs").and_then(Value::as_object).cloned().unwrap_or_default();
            let (Some(&u), Some(&v)) = (id_map.get(&(u_index, u_generation)), id_map.get(&(v_index, v_generation))) else {
                continue;
            };
            let result = if directed {
                world.add_directed_edge(u, v, attrs)
            } else {
                world.add_undirected_edge(u, v, attrs)
            };
            result.map_err(|e| EcsError::Deserialization(e.to_string()))?;
        }
    }

    Ok(world)
}

fn apply_component(world: &mut World, entity: EntityId, type_name: &str, data: Value) -> Result<()> {
    match world.registry().lookup_by_name(type_name) {
        Some(type_id) if world.registry().is_constructible(type_id) => {
            let value = world.registry().construct(type_id, data)?;
            world.add_component_dynamic(entity, type_id, value)
        }
        Some(type_id) => {
            let map = data.as_object().cloned().unwrap_or_default();
            world.set_dynamic(entity, type_id, map)
        }
        None => {
            let map = data.as_object().cloned().unwrap_or_default();
            let type_id = world.define_dynamic(type_name, Map::new())?;
            world.set_dynamic(entity, type_id, map)
        }
    }
}

fn entity_id_to_json(entity: EntityId) -> Value {
    let (index, generation) = entity_parts(entity);
    json!({ "index": index, "generation": generation })
}

fn entity_id_from_json(value: Option<&Value>) -> Result<(u32, u32)> {
    let obj = value
        .and_then(Value::as_object)
        .ok_or_else(|| EcsError::Deserialization("entity id must be an {index, generation} object".to_string()))?;
    let index = obj
        .get("index")
        .and_then(Value::as_u64)
        .ok_or_else(|| EcsError::Deserialization("entity id is missing `index`".to_string()))? as u32;
    let generation = obj
        .get("generation")
        .and_then(Value::as_u64)
        .ok_or_else(|| EcsError::Deserialization("entity id is missing `generation`".to_string()))? as u32;
    Ok((index, generation))
}
