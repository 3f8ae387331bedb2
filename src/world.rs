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

//! Entity Directory (§4.3), Mutation Engine (§4.4) and Driver (§6.1), all owned by `World`.

use std::cell::Cell;

use rustc_hash::FxHashMap;
use serde_json::Value;
use slotmap::SlotMap;

use crate::archetype::{ArchetypeId, ArchetypeStore};
use crate::bitset::Signature;
use crate::component::{Bundle, Component, DynamicComponent};
use crate::entity::{EntityId, EntityLocation};
use crate::error::{EcsError, Result};
use crate::event_log::{EventLog, LogEventKind};
use crate::query::{Query, QueryCache};
use crate::registry::{ComponentRegistry, ComponentTypeId};
use crate::relationship::RelationshipGraph;

/// Upper bound on live entities, chosen well below slotmap's own 32-bit index space so
/// `CapacityExhausted` is reachable long before the slot index would wrap (I7).
pub const MAX_ENTITIES: usize = 4_000_000;

/// The one piece of structured configuration the core takes (§1.1): pre-sizing hints passed
/// straight to the `SlotMap`/`ComponentRegistry` allocations rather than a config-file layer.
/// Both fields are hints, not limits — `MAX_ENTITIES` remains the hard cap regardless of
/// `entity_capacity_hint`.
#[derive(Debug, Clone, Copy)]
pub struct WorldConfig {
    /// Entities to pre-allocate storage for.
    pub entity_capacity_hint: usize,
    /// Component types to pre-allocate the registry's lookup tables for.
    pub component_type_capacity_hint: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            entity_capacity_hint: 0,
            component_type_capacity_hint: 0,
        }
    }
}

/// Owns every entity, archetype, component value and relationship edge in one simulation, plus
/// the frame clock the Driver advances (§6.1).
pub struct World {
    registry: ComponentRegistry,
    archetypes: ArchetypeStore,
    entities: SlotMap<EntityId, EntityLocation>,
    query_cache: QueryCache,
    relationships: RelationshipGraph,
    event_log: EventLog,
    /// Depth counter for the manual `begin_iteration`/`end_iteration` protocol (§4.5.1). Not
    /// tied to a Rust borrow: the compile-time-checked `for_each`/`for_each_mut` helpers below
    /// already prevent concurrent structural mutation for in-process callers for free, via
    /// `&self`/`&mut self` exclusivity. This counter exists for callers that cross a boundary the
    /// borrow checker can't see through — the inspector or a future scripting host — where
    /// iteration and mutation happen in separate calls with no live Rust borrow connecting them.
    iteration_depth: Cell<usize>,
    tick: u64,
    elapsed_secs: f64,
    paused: bool,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Creates a world with its entity directory and component registry pre-sized per `config`
    /// (§1.1 Configuration). Everything else about the world is identical to `World::new()`.
    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            registry: ComponentRegistry::with_capacity(config.component_type_capacity_hint),
            archetypes: ArchetypeStore::new(),
            entities: SlotMap::with_capacity_and_key(config.entity_capacity_hint),
            query_cache: QueryCache::new(),
            relationships: RelationshipGraph::new(),
            event_log: EventLog::default(),
            iteration_depth: Cell::new(0),
            tick: 0,
            elapsed_secs: 0.0,
            paused: false,
        }
    }

    // ---- Component Registry access (§4.1) ----

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    // ---- Relationship Graph access (§4.6) ----

    pub fn relationships(&self) -> &RelationshipGraph {
        &self.relationships
    }

    pub fn relationships_mut(&mut self) -> &mut RelationshipGraph {
        &mut self.relationships
    }

    /// Adds a directed edge and records it to the event log. Prefer this over
    /// `relationships_mut().add_directed(...)` so the edge shows up in `world_status` history.
    pub fn add_directed_edge(
        &mut self,
        u: EntityId,
        v: EntityId,
        attrs: serde_json::Map<String, Value>,
    ) -> std::result::Result<(), crate::relationship::SelfLoop> {
        self.relationships.add_directed(u, v, attrs)?;
        self.event_log.record(self.tick, LogEventKind::EdgeAdded, Value::Null);
        Ok(())
    }

    /// Adds an undirected edge and records it to the event log, mirroring `add_directed_edge`.
    pub fn add_undirected_edge(
        &mut self,
        u: EntityId,
        v: EntityId,
        attrs: serde_json::Map<String, Value>,
    ) -> std::result::Result<(), crate::relationship::SelfLoop> {
        self.relationships.add_undirected(u, v, attrs)?;
        self.event_log.record(self.tick, LogEventKind::EdgeAdded, Value::Null);
        Ok(())
    }

    /// Removes every edge directly between `u` and `v` and records one `EdgeRemoved` entry if
    /// any were found.
    pub fn remove_edge(&mut self, u: EntityId, v: EntityId) -> usize {
        let removed = self.relationships.remove_edge(u, v);
        if removed > 0 {
            self.event_log.record(self.tick, LogEventKind::EdgeRemoved, Value::Null);
        }
        removed
    }

    // ---- Event log access (§6.2) ----

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    // ---- Entity Directory (§4.3) ----

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.contains_key(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys()
    }

    fn location(&self, entity: EntityId) -> Result<EntityLocation> {
        self.entities.get(entity).copied().ok_or(EcsError::StaleEntity)
    }

    /// Creates an entity with no components, placed in the empty archetype.
    pub fn create_entity(&mut self) -> Result<EntityId> {
        self.ensure_not_iterating()?;
        self.ensure_capacity()?;
        let archetype_id = self.archetypes.empty_archetype();
        let archetypes = &mut self.archetypes;
        let entity = self.entities.insert_with_key(|key| {
            let row = archetypes.get_mut(archetype_id).append_row(key, FxHashMap::default());
            EntityLocation {
                archetype_id,
                archetype_row: row,
            }
        });
        self.event_log.record(self.tick, LogEventKind::EntityCreated, Value::Null);
        Ok(entity)
    }

    /// Creates an entity carrying every component in `bundle` (§3 `Bundle`).
    pub fn create_entity_with<B: Bundle>(&mut self, bundle: B) -> Result<EntityId> {
        self.ensure_not_iterating()?;
        self.ensure_capacity()?;
        let before = self.registry.len();
        let pairs = bundle.into_components(&mut self.registry);
        if self.registry.len() > before {
            self.query_cache.invalidate_all();
        }
        let mut signature = Signature::empty();
        let mut types = Vec::with_capacity(pairs.len());
        for (type_id, _) in &pairs {
            signature.set(*type_id);
            types.push(*type_id);
        }
        let archetype_id = self.archetypes.find_or_create(signature, &types);
        let mut values = FxHashMap::default();
        for (type_id, value) in pairs {
            values.insert(type_id, value);
        }
        let archetypes = &mut self.archetypes;
        let entity = self.entities.insert_with_key(|key| {
            let row = archetypes.get_mut(archetype_id).append_row(key, values);
            EntityLocation {
                archetype_id,
                archetype_row: row,
            }
        });
        self.event_log.record(self.tick, LogEventKind::EntityCreated, Value::Null);
        Ok(entity)
    }

    /// Removes the entity, its components and every relationship edge touching it (I9).
    pub fn destroy_entity(&mut self, entity: EntityId) -> Result<()> {
        self.ensure_not_iterating()?;
        let loc = self.location(entity)?;
        self.entities.remove(entity);
        let (_values, moved) = self.archetypes.get_mut(loc.archetype_id).swap_remove_row(loc.archetype_row);
        if let Some(moved_entity) = moved {
            if let Some(moved_loc) = self.entities.get_mut(moved_entity) {
                moved_loc.archetype_row = loc.archetype_row;
            }
        }
        self.relationships.detach(entity);
        self.event_log.record(self.tick, LogEventKind::EntityDestroyed, Value::Null);
        Ok(())
    }

    // ---- Mutation Engine (§4.4) ----

    /// Adds (or overwrites, per §4.4.4) a statically-typed component, auto-registering `T` with
    /// the registry on first use.
    pub fn add_component<T: Component>(&mut self, entity: EntityId, value: T) -> Result<()> {
        let type_id = self.register_component::<T>();
        self.add_component_dynamic(entity, type_id, Box::new(value))
    }

    /// Registers `T` if this is its first use, invalidating the query cache per §4.1 ("Invalidates
    /// query cache entries whose required/excluded sets reference names previously unresolved").
    /// A no-op rescan on the next `resolve_query` is cheap; silently serving a stale archetype
    /// list to a query built around a type that didn't exist yet is not.
    fn register_component<T: Component>(&mut self) -> ComponentTypeId {
        let before = self.registry.len();
        let type_id = self.registry.register::<T>();
        if self.registry.len() > before {
            self.query_cache.invalidate_all();
        }
        type_id
    }

    /// Registers a schema-defined dynamic component (§4.1 `define_dynamic`), invalidating the
    /// query cache for the same reason as `register_component`.
    pub fn define_dynamic(&mut self, name: &str, default: serde_json::Map<String, Value>) -> Result<ComponentTypeId> {
        let type_id = self.registry.define_dynamic(name, default)?;
        self.query_cache.invalidate_all();
        Ok(type_id)
    }

    /// Adds (or overwrites) a component value by registry id — the path the inspector and
    /// `DynamicComponent` both funnel through.
    pub fn add_component_dynamic(
        &mut self,
        entity: EntityId,
        type_id: ComponentTypeId,
        value: Box<dyn Component>,
    ) -> Result<()> {
        self.ensure_not_iterating()?;
        let loc = self.location(entity)?;
        let archetype = self.archetypes.get(loc.archetype_id);
        if archetype.has_component(type_id) {
            self.archetypes.get_mut(loc.archetype_id).set_component_at(type_id, loc.archetype_row, value);
            self.event_log.record(self.tick, LogEventKind::ComponentChanged, Value::Null);
            return Ok(());
        }
        let new_signature = archetype.signature().with(type_id);
        let mut new_types = archetype.types().to_vec();
        new_types.push(type_id);
        self.relocate(entity, loc, new_signature, new_types, move |values| {
            values.insert(type_id, value);
        })?;
        self.event_log.record(self.tick, LogEventKind::ComponentAdded, Value::Null);
        Ok(())
    }

    pub fn remove_component<T: 'static>(&mut self, entity: EntityId) -> Result<()> {
        let Some(type_id) = self.registry.lookup_by_type::<T>() else {
            return Ok(());
        };
        self.remove_component_dynamic(entity, type_id)
    }

    pub fn remove_component_dynamic(&mut self, entity: EntityId, type_id: ComponentTypeId) -> Result<()> {
        self.ensure_not_iterating()?;
        let loc = self.location(entity)?;
        let archetype = self.archetypes.get(loc.archetype_id);
        if !archetype.has_component(type_id) {
            return Ok(());
        }
        let new_signature = archetype.signature().without(type_id);
        let new_types: Vec<_> = archetype.types().iter().copied().filter(|&t| t != type_id).collect();
        self.relocate(entity, loc, new_signature, new_types, move |values| {
            values.remove(&type_id);
        })?;
        self.event_log.record(self.tick, LogEventKind::ComponentRemoved, Value::Null);
        Ok(())
    }

    /// Moves `entity`'s row from its current archetype to the one matching `new_signature`,
    /// applying `adjust` to the carried-over component values in between (§4.4.1 steps 2-6).
    fn relocate(
        &mut self,
        entity: EntityId,
        loc: EntityLocation,
        new_signature: Signature,
        new_types: Vec<ComponentTypeId>,
        adjust: impl FnOnce(&mut FxHashMap<ComponentTypeId, Box<dyn Component>>),
    ) -> Result<()> {
        let new_archetype_id = self.archetypes.find_or_create(new_signature, &new_types);
        let (mut values, moved) = self
            .archetypes
            .get_mut(loc.archetype_id)
            .swap_remove_row(loc.archetype_row);
        if let Some(moved_entity) = moved {
            if let Some(moved_loc) = self.entities.get_mut(moved_entity) {
                moved_loc.archetype_row = loc.archetype_row;
            }
        }
        #[cfg(feature = "profiling")]
        if self.archetypes.get(loc.archetype_id).is_empty() {
            tracing::trace!(archetype_id = loc.archetype_id, "archetype retired (emptied by relocate)");
        }
        adjust(&mut values);
        let new_row = self.archetypes.get_mut(new_archetype_id).append_row(entity, values);
        *self.entities.get_mut(entity).expect("entity validated above") = EntityLocation {
            archetype_id: new_archetype_id,
            archetype_row: new_row,
        };
        Ok(())
    }

    pub fn has_component<T: 'static>(&self, entity: EntityId) -> Result<bool> {
        let loc = self.location(entity)?;
        let Some(type_id) = self.registry.lookup_by_type::<T>() else {
            return Ok(false);
        };
        Ok(self.archetypes.get(loc.archetype_id).has_component(type_id))
    }

    pub fn get_component<T: 'static>(&self, entity: EntityId) -> Result<&T> {
        let loc = self.location(entity)?;
        let type_id = self
            .registry
            .lookup_by_type::<T>()
            .ok_or_else(|| EcsError::UnknownComponentType(std::any::type_name::<T>().to_string()))?;
        self.archetypes
            .get(loc.archetype_id)
            .component_at(type_id, loc.archetype_row)
            .and_then(|c| c.as_any().downcast_ref::<T>())
            .ok_or_else(|| EcsError::UnknownComponentType(std::any::type_name::<T>().to_string()))
    }

    pub fn get_component_mut<T: 'static>(&mut self, entity: EntityId) -> Result<&mut T> {
        self.ensure_not_iterating()?;
        let loc = self.location(entity)?;
        let type_id = self
            .registry
            .lookup_by_type::<T>()
            .ok_or_else(|| EcsError::UnknownComponentType(std::any::type_name::<T>().to_string()))?;
        self.archetypes
            .get_mut(loc.archetype_id)
            .component_at_mut(type_id, loc.archetype_row)
            .and_then(|c| c.as_any_mut().downcast_mut::<T>())
            .ok_or_else(|| EcsError::UnknownComponentType(std::any::type_name::<T>().to_string()))
    }

    // ---- Dynamic components (§4.1 `define_dynamic`) ----

    pub fn set_dynamic(&mut self, entity: EntityId, type_id: ComponentTypeId, fields: serde_json::Map<String, Value>) -> Result<()> {
        self.add_component_dynamic(entity, type_id, Box::new(DynamicComponent::new(fields)))
    }

    pub fn get_dynamic(&self, entity: EntityId, type_id: ComponentTypeId) -> Result<&DynamicComponent> {
        let loc = self.location(entity)?;
        self.archetypes
            .get(loc.archetype_id)
            .component_at(type_id, loc.archetype_row)
            .and_then(|c| c.as_any().downcast_ref::<DynamicComponent>())
            .ok_or_else(|| EcsError::UnknownComponentType(format!("dynamic component {type_id}")))
    }

    pub fn remove_dynamic(&mut self, entity: EntityId, type_id: ComponentTypeId) -> Result<()> {
        self.remove_component_dynamic(entity, type_id)
    }

    // ---- Query Planner & Cache (§4.5) ----

    /// Resolves `query` against the current archetype set (§4.5). Takes `&self` — the cache
    /// behind this is interior-mutable — specifically so a `System`, which only ever sees
    /// `&World`, can reach the Query Planner directly rather than falling back to an O(population)
    /// scan over every live entity.
    pub fn resolve_query(&self, query: &Query) -> Vec<ArchetypeId> {
        self.query_cache.resolve(query, &self.archetypes)
    }

    pub fn archetype_entities(&self, archetype_id: ArchetypeId) -> &[EntityId] {
        self.archetypes.get(archetype_id).entities()
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Whether `entity` currently carries component `type_id`, static or dynamic alike — the
    /// inspector's `entity_components` walks every registered type against this (§6.2).
    pub fn has_component_dynamic(&self, entity: EntityId, type_id: ComponentTypeId) -> Result<bool> {
        let loc = self.location(entity)?;
        Ok(self.archetypes.get(loc.archetype_id).has_component(type_id))
    }

    /// `Component::describe()` of `entity`'s value for `type_id`, or `None` if the entity doesn't
    /// carry that component, or if the value failed to serialize (§6.2 `data?`).
    pub fn describe_component(&self, entity: EntityId, type_id: ComponentTypeId) -> Result<Option<Value>> {
        let loc = self.location(entity)?;
        Ok(self
            .archetypes
            .get(loc.archetype_id)
            .component_at(type_id, loc.archetype_row)
            .and_then(|c| c.describe()))
    }

    /// Read-only iteration over every matching row's component value for `type_id`, bracketed by
    /// the iteration-depth guard so concurrent structural mutation through the manual
    /// `begin_iteration`/`end_iteration` protocol is rejected (§4.5.1).
    pub fn for_each(&self, query: &Query, archetype_ids: &[ArchetypeId], type_id: ComponentTypeId, mut f: impl FnMut(EntityId, &dyn Component)) {
        let _guard = self.iterate();
        for &archetype_id in archetype_ids {
            let archetype = self.archetypes.get(archetype_id);
            if !query.matches(archetype.signature()) {
                continue;
            }
            if let Some(column) = archetype.column(type_id) {
                for (entity, value) in archetype.entities().iter().zip(column.iter()) {
                    f(*entity, value.as_ref());
                }
            }
        }
    }

    /// Mutable iteration over one component column across matching archetypes. Takes `&mut
    /// self`, so the borrow checker alone already rules out any concurrent structural mutation
    /// from safe code holding a second handle to this `World` — the `iteration_depth` guard here
    /// exists for symmetry with `for_each` and to keep the manual protocol's invariant true
    /// even if a future caller reaches this through interior mutability.
    pub fn for_each_mut(
        &mut self,
        query: &Query,
        archetype_ids: &[ArchetypeId],
        type_id: ComponentTypeId,
        mut f: impl FnMut(EntityId, &mut dyn Component),
    ) {
        self.iteration_depth.set(self.iteration_depth.get() + 1);
        for &archetype_id in archetype_ids {
            let archetype = self.archetypes.get_mut(archetype_id);
            if !query.matches(archetype.signature()) {
                continue;
            }
            let entities = archetype.entities().to_vec();
            for (row, entity) in entities.into_iter().enumerate() {
                if let Some(value) = archetype.component_at_mut(type_id, row) {
                    f(entity, value);
                }
            }
        }
        let depth = self.iteration_depth.get();
        self.iteration_depth.set(depth.saturating_sub(1));
    }

    /// Manually marks the start of an iteration for callers that cross an FFI/scripting boundary
    /// and can't hold a live Rust borrow across their own "iterate, then maybe mutate" sequence.
    /// Nestable; every `begin_iteration` must be matched by an `end_iteration`.
    pub fn begin_iteration(&self) {
        self.iteration_depth.set(self.iteration_depth.get() + 1);
    }

    pub fn end_iteration(&self) {
        let depth = self.iteration_depth.get();
        self.iteration_depth.set(depth.saturating_sub(1));
    }

    fn iterate(&self) -> IterationGuard<'_> {
        self.begin_iteration();
        IterationGuard { world: self }
    }

    fn ensure_not_iterating(&self) -> Result<()> {
        if self.iteration_depth.get() > 0 {
            Err(EcsError::ConcurrentMutation)
        } else {
            Ok(())
        }
    }

    // ---- Driver (§6.1) ----

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Advances the clock by `dt` seconds. A no-op while paused, but still validates `dt`.
    pub fn tick(&mut self, dt: f64) -> Result<()> {
        if dt < 0.0 || !dt.is_finite() {
            return Err(EcsError::InvalidArgument(format!("dt must be a finite, non-negative number of seconds, got {dt}")));
        }
        if self.paused {
            return Ok(());
        }
        self.tick += 1;
        self.elapsed_secs += dt;
        Ok(())
    }

    /// Advances the clock by `frames` ticks of `dt` seconds each. Only valid while paused (§6.1);
    /// `frames` must fall within `[1, 10_000]`.
    pub fn step(&mut self, frames: u32, dt: f64) -> Result<()> {
        if !self.paused {
            return Err(EcsError::InvalidArgument(
                "step is only valid while the world is paused".to_string(),
            ));
        }
        if !(1..=10_000).contains(&frames) {
            return Err(EcsError::InvalidArgument(format!(
                "frames must be between 1 and 10000, got {frames}"
            )));
        }
        if dt < 0.0 || !dt.is_finite() {
            return Err(EcsError::InvalidArgument(format!("dt must be a finite, non-negative number of seconds, got {dt}")));
        }
        for _ in 0..frames {
            self.tick += 1;
            self.elapsed_secs += dt;
        }
        Ok(())
    }

    fn ensure_capacity(&self) -> Result<()> {
        if self.entities.len() >= MAX_ENTITIES {
            Err(EcsError::CapacityExhausted {
                attempted: self.entities.len() + 1,
                capacity: MAX_ENTITIES,
            })
        } else {
            Ok(())
        }
    }
}

struct IterationGuard<'w> {
    world: &'w World,
}

impl Drop for IterationGuard<'_> {
    fn drop(&mut self) {
        self.world.end_iteration();
    }
}
