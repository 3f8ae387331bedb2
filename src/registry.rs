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

//! Component Registry (§4.1): gives every component type a compact, process-stable identifier.

use std::any::TypeId;
use std::collections::HashMap;

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde_json::Map as JsonMap;
use serde_json::Value;

use crate::component::Component;
use crate::error::{EcsError, Result};

/// Dense, monotonically-assigned index. Doubles as the bit position in a `Signature` (§4.1).
pub type ComponentTypeId = usize;

/// Builds a boxed component from a neutral-document payload. Populated for types registered
/// through [`ComponentRegistry::register_reflectable`] — the Rust stand-in for the source's
/// "reflection-driven JSON" (§9): rather than walking fields via language reflection, the type
/// hands the registry a closure once, at registration time.
type Constructor = Box<dyn Fn(Value) -> Result<Box<dyn Component>> + Send + Sync>;

/// Everything the registry knows about one component type.
#[derive(Clone)]
pub struct ComponentTypeInfo {
    pub name: String,
    /// `Some` for compile-time (`register::<T>()`) types, `None` for dynamic ones.
    type_id: Option<TypeId>,
    pub is_dynamic: bool,
    /// Plugin prefix that introduced this type, if registered via a plugin (§2).
    pub owner: Option<String>,
    /// Default value map for dynamic components (§3 `DynamicComponentSchema`).
    pub default_value: Option<JsonMap<String, Value>>,
}

impl std::fmt::Debug for ComponentTypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentTypeInfo")
            .field("name", &self.name)
            .field("is_dynamic", &self.is_dynamic)
            .field("owner", &self.owner)
            .finish()
    }
}

/// Assigns a stable dense index and bitmask position to every component type introduced at
/// runtime; also names dynamic (schema-defined) components.
///
/// Append-only after first use: indices are never reused (I3), so a `ComponentTypeId` stays
/// valid for the lifetime of the world.
#[derive(Default)]
pub struct ComponentRegistry {
    types: Vec<ComponentTypeInfo>,
    by_type_id: FxHashMap<TypeId, ComponentTypeId>,
    by_name: HashMap<String, ComponentTypeId>,
    constructors: FxHashMap<ComponentTypeId, Constructor>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Like [`new`](Self::new), but pre-sizes the type table and name/id lookup maps for
    /// `capacity` component types — a hint, not a hard cap (§1.1 `WorldConfig`).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            types: Vec::with_capacity(capacity),
            by_type_id: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            by_name: HashMap::with_capacity(capacity),
            constructors: FxHashMap::default(),
        }
    }

    /// Idempotent: registering the same compile-time type twice returns the same id.
    pub fn register<T: 'static>(&mut self) -> ComponentTypeId {
        let type_id = TypeId::of::<T>();
        if let Some(&id) = self.by_type_id.get(&type_id) {
            return id;
        }
        let name = Self::short_type_name(std::any::type_name::<T>());
        self.insert(name, Some(type_id), false, None, None)
    }

    /// Like [`register`](Self::register), but recorded as owned by a plugin prefix (§2).
    pub fn register_owned<T: 'static>(&mut self, owner: &str) -> ComponentTypeId {
        let id = self.register::<T>();
        self.types[id].owner = Some(owner.to_string());
        id
    }

    /// Registers (or re-registers) `T` with a JSON constructor attached, so the inspector's
    /// `set_component_by_name` (§6.2) can build a `T` from a payload without Rust reflection.
    pub fn register_reflectable<T>(&mut self) -> ComponentTypeId
    where
        T: Component + DeserializeOwned,
    {
        let id = self.register::<T>();
        self.constructors.insert(
            id,
            Box::new(|value: Value| {
                serde_json::from_value::<T>(value)
                    .map(|v| Box::new(v) as Box<dyn Component>)
                    .map_err(|e| EcsError::TypeMismatch(e.to_string()))
            }),
        );
        id
    }

    /// Builds a component value from a neutral-document payload, for types registered via
    /// `register_reflectable`. Dynamic components are always constructible — their payload *is*
    /// the value — and are handled separately by the caller (see `World::set_dynamic`).
    pub fn construct(&self, id: ComponentTypeId, payload: Value) -> Result<Box<dyn Component>> {
        let ctor = self.constructors.get(&id).ok_or_else(|| {
            EcsError::TypeMismatch(format!(
                "component type {:?} has no registered constructor (not reflectable)",
                self.info(id).map(|i| i.name.as_str()).unwrap_or("?")
            ))
        })?;
        ctor(payload)
    }

    pub fn is_constructible(&self, id: ComponentTypeId) -> bool {
        self.constructors.contains_key(&id)
    }

    /// Registers a schema-defined dynamic component. Fails with `DuplicateName` if a component
    /// (static or dynamic) already uses this name.
    pub fn define_dynamic(
        &mut self,
        name: &str,
        default: JsonMap<String, Value>,
    ) -> Result<ComponentTypeId> {
        self.define_dynamic_owned(name, default, None)
    }

    pub fn define_dynamic_owned(
        &mut self,
        name: &str,
        default: JsonMap<String, Value>,
        owner: Option<&str>,
    ) -> Result<ComponentTypeId> {
        if self.by_name.contains_key(name) {
            return Err(EcsError::DuplicateName(name.to_string()));
        }
        Ok(self.insert(
            name.to_string(),
            None,
            true,
            Some(default),
            owner.map(str::to_string),
        ))
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<ComponentTypeId> {
        self.by_name.get(name).copied()
    }

    pub fn lookup_by_type<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.by_type_id.get(&TypeId::of::<T>()).copied()
    }

    pub fn info(&self, id: ComponentTypeId) -> Option<&ComponentTypeInfo> {
        self.types.get(id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ComponentTypeId, &ComponentTypeInfo)> {
        self.types.iter().enumerate()
    }

    fn insert(
        &mut self,
        name: String,
        type_id: Option<TypeId>,
        is_dynamic: bool,
        default_value: Option<JsonMap<String, Value>>,
        owner: Option<String>,
    ) -> ComponentTypeId {
        let id = self.types.len();
        if let Some(tid) = type_id {
            self.by_type_id.insert(tid, id);
        }
        self.by_name.insert(name.clone(), id);
        #[cfg(feature = "profiling")]
        tracing::debug!(id, %name, is_dynamic, owner = owner.as_deref().unwrap_or(""), "component type registered");
        self.types.push(ComponentTypeInfo {
            name,
            type_id,
            is_dynamic,
            owner,
            default_value,
        });
        id
    }

    /// `std::any::type_name` returns a fully-qualified path; display names drop the module
    /// prefix so `set_component_by_name`/the inspector deal in short names like `Position`.
    fn short_type_name(full: &str) -> String {
        full.rsplit("::").next().unwrap_or(full).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let mut registry = ComponentRegistry::new();
        struct Position;
        let a = registry.register::<Position>();
        let b = registry.register::<Position>();
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn define_dynamic_rejects_duplicate_names() {
        let mut registry = ComponentRegistry::new();
        registry.define_dynamic("Health", JsonMap::new()).unwrap();
        let err = registry.define_dynamic("Health", JsonMap::new()).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateName(_)));
    }

    #[test]
    fn lookup_by_name_finds_registered_types() {
        let mut registry = ComponentRegistry::new();
        struct Velocity;
        let id = registry.register::<Velocity>();
        let name = registry.info(id).unwrap().name.clone();
        assert_eq!(registry.lookup_by_name(&name), Some(id));
    }

    #[test]
    fn reflectable_types_construct_from_json_payload() {
        #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
        struct Position {
            x: f32,
            y: f32,
        }

        let mut registry = ComponentRegistry::new();
        let id = registry.register_reflectable::<Position>();
        assert!(registry.is_constructible(id));

        let built = registry
            .construct(id, serde_json::json!({"x": 1.0, "y": 2.0}))
            .unwrap();
        let pos = built.as_any().downcast_ref::<Position>().unwrap();
        assert_eq!(pos.x, 1.0);
        assert_eq!(pos.y, 2.0);
    }

    #[test]
    fn non_reflectable_types_fail_to_construct() {
        struct Opaque;
        let mut registry = ComponentRegistry::new();
        let id = registry.register::<Opaque>();
        assert!(!registry.is_constructible(id));
        assert!(registry.construct(id, Value::Null).is_err());
    }

    #[test]
    fn indices_are_assigned_monotonically() {
        let mut registry = ComponentRegistry::new();
        struct A;
        struct B;
        struct C;
        assert_eq!(registry.register::<A>(), 0);
        assert_eq!(registry.register::<B>(), 1);
        assert_eq!(registry.register::<C>(), 2);
    }
}
