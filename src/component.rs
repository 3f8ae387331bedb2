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

//! Component and Bundle traits
//!
//! Components are data attached to entities. Every type gets the `Component` impl for free as
//! long as it is `Serialize` — that's what lets the registry, the inspector, and the
//! serialization layer describe a component's value without knowing its concrete type.

use std::any::Any;

use serde_json::{Map, Value};
use smallvec::{smallvec, SmallVec};

use crate::registry::{ComponentRegistry, ComponentTypeId};

/// Maximum number of components supported by `Bundle` tuple implementations.
pub const MAX_BUNDLE_COMPONENTS: usize = 8;

/// Anything storable in an archetype column.
///
/// `describe()` is the reflection-free escape hatch §9 asks for: instead of walking fields via
/// language reflection, every component type hands back a neutral document (or `None` if the
/// value failed to serialize).
pub trait Component: Any + Send + Sync + erased_serde::Serialize {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn describe(&self) -> Option<Value>;
}

impl<T> Component for T
where
    T: Any + Send + Sync + serde::Serialize,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn describe(&self) -> Option<Value> {
        serde_json::to_value(self).ok()
    }
}

erased_serde::serialize_trait_object!(Component);

/// A component whose shape was introduced by name at runtime (§4.1 `define_dynamic`).
///
/// Instances are property bags rather than fixed-shape records; `Component::describe()` for
/// these is just handing back the map.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct DynamicComponent(pub Map<String, Value>);

impl DynamicComponent {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// Groups multiple components for spawning an entity with all of them at once.
///
/// Kept as ergonomic sugar over the dynamic `World::create_entity` + `add_component` path: a
/// `Bundle` knows how to both register and box up its members, since the registry can only
/// assign an id to a component type while that type is still concretely known (at the
/// macro-generated call site), not after it has been erased to `Box<dyn Component>`.
pub trait Bundle: Send + Sync + 'static {
    fn into_components(
        self,
        registry: &mut ComponentRegistry,
    ) -> SmallVec<[(ComponentTypeId, Box<dyn Component>); MAX_BUNDLE_COMPONENTS]>
    where
        Self: Sized;
}

macro_rules! impl_bundle_for_tuple {
    ($($name:ident),+) => {
        impl<$($name: Component),+> Bundle for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_components(
                self,
                registry: &mut ComponentRegistry,
            ) -> SmallVec<[(ComponentTypeId, Box<dyn Component>); MAX_BUNDLE_COMPONENTS]> {
                let ($($name,)+) = self;
                smallvec![$((registry.register::<$name>(), Box::new($name) as Box<dyn Component>)),+]
            }
        }
    };
}

impl_bundle_for_tuple!(A);
impl_bundle_for_tuple!(A, B);
impl_bundle_for_tuple!(A, B, C);
impl_bundle_for_tuple!(A, B, C, D);
impl_bundle_for_tuple!(A, B, C, D, E);
impl_bundle_for_tuple!(A, B, C, D, E, F);
impl_bundle_for_tuple!(A, B, C, D, E, F, G);
impl_bundle_for_tuple!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, serde::Serialize)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[test]
    fn describe_round_trips_through_json() {
        let pos = Position { x: 1.0, y: 2.0 };
        let value = pos.describe().unwrap();
        assert_eq!(value["x"], 1.0);
        assert_eq!(value["y"], 2.0);
    }

    #[test]
    fn bundle_tuple_registers_and_yields_boxed_components_in_order() {
        #[derive(Debug, Clone, serde::Serialize)]
        struct Velocity(f32);

        let mut registry = ComponentRegistry::new();
        let boxed = (Position { x: 0.0, y: 0.0 }, Velocity(3.0)).into_components(&mut registry);
        assert_eq!(boxed.len(), 2);
        assert_eq!(registry.len(), 2);
        assert_ne!(boxed[0].0, boxed[1].0);
    }

    #[test]
    fn dynamic_component_stores_arbitrary_fields() {
        let mut map = Map::new();
        map.insert("hp".to_string(), Value::from(42));
        let dyn_comp = DynamicComponent::new(map);
        assert_eq!(dyn_comp.get("hp"), Some(&Value::from(42)));
    }
}
