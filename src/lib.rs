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

//! Archetype ECS - an archetype-based Entity Component System core.
//!
//! `World` owns the Component Registry, Archetype Store, Entity Directory and Relationship
//! Graph; `Schedule`/`Executor` run systems against it one frame at a time; `App` glues a
//! `World`, a `Schedule` and a `ServiceTable` together behind a small plugin host.

pub mod app;
pub mod archetype;
pub mod bitset;
pub mod command;
pub mod component;
pub mod dependency;
pub mod entity;
pub mod error;
pub mod event_log;
pub mod inspector;
pub mod plugin;
pub mod query;
pub mod registry;
pub mod relationship;
pub mod serialization;
pub mod service;
pub mod world;

// System Runner & Scheduler
pub mod executor;
pub mod schedule;
pub mod system;

pub mod prelude;

// Re-exports for convenience
pub use app::App;
pub use archetype::{Archetype, ArchetypeId, ArchetypeStore};
pub use bitset::{BitSet, Signature};
pub use command::{Command, CommandBuffer};
pub use component::{Bundle, Component, DynamicComponent};
pub use entity::{entity_parts, EntityId, EntityLocation};
pub use error::{EcsError, Result};
pub use plugin::Plugin;
pub use query::{Query, QueryCache};
pub use registry::{ComponentRegistry, ComponentTypeId, ComponentTypeInfo};
pub use relationship::{EdgeKind, RelationshipGraph, SelfLoop};
pub use service::{InvocableService, ServiceTable};
pub use world::{World, WorldConfig};

pub use executor::{Executor, SystemProfiler};
pub use schedule::{Schedule, SystemGroup};
pub use system::{BoxedSystem, System, SystemAccess, SystemId};
