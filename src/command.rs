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

//! Deferred world mutations (§5): systems run against a shared `&World` and queue their writes
//! into a `CommandBuffer`, which the executor applies at the group barrier.

use crate::component::{Bundle, Component};
use crate::entity::EntityId;
use crate::error::{EcsError, Result};
pub use crate::world::World;

/// Type alias for world mutation closures
pub type CommandClosure = Box<dyn FnOnce(&mut World) -> Result<()> + Send>;

pub enum Command {
    Spawn(CommandClosure),
    Despawn(EntityId),
    Custom(CommandClosure),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Spawn(_) => write!(f, "Spawn(...)"),
            Command::Despawn(e) => f.debug_tuple("Despawn").field(e).finish(),
            Command::Custom(_) => write!(f, "Custom(...)"),
        }
    }
}

/// Command buffer for deferred operations
#[derive(Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
        }
    }

    /// Queue a bundle spawn.
    pub fn spawn<B>(&mut self, bundle: B)
    where
        B: Bundle,
    {
        self.commands.push(Command::Spawn(Box::new(move |world| {
            world.create_entity_with(bundle).map(|_| ())
        })));
    }

    pub fn despawn(&mut self, entity: EntityId) {
        self.commands.push(Command::Despawn(entity));
    }

    /// Queue an arbitrary world mutation.
    pub fn add<F>(&mut self, f: F)
    where
        F: FnOnce(&mut World) -> Result<()> + Send + 'static,
    {
        self.commands.push(Command::Custom(Box::new(f)));
    }

    pub fn add_component<T: Component>(&mut self, entity: EntityId, component: T) {
        self.add(move |world| world.add_component(entity, component));
    }

    pub fn remove_component<T: Component>(&mut self, entity: EntityId) {
        self.add(move |world| world.remove_component::<T>(entity));
    }

    /// Apply all commands to the world and clear the buffer.
    ///
    /// A `Despawn` for an entity some earlier command in the same batch already destroyed (two
    /// systems in one group both despawning the same entity, say) is log-and-continue rather than
    /// aborting the rest of the batch: §4.4.5 guarantees each *operation* leaves no partial state,
    /// but a batch systems actually observe as one unit shouldn't have its later commands silently
    /// dropped because an earlier despawn already happened to the same entity (§9's
    /// `HandlerFailure` design note makes the same call for swallowed handler errors). Every other
    /// command still propagates its error and aborts the batch.
    pub fn apply(&mut self, world: &mut World) -> Result<()> {
        for command in self.commands.drain(..) {
            match command {
                Command::Spawn(f) => f(world)?,
                Command::Despawn(entity) => match world.destroy_entity(entity) {
                    Ok(()) => {}
                    Err(EcsError::StaleEntity) => {
                        #[cfg(feature = "profiling")]
                        tracing::debug!(?entity, "despawn of already-destroyed entity ignored");
                    }
                    Err(e) => return Err(e),
                },
                Command::Custom(f) => f(world)?,
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}
