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

//! System trait and access metadata

use std::any::TypeId;

use crate::command::CommandBuffer;
use crate::error::Result;
use crate::World;

/// System ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemId(pub u32);

/// System access metadata, used only by the optional conflict-based parallel-feasibility
/// analysis (`Schedule::analyze_parallelization`) — the primary ordering (§5) ignores it.
#[derive(Debug, Clone)]
pub struct SystemAccess {
    pub reads: Vec<TypeId>,
    pub writes: Vec<TypeId>,
}

impl SystemAccess {
    /// Create empty access
    pub fn empty() -> Self {
        Self {
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    /// Check if conflicts with another access
    pub fn conflicts_with(&self, other: &SystemAccess) -> bool {
        for w1 in &self.writes {
            for w2 in &other.writes {
                if w1 == w2 {
                    return true;
                }
            }
        }

        for w in &self.writes {
            for r in &other.reads {
                if w == r {
                    return true;
                }
            }
        }

        for r in &self.reads {
            for w in &other.writes {
                if r == w {
                    return true;
                }
            }
        }

        false
    }
}

/// A unit of per-frame logic, run by the `Schedule`/`Executor` in its declared group and
/// priority (§5). Mutations go through `commands` rather than straight into `world`, so every
/// system in a group observes the same world state until the group's barrier flush.
pub trait System: Send + Sync {
    /// Access metadata for the optional conflict-based analysis; unused by primary scheduling.
    fn access(&self) -> SystemAccess;

    fn name(&self) -> &'static str;

    fn run(&mut self, world: &World, commands: &mut CommandBuffer) -> Result<()>;
}

/// Boxed system
pub type BoxedSystem = Box<dyn System>;
