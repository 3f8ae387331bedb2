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

//! Runs a `Schedule` against a `World`, one frame at a time (§5, §6.1).

use std::collections::HashMap;
use std::time::Duration;

use crate::command::CommandBuffer;
use crate::error::Result;
use crate::schedule::{Schedule, SystemGroup, GROUPS_IN_ORDER};
use crate::system::SystemId;
use crate::World;

#[derive(Debug, Clone, Copy)]
pub struct SystemStats {
    pub min: Duration,
    pub max: Duration,
    pub avg: Duration,
    pub call_count: u64,
}

/// Per-system timing, for the inspector's `world_status` (§6.2).
pub struct SystemProfiler {
    timings: HashMap<SystemId, Vec<Duration>>,
    call_counts: HashMap<SystemId, u64>,
}

impl SystemProfiler {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            call_counts: HashMap::new(),
        }
    }

    pub fn record_execution(&mut self, id: SystemId, duration: Duration) {
        self.timings.entry(id).or_default().push(duration);
        self.call_counts.entry(id).and_modify(|c| *c += 1).or_insert(1);
    }

    pub fn get_stats(&self, id: SystemId) -> Option<SystemStats> {
        let timings = self.timings.get(&id)?;
        if timings.is_empty() {
            return None;
        }
        let min = *timings.iter().min().unwrap_or(&Duration::ZERO);
        let max = *timings.iter().max().unwrap_or(&Duration::ZERO);
        let avg = timings.iter().sum::<Duration>() / timings.len() as u32;
        Some(SystemStats {
            min,
            max,
            avg,
            call_count: *self.call_counts.get(&id).unwrap_or(&0),
        })
    }

    pub fn clear(&mut self) {
        self.timings.clear();
        self.call_counts.clear();
    }
}

impl Default for SystemProfiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives one `Schedule` through a `World`, one `Initialization`/`Simulation`/`Presentation`
/// frame at a time (§5). Every system in a group runs against the same `&World`; the group's
/// queued commands are applied as a barrier before the next group starts, so no system ever
/// observes a partially-mutated world from a sibling in its own group.
pub struct Executor {
    pub schedule: Schedule,
    pub profiler: SystemProfiler,
}

impl Executor {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            profiler: SystemProfiler::new(),
        }
    }

    /// Runs every enabled system once, grouped and barriered per §5, skipping disabled entries
    /// entirely (they still occupy their scheduled slot — just aren't invoked).
    pub fn execute_frame(&mut self, world: &mut World) -> Result<()> {
        let order = self.schedule.ordered_indices();
        let mut cursor = 0;
        for &group in &GROUPS_IN_ORDER {
            let mut commands = CommandBuffer::new();
            while cursor < order.len() && self.schedule.group_of(order[cursor]) == group {
                let idx = order[cursor];
                cursor += 1;
                if !self.schedule.is_enabled(idx) {
                    continue;
                }
                let id = self.schedule.system_id_of(idx);
                #[cfg(feature = "profiling")]
                let span = tracing::info_span!(
                    "system",
                    system = self.schedule.system_mut(idx).name(),
                    group = ?group,
                    tick = world.tick_count(),
                );
                #[cfg(feature = "profiling")]
                let _guard = span.enter();
                let start = std::time::Instant::now();
                self.schedule.system_mut(idx).run(world, &mut commands)?;
                self.profiler.record_execution(id, start.elapsed());
            }
            self.barrier(world, &mut commands)?;
        }
        Ok(())
    }

    fn barrier(&mut self, world: &mut World, commands: &mut CommandBuffer) -> Result<()> {
        commands.apply(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{System, SystemAccess};

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    struct Marker(i32);

    struct SpawnsAnEntity;
    impl System for SpawnsAnEntity {
        fn access(&self) -> SystemAccess {
            SystemAccess::empty()
        }
        fn name(&self) -> &'static str {
            "spawns_an_entity"
        }
        fn run(&mut self, _world: &World, commands: &mut CommandBuffer) -> Result<()> {
            commands.spawn((Marker(1),));
            Ok(())
        }
    }

    #[test]
    fn execute_frame_applies_commands_queued_during_the_frame() {
        let mut world = World::new();
        let mut schedule = Schedule::new();
        schedule.add_system(Box::new(SpawnsAnEntity));
        let mut executor = Executor::new(schedule);
        assert_eq!(world.entity_count(), 0);
        executor.execute_frame(&mut world).unwrap();
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn disabled_systems_do_not_run() {
        let mut world = World::new();
        let mut schedule = Schedule::new();
        let id = schedule.add_system(Box::new(SpawnsAnEntity));
        schedule.disable_system(id).unwrap();
        let mut executor = Executor::new(schedule);
        executor.execute_frame(&mut world).unwrap();
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn profiler_records_one_call_per_executed_system() {
        let mut world = World::new();
        let mut schedule = Schedule::new();
        let id = schedule.add_system(Box::new(SpawnsAnEntity));
        let mut executor = Executor::new(schedule);
        executor.execute_frame(&mut world).unwrap();
        assert_eq!(executor.profiler.get_stats(id).unwrap().call_count, 1);
    }

    #[test]
    fn groups_execute_in_fixed_order_even_when_added_out_of_order() {
        use std::sync::{Arc, Mutex};

        struct RecordsGroup(&'static str, Arc<Mutex<Vec<&'static str>>>);
        impl System for RecordsGroup {
            fn access(&self) -> SystemAccess {
                SystemAccess::empty()
            }
            fn name(&self) -> &'static str {
                self.0
            }
            fn run(&mut self, _world: &World, _commands: &mut CommandBuffer) -> Result<()> {
                self.1.lock().unwrap().push(self.0);
                Ok(())
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut schedule = Schedule::new();
        schedule.add_system_in(
            Box::new(RecordsGroup("presentation", log.clone())),
            SystemGroup::Presentation,
            0,
        );
        schedule.add_system_in(Box::new(RecordsGroup("init", log.clone())), SystemGroup::Initialization, 0);
        schedule.add_system_in(Box::new(RecordsGroup("sim", log.clone())), SystemGroup::Simulation, 0);

        let mut world = World::new();
        let mut executor = Executor::new(schedule);
        executor.execute_frame(&mut world).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["init", "sim", "presentation"]);
    }
}
