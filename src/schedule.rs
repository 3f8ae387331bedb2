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

//! System Runner & Scheduler (§5).
//!
//! Primary ordering is declarative: `(group, priority, insertion order)`, where `group` is one
//! of three fixed phases every frame passes through. `analyze_parallelization` offers a
//! secondary, conflict-based view of the same systems (`dependency::DependencyGraph`) for
//! callers who want to know what could safely run concurrently — it never changes execution
//! order itself.

use crate::error::{EcsError, Result};
use crate::system::{BoxedSystem, SystemAccess, SystemId};

/// The three fixed groups systems run in, in this order, every frame (§5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SystemGroup {
    Initialization,
    Simulation,
    Presentation,
}

pub const GROUPS_IN_ORDER: [SystemGroup; 3] = [
    SystemGroup::Initialization,
    SystemGroup::Simulation,
    SystemGroup::Presentation,
];

struct SystemEntry {
    system: BoxedSystem,
    id: SystemId,
    group: SystemGroup,
    priority: i32,
    insertion_order: usize,
    enabled: bool,
    owner: Option<String>,
}

/// A read-only view of one scheduled system, for the inspector's `list_systems` (§6.2).
#[derive(Debug, Clone)]
pub struct SystemSummary {
    pub id: SystemId,
    pub name: &'static str,
    pub group: SystemGroup,
    pub priority: i32,
    pub enabled: bool,
    pub owner: Option<String>,
}

/// Ordered, grouped collection of systems.
pub struct Schedule {
    entries: Vec<SystemEntry>,
    next_insertion_order: usize,
    next_id: u32,
    /// Cached sort of `entries`' indices by `(group, priority, insertion_order)`; `None` when an
    /// `add_system*` call has invalidated it.
    order: Option<Vec<usize>>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedule {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_insertion_order: 0,
            next_id: 0,
            order: None,
        }
    }

    /// Adds `system` to the `Simulation` group at priority 0.
    pub fn add_system(&mut self, system: BoxedSystem) -> SystemId {
        self.add_system_in(system, SystemGroup::Simulation, 0)
    }

    pub fn add_system_in(&mut self, system: BoxedSystem, group: SystemGroup, priority: i32) -> SystemId {
        self.add_system_owned(system, group, priority, None)
    }

    /// Adds `system`, recording `owner` as the plugin prefix that introduced it (§2).
    pub fn add_system_owned(
        &mut self,
        system: BoxedSystem,
        group: SystemGroup,
        priority: i32,
        owner: Option<String>,
    ) -> SystemId {
        let id = SystemId(self.next_id);
        self.next_id += 1;
        let insertion_order = self.next_insertion_order;
        self.next_insertion_order += 1;
        self.entries.push(SystemEntry {
            system,
            id,
            group,
            priority,
            insertion_order,
            enabled: true,
            owner,
        });
        self.order = None;
        id
    }

    pub fn enable_system(&mut self, id: SystemId) -> Result<()> {
        self.set_enabled(id, true)
    }

    pub fn disable_system(&mut self, id: SystemId) -> Result<()> {
        self.set_enabled(id, false)
    }

    fn set_enabled(&mut self, id: SystemId, enabled: bool) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| EcsError::SystemNotFound(format!("{id:?}")))?;
        entry.enabled = enabled;
        Ok(())
    }

    pub fn find_by_name(&self, name: &str) -> Option<SystemId> {
        self.entries.iter().find(|e| e.system.name() == name).map(|e| e.id)
    }

    pub fn list_systems(&self) -> Vec<SystemSummary> {
        self.entries
            .iter()
            .map(|e| SystemSummary {
                id: e.id,
                name: e.system.name(),
                group: e.group,
                priority: e.priority,
                enabled: e.enabled,
                owner: e.owner.clone(),
            })
            .collect()
    }

    pub fn system_count(&self) -> usize {
        self.entries.len()
    }

    fn ensure_ordered(&mut self) {
        if self.order.is_some() {
            return;
        }
        let mut indices: Vec<usize> = (0..self.entries.len()).collect();
        indices.sort_by_key(|&i| {
            let e = &self.entries[i];
            (e.group, e.priority, e.insertion_order)
        });
        self.order = Some(indices);
    }

    /// Rebuilds the cached order only if dirty, and returns it. Called once per frame by the
    /// executor.
    pub(crate) fn ordered_indices(&mut self) -> Vec<usize> {
        self.ensure_ordered();
        self.order.clone().unwrap_or_default()
    }

    pub(crate) fn group_of(&self, idx: usize) -> SystemGroup {
        self.entries[idx].group
    }

    pub(crate) fn is_enabled(&self, idx: usize) -> bool {
        self.entries[idx].enabled
    }

    pub(crate) fn system_id_of(&self, idx: usize) -> SystemId {
        self.entries[idx].id
    }

    pub(crate) fn system_mut(&mut self, idx: usize) -> &mut BoxedSystem {
        &mut self.entries[idx].system
    }

    pub fn get_accesses(&self) -> Vec<SystemAccess> {
        self.entries.iter().map(|e| e.system.access()).collect()
    }

    /// Optional secondary analysis: what stages these systems could run in if scheduled purely
    /// by read/write conflicts, ignoring declared group and priority entirely.
    pub fn analyze_parallelization(&self) -> crate::dependency::DependencyGraph {
        crate::dependency::DependencyGraph::new(self.get_accesses())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandBuffer;

    struct MockSystem(&'static str);
    impl crate::system::System for MockSystem {
        fn run(&mut self, _world: &crate::World, _commands: &mut CommandBuffer) -> crate::error::Result<()> {
            Ok(())
        }
        fn name(&self) -> &'static str {
            self.0
        }
        fn access(&self) -> SystemAccess {
            SystemAccess::empty()
        }
    }

    #[test]
    fn ordering_is_dirtied_by_add_and_rebuilt_lazily() {
        let mut schedule = Schedule::new();
        schedule.add_system(Box::new(MockSystem("a")));
        assert!(schedule.order.is_none());
        schedule.ordered_indices();
        assert!(schedule.order.is_some());
        schedule.add_system(Box::new(MockSystem("b")));
        assert!(schedule.order.is_none());
    }

    #[test]
    fn groups_run_before_later_groups_regardless_of_insertion_order() {
        let mut schedule = Schedule::new();
        schedule.add_system_in(Box::new(MockSystem("presentation")), SystemGroup::Presentation, 0);
        schedule.add_system_in(Box::new(MockSystem("init")), SystemGroup::Initialization, 0);
        let order = schedule.ordered_indices();
        let names: Vec<_> = order.iter().map(|&i| schedule.list_systems()[i].name).collect();
        assert_eq!(names, vec!["init", "presentation"]);
    }

    #[test]
    fn higher_priority_runs_first_within_a_group() {
        let mut schedule = Schedule::new();
        schedule.add_system_in(Box::new(MockSystem("low")), SystemGroup::Simulation, 5);
        schedule.add_system_in(Box::new(MockSystem("high")), SystemGroup::Simulation, -5);
        let order = schedule.ordered_indices();
        let names: Vec<_> = order.iter().map(|&i| schedule.list_systems()[i].name).collect();
        assert_eq!(names, vec!["high", "low"]);
    }

    #[test]
    fn disabled_systems_stay_in_the_order_but_are_flagged() {
        let mut schedule = Schedule::new();
        let id = schedule.add_system(Box::new(MockSystem("a")));
        schedule.disable_system(id).unwrap();
        assert!(!schedule.list_systems()[0].enabled);
    }

    #[test]
    fn disabling_an_unknown_system_reports_not_found() {
        let mut schedule = Schedule::new();
        assert!(matches!(schedule.disable_system(SystemId(99)), Err(EcsError::SystemNotFound(_))));
    }
}
