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

//! Relationship Graph (§4.6): a labeled multigraph over entity ids.

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use crate::entity::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Directed,
    Undirected,
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub u: EntityId,
    pub v: EntityId,
    pub kind: EdgeKind,
    pub attrs: Map<String, Value>,
}

/// A directed-and-undirected labeled multigraph whose nodes are entity ids.
///
/// Edges are stored once, in a flat `Vec`, with an adjacency index into it; destroying an
/// entity detaches every edge touching it (I6, I9).
#[derive(Default)]
pub struct RelationshipGraph {
    edges: Vec<Option<Edge>>,
    adjacency: FxHashMap<EntityId, Vec<usize>>,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_directed(&mut self, u: EntityId, v: EntityId, attrs: Map<String, Value>) -> Result<(), SelfLoop> {
        self.add_edge(u, v, EdgeKind::Directed, attrs)
    }

    pub fn add_undirected(&mut self, u: EntityId, v: EntityId, attrs: Map<String, Value>) -> Result<(), SelfLoop> {
        self.add_edge(u, v, EdgeKind::Undirected, attrs)
    }

    fn add_edge(
        &mut self,
        u: EntityId,
        v: EntityId,
        kind: EdgeKind,
        attrs: Map<String, Value>,
    ) -> Result<(), SelfLoop> {
        if u == v {
            return Err(SelfLoop);
        }
        let idx = self.edges.len();
        self.edges.push(Some(Edge { u, v, kind, attrs }));
        self.adjacency.entry(u).or_default().push(idx);
        self.adjacency.entry(v).or_default().push(idx);
        Ok(())
    }

    /// Removes every edge directly between `u` and `v` (either direction), regardless of kind.
    /// Returns the number of edges removed.
    pub fn remove_edge(&mut self, u: EntityId, v: EntityId) -> usize {
        let mut removed = 0;
        for slot in &mut self.edges {
            let matches = matches!(slot, Some(e) if (e.u == u && e.v == v) || (e.u == v && e.v == u));
            if matches {
                *slot = None;
                removed += 1;
            }
        }
        if removed > 0 {
            self.compact_adjacency(u);
            self.compact_adjacency(v);
        }
        removed
    }

    /// Every entity directly connected to `entity`, in either direction.
    pub fn neighbors(&self, entity: EntityId) -> Vec<EntityId> {
        self.edges_of(entity).into_iter().map(|(other, _, _)| other).collect()
    }

    pub fn in_neighbors(&self, entity: EntityId) -> Vec<EntityId> {
        self.edge_indices(entity)
            .filter_map(|idx| self.edges[idx].as_ref())
            .filter(|e| matches!(e.kind, EdgeKind::Directed) && e.v == entity)
            .map(|e| e.u)
            .collect()
    }

    pub fn out_neighbors(&self, entity: EntityId) -> Vec<EntityId> {
        self.edge_indices(entity)
            .filter_map(|idx| self.edges[idx].as_ref())
            .filter(|e| matches!(e.kind, EdgeKind::Directed) && e.u == entity)
            .map(|e| e.v)
            .collect()
    }

    pub fn edges_of(&self, entity: EntityId) -> Vec<(EntityId, EdgeKind, Map<String, Value>)> {
        self.edge_indices(entity)
            .filter_map(|idx| self.edges[idx].as_ref())
            .map(|e| {
                let other = if e.u == entity { e.v } else { e.u };
                (other, e.kind, e.attrs.clone())
            })
            .collect()
    }

    /// Removes every edge touching `entity` (§4.3 `destroy`, I9).
    pub fn detach(&mut self, entity: EntityId) {
        if let Some(indices) = self.adjacency.remove(&entity) {
            let mut touched = Vec::new();
            for idx in indices {
                if let Some(edge) = self.edges[idx].take() {
                    touched.push(if edge.u == entity { edge.v } else { edge.u });
                }
            }
            for other in touched {
                self.compact_adjacency(other);
            }
        }
    }

    fn edge_indices(&self, entity: EntityId) -> impl Iterator<Item = usize> + '_ {
        self.adjacency.get(&entity).into_iter().flatten().copied()
    }

    fn compact_adjacency(&mut self, entity: EntityId) {
        if let Some(indices) = self.adjacency.get_mut(&entity) {
            indices.retain(|&idx| self.edges[idx].is_some());
            if indices.is_empty() {
                self.adjacency.remove(&entity);
            }
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_some()).count()
    }

    /// Every live edge, for the neutral document's `graph.edges` (§6.3).
    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter_map(|slot| slot.as_ref())
    }

    /// Every entity that is an endpoint of at least one live edge, for `graph.nodes` (§6.3).
    pub fn node_ids(&self) -> Vec<EntityId> {
        self.adjacency.keys().copied().collect()
    }
}

/// Self-loops are rejected outright (I6); this is the only failure mode relationship ops have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfLoop;

impl std::fmt::Display for SelfLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "relationship edges cannot be self-loops")
    }
}

impl std::error::Error for SelfLoop {}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_entity(index: u32) -> EntityId {
        slotmap::KeyData::from_ffi(((1u64) << 32) | index as u64).into()
    }

    #[test]
    fn self_loops_are_rejected() {
        let mut graph = RelationshipGraph::new();
        let a = fake_entity(1);
        assert!(graph.add_directed(a, a, Map::new()).is_err());
    }

    #[test]
    fn directed_edges_respect_direction() {
        let mut graph = RelationshipGraph::new();
        let a = fake_entity(1);
        let b = fake_entity(2);
        graph.add_directed(a, b, Map::new()).unwrap();
        assert_eq!(graph.out_neighbors(a), vec![b]);
        assert_eq!(graph.in_neighbors(b), vec![a]);
        assert!(graph.out_neighbors(b).is_empty());
    }

    #[test]
    fn undirected_edges_are_symmetric() {
        let mut graph = RelationshipGraph::new();
        let a = fake_entity(1);
        let b = fake_entity(2);
        graph.add_undirected(a, b, Map::new()).unwrap();
        assert_eq!(graph.neighbors(a), vec![b]);
        assert_eq!(graph.neighbors(b), vec![a]);
    }

    #[test]
    fn detach_removes_every_edge_touching_an_entity() {
        let mut graph = RelationshipGraph::new();
        let a = fake_entity(1);
        let b = fake_entity(2);
        let c = fake_entity(3);
        graph.add_undirected(a, b, Map::new()).unwrap();
        graph.add_directed(a, c, Map::new()).unwrap();
        graph.detach(a);
        assert!(graph.neighbors(a).is_empty());
        assert!(graph.neighbors(b).is_empty());
        assert!(graph.neighbors(c).is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn remove_edge_only_removes_direct_connections() {
        let mut graph = RelationshipGraph::new();
        let a = fake_entity(1);
        let b = fake_entity(2);
        let c = fake_entity(3);
        graph.add_undirected(a, b, Map::new()).unwrap();
        graph.add_undirected(a, c, Map::new()).unwrap();
        assert_eq!(graph.remove_edge(a, b), 1);
        assert_eq!(graph.neighbors(a), vec![c]);
    }
}
