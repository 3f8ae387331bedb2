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

//! Query Planner & Cache (§4.5): compiles a query into a reusable, invalidation-aware list of
//! matching archetypes.

use std::cell::RefCell;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::archetype::{ArchetypeId, ArchetypeStore};
use crate::bitset::Signature;
use crate::registry::ComponentTypeId;

pub type ComponentSet = SmallVec<[ComponentTypeId; 8]>;

/// `(required, excluded, optional)` — §4.5's query triple.
///
/// `optional` never affects matching; it only tells iteration which columns to yield as
/// `Option` rather than requiring them, enabling zero-cost "left outer" joins.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub required: ComponentSet,
    pub excluded: ComponentSet,
    pub optional: ComponentSet,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, t: ComponentTypeId) -> Self {
        self.required.push(t);
        self
    }

    pub fn exclude(mut self, t: ComponentTypeId) -> Self {
        self.excluded.push(t);
        self
    }

    pub fn optional(mut self, t: ComponentTypeId) -> Self {
        self.optional.push(t);
        self
    }

    /// An archetype matches iff its signature is a superset of `required` and disjoint from
    /// `excluded` (§4.5).
    pub fn matches(&self, signature: &Signature) -> bool {
        let mut required_sig = Signature::empty();
        for &t in &self.required {
            required_sig.set(t);
        }
        let mut excluded_sig = Signature::empty();
        for &t in &self.excluded {
            excluded_sig.set(t);
        }
        signature.matches(&required_sig, &excluded_sig)
    }

    fn canonical_key(&self) -> QueryKey {
        let mut required = self.required.clone();
        required.sort_unstable();
        required.dedup();
        let mut excluded = self.excluded.clone();
        excluded.sort_unstable();
        excluded.dedup();
        QueryKey { required, excluded }
    }
}

/// The canonicalized form of a query used as the cache key: `optional` is deliberately excluded
/// since it never affects which archetypes match (§4.5).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct QueryKey {
    required: ComponentSet,
    excluded: ComponentSet,
}

struct CachedQueryResult {
    matches: Vec<ArchetypeId>,
    /// How many of the store's archetypes (by id, which only ever grows) this entry has already
    /// scanned — lets `resolve` do an incremental rescan instead of a full one.
    seen_archetypes: usize,
}

/// Caches compiled queries, incrementally rescanning only archetypes created since the query was
/// last resolved. Invalidated wholesale whenever the component registry changes in a way that
/// could affect matching (a new component type index was assigned).
///
/// Wrapped in a `RefCell` so `resolve`/`invalidate_all` take `&self`: a `System` only ever
/// receives `&World` (§5), so the cache it sits behind must be mutable through a shared
/// reference, the same way the teacher's profiling counters use interior mutability to stay
/// reachable from `&self` call sites.
#[derive(Default)]
pub struct QueryCache {
    entries: RefCell<FxHashMap<QueryKey, CachedQueryResult>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every cached entry. Called when a component registration could change whether
    /// previously-unresolved required/excluded names now refer to a real type.
    pub fn invalidate_all(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Resolve `q` against `archetypes`, reusing the cache and incrementally extending it.
    pub fn resolve(&self, q: &Query, archetypes: &ArchetypeStore) -> Vec<ArchetypeId> {
        let key = q.canonical_key();
        let total = archetypes.len();
        let mut entries = self.entries.borrow_mut();
        let entry = entries.entry(key).or_insert_with(|| CachedQueryResult {
            matches: Vec::new(),
            seen_archetypes: 0,
        });
        if entry.seen_archetypes < total {
            for (id, archetype) in archetypes.iter().skip(entry.seen_archetypes) {
                if q.matches(archetype.signature()) {
                    entry.matches.push(id);
                }
            }
            entry.seen_archetypes = total;
        }
        entry.matches.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
