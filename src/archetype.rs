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

//! Archetype Store (§4.2): owns all component data as parallel dense columns, plus the packed
//! entity list every archetype carries alongside them.

use rustc_hash::FxHashMap;

use crate::bitset::Signature;
use crate::component::Component;
use crate::entity::EntityId;
use crate::registry::ComponentTypeId;

pub type ArchetypeId = usize;

/// Structure-of-arrays storage for every entity sharing one component signature.
///
/// `entities[i]` and `columns[_][i]` always describe the same row (I2); `append_row` and
/// `swap_remove_row` are the only ways to change row count, and they keep both in lockstep.
pub struct Archetype {
    signature: Signature,
    types: Vec<ComponentTypeId>,
    entities: Vec<EntityId>,
    columns: FxHashMap<ComponentTypeId, Vec<Box<dyn Component>>>,
}

impl Archetype {
    pub fn new(signature: Signature, mut types: Vec<ComponentTypeId>) -> Self {
        types.sort_unstable();
        let mut columns = FxHashMap::default();
        for &t in &types {
            columns.insert(t, Vec::new());
        }
        Self {
            signature,
            types,
            entities: Vec::new(),
            columns,
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The component types this archetype stores, in the order its columns are laid out.
    pub fn types(&self) -> &[ComponentTypeId] {
        &self.types
    }

    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn has_component(&self, t: ComponentTypeId) -> bool {
        self.columns.contains_key(&t)
    }

    /// Append a new row. `values` must contain exactly this archetype's component types.
    ///
    /// # Panics
    /// Panics if `values` is missing an entry for one of `self.types()` — that would violate I2
    /// and indicates a bug in the Mutation Engine, not a recoverable user error.
    pub fn append_row(
        &mut self,
        entity: EntityId,
        mut values: FxHashMap<ComponentTypeId, Box<dyn Component>>,
    ) -> usize {
        let row = self.entities.len();
        for &t in &self.types {
            let value = values
                .remove(&t)
                .expect("append_row: missing component value for archetype's signature");
            self.columns.get_mut(&t).unwrap().push(value);
        }
        self.entities.push(entity);
        row
    }

    /// Classic swap-with-last removal. Returns the removed row's component values (so the
    /// Mutation Engine can move them into a new archetype) and the id of whichever entity got
    /// swapped into the vacated slot, if any (so the Entity Directory can patch its location).
    pub fn swap_remove_row(
        &mut self,
        row: usize,
    ) -> (FxHashMap<ComponentTypeId, Box<dyn Component>>, Option<EntityId>) {
        let mut values = FxHashMap::default();
        for &t in &self.types {
            let column = self.columns.get_mut(&t).unwrap();
            values.insert(t, column.swap_remove(row));
        }
        self.entities.swap_remove(row);
        let moved = if row < self.entities.len() {
            Some(self.entities[row])
        } else {
            None
        };
        (values, moved)
    }

    pub fn column(&self, t: ComponentTypeId) -> Option<&[Box<dyn Component>]> {
        self.columns.get(&t).map(Vec::as_slice)
    }

    pub fn component_at(&self, t: ComponentTypeId, row: usize) -> Option<&dyn Component> {
        self.columns.get(&t)?.get(row).map(Box::as_ref)
    }

    pub fn component_at_mut(&mut self, t: ComponentTypeId, row: usize) -> Option<&mut (dyn Component + 'static)> {
        self.columns.get_mut(&t)?.get_mut(row).map(Box::as_mut)
    }

    /// Overwrite the value at `row` for component type `t` in place (used by `add_component`
    /// when the target signature equals the source — §4.4.4 "pure value overwrite").
    pub fn set_component_at(&mut self, t: ComponentTypeId, row: usize, value: Box<dyn Component>) {
        if let Some(column) = self.columns.get_mut(&t) {
            column[row] = value;
        }
    }
}

/// Owns every archetype that has ever existed in the world, keyed by signature for O(1)
/// canonicalization (§4.2).
#[derive(Default)]
pub struct ArchetypeStore {
    archetypes: Vec<Archetype>,
    by_signature: FxHashMap<Signature, ArchetypeId>,
}

impl ArchetypeStore {
    pub fn new() -> Self {
        let mut store = Self::default();
        store.find_or_create(Signature::empty(), &[]);
        store
    }

    /// The archetype holding entities with no components at all; always archetype 0.
    pub fn empty_archetype(&self) -> ArchetypeId {
        0
    }

    /// Canonicalizes `signature` and returns a stable handle. Creation never touches existing
    /// archetypes — the contract `find_or_create` relies on to keep cached query results valid
    /// for archetypes it didn't just create.
    pub fn find_or_create(&mut self, signature: Signature, types: &[ComponentTypeId]) -> ArchetypeId {
        if let Some(&id) = self.by_signature.get(&signature) {
            return id;
        }
        let id = self.archetypes.len();
        #[cfg(feature = "profiling")]
        tracing::trace!(archetype_id = id, type_count = types.len(), "archetype created");
        self.archetypes.push(Archetype::new(signature.clone(), types.to_vec()));
        self.by_signature.insert(signature, id);
        id
    }

    pub fn get(&self, id: ArchetypeId) -> &Archetype {
        &self.archetypes[id]
    }

    pub fn get_mut(&mut self, id: ArchetypeId) -> &mut Archetype {
        &mut self.archetypes[id]
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArchetypeId, &Archetype)> {
        self.archetypes.iter().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(bits: &[usize]) -> Signature {
        let mut s = Signature::empty();
        for &b in bits {
            s.set(b);
        }
        s
    }

    #[test]
    fn find_or_create_returns_same_id_for_equal_signatures() {
        let mut store = ArchetypeStore::new();
        let a = store.find_or_create(sig(&[0, 1]), &[0, 1]);
        let b = store.find_or_create(sig(&[0, 1]), &[0, 1]);
        assert_eq!(a, b);
    }

    #[test]
    fn find_or_create_never_touches_existing_archetypes() {
        let mut store = ArchetypeStore::new();
        let a = store.find_or_create(sig(&[0]), &[0]);
        store.get_mut(a).append_row(EntityId::default(), {
            let mut m = FxHashMap::default();
            m.insert(0, Box::new(1i32) as Box<dyn Component>);
            m
        });
        let _b = store.find_or_create(sig(&[0, 1]), &[0, 1]);
        assert_eq!(store.get(a).len(), 1);
    }

    fn fake_entity(index: u32) -> EntityId {
        slotmap::KeyData::from_ffi(((1u64) << 32) | index as u64).into()
    }

    #[test]
    fn append_and_swap_remove_preserve_row_column_lockstep() {
        let mut arch = Archetype::new(sig(&[0]), vec![0]);
        let e1 = fake_entity(1);
        let e2 = fake_entity(2);
        let e3 = fake_entity(3);

        let mut v1 = FxHashMap::default();
        v1.insert(0, Box::new(1i32) as Box<dyn Component>);
        arch.append_row(e1, v1);

        let mut v2 = FxHashMap::default();
        v2.insert(0, Box::new(2i32) as Box<dyn Component>);
        arch.append_row(e2, v2);

        let mut v3 = FxHashMap::default();
        v3.insert(0, Box::new(3i32) as Box<dyn Component>);
        arch.append_row(e3, v3);

        assert_eq!(arch.len(), 3);
        let (_removed, moved) = arch.swap_remove_row(0);
        assert_eq!(moved, Some(e3));
        assert_eq!(arch.len(), 2);
        assert_eq!(arch.entities()[0], e3);
        let remaining = arch.component_at(0, 0).unwrap().as_any().downcast_ref::<i32>();
        assert_eq!(remaining, Some(&3));
    }
}
