//! Word-array bitset, and the `Signature` type built on top of it.
//!
//! `BitSet` is a minimal, allocation-light bitset backed by `Vec<u64>`. `Signature` wraps one to
//! represent an archetype's component set: it widens lazily (appending zero words costs nothing
//! semantically) and compares/hashes as if trailing zero words did not exist, so two signatures
//! built at different points in the registry's growth still compare equal.

use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Default)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    /// Create a new BitSet capable of holding at least `capacity` bits.
    pub fn with_capacity(capacity: usize) -> Self {
        let num_words = capacity.div_ceil(64);
        Self {
            words: vec![0; num_words],
        }
    }

    /// Set the bit at `index` to true.
    /// Resizes automatically if index is out of bounds.
    pub fn set(&mut self, index: usize) {
        let (word_idx, bit_idx) = (index / 64, index % 64);
        if word_idx >= self.words.len() {
            self.words.resize(word_idx + 1, 0);
        }
        self.words[word_idx] |= 1 << bit_idx;
    }

    /// Clear the bit at `index`. No-op if already out of range/clear.
    pub fn unset(&mut self, index: usize) {
        let (word_idx, bit_idx) = (index / 64, index % 64);
        if word_idx < self.words.len() {
            self.words[word_idx] &= !(1u64 << bit_idx);
        }
    }

    /// Check if the bit at `index` is set.
    pub fn contains(&self, index: usize) -> bool {
        let (word_idx, bit_idx) = (index / 64, index % 64);
        if word_idx >= self.words.len() {
            return false;
        }
        (self.words[word_idx] & (1 << bit_idx)) != 0
    }

    /// Returns true if this set shares any set bits with `other`.
    pub fn intersects(&self, other: &Self) -> bool {
        let len = std::cmp::min(self.words.len(), other.words.len());
        for i in 0..len {
            if (self.words[i] & other.words[i]) != 0 {
                return true;
            }
        }
        false
    }

    /// Returns true if `self` contains every bit set in `other` (self ⊇ other).
    pub fn is_superset(&self, other: &Self) -> bool {
        for (i, &word) in other.words.iter().enumerate() {
            let mine = self.words.get(i).copied().unwrap_or(0);
            if word & !mine != 0 {
                return false;
            }
        }
        true
    }

    /// Union in place: `self |= other`, widening as needed.
    pub fn union_with(&mut self, other: &Self) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (i, &word) in other.words.iter().enumerate() {
            self.words[i] |= word;
        }
    }

    /// The highest index in use, after trimming trailing all-zero words. Two bitsets with the
    /// same set bits always agree on this regardless of how much they've been lazily widened.
    fn significant_len(&self) -> usize {
        self.words
            .iter()
            .rposition(|&w| w != 0)
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Returns iterator over indices of set bits
    pub fn ones(&self) -> OnesIter<'_> {
        OnesIter {
            bitset: self,
            word_idx: 0,
            current_word: if self.words.is_empty() {
                0
            } else {
                self.words[0]
            },
        }
    }
}

impl PartialEq for BitSet {
    fn eq(&self, other: &Self) -> bool {
        let len = std::cmp::max(self.significant_len(), other.significant_len());
        (0..len).all(|i| {
            self.words.get(i).copied().unwrap_or(0) == other.words.get(i).copied().unwrap_or(0)
        })
    }
}

impl Eq for BitSet {}

impl Hash for BitSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let len = self.significant_len();
        self.words[..len].hash(state);
    }
}

pub struct OnesIter<'a> {
    bitset: &'a BitSet,
    word_idx: usize,
    current_word: u64,
}

impl Iterator for OnesIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let trailing = self.current_word.trailing_zeros();
                self.current_word &= !(1 << trailing); // Clear the bit we just found
                return Some(self.word_idx * 64 + trailing as usize);
            }

            self.word_idx += 1;
            if self.word_idx >= self.bitset.words.len() {
                return None;
            }
            self.current_word = self.bitset.words[self.word_idx];
        }
    }
}

/// An archetype's component set: a bitmask over `ComponentTypeId`s (see `registry.rs`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Signature(BitSet);

impl Signature {
    pub fn empty() -> Self {
        Self(BitSet::default())
    }

    pub fn with(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.0.set(index);
        next
    }

    pub fn without(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.0.unset(index);
        next
    }

    pub fn set(&mut self, index: usize) {
        self.0.set(index);
    }

    pub fn unset(&mut self, index: usize) {
        self.0.unset(index);
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0.contains(index)
    }

    pub fn is_superset(&self, required: &Signature) -> bool {
        self.0.is_superset(&required.0)
    }

    pub fn is_disjoint(&self, excluded: &Signature) -> bool {
        !self.0.intersects(&excluded.0)
    }

    pub fn union(&self, other: &Signature) -> Signature {
        let mut next = self.clone();
        next.0.union_with(&other.0);
        next
    }

    pub fn matches(&self, required: &Signature, excluded: &Signature) -> bool {
        self.is_superset(required) && self.is_disjoint(excluded)
    }

    pub fn ones(&self) -> OnesIter<'_> {
        self.0.ones()
    }

    pub fn is_empty(&self) -> bool {
        self.0.ones().next().is_none()
    }
}
