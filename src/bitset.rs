//! Growable bit sets.

use std::fmt;
use std::hash::{Hash, Hasher};

use fixedbitset::FixedBitSet;

/// A set of small integers backed by a [`FixedBitSet`].
///
/// In contrast to the underlying bit set, the capacity grows on insertion
/// and equality as well as hashing only consider the contained elements,
/// so two sets with the same elements are equal regardless of their capacity.
#[derive(Debug, Clone, Default)]
pub struct BitSet {
    data: FixedBitSet,
}

impl BitSet {
    pub fn new() -> Self {
        Self {
            data: FixedBitSet::default(),
        }
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            data: FixedBitSet::with_capacity(n),
        }
    }

    /// Creates the singleton set `{ index }`.
    pub fn singleton(index: usize) -> Self {
        let mut set = Self::with_capacity(index + 1);
        set.insert(index);
        set
    }

    pub fn insert(&mut self, index: usize) {
        if index >= self.data.len() {
            self.data.grow(index + 1);
        }
        self.data.insert(index);
    }

    pub fn remove(&mut self, index: usize) {
        if index < self.data.len() {
            self.data.set(index, false);
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.data.contains(index)
    }

    pub fn is_empty(&self) -> bool {
        self.data.ones().next().is_none()
    }

    pub fn len(&self) -> usize {
        self.data.count_ones(..)
    }

    pub fn ones(&self) -> fixedbitset::Ones<'_> {
        self.data.ones()
    }

    pub fn union_with(&mut self, other: &BitSet) {
        self.data.union_with(&other.data);
    }

    pub fn union(&self, other: &BitSet) -> BitSet {
        let mut set = self.clone();
        set.union_with(other);
        set
    }

    /// Returns a copy of this set without the given element.
    pub fn without(&self, index: usize) -> BitSet {
        let mut set = self.clone();
        set.remove(index);
        set
    }

    pub fn is_superset(&self, other: &BitSet) -> bool {
        self.data.is_superset(&other.data)
    }

    pub fn is_subset(&self, other: &BitSet) -> bool {
        self.data.is_subset(&other.data)
    }

    pub fn intersects(&self, other: &BitSet) -> bool {
        !self.data.is_disjoint(&other.data)
    }
}

impl PartialEq for BitSet {
    fn eq(&self, other: &Self) -> bool {
        self.ones().eq(other.ones())
    }
}

impl Eq for BitSet {}

impl Hash for BitSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for index in self.ones() {
            index.hash(state);
        }
    }
}

impl std::iter::FromIterator<usize> for BitSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = BitSet::new();
        for index in iter {
            set.insert(index);
        }
        set
    }
}

impl fmt::Display for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, index) in self.ones().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", index)?;
        }
        write!(f, "}}")
    }
}
