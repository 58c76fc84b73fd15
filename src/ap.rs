//! Tables of atomic propositions.

use std::collections::HashMap;
use std::fmt;

/// A stable mapping between names of atomic propositions and their indices.
///
/// Indices are assigned in insertion order and never change,
/// so they can be shared with the consumer of the automaton.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApSet {
    names: Vec<String>,
    indices: HashMap<String, usize>,
}

impl ApSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the proposition if it is not yet present and returns its index.
    pub fn add_ap<S: AsRef<str>>(&mut self, name: S) -> usize {
        let name = name.as_ref();
        if let Some(&index) = self.indices.get(name) {
            return index;
        }
        let index = self.names.len();
        self.names.push(name.to_owned());
        self.indices.insert(name.to_owned(), index);
        index
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> std::iter::FromIterator<S> for ApSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut aps = ApSet::new();
        for name in iter {
            aps.add_ap(name);
        }
        aps
    }
}

impl fmt::Display for ApSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, name) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", name, i)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_stable() {
        let mut aps = ApSet::new();
        assert_eq!(aps.add_ap("p"), 0);
        assert_eq!(aps.add_ap("q"), 1);
        assert_eq!(aps.add_ap("p"), 0);
        assert_eq!(aps.len(), 2);
        assert_eq!(aps.index_of("q"), Some(1));
        assert_eq!(aps.index_of("r"), None);
        assert_eq!(aps.get(1), Some("q"));
        assert_eq!(aps.to_string(), "{p:0, q:1}");
    }
}
