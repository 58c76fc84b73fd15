use std::fmt;

use crate::ap::ApSet;
use crate::bitset::BitSet;

/// A conjunction of literals over indices of atomic propositions.
///
/// The unsatisfiable monomial is represented by a flag with empty literal sets,
/// so that every monomial has a unique representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Monomial {
    positive: BitSet,
    negative: BitSet,
    falsum: bool,
}

impl Monomial {
    /// The monomial without literals, satisfied by every letter.
    pub fn tt() -> Self {
        Self::default()
    }

    pub fn ff() -> Self {
        Monomial {
            falsum: true,
            ..Self::default()
        }
    }

    pub fn literal(index: usize, value: bool) -> Self {
        let mut monomial = Self::tt();
        monomial.and_literal(index, value);
        monomial
    }

    /// Creates the conjunction of the positive and negative literals,
    /// which is unsatisfiable if both sets intersect.
    pub fn from_literals(positive: &BitSet, negative: &BitSet) -> Self {
        if positive.intersects(negative) {
            Self::ff()
        } else {
            Monomial {
                positive: positive.clone(),
                negative: negative.clone(),
                falsum: false,
            }
        }
    }

    pub fn is_true(&self) -> bool {
        !self.falsum && self.positive.is_empty() && self.negative.is_empty()
    }

    pub fn is_false(&self) -> bool {
        self.falsum
    }

    pub fn positive(&self) -> &BitSet {
        &self.positive
    }

    pub fn negative(&self) -> &BitSet {
        &self.negative
    }

    /// The value of the proposition in this monomial, if it occurs.
    pub fn value(&self, index: usize) -> Option<bool> {
        if self.positive.contains(index) {
            Some(true)
        } else if self.negative.contains(index) {
            Some(false)
        } else {
            None
        }
    }

    pub fn and_literal(&mut self, index: usize, value: bool) {
        if self.falsum {
            return;
        }
        if self.value(index) == Some(!value) {
            *self = Self::ff();
        } else if value {
            self.positive.insert(index);
        } else {
            self.negative.insert(index);
        }
    }

    pub fn and(&self, other: &Monomial) -> Monomial {
        if self.falsum || other.falsum {
            return Self::ff();
        }
        Self::from_literals(
            &self.positive.union(&other.positive),
            &self.negative.union(&other.negative),
        )
    }

    /// Checks if every letter satisfying this monomial also satisfies `other`.
    pub fn implies(&self, other: &Monomial) -> bool {
        self.falsum
            || (!other.falsum
                && self.positive.is_superset(&other.positive)
                && self.negative.is_superset(&other.negative))
    }

    /// Checks if some letter satisfies both monomials.
    pub fn intersects(&self, other: &Monomial) -> bool {
        !self.falsum
            && !other.falsum
            && !self.positive.intersects(&other.negative)
            && !self.negative.intersects(&other.positive)
    }

    /// Checks if the letter, given as the set of true propositions, satisfies the monomial.
    pub fn satisfied_by(&self, letter: &BitSet) -> bool {
        !self.falsum && letter.is_superset(&self.positive) && !letter.intersects(&self.negative)
    }

    /// If both monomials have the same literals except for the polarity of one
    /// proposition, returns their disjunction.
    fn resolve(&self, other: &Monomial) -> Option<Monomial> {
        if self.falsum || other.falsum {
            return None;
        }
        let support = self.positive.union(&self.negative);
        if support != other.positive.union(&other.negative) {
            return None;
        }
        let mut differing = support.ones().filter(|&i| {
            (self.positive.contains(i) && other.negative.contains(i))
                || (self.negative.contains(i) && other.positive.contains(i))
        });
        let index = differing.next()?;
        if differing.next().is_some() {
            return None;
        }
        Some(Monomial {
            positive: self.positive.without(index),
            negative: self.negative.without(index),
            falsum: false,
        })
    }

    /// Returns a helper to render the monomial with the names of the propositions.
    pub fn display<'a>(&'a self, aps: &'a ApSet) -> MonomialDisplay<'a> {
        MonomialDisplay {
            monomial: self,
            aps,
        }
    }

    fn literals(&self) -> impl Iterator<Item = (usize, bool)> + '_ {
        let mut literals: Vec<_> = self
            .positive
            .ones()
            .map(|i| (i, true))
            .chain(self.negative.ones().map(|i| (i, false)))
            .collect();
        literals.sort_unstable();
        literals.into_iter()
    }
}

/// Simplifies a disjunction of monomials.
///
/// Monomials implied by another one are dropped, and pairs that only differ
/// in the polarity of one proposition are combined, until neither applies.
pub fn merge_guards(guards: Vec<Monomial>) -> Vec<Monomial> {
    let mut guards: Vec<_> = guards.into_iter().filter(|m| !m.is_false()).collect();
    loop {
        let subsumed = (0..guards.len()).find(|&i| {
            guards.iter().enumerate().any(|(j, other)| {
                j != i && guards[i].implies(other) && (guards[i] != *other || j < i)
            })
        });
        if let Some(i) = subsumed {
            guards.remove(i);
            continue;
        }
        let resolvent = (0..guards.len()).find_map(|i| {
            (i + 1..guards.len())
                .find_map(|j| guards[i].resolve(&guards[j]).map(|m| (i, j, m)))
        });
        match resolvent {
            Some((i, j, merged)) => {
                guards.remove(j);
                guards[i] = merged;
            }
            None => return guards,
        }
    }
}

/// Renders the monomial as a label of the HOA format, e.g. `0&!1`.
impl fmt::Display for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.falsum {
            return write!(f, "f");
        }
        if self.is_true() {
            return write!(f, "t");
        }
        for (n, (index, value)) in self.literals().enumerate() {
            if n > 0 {
                write!(f, "&")?;
            }
            write!(f, "{}{}", if value { "" } else { "!" }, index)?;
        }
        Ok(())
    }
}

/// Helper struct to render a monomial with proposition names.
pub struct MonomialDisplay<'a> {
    monomial: &'a Monomial,
    aps: &'a ApSet,
}

impl<'a> fmt::Display for MonomialDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.monomial.is_false() {
            return write!(f, "false");
        }
        if self.monomial.is_true() {
            return write!(f, "true");
        }
        for (n, (index, value)) in self.monomial.literals().enumerate() {
            if n > 0 {
                write!(f, " & ")?;
            }
            if !value {
                write!(f, "!")?;
            }
            match self.aps.get(index) {
                Some(name) => write!(f, "{}", name)?,
                None => write!(f, "{}", index)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monomial(positive: &[usize], negative: &[usize]) -> Monomial {
        Monomial::from_literals(
            &positive.iter().copied().collect(),
            &negative.iter().copied().collect(),
        )
    }

    #[test]
    fn test_conjunction() {
        let a = Monomial::literal(0, true);
        let not_b = Monomial::literal(1, false);
        let both = a.and(&not_b);
        assert_eq!(both, monomial(&[0], &[1]));
        assert!(both.and(&Monomial::literal(1, true)).is_false());
        assert!(monomial(&[2], &[2]).is_false());
        assert_eq!(both.to_string(), "0&!1");
        assert_eq!(Monomial::tt().to_string(), "t");

        let aps: ApSet = vec!["a", "b"].into_iter().collect();
        assert_eq!(both.display(&aps).to_string(), "a & !b");
    }

    #[test]
    fn test_implication() {
        let a_not_b = monomial(&[0], &[1]);
        let not_b = monomial(&[], &[1]);
        assert!(a_not_b.implies(&not_b));
        assert!(!not_b.implies(&a_not_b));
        assert!(Monomial::ff().implies(&a_not_b));
        assert!(a_not_b.implies(&Monomial::tt()));
        assert!(a_not_b.intersects(&not_b));
        assert!(!a_not_b.intersects(&monomial(&[1], &[])));
    }

    #[test]
    fn test_weaker_guard_subsumes_stronger() {
        let merged = merge_guards(vec![monomial(&[0], &[1]), monomial(&[], &[1])]);
        assert_eq!(merged, vec![monomial(&[], &[1])]);
    }

    #[test]
    fn test_complementary_literals_are_combined() {
        let merged = merge_guards(vec![
            monomial(&[0, 2], &[]),
            monomial(&[2], &[0]),
            Monomial::ff(),
        ]);
        assert_eq!(merged, vec![monomial(&[2], &[])]);

        let merged = merge_guards(vec![monomial(&[0], &[]), monomial(&[], &[0])]);
        assert_eq!(merged, vec![Monomial::tt()]);

        let merged = merge_guards(vec![monomial(&[0], &[1]), monomial(&[1], &[0])]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_negative_literal_first_is_combined() {
        let merged = merge_guards(vec![monomial(&[], &[0]), monomial(&[0], &[])]);
        assert_eq!(merged, vec![Monomial::tt()]);

        let merged = merge_guards(vec![monomial(&[1], &[0]), monomial(&[0, 1], &[])]);
        assert_eq!(merged, vec![monomial(&[1], &[])]);
    }

    #[test]
    fn test_exclusive_or_is_kept() {
        let a_not_b = monomial(&[0], &[1]);
        let b_not_a = monomial(&[1], &[0]);
        assert_eq!(a_not_b.resolve(&b_not_a), None);
        assert_eq!(b_not_a.resolve(&a_not_b), None);
        let merged = merge_guards(vec![b_not_a.clone(), a_not_b.clone()]);
        assert_eq!(merged, vec![b_not_a, a_not_b]);
    }

    #[test]
    fn test_letters() {
        let letter: BitSet = vec![0].into_iter().collect();
        assert!(monomial(&[0], &[1]).satisfied_by(&letter));
        assert!(!monomial(&[1], &[]).satisfied_by(&letter));
        assert!(!Monomial::ff().satisfied_by(&letter));
        assert!(Monomial::tt().satisfied_by(&BitSet::new()));
    }
}
