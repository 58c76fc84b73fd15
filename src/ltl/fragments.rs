//! Syntactic fragments of the temporal hierarchy.

use std::fmt;

use super::{LtlArena, LtlIndex, LtlNode};

/// Membership of a formula in the syntactic fragments
/// of the safety-progress hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LtlFragments {
    safety: bool,
    guarantee: bool,
    obligation: bool,
    recurrence: bool,
    persistence: bool,
}

impl Default for LtlFragments {
    fn default() -> Self {
        LtlFragments {
            safety: true,
            guarantee: true,
            obligation: true,
            recurrence: true,
            persistence: true,
        }
    }
}

impl LtlFragments {
    /// Classifies the formula by a bottom-up pass over its syntax tree.
    pub fn analyse(arena: &LtlArena, f: LtlIndex) -> Self {
        use LtlNode::*;
        match arena[f] {
            True | False | Ap(_) => Self::default(),
            Not(l) => Self::analyse(arena, l).not(),
            Next(l) => Self::analyse(arena, l),
            Finally(l) => Self::analyse(arena, l).eventually(),
            Globally(l) => Self::analyse(arena, l).always(),
            And(l, r) | Or(l, r) => Self::analyse(arena, l).meet(&Self::analyse(arena, r)),
            Until(l, r) => Self::analyse(arena, l).until(&Self::analyse(arena, r)),
            Release(l, r) => Self::analyse(arena, l).release(&Self::analyse(arena, r)),
            Implies(l, r) => Self::analyse(arena, l)
                .not()
                .meet(&Self::analyse(arena, r)),
            Equiv(l, r) => {
                let left = Self::analyse(arena, l);
                let right = Self::analyse(arena, r);
                left.meet(&right).meet(&left.not().meet(&right.not()))
            }
        }
    }

    pub fn is_syntactic_safety(&self) -> bool {
        self.safety
    }

    pub fn is_syntactic_guarantee(&self) -> bool {
        self.guarantee
    }

    pub fn is_syntactic_obligation(&self) -> bool {
        self.obligation
    }

    pub fn is_syntactic_recurrence(&self) -> bool {
        self.recurrence
    }

    pub fn is_syntactic_persistence(&self) -> bool {
        self.persistence
    }

    /// Fragments of a conjunction or disjunction.
    fn meet(&self, other: &Self) -> Self {
        LtlFragments {
            safety: self.safety && other.safety,
            guarantee: self.guarantee && other.guarantee,
            obligation: self.obligation && other.obligation,
            recurrence: self.recurrence && other.recurrence,
            persistence: self.persistence && other.persistence,
        }
    }

    fn not(&self) -> Self {
        LtlFragments {
            safety: self.guarantee,
            guarantee: self.safety,
            obligation: self.obligation,
            recurrence: self.persistence,
            persistence: self.recurrence,
        }
    }

    fn eventually(&self) -> Self {
        LtlFragments {
            safety: false,
            obligation: self.guarantee,
            recurrence: self.guarantee,
            ..*self
        }
    }

    fn always(&self) -> Self {
        LtlFragments {
            guarantee: false,
            obligation: self.safety,
            persistence: self.safety,
            ..*self
        }
    }

    fn until(&self, other: &Self) -> Self {
        LtlFragments {
            safety: false,
            guarantee: self.guarantee && other.guarantee,
            obligation: self.obligation && other.guarantee,
            recurrence: self.recurrence && other.guarantee,
            persistence: self.persistence && other.persistence,
        }
    }

    fn release(&self, other: &Self) -> Self {
        LtlFragments {
            safety: self.safety && other.safety,
            guarantee: false,
            obligation: self.obligation && other.safety,
            recurrence: self.recurrence && other.recurrence,
            persistence: self.persistence && other.safety,
        }
    }
}

impl fmt::Display for LtlFragments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (self.safety, "syntactic safety"),
            (self.guarantee, "syntactic guarantee"),
            (self.obligation, "syntactic obligation"),
            (self.recurrence, "syntactic recurrence"),
            (self.persistence, "syntactic persistence"),
        ];
        write!(f, "[")?;
        let mut first = true;
        for (_, name) in names.iter().filter(|(member, _)| *member) {
            if !first {
                write!(f, ",")?;
            }
            first = false;
            write!(f, "{}", name)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_fragments() {
        let mut arena = LtlArena::new();
        let p = arena.ap("p");
        let q = arena.ap("q");

        let gp = arena.globally(p);
        let fragments = LtlFragments::analyse(&arena, gp);
        assert!(fragments.is_syntactic_safety());
        assert!(!fragments.is_syntactic_guarantee());
        assert!(fragments.is_syntactic_obligation());

        let until = arena.until(p, q);
        let fragments = LtlFragments::analyse(&arena, until);
        assert!(!fragments.is_syntactic_safety());
        assert!(fragments.is_syntactic_guarantee());

        let not_until = arena.not(until);
        let fragments = LtlFragments::analyse(&arena, not_until);
        assert!(fragments.is_syntactic_safety());
        assert!(!fragments.is_syntactic_guarantee());
    }

    #[test]
    fn test_recurrence_and_persistence() {
        let mut arena = LtlArena::new();
        let p = arena.ap("p");
        let fp = arena.finally(p);
        let gfp = arena.globally(fp);
        let fragments = LtlFragments::analyse(&arena, gfp);
        assert!(fragments.is_syntactic_recurrence());
        assert!(!fragments.is_syntactic_persistence());
        assert!(!fragments.is_syntactic_obligation());
        assert_eq!(fragments.to_string(), "[syntactic recurrence]");

        let gp = arena.globally(p);
        let fgp = arena.finally(gp);
        let fragments = LtlFragments::analyse(&arena, fgp);
        assert!(fragments.is_syntactic_persistence());
        assert!(!fragments.is_syntactic_recurrence());
    }
}
