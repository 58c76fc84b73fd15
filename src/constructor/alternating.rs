//! Very weak alternating automata over the subformulas of a formula.

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::ap::ApSet;
use crate::bitset::BitSet;
use crate::error::TranslationError;
use crate::ltl::{LtlArena, LtlIndex, LtlNode, Syntax};
use crate::nba::Monomial;
use crate::options::TranslationOptions;

const STAGE: &str = "alternating automaton construction";

/// A conjunctive transition: reading a letter satisfying the literals
/// moves to all states in `to` at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ATrans {
    pub(crate) to: BitSet,
    pub(crate) pos: BitSet,
    pub(crate) neg: BitSet,
}

impl ATrans {
    fn literal(index: usize, value: bool) -> Self {
        let mut t = Self::default();
        if value {
            t.pos.insert(index);
        } else {
            t.neg.insert(index);
        }
        t
    }

    fn to_state(state: usize) -> Self {
        ATrans {
            to: BitSet::singleton(state),
            ..Self::default()
        }
    }

    /// Conjunction of both transitions, or `None` if their literals contradict.
    pub(crate) fn merge(&self, other: &ATrans) -> Option<ATrans> {
        let pos = self.pos.union(&other.pos);
        let neg = self.neg.union(&other.neg);
        if pos.intersects(&neg) {
            return None;
        }
        Some(ATrans {
            to: self.to.union(&other.to),
            pos,
            neg,
        })
    }

    /// Checks if `other` is enabled whenever this transition is,
    /// with a subset of its targets.
    fn subsumed_by(&self, other: &ATrans) -> bool {
        self.to.is_superset(&other.to)
            && self.pos.is_superset(&other.pos)
            && self.neg.is_superset(&other.neg)
    }
}

fn product(left: &[ATrans], right: &[ATrans]) -> Vec<ATrans> {
    left.iter()
        .flat_map(|t1| right.iter().filter_map(move |t2| t1.merge(t2)))
        .collect()
}

/// Alternating automaton with one state per temporal subformula.
///
/// Slot 0 holds the initial transitions; the other slots hold the transitions
/// of the states, or `None` if the state was removed as unreachable.
#[derive(Debug, Clone)]
pub(crate) struct AlternatingAutomaton {
    transitions: Vec<Option<Vec<ATrans>>>,
    labels: Vec<Option<String>>,
    final_set: BitSet,
    aps: ApSet,
}

impl AlternatingAutomaton {
    pub(crate) fn new(
        arena: &mut LtlArena,
        formula: LtlIndex,
        aps: &mut ApSet,
        options: &TranslationOptions,
    ) -> Result<Self, TranslationError> {
        let formula = if options.formula_simplification {
            arena.simplify(formula)
        } else {
            arena.negation_normal_form(formula)
        };
        let arena: &LtlArena = arena;
        debug!(
            "Rewritten formula: {}",
            arena.display(formula, Syntax::Default)
        );

        let mut builder = AlternatingBuilder::new(arena, aps);
        let initial = builder.boolean(formula)?;
        let AlternatingBuilder {
            mut transitions,
            labels,
            final_set,
            ..
        } = builder;
        transitions[0] = Some(initial);

        let mut automaton = AlternatingAutomaton {
            transitions,
            labels,
            final_set,
            aps: aps.clone(),
        };
        if options.automata_simplification {
            automaton.simplify_states();
        }
        Ok(automaton)
    }

    /// Removes states not reachable from the initial transitions and
    /// transitions subsumed by another transition of the same state.
    fn simplify_states(&mut self) {
        let mut reachable = BitSet::new();
        for t in self.initial() {
            reachable.union_with(&t.to);
        }
        // successors of a state have smaller indices, except for the state itself
        for i in (1..self.transitions.len()).rev() {
            if !reachable.contains(i) {
                self.transitions[i] = None;
                self.labels[i] = None;
                self.final_set.remove(i);
                continue;
            }
            if let Some(transitions) = &mut self.transitions[i] {
                let mut k = 0;
                while k < transitions.len() {
                    let redundant = (0..transitions.len())
                        .any(|j| j != k && transitions[k].subsumed_by(&transitions[j]));
                    if redundant {
                        transitions.remove(k);
                    } else {
                        k += 1;
                    }
                }
                for t in transitions.iter() {
                    reachable.union_with(&t.to);
                }
            }
        }
    }

    pub(crate) fn initial(&self) -> &[ATrans] {
        self.transitions(0)
    }

    pub(crate) fn transitions(&self, state: usize) -> &[ATrans] {
        self.transitions
            .get(state)
            .and_then(Option::as_deref)
            .unwrap_or(&[])
    }

    /// States stemming from an until formula, whose obligation must be discharged.
    pub(crate) fn final_set(&self) -> &BitSet {
        &self.final_set
    }

    pub(crate) fn aps(&self) -> &ApSet {
        &self.aps
    }

    pub(crate) fn num_states(&self) -> usize {
        self.transitions.iter().skip(1).flatten().count()
    }

    pub(crate) fn num_transitions(&self) -> usize {
        self.transitions.iter().skip(1).flatten().map(Vec::len).sum()
    }
}

impl fmt::Display for AlternatingAutomaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "init :")?;
        for t in self.initial() {
            writeln!(f, "{}", t.to)?;
        }
        for i in (1..self.transitions.len()).rev() {
            let (transitions, label) = match (&self.transitions[i], &self.labels[i]) {
                (Some(transitions), Some(label)) => (transitions, label),
                _ => continue,
            };
            writeln!(f, "state {} : {}", i, label)?;
            for t in transitions {
                let guard = Monomial::from_literals(&t.pos, &t.neg);
                writeln!(f, "{} -> {}", guard.display(&self.aps), t.to)?;
            }
        }
        Ok(())
    }
}

/// Builds the states of the automaton bottom-up, assigning each new
/// subformula the next free slot after its operands.
struct AlternatingBuilder<'a> {
    arena: &'a LtlArena,
    aps: &'a mut ApSet,
    done: HashMap<LtlIndex, usize>,
    transitions: Vec<Option<Vec<ATrans>>>,
    labels: Vec<Option<String>>,
    final_set: BitSet,
}

impl<'a> AlternatingBuilder<'a> {
    fn new(arena: &'a LtlArena, aps: &'a mut ApSet) -> Self {
        AlternatingBuilder {
            arena,
            aps,
            done: HashMap::new(),
            transitions: vec![None],
            labels: vec![None],
            final_set: BitSet::new(),
        }
    }

    /// Transitions for the boolean structure of `f`, with temporal
    /// subformulas and literals as states.
    fn boolean(&mut self, f: LtlIndex) -> Result<Vec<ATrans>, TranslationError> {
        let arena = self.arena;
        match arena[f] {
            LtlNode::True => Ok(vec![ATrans::default()]),
            LtlNode::False => Ok(Vec::new()),
            LtlNode::And(l, r) => {
                let left = self.boolean(l)?;
                let right = self.boolean(r)?;
                Ok(product(&left, &right))
            }
            LtlNode::Or(l, r) => {
                let mut transitions = self.boolean(l)?;
                transitions.extend(self.boolean(r)?);
                Ok(transitions)
            }
            _ => {
                let state = self.build(f)?;
                Ok(vec![ATrans::to_state(state)])
            }
        }
    }

    fn transitions_of(&mut self, f: LtlIndex) -> Result<Vec<ATrans>, TranslationError> {
        let state = self.build(f)?;
        Ok(self.transitions[state].clone().unwrap_or_default())
    }

    /// Creates the state for `f` and returns its index.
    fn build(&mut self, f: LtlIndex) -> Result<usize, TranslationError> {
        if let Some(&state) = self.done.get(&f) {
            return Ok(state);
        }
        let arena = self.arena;
        let transitions = match arena[f] {
            LtlNode::True => vec![ATrans::default()],
            LtlNode::False => Vec::new(),
            LtlNode::Ap(ref name) => vec![ATrans::literal(self.aps.add_ap(name), true)],
            LtlNode::Not(operand) => match arena[operand] {
                LtlNode::Ap(ref name) => vec![ATrans::literal(self.aps.add_ap(name), false)],
                _ => return Err(TranslationError::not_in_normal_form("!", STAGE)),
            },
            LtlNode::Next(operand) => self.boolean(operand)?,
            // p U q = q || (p && X (p U q))
            LtlNode::Until(l, r) => {
                let mut transitions = self.transitions_of(r)?;
                let left = self.transitions_of(l)?;
                let state = self.transitions.len();
                transitions.extend(left.into_iter().map(|mut t| {
                    t.to.insert(state);
                    t
                }));
                self.final_set.insert(state);
                transitions
            }
            // p V q = (p && q) || (q && X (p V q))
            LtlNode::Release(l, r) => {
                let right = self.transitions_of(r)?;
                let left = self.transitions_of(l)?;
                let state = self.transitions.len();
                let mut transitions = Vec::new();
                for t1 in &right {
                    transitions.extend(left.iter().filter_map(|t2| t1.merge(t2)));
                    let mut t = t1.clone();
                    t.to.insert(state);
                    transitions.push(t);
                }
                transitions
            }
            LtlNode::And(l, r) => {
                let left = self.transitions_of(l)?;
                let right = self.transitions_of(r)?;
                product(&left, &right)
            }
            LtlNode::Or(l, r) => {
                let mut transitions = self.transitions_of(l)?;
                transitions.extend(self.transitions_of(r)?);
                transitions
            }
            ref node @ LtlNode::Finally(_)
            | ref node @ LtlNode::Globally(_)
            | ref node @ LtlNode::Implies(_, _)
            | ref node @ LtlNode::Equiv(_, _) => {
                return Err(TranslationError::not_in_normal_form(node.operator(), STAGE));
            }
        };
        let state = self.transitions.len();
        self.transitions.push(Some(transitions));
        self.labels
            .push(Some(arena.display(f, Syntax::Default).to_string()));
        self.done.insert(f, state);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(arena: &mut LtlArena, f: LtlIndex, aps: &mut ApSet) -> AlternatingAutomaton {
        AlternatingAutomaton::new(arena, f, aps, &TranslationOptions::default()).unwrap()
    }

    #[test]
    fn test_until() {
        let mut arena = LtlArena::new();
        let mut aps = ApSet::new();
        let p = arena.ap("p");
        let q = arena.ap("q");
        let until = arena.until(p, q);
        let automaton = translate(&mut arena, until, &mut aps);

        // q and p are created before the until state itself
        assert_eq!(aps.index_of("q"), Some(0));
        assert_eq!(aps.index_of("p"), Some(1));
        assert_eq!(automaton.num_states(), 1);
        assert_eq!(automaton.initial().len(), 1);
        let state = automaton.initial()[0].to.ones().next().unwrap();
        assert_eq!(automaton.final_set(), &BitSet::singleton(state));

        let transitions = automaton.transitions(state);
        assert_eq!(transitions.len(), 2);
        assert!(transitions
            .iter()
            .any(|t| t.to.is_empty() && t.pos == BitSet::singleton(0)));
        assert!(transitions
            .iter()
            .any(|t| t.to == BitSet::singleton(state) && t.pos == BitSet::singleton(1)));
        assert!(automaton
            .to_string()
            .contains(&format!("state {} : (p U q)\n", state)));
    }

    #[test]
    fn test_release() {
        let mut arena = LtlArena::new();
        let mut aps = ApSet::new();
        let p = arena.ap("p");
        let q = arena.ap("q");
        let release = arena.release(p, q);
        let automaton = translate(&mut arena, release, &mut aps);

        let state = automaton.initial()[0].to.ones().next().unwrap();
        assert!(automaton.final_set().is_empty());
        let transitions = automaton.transitions(state);
        assert_eq!(transitions.len(), 2);
        let both: BitSet = vec![0, 1].into_iter().collect();
        assert!(transitions.iter().any(|t| t.to.is_empty() && t.pos == both));
        assert!(transitions.iter().any(|t| t.to.contains(state)));
    }

    #[test]
    fn test_contradicting_literals_are_dropped() {
        let mut arena = LtlArena::new();
        let mut aps = ApSet::new();
        let p = arena.ap("p");
        let not_p = arena.not(p);
        let both = arena.and(p, not_p);

        let mut builder = AlternatingBuilder::new(&arena, &mut aps);
        let state = builder.build(both).unwrap();
        assert_eq!(builder.transitions[state], Some(Vec::new()));
    }

    #[test]
    fn test_unsupported_operators() {
        let mut arena = LtlArena::new();
        let mut aps = ApSet::new();
        let p = arena.ap("p");
        let fp = arena.finally(p);
        let not_fp = arena.not(fp);

        let mut builder = AlternatingBuilder::new(&arena, &mut aps);
        assert_eq!(
            builder.boolean(fp),
            Err(TranslationError::not_in_normal_form("F", STAGE))
        );
        assert_eq!(
            builder.boolean(not_fp),
            Err(TranslationError::not_in_normal_form("!", STAGE))
        );
    }

    #[test]
    fn test_subsumed_transitions_are_removed() {
        let mut arena = LtlArena::new();
        let mut aps = ApSet::new();
        let p = arena.ap("p");
        let q = arena.ap("q");
        // X (p || (p && q)) keeps only the transition guarded by p
        let pq = arena.and(p, q);
        let or = arena.or(p, pq);
        let next = arena.next(or);
        let options = TranslationOptions {
            formula_simplification: false,
            ..TranslationOptions::default()
        };
        let automaton = AlternatingAutomaton::new(&mut arena, next, &mut aps, &options).unwrap();
        let state = automaton.initial()[0].to.ones().next().unwrap();
        let transitions = automaton.transitions(state);
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].to.len(), 1);
        assert_eq!(automaton.num_states(), 2);
        assert_eq!(automaton.num_transitions(), 2);
    }
}
