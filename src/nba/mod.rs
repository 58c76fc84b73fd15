//! The exported nondeterministic Büchi automaton.

mod monomial;

use std::collections::VecDeque;
use std::fmt;
use std::ops::Index;

use log::error;

use crate::ap::ApSet;
use crate::bitset::BitSet;
use crate::constructor::scc::SccDecomposition;
use crate::error::TranslationError;

pub use monomial::{merge_guards, Monomial, MonomialDisplay};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateIndex(usize);

impl StateIndex {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for StateIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NbaEdge {
    guard: Monomial,
    successor: StateIndex,
}

impl NbaEdge {
    pub fn guard(&self) -> &Monomial {
        &self.guard
    }

    pub fn successor(&self) -> StateIndex {
        self.successor
    }
}

#[derive(Debug, Clone, Default)]
pub struct NbaState {
    accepting: bool,
    edges: Vec<NbaEdge>,
}

impl NbaState {
    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    pub fn edges(&self) -> &[NbaEdge] {
        &self.edges
    }
}

/// A Büchi automaton with state-based acceptance and edges labelled
/// by monomials over the indices of an AP table.
#[derive(Debug, Clone)]
pub struct Nba {
    aps: ApSet,
    states: Vec<NbaState>,
    start: Option<StateIndex>,
}

impl Nba {
    pub fn new(aps: ApSet) -> Self {
        Nba {
            aps,
            states: Vec::new(),
            start: None,
        }
    }

    pub fn new_state(&mut self) -> StateIndex {
        let index = StateIndex(self.states.len());
        self.states.push(NbaState::default());
        index
    }

    pub fn set_start_state(&mut self, state: StateIndex) {
        self.start = Some(state);
    }

    pub fn start_state(&self) -> Option<StateIndex> {
        self.start
    }

    pub fn set_final(&mut self, state: StateIndex, accepting: bool) {
        self.states[state.0].accepting = accepting;
    }

    pub fn is_final(&self, state: StateIndex) -> bool {
        self.states[state.0].accepting
    }

    pub fn add_edge(&mut self, from: StateIndex, guard: Monomial, to: StateIndex) {
        self.states[from.0].edges.push(NbaEdge {
            guard,
            successor: to,
        });
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_edges(&self) -> usize {
        self.states.iter().map(|s| s.edges.len()).sum()
    }

    pub fn aps(&self) -> &ApSet {
        &self.aps
    }

    pub fn states(&self) -> impl Iterator<Item = StateIndex> {
        (0..self.states.len()).map(StateIndex)
    }

    pub fn edges(&self, state: StateIndex) -> &[NbaEdge] {
        &self.states[state.0].edges
    }

    /// Returns the states reached from `state` when reading the letter,
    /// given as the set of indices of the true propositions.
    pub fn successors(&self, state: StateIndex, letter: &BitSet) -> BitSet {
        self.edges(state)
            .iter()
            .filter(|e| e.guard.satisfied_by(letter))
            .map(|e| e.successor.0)
            .collect()
    }

    pub fn reachable_states(&self) -> BitSet {
        let mut reachable = BitSet::with_capacity(self.num_states());
        let mut queue = VecDeque::new();
        if let Some(start) = self.start {
            reachable.insert(start.0);
            queue.push_back(start);
        }
        while let Some(state) = queue.pop_front() {
            for edge in self.edges(state) {
                if !reachable.contains(edge.successor.0) {
                    reachable.insert(edge.successor.0);
                    queue.push_back(edge.successor);
                }
            }
        }
        reachable
    }

    /// Checks that every state is reachable from the start state.
    pub fn check_connected(&self) -> Result<(), TranslationError> {
        let unreachable = self.num_states() - self.reachable_states().len();
        if unreachable > 0 {
            error!(
                "{} of {} states not reachable from start state",
                unreachable,
                self.num_states()
            );
            return Err(TranslationError::UnreachableStates { unreachable });
        }
        Ok(())
    }

    /// Checks if every letter enables edges to at most one successor in each state.
    pub fn is_deterministic(&self) -> bool {
        self.states.iter().all(|state| {
            state.edges.iter().enumerate().all(|(i, e1)| {
                state.edges[i + 1..].iter().all(|e2| {
                    e1.successor == e2.successor || !e1.guard.intersects(&e2.guard)
                })
            })
        })
    }

    /// Clears the acceptance flag of final states that no run can visit twice,
    /// i.e. states forming a trivial SCC. Returns the number of changed states.
    pub fn remove_redundant_final_states(&mut self) -> usize {
        let successors: Vec<Vec<usize>> = self
            .states
            .iter()
            .map(|s| s.edges.iter().map(|e| e.successor.0).collect())
            .collect();
        let sccs = SccDecomposition::new(&successors, 0..self.states.len());
        let mut changed = 0;
        for (index, state) in self.states.iter_mut().enumerate() {
            let trivial = sccs
                .component(index)
                .map_or(true, |c| sccs.is_trivial(c));
            if state.accepting && trivial {
                state.accepting = false;
                changed += 1;
            }
        }
        changed
    }
}

impl Index<StateIndex> for Nba {
    type Output = NbaState;

    fn index(&self, index: StateIndex) -> &Self::Output {
        &self.states[index.0]
    }
}

impl fmt::Display for Nba {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // write header
        writeln!(f, "HOA: v1")?;
        writeln!(
            f,
            "tool: \"{}\" \"{}\"",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        )?;
        writeln!(f, "States: {}", self.num_states())?;
        if let Some(start) = self.start {
            writeln!(f, "Start: {}", start)?;
        }
        write!(f, "AP: {}", self.aps.len())?;
        for ap in self.aps.iter() {
            write!(f, " \"{}\"", ap)?;
        }
        writeln!(f)?;
        writeln!(f, "acc-name: Buchi")?;
        writeln!(f, "Acceptance: 1 Inf(0)")?;
        writeln!(
            f,
            "properties: trans-labels explicit-labels state-acc no-univ-branch"
        )?;

        // write body
        writeln!(f, "--BODY--")?;
        for (index, state) in self.states.iter().enumerate() {
            if state.accepting {
                writeln!(f, "State: {} {{0}}", index)?;
            } else {
                writeln!(f, "State: {}", index)?;
            }
            for edge in &state.edges {
                writeln!(f, "[{}] {}", edge.guard, edge.successor)?;
            }
        }
        writeln!(f, "--END--")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> Nba {
        // a U b over {a, b}
        let aps: ApSet = vec!["a", "b"].into_iter().collect();
        let mut nba = Nba::new(aps);
        let init = nba.new_state();
        let all = nba.new_state();
        nba.set_start_state(init);
        nba.set_final(all, true);
        let mut a_not_b = Monomial::literal(0, true);
        a_not_b.and_literal(1, false);
        nba.add_edge(init, a_not_b, init);
        nba.add_edge(init, Monomial::literal(1, true), all);
        nba.add_edge(all, Monomial::tt(), all);
        nba
    }

    #[test]
    fn test_hoa_output() {
        let nba = example();
        let hoa = nba.to_string();
        let expected_body = "--BODY--\nState: 0\n[0&!1] 0\n[1] 1\nState: 1 {0}\n[t] 1\n--END--\n";
        assert!(hoa.starts_with("HOA: v1\n"));
        assert!(hoa.contains("States: 2\nStart: 0\nAP: 2 \"a\" \"b\"\n"));
        assert!(hoa.contains("Acceptance: 1 Inf(0)\n"));
        assert!(hoa.ends_with(expected_body));
    }

    #[test]
    fn test_successors_and_reachability() {
        let mut nba = example();
        let init = StateIndex(0);
        let letter: BitSet = vec![0].into_iter().collect();
        assert_eq!(nba.successors(init, &letter), BitSet::singleton(0));
        let letter: BitSet = vec![0, 1].into_iter().collect();
        assert_eq!(nba.successors(init, &letter), BitSet::singleton(1));
        assert!(nba.successors(init, &BitSet::new()).is_empty());

        assert_eq!(nba.reachable_states().len(), 2);
        assert!(nba.check_connected().is_ok());
        nba.new_state();
        assert_eq!(
            nba.check_connected(),
            Err(TranslationError::UnreachableStates { unreachable: 1 })
        );
    }

    #[test]
    fn test_determinism() {
        let mut nba = example();
        assert!(nba.is_deterministic());
        let init = StateIndex(0);
        nba.add_edge(init, Monomial::literal(0, true), StateIndex(1));
        assert!(!nba.is_deterministic());
    }

    #[test]
    fn test_redundant_final_states() {
        let mut nba = example();
        assert_eq!(nba.remove_redundant_final_states(), 0);
        nba.set_final(StateIndex(0), true);
        assert_eq!(nba.remove_redundant_final_states(), 0);

        let mut nba = Nba::new(ApSet::new());
        let first = nba.new_state();
        let second = nba.new_state();
        nba.set_start_state(first);
        nba.set_final(first, true);
        nba.set_final(second, true);
        nba.add_edge(first, Monomial::tt(), second);
        nba.add_edge(second, Monomial::tt(), second);
        assert_eq!(nba.remove_redundant_final_states(), 1);
        assert!(!nba.is_final(first));
        assert!(nba.is_final(second));
    }
}
