//! Generalized Büchi automata obtained by a subset construction
//! on the alternating automaton.

use std::collections::HashMap;
use std::fmt;

use log::trace;
use tinyvec::TinyVec;

use super::alternating::{ATrans, AlternatingAutomaton};
use super::queue::ExplorationQueue;
use super::scc::SccDecomposition;
use super::{resolve_removed, StateStatus};
use crate::ap::ApSet;
use crate::bitset::BitSet;
use crate::nba::Monomial;
use crate::options::TranslationOptions;

/// A transition of the generalized automaton with the set of
/// until states whose obligation it discharges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GTrans {
    pub(crate) to: usize,
    pub(crate) pos: BitSet,
    pub(crate) neg: BitSet,
    pub(crate) fin: BitSet,
}

#[derive(Debug, Clone)]
struct GState {
    id: usize,
    nodes: BitSet,
    incoming: usize,
    scc: usize,
    transitions: Vec<GTrans>,
    status: StateStatus,
}

/// Generalized Büchi automaton whose states are sets of states of
/// the alternating automaton.
///
/// Removed states keep their slot and point to the state replacing them.
#[derive(Debug, Clone)]
pub(crate) struct GeneralizedAutomaton<'a> {
    alternating: &'a AlternatingAutomaton,
    states: Vec<GState>,
    order: Vec<usize>,
    initial: Vec<Option<usize>>,
    final_list: Vec<usize>,
    bad_scc: Vec<bool>,
    next_id: usize,
    use_scc: bool,
}

impl<'a> GeneralizedAutomaton<'a> {
    fn is_live(&self, state: usize) -> bool {
        self.states[state].status == StateStatus::Live
    }

    fn resolve(&self, state: usize) -> Option<usize> {
        resolve_removed(state, |s| self.states[s].status)
    }

    /// Live initial states.
    pub(crate) fn initial_states(&self) -> impl Iterator<Item = usize> + '_ {
        self.initial.iter().flatten().copied()
    }

    /// Live states, oldest first.
    #[cfg(test)]
    fn states(&self) -> &[usize] {
        &self.order
    }

    pub(crate) fn transitions(&self, state: usize) -> &[GTrans] {
        &self.states[state].transitions
    }

    pub(crate) fn id(&self, state: usize) -> usize {
        self.states[state].id
    }

    /// Until states of the alternating automaton, one per acceptance condition.
    pub(crate) fn final_list(&self) -> &[usize] {
        &self.final_list
    }

    /// The smallest id not assigned to any state.
    pub(crate) fn next_id(&self) -> usize {
        self.next_id
    }

    pub(crate) fn aps(&self) -> &ApSet {
        self.alternating.aps()
    }

    pub(crate) fn num_states(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn num_transitions(&self) -> usize {
        self.order
            .iter()
            .map(|&s| self.states[s].transitions.len())
            .sum()
    }

    fn scc_of(&self, state: usize) -> usize {
        self.states[state].scc
    }

    fn is_bad_scc(&self, scc: usize) -> bool {
        self.bad_scc.get(scc).copied().unwrap_or(false)
    }

    /// Checks if both transitions are equal, where the acceptance conditions
    /// are ignored if they are irrelevant within the SCCs of the sources.
    fn same_transition(&self, a: usize, s: &GTrans, b: usize, t: &GTrans, use_scc: bool) -> bool {
        if s.to != t.to || s.pos != t.pos || s.neg != t.neg {
            return false;
        }
        if s.fin == t.fin {
            return true;
        }
        use_scc
            && (self.is_bad_scc(self.scc_of(a))
                || self.is_bad_scc(self.scc_of(b))
                || self.scc_of(a) != self.scc_of(s.to)
                || self.scc_of(b) != self.scc_of(t.to))
    }

    fn all_transitions_match(&self, a: usize, a_trans: &[GTrans], b: usize, use_scc: bool) -> bool {
        let b_trans = &self.states[b].transitions;
        a_trans.iter().all(|s| {
            b_trans
                .iter()
                .any(|t| self.same_transition(a, s, b, t, use_scc))
        }) && b_trans.iter().all(|t| {
            a_trans
                .iter()
                .any(|s| self.same_transition(a, s, b, t, use_scc))
        })
    }

    fn remove_state(&mut self, state: usize, replacement: Option<usize>) {
        let s = &mut self.states[state];
        s.status = StateStatus::Removed(replacement);
        s.transitions.clear();
        self.order.retain(|&o| o != state);
    }

    /// Redirects transitions to removed states to their replacement,
    /// dropping transitions to removed states without one.
    fn retarget_all(&mut self) {
        let initial = std::mem::take(&mut self.initial);
        self.initial = initial
            .into_iter()
            .map(|i| i.and_then(|s| self.resolve(s)))
            .collect();
        for k in 0..self.order.len() {
            let state = self.order[k];
            let transitions = std::mem::take(&mut self.states[state].transitions);
            let transitions = transitions
                .into_iter()
                .filter_map(|mut t| {
                    t.to = self.resolve(t.to)?;
                    Some(t)
                })
                .collect();
            self.states[state].transitions = transitions;
        }
    }

    /// Removes states unreachable from the initial states and determines
    /// which SCCs can not satisfy all acceptance conditions.
    fn simplify_scc(&mut self) {
        if self.order.is_empty() {
            return;
        }
        let successors: Vec<Vec<usize>> = self
            .states
            .iter()
            .map(|s| s.transitions.iter().map(|t| t.to).collect())
            .collect();
        let roots: Vec<usize> = self.initial_states().collect();
        let sccs = SccDecomposition::new(&successors, roots);

        for state in self.order.clone() {
            match sccs.component(state) {
                Some(c) => self.states[state].scc = c,
                None => self.remove_state(state, None),
            }
        }
        let mut scc_final = vec![BitSet::new(); sccs.num_components()];
        for &state in &self.order {
            let scc = self.scc_of(state);
            for t in &self.states[state].transitions {
                if self.scc_of(t.to) == scc {
                    scc_final[scc].union_with(&t.fin);
                }
            }
        }
        let final_set = self.alternating.final_set();
        self.bad_scc = scc_final
            .iter()
            .map(|fin| !fin.is_superset(final_set))
            .collect();
    }

    /// Removes transitions for which another transition to the same state
    /// exists with a weaker guard and at least the same acceptance conditions.
    fn simplify_transitions(&mut self) -> usize {
        let mut changed = 0;
        for k in 0..self.order.len() {
            let state = self.order[k];
            let mut transitions = std::mem::take(&mut self.states[state].transitions);
            let ignore_fin = |automaton: &Self, t: &GTrans| {
                automaton.use_scc
                    && (automaton.scc_of(state) != automaton.scc_of(t.to)
                        || automaton.is_bad_scc(automaton.scc_of(state)))
            };
            let mut i = 0;
            while i < transitions.len() {
                let t = &transitions[i];
                let redundant = transitions.iter().enumerate().any(|(j, t1)| {
                    j != i
                        && t1.to == t.to
                        && t.pos.is_superset(&t1.pos)
                        && t.neg.is_superset(&t1.neg)
                        && (t1.fin.is_superset(&t.fin) || ignore_fin(self, t))
                });
                if redundant {
                    transitions.remove(i);
                    changed += 1;
                } else {
                    i += 1;
                }
            }
            self.states[state].transitions = transitions;
        }
        changed
    }

    /// Merges equivalent states and removes states without transitions.
    fn simplify_states(&mut self) -> usize {
        let mut changed = 0;
        let order = self.order.clone();
        for k in (0..order.len()).rev() {
            let a = order[k];
            if !self.is_live(a) {
                continue;
            }
            if self.states[a].transitions.is_empty() {
                self.remove_state(a, None);
                changed += 1;
                continue;
            }
            let a_trans = &self.states[a].transitions;
            let equivalent = order[..k].iter().rev().copied().find(|&b| {
                self.is_live(b) && self.all_transitions_match(a, a_trans, b, self.use_scc)
            });
            if let Some(b) = equivalent {
                // a state upstream of the other one is trivial
                if self.scc_of(a) > self.scc_of(b) {
                    self.remove_state(a, Some(b));
                } else {
                    self.remove_state(b, Some(a));
                }
                changed += 1;
            }
        }
        self.retarget_all();
        changed
    }

    fn simplify(&mut self) {
        self.simplify_scc();
        self.simplify_transitions();
        self.simplify_scc();
        let mut round = 0;
        while self.simplify_states() != 0 {
            round += 1;
            trace!(
                "Generalized simplification round {}: {} states",
                round,
                self.num_states()
            );
            self.simplify_scc();
            self.simplify_transitions();
            self.simplify_scc();
        }
    }
}

impl<'a> fmt::Display for GeneralizedAutomaton<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "init :")?;
        for state in self.initial_states() {
            writeln!(f, "{}", self.id(state))?;
        }
        for &state in &self.order {
            let s = &self.states[state];
            writeln!(f, "state {} ({}) : {}", s.id, s.nodes, s.scc)?;
            for t in &s.transitions {
                let guard = Monomial::from_literals(&t.pos, &t.neg);
                writeln!(
                    f,
                    "{} -> {} : {}",
                    guard.display(self.aps()),
                    self.id(t.to),
                    t.fin
                )?;
            }
        }
        Ok(())
    }
}

/// Conjunctions of one transition of each factor, skipping contradictions.
///
/// The choices are enumerated like the digits of an odometer, keeping the
/// merged transitions of every prefix of the choices.
struct Products<'b> {
    factors: Vec<&'b [ATrans]>,
    positions: TinyVec<[usize; 8]>,
    partial: Vec<ATrans>,
    done: bool,
}

impl<'b> Products<'b> {
    fn new(factors: Vec<&'b [ATrans]>) -> Self {
        let done = factors.iter().any(|f| f.is_empty());
        let mut positions = TinyVec::with_capacity(factors.len());
        positions.resize(factors.len(), 0);
        Products {
            factors,
            positions,
            partial: vec![ATrans::default()],
            done,
        }
    }

    /// Moves to the next choice at the given level, resetting all deeper levels.
    fn advance(&mut self, level: usize) -> bool {
        let mut level = level;
        loop {
            self.positions[level] += 1;
            if self.positions[level] < self.factors[level].len() {
                for position in &mut self.positions[level + 1..] {
                    *position = 0;
                }
                self.partial.truncate(level + 1);
                return true;
            }
            if level == 0 {
                return false;
            }
            level -= 1;
        }
    }
}

impl<'b> Iterator for Products<'b> {
    type Item = ATrans;

    fn next(&mut self) -> Option<ATrans> {
        if self.done {
            return None;
        }
        let n = self.factors.len();
        while self.partial.len() <= n {
            let level = self.partial.len() - 1;
            let choice = &self.factors[level][self.positions[level]];
            match self.partial[level].merge(choice) {
                Some(merged) => self.partial.push(merged),
                None => {
                    if !self.advance(level) {
                        self.done = true;
                        return None;
                    }
                }
            }
        }
        let product = self.partial.pop();
        if n == 0 || !self.advance(n - 1) {
            self.done = true;
        }
        product
    }
}

/// Explores the generalized automaton from its initial states.
pub(crate) struct GeneralizedConstructor<'a, Q> {
    automaton: GeneralizedAutomaton<'a>,
    mapping: HashMap<BitSet, usize>,
    queue: Q,
    on_the_fly: bool,
    simplify: bool,
}

impl<'a, Q: ExplorationQueue<usize>> GeneralizedConstructor<'a, Q> {
    pub(crate) fn new(
        alternating: &'a AlternatingAutomaton,
        queue: Q,
        options: &TranslationOptions,
    ) -> Self {
        let automaton = GeneralizedAutomaton {
            alternating,
            states: Vec::new(),
            order: Vec::new(),
            initial: Vec::new(),
            final_list: alternating.final_set().ones().collect(),
            bad_scc: Vec::new(),
            next_id: 1,
            use_scc: options.scc_simplification,
        };
        let mut constructor = GeneralizedConstructor {
            automaton,
            mapping: HashMap::new(),
            queue,
            on_the_fly: options.on_the_fly_simplification,
            simplify: options.automata_simplification,
        };
        for t in alternating.initial() {
            let state = constructor.find_or_create(&t.to);
            constructor.automaton.states[state].incoming += 1;
            if !constructor.automaton.initial.contains(&Some(state)) {
                constructor.automaton.initial.push(Some(state));
            }
        }
        constructor
    }

    fn find_or_create(&mut self, nodes: &BitSet) -> usize {
        if let Some(&state) = self.mapping.get(nodes) {
            return state;
        }
        let automaton = &mut self.automaton;
        let id = if nodes.is_empty() {
            0
        } else {
            automaton.next_id += 1;
            automaton.next_id - 1
        };
        let state = automaton.states.len();
        automaton.states.push(GState {
            id,
            nodes: nodes.clone(),
            incoming: 0,
            scc: 0,
            transitions: Vec::new(),
            status: StateStatus::Pending,
        });
        self.mapping.insert(nodes.clone(), state);
        self.queue.push(state);
        state
    }

    /// Checks if the transition discharges the obligation of the until state `i`:
    /// either `i` is not a target, or the other targets and the guard already
    /// entail a transition of `i`.
    fn is_final(&self, t: &ATrans, i: usize) -> bool {
        if !t.to.contains(i) {
            return true;
        }
        let rest = t.to.without(i);
        self.automaton.alternating.transitions(i).iter().any(|ti| {
            rest.is_superset(&ti.to) && t.pos.is_superset(&ti.pos) && t.neg.is_superset(&ti.neg)
        })
    }

    fn explore(&mut self) {
        while let Some(state) = self.queue.pop() {
            if self.automaton.states[state].incoming == 0 {
                // no longer needed, may be recreated on demand
                let nodes = &self.automaton.states[state].nodes;
                self.mapping.remove(nodes);
                self.automaton.states[state].status = StateStatus::Removed(None);
                continue;
            }
            self.make_transitions(state);
        }
    }

    fn make_transitions(&mut self, state: usize) {
        let alternating = self.automaton.alternating;
        let factors: Vec<&[ATrans]> = self.automaton.states[state]
            .nodes
            .ones()
            .map(|node| alternating.transitions(node))
            .collect();

        let mut transitions: Vec<GTrans> = Vec::new();
        for t1 in Products::new(factors) {
            let fin: BitSet = self
                .automaton
                .final_list
                .iter()
                .copied()
                .filter(|&i| self.is_final(&t1, i))
                .collect();

            let mut redundant = false;
            if self.on_the_fly {
                let mut k = 0;
                while k < transitions.len() {
                    let t2 = &transitions[k];
                    let t2_nodes = &self.automaton.states[t2.to].nodes;
                    if t2_nodes.is_superset(&t1.to)
                        && t2.pos.is_superset(&t1.pos)
                        && t2.neg.is_superset(&t1.neg)
                        && fin == t2.fin
                    {
                        let t2 = transitions.remove(k);
                        self.automaton.states[t2.to].incoming -= 1;
                    } else if t1.to.is_superset(t2_nodes)
                        && t1.pos.is_superset(&t2.pos)
                        && t1.neg.is_superset(&t2.neg)
                        && fin == t2.fin
                    {
                        redundant = true;
                        break;
                    } else {
                        k += 1;
                    }
                }
            }
            if !redundant {
                let to = self.find_or_create(&t1.to);
                self.automaton.states[to].incoming += 1;
                transitions.push(GTrans {
                    to,
                    pos: t1.pos,
                    neg: t1.neg,
                    fin,
                });
            }
        }

        if transitions.is_empty() {
            self.automaton.states[state].status = StateStatus::Removed(None);
            return;
        }
        if self.on_the_fly {
            let automaton = &self.automaton;
            let equivalent = automaton
                .order
                .iter()
                .copied()
                .find(|&s1| automaton.all_transitions_match(state, &transitions, s1, false));
            if let Some(s1) = equivalent {
                for t in &transitions {
                    self.automaton.states[t.to].incoming -= 1;
                }
                self.automaton.states[state].status = StateStatus::Removed(Some(s1));
                return;
            }
        }
        let s = &mut self.automaton.states[state];
        s.transitions = transitions;
        s.status = StateStatus::Live;
        self.automaton.order.push(state);
    }

    /// Explores all states and applies the a-posteriori simplifications.
    pub(crate) fn into_automaton(mut self) -> GeneralizedAutomaton<'a> {
        self.explore();
        let mut automaton = self.automaton;
        automaton.retarget_all();
        if self.simplify {
            automaton.simplify();
        } else {
            automaton.simplify_scc();
        }
        automaton
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructor::queue::{BfsQueue, DfsQueue};
    use crate::ltl::LtlArena;

    fn atrans(to: &[usize], pos: &[usize], neg: &[usize]) -> ATrans {
        ATrans {
            to: to.iter().copied().collect(),
            pos: pos.iter().copied().collect(),
            neg: neg.iter().copied().collect(),
        }
    }

    #[test]
    fn test_products() {
        let a = vec![atrans(&[1], &[0], &[]), atrans(&[2], &[], &[0])];
        let b = vec![atrans(&[3], &[0], &[]), atrans(&[4], &[1], &[])];
        let products: Vec<_> = Products::new(vec![&a, &b]).collect();
        assert_eq!(
            products,
            vec![
                atrans(&[1, 3], &[0], &[]),
                atrans(&[1, 4], &[0, 1], &[]),
                atrans(&[2, 4], &[1], &[0]),
            ]
        );

        let empty: Vec<ATrans> = Vec::new();
        assert_eq!(Products::new(vec![&a, &empty]).count(), 0);
        assert_eq!(
            Products::new(Vec::new()).collect::<Vec<_>>(),
            vec![ATrans::default()]
        );
    }

    #[test]
    fn test_first_choice_contradicting_all() {
        let a = vec![atrans(&[], &[0], &[]), atrans(&[], &[1], &[])];
        let b = vec![atrans(&[], &[], &[0])];
        let products: Vec<_> = Products::new(vec![&a, &b]).collect();
        assert_eq!(products, vec![atrans(&[], &[1], &[0])]);
    }

    fn until_automaton(arena: &mut LtlArena, aps: &mut ApSet) -> AlternatingAutomaton {
        let p = arena.ap("p");
        let q = arena.ap("q");
        let until = arena.until(p, q);
        AlternatingAutomaton::new(arena, until, aps, &TranslationOptions::default()).unwrap()
    }

    #[test]
    fn test_until() {
        let mut arena = LtlArena::new();
        let mut aps = ApSet::new();
        let alternating = until_automaton(&mut arena, &mut aps);
        let options = TranslationOptions::default();
        let automaton =
            GeneralizedConstructor::new(&alternating, BfsQueue::with_capacity(16), &options)
                .into_automaton();

        assert_eq!(automaton.num_states(), 2);
        assert_eq!(automaton.num_transitions(), 3);
        assert_eq!(automaton.final_list().len(), 1);
        let init: Vec<_> = automaton.initial_states().collect();
        assert_eq!(init.len(), 1);
        assert_eq!(automaton.id(init[0]), 1);

        let accept_all = automaton
            .states()
            .iter()
            .copied()
            .find(|&s| automaton.id(s) == 0)
            .unwrap();
        let transitions = automaton.transitions(accept_all);
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].to, accept_all);
        assert_eq!(transitions[0].fin.len(), 1);
        assert!(automaton.to_string().starts_with("init :\n1\n"));
    }

    #[test]
    fn test_exploration_orders() {
        let mut arena = LtlArena::new();
        let mut aps = ApSet::new();
        let p = arena.ap("p");
        let q = arena.ap("q");
        let gfp = {
            let fp = arena.finally(p);
            arena.globally(fp)
        };
        let gfq = {
            let fq = arena.finally(q);
            arena.globally(fq)
        };
        let both = arena.and(gfp, gfq);
        let options = TranslationOptions::default();
        let alternating = AlternatingAutomaton::new(&mut arena, both, &mut aps, &options).unwrap();

        let bfs = GeneralizedConstructor::new(&alternating, BfsQueue::with_capacity(16), &options)
            .into_automaton();
        let dfs = GeneralizedConstructor::new(&alternating, DfsQueue::with_capacity(16), &options)
            .into_automaton();
        for automaton in &[bfs, dfs] {
            assert_eq!(automaton.final_list().len(), 2);
            assert_eq!(automaton.initial_states().count(), 1);
            assert!(automaton
                .states()
                .iter()
                .all(|&s| !automaton.transitions(s).is_empty()));
        }
    }
}
