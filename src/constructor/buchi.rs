//! Degeneralization of the generalized automaton with a counter over
//! the acceptance conditions.

use std::collections::HashMap;
use std::fmt;

use log::trace;

use super::generalized::{GTrans, GeneralizedAutomaton};
use super::queue::ExplorationQueue;
use super::scc::SccDecomposition;
use super::{resolve_removed, StateStatus};
use crate::ap::ApSet;
use crate::bitset::BitSet;
use crate::error::TranslationError;
use crate::nba::{merge_guards, Monomial, Nba, StateIndex};
use crate::options::TranslationOptions;

/// Slot of the initial pseudostate.
const INITIAL: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SccClass {
    /// Not yet determined, treated like a non-trivial SCC.
    Unknown,
    Trivial,
    NonTrivial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BTrans {
    pub(crate) to: usize,
    pub(crate) pos: BitSet,
    pub(crate) neg: BitSet,
}

#[derive(Debug, Clone)]
struct BState {
    /// Display id, `None` for the initial pseudostate.
    id: Option<usize>,
    gstate: Option<usize>,
    fin: usize,
    incoming: usize,
    scc: SccClass,
    transitions: Vec<BTrans>,
    status: StateStatus,
}

/// Büchi automaton whose states pair a state of the generalized automaton
/// with the index of the next acceptance condition to satisfy.
///
/// A state is accepting if its counter equals the number of conditions.
#[derive(Debug, Clone)]
pub(crate) struct BuchiAutomaton<'a> {
    generalized: &'a GeneralizedAutomaton<'a>,
    states: Vec<BState>,
    order: Vec<usize>,
    accept: usize,
    max_id: usize,
    use_scc: bool,
}

impl<'a> BuchiAutomaton<'a> {
    fn is_live(&self, state: usize) -> bool {
        self.states[state].status == StateStatus::Live
    }

    fn resolve(&self, state: usize) -> Option<usize> {
        resolve_removed(state, |s| self.states[s].status)
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

    /// Skips all acceptance conditions from `fin` on that are satisfied by the set.
    fn next_final(&self, set: &BitSet, fin: usize) -> usize {
        let finals = self.generalized.final_list();
        let mut fin = fin;
        while fin != self.accept && set.contains(finals[fin]) {
            fin += 1;
        }
        fin
    }

    /// Checks if both states have the same transitions and either agree on
    /// acceptance or one of them is in a trivial SCC.
    fn all_transitions_match(&self, a: usize, a_trans: &[BTrans], b: usize) -> bool {
        let (sa, sb) = (&self.states[a], &self.states[b]);
        let accepting_differs =
            (sa.fin == self.accept) != (sb.fin == self.accept);
        if accepting_differs && sa.scc != SccClass::Trivial && sb.scc != SccClass::Trivial {
            return false;
        }
        a_trans.iter().all(|s| sb.transitions.contains(s))
            && sb.transitions.iter().all(|t| a_trans.contains(t))
    }

    fn remove_state(&mut self, state: usize, replacement: Option<usize>) {
        let s = &mut self.states[state];
        s.status = StateStatus::Removed(replacement);
        s.transitions.clear();
        self.order.retain(|&o| o != state);
    }

    fn retarget_all(&mut self) {
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

    /// Removes transitions for which another transition to the same state
    /// with a weaker guard exists.
    fn simplify_transitions(&mut self) -> usize {
        let mut changed = 0;
        for k in 0..self.order.len() {
            let transitions = &mut self.states[self.order[k]].transitions;
            let mut i = 0;
            while i < transitions.len() {
                let t = &transitions[i];
                let redundant = transitions.iter().enumerate().any(|(j, t1)| {
                    j != i
                        && t1.to == t.to
                        && t.pos.is_superset(&t1.pos)
                        && t.neg.is_superset(&t1.neg)
                });
                if redundant {
                    transitions.remove(i);
                    changed += 1;
                } else {
                    i += 1;
                }
            }
        }
        changed
    }

    /// Removes states unreachable from the initial state and classifies
    /// the remaining states by their SCC.
    fn simplify_scc(&mut self) {
        if self.order.is_empty() {
            return;
        }
        if !self.is_live(INITIAL) {
            for state in self.order.clone() {
                self.remove_state(state, None);
            }
            return;
        }
        let successors: Vec<Vec<usize>> = self
            .states
            .iter()
            .map(|s| s.transitions.iter().map(|t| t.to).collect())
            .collect();
        let sccs = SccDecomposition::new(&successors, std::iter::once(INITIAL));
        for state in self.order.clone() {
            match sccs.component(state) {
                None => self.remove_state(state, None),
                Some(c) => {
                    self.states[state].scc = if !self.use_scc {
                        SccClass::Unknown
                    } else if sccs.is_trivial(c) {
                        SccClass::Trivial
                    } else {
                        SccClass::NonTrivial
                    }
                }
            }
        }
    }

    /// Merges equivalent states and removes states without transitions.
    fn simplify_states(&mut self) -> usize {
        let mut changed = 0;
        let order = self.order.clone();
        for k in (0..order.len()).rev() {
            let s = order[k];
            if !self.is_live(s) {
                continue;
            }
            if self.states[s].transitions.is_empty() {
                self.remove_state(s, None);
                changed += 1;
                continue;
            }
            let s_trans = &self.states[s].transitions;
            let equivalent = order[..k]
                .iter()
                .rev()
                .copied()
                .find(|&s1| self.is_live(s1) && self.all_transitions_match(s, s_trans, s1));
            if let Some(s1) = equivalent {
                // the acceptance of a trivial SCC does not matter, so s1 may take over the one of s
                if self.states[s1].scc == SccClass::Trivial {
                    self.states[s1].fin = self.states[s].fin;
                    self.states[s1].scc = self.states[s].scc;
                }
                self.remove_state(s, Some(s1));
                changed += 1;
            }
        }
        self.retarget_all();

        // merging may have produced states with equal labels
        for k in (0..self.order.len()).rev() {
            for j in (0..k).rev() {
                let (s, s2) = (self.order[k], self.order[j]);
                if self.states[s].fin == self.states[s2].fin && self.states[s].id == self.states[s2].id
                {
                    self.max_id += 1;
                    self.states[s].id = Some(self.max_id);
                }
            }
        }
        changed
    }

    fn simplify(&mut self) {
        self.simplify_transitions();
        self.simplify_scc();
        let mut round = 0;
        while self.simplify_states() != 0 {
            round += 1;
            trace!(
                "Buchi simplification round {}: {} states",
                round,
                self.num_states()
            );
            self.simplify_transitions();
            self.simplify_scc();
        }
    }

    fn is_accept_all(&self) -> bool {
        self.order.len() == 1 && self.states[self.order[0]].id == Some(0)
    }

    /// Converts the automaton into an [`Nba`] over the same propositions.
    pub(crate) fn to_nba(&self) -> Result<Nba, TranslationError> {
        let mut nba = Nba::new(self.generalized.aps().clone());
        if self.order.is_empty() {
            let state = nba.new_state();
            nba.set_start_state(state);
            nba.set_final(state, false);
            return Ok(nba);
        }
        if self.is_accept_all() {
            let state = nba.new_state();
            nba.set_start_state(state);
            nba.set_final(state, true);
            nba.add_edge(state, Monomial::tt(), state);
            return Ok(nba);
        }

        let mut mapping: Vec<Option<StateIndex>> = vec![None; self.states.len()];
        for &s in &self.order {
            let index = nba.new_state();
            mapping[s] = Some(index);
            let state = &self.states[s];
            if state.id.is_none() {
                nba.set_start_state(index);
            }
            nba.set_final(index, state.fin == self.accept || state.id == Some(0));
        }
        for &s in &self.order {
            let from = match mapping[s] {
                Some(from) => from,
                None => continue,
            };
            let mut targets: Vec<(StateIndex, Vec<Monomial>)> = Vec::new();
            let mut add_guard = |to: StateIndex, guard: Monomial| {
                match targets.iter_mut().find(|(target, _)| *target == to) {
                    Some((_, guards)) => guards.push(guard),
                    None => targets.push((to, vec![guard])),
                }
            };
            for t in &self.states[s].transitions {
                if let Some(to) = mapping[t.to] {
                    add_guard(to, Monomial::from_literals(&t.pos, &t.neg));
                }
            }
            if self.states[s].id == Some(0) {
                add_guard(from, Monomial::tt());
            }
            for (to, guards) in targets {
                for guard in merge_guards(guards) {
                    nba.add_edge(from, guard, to);
                }
            }
        }
        nba.check_connected()?;
        Ok(nba)
    }

    /// Renders the automaton as a Spin never claim.
    pub(crate) fn never_claim<'b>(&'b self, aps: &'b ApSet) -> NeverClaim<'b, 'a> {
        NeverClaim {
            automaton: self,
            aps,
        }
    }

    fn label_prefix(&self, fin: usize) -> String {
        if fin == self.accept {
            "accept_".to_owned()
        } else {
            format!("T{}_", fin)
        }
    }
}

impl<'a> fmt::Display for BuchiAutomaton<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.never_claim(self.generalized.aps()))
    }
}

/// Helper struct to render a Büchi automaton as a never claim.
pub(crate) struct NeverClaim<'b, 'a> {
    automaton: &'b BuchiAutomaton<'a>,
    aps: &'b ApSet,
}

impl<'b, 'a> NeverClaim<'b, 'a> {
    fn write_guard(&self, f: &mut fmt::Formatter<'_>, t: &BTrans) -> fmt::Result {
        let literals = t.pos.union(&t.neg);
        if literals.is_empty() {
            return write!(f, "1");
        }
        for (n, i) in literals.ones().enumerate() {
            if n > 0 {
                write!(f, " && ")?;
            }
            if t.neg.contains(i) {
                write!(f, "!")?;
            }
            match self.aps.get(i) {
                Some(name) => write!(f, "{}", name)?,
                None => write!(f, "{}", i)?,
            }
        }
        Ok(())
    }
}

impl<'b, 'a> fmt::Display for NeverClaim<'b, 'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let automaton = self.automaton;
        if automaton.order.is_empty() {
            return writeln!(f, "never {{\nT0_init:\n\tfalse;\n}}");
        }
        if automaton.is_accept_all() {
            return writeln!(
                f,
                "never {{\naccept_init:\n\tif\n\t:: (1) . goto accept_init\n\tfi;\n}}"
            );
        }

        writeln!(f, "never {{")?;
        let mut accept_all = false;
        for &s in &automaton.order {
            let state = &automaton.states[s];
            let id = match state.id {
                Some(0) => {
                    accept_all = true;
                    continue;
                }
                Some(id) => format!("S{}", id),
                None => "init".to_owned(),
            };
            writeln!(f, "{}{}:", automaton.label_prefix(state.fin), id)?;
            if state.transitions.is_empty() {
                writeln!(f, "\tfalse;")?;
                continue;
            }
            writeln!(f, "\tif")?;
            let transitions = &state.transitions;
            let mut printed = vec![false; transitions.len()];
            for i in 0..transitions.len() {
                if printed[i] {
                    continue;
                }
                let target = &automaton.states[transitions[i].to];
                write!(f, "\t:: (")?;
                self.write_guard(f, &transitions[i])?;
                for j in i + 1..transitions.len() {
                    let other = &automaton.states[transitions[j].to];
                    if !printed[j] && other.id == target.id && other.fin == target.fin {
                        write!(f, ") || (")?;
                        self.write_guard(f, &transitions[j])?;
                        printed[j] = true;
                    }
                }
                let target_id = match target.id {
                    Some(0) => "all".to_owned(),
                    Some(id) => format!("S{}", id),
                    None => "init".to_owned(),
                };
                writeln!(
                    f,
                    ") . goto {}{}",
                    automaton.label_prefix(target.fin),
                    target_id
                )?;
            }
            writeln!(f, "\tfi;")?;
        }
        if accept_all {
            writeln!(f, "accept_all:\n\tskip")?;
        }
        writeln!(f, "}}")
    }
}

/// Explores the Büchi automaton from its initial pseudostate.
pub(crate) struct BuchiConstructor<'a, Q> {
    automaton: BuchiAutomaton<'a>,
    mapping: HashMap<(usize, usize), usize>,
    queue: Q,
    on_the_fly: bool,
    simplify: bool,
}

impl<'a, Q: ExplorationQueue<usize>> BuchiConstructor<'a, Q> {
    pub(crate) fn new(
        generalized: &'a GeneralizedAutomaton<'a>,
        queue: Q,
        options: &TranslationOptions,
    ) -> Self {
        let initial = BState {
            id: None,
            gstate: None,
            fin: 0,
            incoming: 1,
            scc: SccClass::Unknown,
            transitions: Vec::new(),
            status: StateStatus::Live,
        };
        let automaton = BuchiAutomaton {
            generalized,
            states: vec![initial],
            order: vec![INITIAL],
            accept: generalized.final_list().len(),
            max_id: generalized.next_id(),
            use_scc: options.scc_simplification,
        };
        let mut constructor = BuchiConstructor {
            automaton,
            mapping: HashMap::new(),
            queue,
            on_the_fly: options.on_the_fly_simplification,
            simplify: options.automata_simplification,
        };
        let mut transitions = Vec::new();
        for g in generalized.initial_states() {
            for t in generalized.transitions(g) {
                let fin = constructor.automaton.next_final(&t.fin, 0);
                constructor.add_transition(&mut transitions, t, fin);
            }
        }
        constructor.automaton.states[INITIAL].transitions = transitions;
        constructor
    }

    fn find_or_create(&mut self, gstate: usize, fin: usize) -> usize {
        if let Some(&state) = self.mapping.get(&(gstate, fin)) {
            return state;
        }
        let automaton = &mut self.automaton;
        let state = automaton.states.len();
        automaton.states.push(BState {
            id: Some(automaton.generalized.id(gstate)),
            gstate: Some(gstate),
            fin,
            incoming: 0,
            scc: SccClass::Unknown,
            transitions: Vec::new(),
            status: StateStatus::Pending,
        });
        self.mapping.insert((gstate, fin), state);
        self.queue.push(state);
        state
    }

    fn add_transition(&mut self, transitions: &mut Vec<BTrans>, t: &GTrans, fin: usize) {
        let to = self.find_or_create(t.to, fin);
        if self.on_the_fly {
            let mut k = 0;
            while k < transitions.len() {
                let t1 = &transitions[k];
                if t1.to == to && t1.pos.is_superset(&t.pos) && t1.neg.is_superset(&t.neg) {
                    transitions.remove(k);
                    self.automaton.states[to].incoming -= 1;
                } else if t1.to == to && t.pos.is_superset(&t1.pos) && t.neg.is_superset(&t1.neg) {
                    return;
                } else {
                    k += 1;
                }
            }
        }
        self.automaton.states[to].incoming += 1;
        transitions.push(BTrans {
            to,
            pos: t.pos.clone(),
            neg: t.neg.clone(),
        });
    }

    fn explore(&mut self) {
        while let Some(state) = self.queue.pop() {
            let s = &self.automaton.states[state];
            if s.incoming == 0 {
                if let Some(gstate) = s.gstate {
                    self.mapping.remove(&(gstate, s.fin));
                }
                self.automaton.states[state].status = StateStatus::Removed(None);
                continue;
            }
            self.make_transitions(state);
        }
    }

    fn make_transitions(&mut self, state: usize) {
        let gstate = match self.automaton.states[state].gstate {
            Some(gstate) => gstate,
            None => return,
        };
        let fin = self.automaton.states[state].fin;
        let start = if fin == self.automaton.accept { 0 } else { fin };
        let generalized = self.automaton.generalized;

        let mut transitions = Vec::new();
        for t in generalized.transitions(gstate) {
            let fin = self.automaton.next_final(&t.fin, start);
            self.add_transition(&mut transitions, t, fin);
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
                .find(|&s1| automaton.all_transitions_match(state, &transitions, s1));
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
    pub(crate) fn into_automaton(mut self) -> BuchiAutomaton<'a> {
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
    use crate::constructor::alternating::AlternatingAutomaton;
    use crate::constructor::generalized::GeneralizedConstructor;
    use crate::constructor::queue::BfsQueue;
    use crate::ltl::{LtlArena, LtlIndex};

    fn with_buchi<F>(arena: &mut LtlArena, f: LtlIndex, aps: &mut ApSet, check: F)
    where
        F: FnOnce(&BuchiAutomaton<'_>),
    {
        let options = TranslationOptions::default();
        let alternating = AlternatingAutomaton::new(arena, f, aps, &options).unwrap();
        let generalized =
            GeneralizedConstructor::new(&alternating, BfsQueue::with_capacity(16), &options)
                .into_automaton();
        let buchi = BuchiConstructor::new(&generalized, BfsQueue::with_capacity(16), &options)
            .into_automaton();
        check(&buchi);
    }

    #[test]
    fn test_until_never_claim() {
        let mut arena = LtlArena::new();
        let mut aps: ApSet = vec!["p", "q"].into_iter().collect();
        let p = arena.ap("p");
        let q = arena.ap("q");
        let until = arena.until(p, q);
        let expected = "never {\n\
                        T0_init:\n\
                        \tif\n\
                        \t:: (q) . goto accept_all\n\
                        \t:: (p) . goto T0_init\n\
                        \tfi;\n\
                        accept_all:\n\
                        \tskip\n\
                        }\n";
        with_buchi(&mut arena, until, &mut aps, |buchi| {
            assert_eq!(buchi.num_states(), 2);
            assert_eq!(buchi.to_string(), expected);
        });
    }

    #[test]
    fn test_constant_never_claims() {
        let mut arena = LtlArena::new();
        let mut aps = ApSet::new();
        let tt = arena.tt();
        let ff = arena.ff();
        with_buchi(&mut arena, tt, &mut aps, |buchi| {
            assert_eq!(
                buchi.to_string(),
                "never {\naccept_init:\n\tif\n\t:: (1) . goto accept_init\n\tfi;\n}\n"
            );
        });
        with_buchi(&mut arena, ff, &mut aps, |buchi| {
            assert_eq!(buchi.num_states(), 0);
            assert_eq!(buchi.to_string(), "never {\nT0_init:\n\tfalse;\n}\n");
        });
    }

    #[test]
    fn test_disjunctive_guards_share_a_line() {
        let mut arena = LtlArena::new();
        let mut aps = ApSet::new();
        let p = arena.ap("p");
        let q = arena.ap("q");
        let r = arena.ap("r");
        // (p || q) U r
        let or = arena.or(p, q);
        let until = arena.until(or, r);
        with_buchi(&mut arena, until, &mut aps, |buchi| {
            let claim = buchi.to_string();
            assert!(
                claim.contains("(p) || (q) . goto T0_init")
                    || claim.contains("(q) || (p) . goto T0_init")
            );
            assert!(claim.contains("\t:: (r) . goto accept_all\n"));
        });
    }

    #[test]
    fn test_globally_finally_has_accepting_cycle() {
        let mut arena = LtlArena::new();
        let mut aps = ApSet::new();
        let p = arena.ap("p");
        let fp = arena.finally(p);
        let gfp = arena.globally(fp);
        with_buchi(&mut arena, gfp, &mut aps, |buchi| {
            let nba = buchi.to_nba().unwrap();
            assert!(nba.states().any(|s| nba.is_final(s)));
            assert!(nba.start_state().is_some());
        });
    }
}
