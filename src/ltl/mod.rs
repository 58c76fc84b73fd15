//! Hash-consed formulas of linear temporal logic.

pub mod fragments;
pub mod rewrite;

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;

use crate::ap::ApSet;
use crate::error::TranslationError;
use crate::nba::Monomial;

/// Handle of a formula in an [`LtlArena`].
///
/// As formulas are hash-consed, two handles of the same arena
/// are equal if and only if the formulas are structurally equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LtlIndex(usize);

impl LtlIndex {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for LtlIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node of a formula with references to its operands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LtlNode {
    True,
    False,
    Ap(String),
    Not(LtlIndex),
    Next(LtlIndex),
    Finally(LtlIndex),
    Globally(LtlIndex),
    And(LtlIndex, LtlIndex),
    Or(LtlIndex, LtlIndex),
    Implies(LtlIndex, LtlIndex),
    Equiv(LtlIndex, LtlIndex),
    Until(LtlIndex, LtlIndex),
    Release(LtlIndex, LtlIndex),
}

impl LtlNode {
    /// The left (or only) and right operand of the node.
    pub fn children(&self) -> (Option<LtlIndex>, Option<LtlIndex>) {
        use LtlNode::*;
        match *self {
            True | False | Ap(_) => (None, None),
            Not(l) | Next(l) | Finally(l) | Globally(l) => (Some(l), None),
            And(l, r) | Or(l, r) | Implies(l, r) | Equiv(l, r) | Until(l, r) | Release(l, r) => {
                (Some(l), Some(r))
            }
        }
    }

    /// The name of the operator, as used in error messages.
    pub fn operator(&self) -> &'static str {
        use LtlNode::*;
        match self {
            True => "true",
            False => "false",
            Ap(_) => "ap",
            Not(_) => "!",
            Next(_) => "X",
            Finally(_) => "F",
            Globally(_) => "G",
            And(_, _) => "&&",
            Or(_, _) => "||",
            Implies(_, _) => "->",
            Equiv(_, _) => "<->",
            Until(_, _) => "U",
            Release(_, _) => "V",
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, LtlNode::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, LtlNode::False)
    }
}

/// The concrete syntax used to render a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    /// Infix notation with `&&`, `||`, `U` and `V`.
    Default,
    /// Prefix notation of LBT.
    Lbt,
    /// Syntax of the Spin model checker.
    Spin,
    /// Syntax of the Spot library.
    Spot,
}
impl Default for Syntax {
    fn default() -> Self {
        Self::Default
    }
}

/// An arena of hash-consed formulas.
///
/// Formulas are immutable once created, operations that transform
/// a formula create new nodes in the arena and return their handle.
#[derive(Debug, Default, Clone)]
pub struct LtlArena {
    nodes: Vec<LtlNode>,
    indices: HashMap<LtlNode, LtlIndex>,
}

impl std::ops::Index<LtlIndex> for LtlArena {
    type Output = LtlNode;

    fn index(&self, index: LtlIndex) -> &Self::Output {
        &self.nodes[index.0]
    }
}

impl LtlArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the handle of the given node, adding it if it is not yet present.
    pub fn intern(&mut self, node: LtlNode) -> LtlIndex {
        if let Some(&index) = self.indices.get(&node) {
            return index;
        }
        let index = LtlIndex(self.nodes.len());
        self.nodes.push(node.clone());
        self.indices.insert(node, index);
        index
    }

    pub fn tt(&mut self) -> LtlIndex {
        self.intern(LtlNode::True)
    }

    pub fn ff(&mut self) -> LtlIndex {
        self.intern(LtlNode::False)
    }

    pub fn ap<S: AsRef<str>>(&mut self, name: S) -> LtlIndex {
        self.intern(LtlNode::Ap(name.as_ref().to_owned()))
    }

    pub fn not(&mut self, f: LtlIndex) -> LtlIndex {
        self.intern(LtlNode::Not(f))
    }

    pub fn next(&mut self, f: LtlIndex) -> LtlIndex {
        self.intern(LtlNode::Next(f))
    }

    pub fn finally(&mut self, f: LtlIndex) -> LtlIndex {
        self.intern(LtlNode::Finally(f))
    }

    pub fn globally(&mut self, f: LtlIndex) -> LtlIndex {
        self.intern(LtlNode::Globally(f))
    }

    pub fn and(&mut self, l: LtlIndex, r: LtlIndex) -> LtlIndex {
        self.intern(LtlNode::And(l, r))
    }

    pub fn or(&mut self, l: LtlIndex, r: LtlIndex) -> LtlIndex {
        self.intern(LtlNode::Or(l, r))
    }

    pub fn implies(&mut self, l: LtlIndex, r: LtlIndex) -> LtlIndex {
        self.intern(LtlNode::Implies(l, r))
    }

    pub fn equiv(&mut self, l: LtlIndex, r: LtlIndex) -> LtlIndex {
        self.intern(LtlNode::Equiv(l, r))
    }

    pub fn until(&mut self, l: LtlIndex, r: LtlIndex) -> LtlIndex {
        self.intern(LtlNode::Until(l, r))
    }

    pub fn release(&mut self, l: LtlIndex, r: LtlIndex) -> LtlIndex {
        self.intern(LtlNode::Release(l, r))
    }

    /// Wraps the formula in a negation.
    pub fn negate(&mut self, f: LtlIndex) -> LtlIndex {
        self.not(f)
    }

    /// Rebuilds the node of `f` with the operands mapped by `map`.
    fn map_children<E, M>(&mut self, f: LtlIndex, mut map: M) -> Result<LtlIndex, E>
    where
        M: FnMut(&mut Self, LtlIndex) -> Result<LtlIndex, E>,
    {
        use LtlNode::*;
        let node = match self[f].clone() {
            True | False | Ap(_) => return Ok(f),
            Not(l) => Not(map(self, l)?),
            Next(l) => Next(map(self, l)?),
            Finally(l) => Finally(map(self, l)?),
            Globally(l) => Globally(map(self, l)?),
            And(l, r) => {
                let l = map(self, l)?;
                And(l, map(self, r)?)
            }
            Or(l, r) => {
                let l = map(self, l)?;
                Or(l, map(self, r)?)
            }
            Implies(l, r) => {
                let l = map(self, l)?;
                Implies(l, map(self, r)?)
            }
            Equiv(l, r) => {
                let l = map(self, l)?;
                Equiv(l, map(self, r)?)
            }
            Until(l, r) => {
                let l = map(self, l)?;
                Until(l, map(self, r)?)
            }
            Release(l, r) => {
                let l = map(self, l)?;
                Release(l, map(self, r)?)
            }
        };
        Ok(self.intern(node))
    }

    fn rebuild<M>(&mut self, f: LtlIndex, mut map: M) -> LtlIndex
    where
        M: FnMut(&mut Self, LtlIndex) -> LtlIndex,
    {
        match self.map_children(f, |arena, c| Ok::<_, Infallible>(map(arena, c))) {
            Ok(index) => index,
            Err(never) => match never {},
        }
    }

    /// Number of operator and leaf nodes of the formula, counting shared subformulas
    /// once per occurrence.
    pub fn count_nodes(&self, f: LtlIndex) -> usize {
        let (left, right) = self[f].children();
        1 + left.map_or(0, |l| self.count_nodes(l)) + right.map_or(0, |r| self.count_nodes(r))
    }

    /// Number of occurrences of atomic propositions in the formula.
    pub fn count_predicates(&self, f: LtlIndex) -> usize {
        match &self[f] {
            LtlNode::Ap(_) => 1,
            node => {
                let (left, right) = node.children();
                left.map_or(0, |l| self.count_predicates(l))
                    + right.map_or(0, |r| self.count_predicates(r))
            }
        }
    }

    /// Checks if the formula is free of release and globally operators.
    pub fn is_co_safe(&self, f: LtlIndex) -> bool {
        match &self[f] {
            LtlNode::Release(_, _) | LtlNode::Globally(_) => false,
            node => {
                let (left, right) = node.children();
                left.map_or(true, |l| self.is_co_safe(l))
                    && right.map_or(true, |r| self.is_co_safe(r))
            }
        }
    }

    pub fn has_next_step(&self, f: LtlIndex) -> bool {
        match &self[f] {
            LtlNode::Next(_) => true,
            node => {
                let (left, right) = node.children();
                left.map_or(false, |l| self.has_next_step(l))
                    || right.map_or(false, |r| self.has_next_step(r))
            }
        }
    }

    /// The atomic propositions of the formula in order of their first occurrence.
    pub fn atomic_propositions(&self, f: LtlIndex) -> ApSet {
        let mut aps = ApSet::new();
        self.collect_aps(f, &mut aps);
        aps
    }

    fn collect_aps(&self, f: LtlIndex, aps: &mut ApSet) {
        match &self[f] {
            LtlNode::Ap(name) => {
                aps.add_ap(name);
            }
            node => {
                let (left, right) = node.children();
                if let Some(l) = left {
                    self.collect_aps(l, aps);
                }
                if let Some(r) = right {
                    self.collect_aps(r, aps);
                }
            }
        }
    }

    /// Rewrites equivalence, implication and release into the operators
    /// true, false, atomic propositions, `!`, `&&`, `||`, `X`, `U`, `F` and `G`.
    pub fn to_basic_operators(&mut self, f: LtlIndex) -> LtlIndex {
        match self[f].clone() {
            LtlNode::Equiv(l, r) => {
                let l = self.to_basic_operators(l);
                let r = self.to_basic_operators(r);
                let both_true = self.and(l, r);
                let not_l = self.not(l);
                let not_r = self.not(r);
                let both_false = self.and(not_l, not_r);
                self.or(both_true, both_false)
            }
            LtlNode::Implies(l, r) => {
                let l = self.to_basic_operators(l);
                let r = self.to_basic_operators(r);
                let not_l = self.not(l);
                self.or(not_l, r)
            }
            LtlNode::Release(l, r) => {
                // p V q = !(!p U !q)
                let l = self.to_basic_operators(l);
                let r = self.to_basic_operators(r);
                let not_l = self.not(l);
                let not_r = self.not(r);
                let until = self.until(not_l, not_r);
                self.not(until)
            }
            _ => self.rebuild(f, |arena, c| arena.to_basic_operators(c)),
        }
    }

    /// Replaces every `X φ` by `X (label && φ)`.
    ///
    /// The formula may not contain implications or equivalences.
    pub fn extend_next_step_with_ap(
        &mut self,
        f: LtlIndex,
        label: &str,
    ) -> Result<LtlIndex, TranslationError> {
        match self[f].clone() {
            LtlNode::Next(l) => {
                let l = self.extend_next_step_with_ap(l, label)?;
                let label = self.ap(label);
                let conj = self.and(label, l);
                Ok(self.next(conj))
            }
            node @ LtlNode::Implies(_, _) | node @ LtlNode::Equiv(_, _) => Err(
                TranslationError::not_in_normal_form(node.operator(), "next-step extension"),
            ),
            _ => self.map_children(f, |arena, c| arena.extend_next_step_with_ap(c, label)),
        }
    }

    /// Replaces the prefix `from_prefix` of all atomic propositions
    /// starting with it by `to_prefix`.
    pub fn rename_aps(&mut self, f: LtlIndex, from_prefix: &str, to_prefix: &str) -> LtlIndex {
        match self[f].clone() {
            LtlNode::Ap(name) => match name.strip_prefix(from_prefix) {
                Some(suffix) => self.ap(format!("{}{}", to_prefix, suffix)),
                None => f,
            },
            _ => self.rebuild(f, |arena, c| arena.rename_aps(c, from_prefix, to_prefix)),
        }
    }

    /// Converts a Boolean formula into disjunctive normal form
    /// by distributing conjunctions over disjunctions.
    pub fn to_dnf(&mut self, f: LtlIndex) -> Result<LtlIndex, TranslationError> {
        match self[f].clone() {
            LtlNode::True | LtlNode::False | LtlNode::Ap(_) => Ok(f),
            LtlNode::Not(l) => {
                let l = self.to_dnf(l)?;
                Ok(self.not(l))
            }
            LtlNode::Or(l, r) => {
                let l = self.to_dnf(l)?;
                let r = self.to_dnf(r)?;
                Ok(self.or(l, r))
            }
            LtlNode::And(l, r) => {
                let l = self.to_dnf(l)?;
                let r = self.to_dnf(r)?;
                match (self[l].clone(), self[r].clone()) {
                    (LtlNode::Or(a, b), LtlNode::Or(c, d)) => {
                        let a_c = self.and(a, c);
                        let b_c = self.and(b, c);
                        let a_d = self.and(a, d);
                        let b_d = self.and(b, d);
                        let left = self.or(a_c, b_c);
                        let right = self.or(a_d, b_d);
                        let left = self.to_dnf(left)?;
                        let right = self.to_dnf(right)?;
                        Ok(self.or(left, right))
                    }
                    (LtlNode::Or(a, b), _) => {
                        let a_r = self.and(a, r);
                        let b_r = self.and(b, r);
                        let left = self.to_dnf(a_r)?;
                        let right = self.to_dnf(b_r)?;
                        Ok(self.or(left, right))
                    }
                    (_, LtlNode::Or(a, b)) => {
                        let l_a = self.and(l, a);
                        let l_b = self.and(l, b);
                        let left = self.to_dnf(l_a)?;
                        let right = self.to_dnf(l_b)?;
                        Ok(self.or(left, right))
                    }
                    _ => Ok(self.and(l, r)),
                }
            }
            node => Err(TranslationError::not_in_normal_form(
                node.operator(),
                "disjunctive normal form",
            )),
        }
    }

    /// Converts a conjunction of literals into a monomial over the
    /// indices of the atomic propositions in `aps`, adding missing propositions.
    pub fn to_monomial(&self, f: LtlIndex, aps: &mut ApSet) -> Result<Monomial, TranslationError> {
        const STAGE: &str = "monomial conversion";
        match &self[f] {
            LtlNode::True => Ok(Monomial::tt()),
            LtlNode::False => Ok(Monomial::ff()),
            LtlNode::Ap(name) => Ok(Monomial::literal(aps.add_ap(name), true)),
            LtlNode::Not(l) => match &self[*l] {
                LtlNode::Ap(name) => Ok(Monomial::literal(aps.add_ap(name), false)),
                LtlNode::True => Ok(Monomial::ff()),
                LtlNode::False => Ok(Monomial::tt()),
                node => Err(TranslationError::not_in_normal_form(node.operator(), STAGE)),
            },
            LtlNode::And(l, r) => {
                let l = self.to_monomial(*l, aps)?;
                let r = self.to_monomial(*r, aps)?;
                Ok(l.and(&r))
            }
            node => Err(TranslationError::not_in_normal_form(node.operator(), STAGE)),
        }
    }

    /// Returns a helper to render the formula in the given syntax.
    pub fn display(&self, f: LtlIndex, syntax: Syntax) -> LtlDisplay<'_> {
        LtlDisplay {
            arena: self,
            formula: f,
            syntax,
        }
    }

    /// Renders the syntax tree of the formula in the DOT format,
    /// with shared subformulas drawn once.
    pub fn to_dot(&self, f: LtlIndex) -> String {
        let mut ids = HashMap::new();
        let mut out = String::from("digraph {\n");
        self.dot_node(f, &mut ids, &mut out);
        out.push_str("}\n");
        out
    }

    fn dot_node(&self, f: LtlIndex, ids: &mut HashMap<LtlIndex, usize>, out: &mut String) -> usize {
        if let Some(&id) = ids.get(&f) {
            return id;
        }
        let id = ids.len();
        ids.insert(f, id);
        out.push_str(&format!(
            "{} [label=\"{}\"]\n",
            id,
            self.display(f, Syntax::Lbt)
        ));
        let (left, right) = self[f].children();
        for child in left.into_iter().chain(right) {
            let child_id = self.dot_node(child, ids, out);
            out.push_str(&format!("{} -> {}\n", id, child_id));
        }
        id
    }
}

/// Helper struct to render a formula of an arena.
pub struct LtlDisplay<'a> {
    arena: &'a LtlArena,
    formula: LtlIndex,
    syntax: Syntax,
}

impl<'a> LtlDisplay<'a> {
    fn with(&self, formula: LtlIndex) -> LtlDisplay<'a> {
        LtlDisplay {
            arena: self.arena,
            formula,
            syntax: self.syntax,
        }
    }

    fn fmt_default(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use LtlNode::*;
        let node = &self.arena[self.formula];
        match node {
            True => write!(f, "true"),
            False => write!(f, "false"),
            Ap(name) => write!(f, "{}", name),
            Not(l) | Next(l) | Finally(l) | Globally(l) => {
                write!(f, "{} {}", node.operator(), self.with(*l))
            }
            And(l, r) | Or(l, r) | Implies(l, r) | Equiv(l, r) | Until(l, r) | Release(l, r) => {
                write!(
                    f,
                    "({} {} {})",
                    self.with(*l),
                    node.operator(),
                    self.with(*r)
                )
            }
        }
    }

    fn fmt_lbt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use LtlNode::*;
        let node = &self.arena[self.formula];
        let op = match node {
            True => return write!(f, "t"),
            False => return write!(f, "f"),
            Ap(name) => return write!(f, "{}", name),
            And(_, _) => "&",
            Or(_, _) => "|",
            Implies(_, _) => "i",
            Equiv(_, _) => "e",
            _ => node.operator(),
        };
        match node.children() {
            (Some(l), Some(r)) => write!(f, "{} {} {}", op, self.with(l), self.with(r)),
            (Some(l), None) => write!(f, "{} {}", op, self.with(l)),
            _ => unreachable!(),
        }
    }

    fn fmt_infix(&self, f: &mut fmt::Formatter<'_>, spin: bool) -> fmt::Result {
        use LtlNode::*;
        let node = &self.arena[self.formula];
        let op = match node {
            True => return write!(f, "true"),
            False => return write!(f, "false"),
            Ap(name) => return write!(f, "{}", name),
            And(_, _) if !spin => "&",
            Or(_, _) if !spin => "|",
            Release(_, _) if !spin => "R",
            Finally(_) if spin => "<>",
            Globally(_) if spin => "[]",
            _ => node.operator(),
        };
        match node.children() {
            (Some(l), Some(r)) => write!(f, "({}) {} ({})", self.with(l), op, self.with(r)),
            (Some(l), None) => write!(f, "{} ({})", op, self.with(l)),
            _ => unreachable!(),
        }
    }
}

impl<'a> fmt::Display for LtlDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.syntax {
            Syntax::Default => self.fmt_default(f),
            Syntax::Lbt => self.fmt_lbt(f),
            Syntax::Spin => self.fmt_infix(f, true),
            Syntax::Spot => self.fmt_infix(f, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consing() {
        let mut arena = LtlArena::new();
        let p1 = arena.ap("p");
        let p2 = arena.ap("p");
        let q = arena.ap("q");
        assert_eq!(p1, p2);
        let u1 = arena.until(p1, q);
        let u2 = arena.until(p2, q);
        assert_eq!(u1, u2);
        assert_ne!(u1, arena.release(p1, q));
        assert_eq!(arena.len(), 4);
    }

    #[test]
    fn test_display() {
        let mut arena = LtlArena::new();
        let p = arena.ap("p");
        let q = arena.ap("q");
        let f = arena.finally(p);
        let not_q = arena.not(q);
        let r = arena.release(f, not_q);
        assert_eq!(arena.display(r, Syntax::Default).to_string(), "(F p V ! q)");
        assert_eq!(arena.display(r, Syntax::Lbt).to_string(), "V F p ! q");
        assert_eq!(
            arena.display(r, Syntax::Spin).to_string(),
            "(<> (p)) V (! (q))"
        );
        assert_eq!(arena.display(r, Syntax::Spot).to_string(), "(F (p)) R (! (q))");
    }

    #[test]
    fn test_queries() {
        let mut arena = LtlArena::new();
        let p = arena.ap("p");
        let q = arena.ap("q");
        let xp = arena.next(p);
        let u = arena.until(xp, q);
        let g = arena.globally(u);
        let conj = arena.and(g, p);

        assert_eq!(arena.count_nodes(conj), 7);
        assert_eq!(arena.count_predicates(conj), 3);
        assert!(arena.has_next_step(conj));
        assert!(!arena.is_co_safe(conj));
        assert!(arena.is_co_safe(u));

        let aps = arena.atomic_propositions(conj);
        assert_eq!(aps.iter().collect::<Vec<_>>(), vec!["p", "q"]);
    }

    #[test]
    fn test_to_basic_operators() {
        let mut arena = LtlArena::new();
        let p = arena.ap("p");
        let q = arena.ap("q");
        let imp = arena.implies(p, q);
        let basic = arena.to_basic_operators(imp);
        assert_eq!(arena.display(basic, Syntax::Default).to_string(), "(! p || q)");

        let rel = arena.release(p, q);
        let basic = arena.to_basic_operators(rel);
        assert_eq!(
            arena.display(basic, Syntax::Default).to_string(),
            "! (! p U ! q)"
        );
    }

    #[test]
    fn test_extend_next_step() {
        let mut arena = LtlArena::new();
        let p = arena.ap("p");
        let xp = arena.next(p);
        let f = arena.finally(xp);
        let extended = arena.extend_next_step_with_ap(f, "l").unwrap();
        assert_eq!(
            arena.display(extended, Syntax::Default).to_string(),
            "F X (l && p)"
        );

        let imp = arena.implies(p, xp);
        assert_eq!(
            arena.extend_next_step_with_ap(imp, "l"),
            Err(TranslationError::NotInNormalForm {
                operator: "->",
                stage: "next-step extension"
            })
        );
    }

    #[test]
    fn test_rename_aps() {
        let mut arena = LtlArena::new();
        let l3 = arena.ap("L3");
        let t2 = arena.ap("T2");
        let f = arena.until(l3, t2);
        let renamed = arena.rename_aps(f, "L", "p");
        assert_eq!(arena.display(renamed, Syntax::Default).to_string(), "(p3 U T2)");
    }

    #[test]
    fn test_dnf_and_monomial() {
        let mut arena = LtlArena::new();
        let a = arena.ap("a");
        let b = arena.ap("b");
        let c = arena.ap("c");
        let not_c = arena.not(c);
        let a_or_b = arena.or(a, b);
        let f = arena.and(a_or_b, not_c);
        let dnf = arena.to_dnf(f).unwrap();
        assert_eq!(
            arena.display(dnf, Syntax::Default).to_string(),
            "((a && ! c) || (b && ! c))"
        );

        let mut aps: ApSet = vec!["c", "a"].into_iter().collect();
        let conj = arena.and(a, not_c);
        let monomial = arena.to_monomial(conj, &mut aps).unwrap();
        assert_eq!(monomial.value(1), Some(true));
        assert_eq!(monomial.value(0), Some(false));
        assert!(arena.to_monomial(dnf, &mut aps).is_err());

        let until = arena.until(a, b);
        assert!(arena.to_dnf(until).is_err());
    }

    #[test]
    fn test_to_dot() {
        let mut arena = LtlArena::new();
        let p = arena.ap("p");
        let f = arena.and(p, p);
        assert_eq!(
            arena.to_dot(f),
            "digraph {\n0 [label=\"& p p\"]\n1 [label=\"p\"]\n0 -> 1\n0 -> 1\n}\n"
        );
    }
}
