//! Rewriting of formulas: negation pushing, normal forms and simplification.

use super::{LtlArena, LtlIndex, LtlNode, Syntax};
use crate::error::TranslationError;

impl LtlArena {
    /// Pushes the negation at the top of `f` towards the atomic propositions
    /// by one application of the duality laws, and right-associates
    /// conjunctions and disjunctions in the result.
    ///
    /// Fails if `f` is not a negation.
    pub fn push_negation(&mut self, f: LtlIndex) -> Result<LtlIndex, TranslationError> {
        match self[f] {
            LtlNode::Not(operand) => Ok(self.negated(operand)),
            _ => Err(TranslationError::NotANegation {
                formula: self.display(f, Syntax::Default).to_string(),
            }),
        }
    }

    /// The formula `! operand` with the negation pushed inwards.
    pub(crate) fn negated(&mut self, operand: LtlIndex) -> LtlIndex {
        let pushed = self.push_into(operand);
        self.right_linked(pushed)
    }

    fn push_into(&mut self, g: LtlIndex) -> LtlIndex {
        match self[g].clone() {
            LtlNode::True => self.ff(),
            LtlNode::False => self.tt(),
            LtlNode::Ap(_) => self.not(g),
            LtlNode::Not(m) => m,
            LtlNode::Next(l) => {
                let l = self.push_into(l);
                self.next(l)
            }
            LtlNode::Finally(l) => {
                let l = self.push_into(l);
                self.globally(l)
            }
            LtlNode::Globally(l) => {
                let l = self.push_into(l);
                self.finally(l)
            }
            LtlNode::And(l, r) => {
                let l = self.push_into(l);
                let r = self.push_into(r);
                self.or(l, r)
            }
            LtlNode::Or(l, r) => {
                let l = self.push_into(l);
                let r = self.push_into(r);
                self.and(l, r)
            }
            LtlNode::Until(l, r) => {
                let l = self.push_into(l);
                let r = self.push_into(r);
                self.release(l, r)
            }
            LtlNode::Release(l, r) => {
                let l = self.push_into(l);
                let r = self.push_into(r);
                self.until(l, r)
            }
            LtlNode::Implies(l, r) => {
                let r = self.push_into(r);
                self.and(l, r)
            }
            LtlNode::Equiv(l, r) => {
                let not_r = self.push_into(r);
                let not_l = self.push_into(l);
                let left = self.and(l, not_r);
                let right = self.and(not_l, r);
                self.or(left, right)
            }
        }
    }

    /// Right-associates all chains of conjunctions and disjunctions,
    /// keeping the order of the operands.
    pub fn right_linked(&mut self, f: LtlIndex) -> LtlIndex {
        let is_and = match self[f] {
            LtlNode::And(_, _) => true,
            LtlNode::Or(_, _) => false,
            _ => return self.rebuild(f, |arena, c| arena.right_linked(c)),
        };
        let mut operands = Vec::new();
        self.collect_chain(f, is_and, &mut operands);
        let mut operands = operands
            .into_iter()
            .map(|o| self.right_linked(o))
            .collect::<Vec<_>>();
        let mut result = operands.pop().unwrap_or(f);
        while let Some(operand) = operands.pop() {
            result = if is_and {
                self.and(operand, result)
            } else {
                self.or(operand, result)
            };
        }
        result
    }

    fn collect_chain(&self, f: LtlIndex, is_and: bool, operands: &mut Vec<LtlIndex>) {
        match self[f] {
            LtlNode::And(l, r) if is_and => {
                self.collect_chain(l, is_and, operands);
                self.collect_chain(r, is_and, operands);
            }
            LtlNode::Or(l, r) if !is_and => {
                self.collect_chain(l, is_and, operands);
                self.collect_chain(r, is_and, operands);
            }
            _ => operands.push(f),
        }
    }

    /// Conservative syntactic check whether `a` implies `b`.
    pub fn syntactically_implies(&self, a: LtlIndex, b: LtlIndex) -> bool {
        use LtlNode::*;
        let (na, nb) = (&self[a], &self[b]);
        if a == b || nb.is_true() || na.is_false() {
            return true;
        }
        if let And(bl, br) = *nb {
            if self.syntactically_implies(a, bl) && self.syntactically_implies(a, br) {
                return true;
            }
        }
        if let Or(al, ar) = *na {
            if self.syntactically_implies(al, b) && self.syntactically_implies(ar, b) {
                return true;
            }
        }
        if let And(al, ar) = *na {
            if self.syntactically_implies(al, b) || self.syntactically_implies(ar, b) {
                return true;
            }
        }
        if let Or(bl, br) = *nb {
            if self.syntactically_implies(a, bl) || self.syntactically_implies(a, br) {
                return true;
            }
        }
        if let Until(_, br) = *nb {
            if self.syntactically_implies(a, br) {
                return true;
            }
        }
        if let Release(_, ar) = *na {
            if self.syntactically_implies(ar, b) {
                return true;
            }
        }
        if let Until(al, ar) = *na {
            if self.syntactically_implies(al, b) && self.syntactically_implies(ar, b) {
                return true;
            }
        }
        if let Release(bl, br) = *nb {
            if self.syntactically_implies(a, bl) && self.syntactically_implies(a, br) {
                return true;
            }
        }
        match (na, nb) {
            (Until(al, ar), Until(bl, br)) | (Release(al, ar), Release(bl, br)) => {
                self.syntactically_implies(*al, *bl) && self.syntactically_implies(*ar, *br)
            }
            _ => false,
        }
    }

    /// Brings the formula into negation normal form over true, false,
    /// literals, `X`, `&&`, `||`, `U` and `V` without further simplification.
    pub fn negation_normal_form(&mut self, f: LtlIndex) -> LtlIndex {
        self.nnf(f, false)
    }

    fn nnf(&mut self, f: LtlIndex, negate: bool) -> LtlIndex {
        match self[f].clone() {
            LtlNode::True if negate => self.ff(),
            LtlNode::False if negate => self.tt(),
            LtlNode::Ap(_) if negate => self.not(f),
            LtlNode::True | LtlNode::False | LtlNode::Ap(_) => f,
            LtlNode::Not(l) => self.nnf(l, !negate),
            LtlNode::Next(l) => {
                let l = self.nnf(l, negate);
                self.next(l)
            }
            LtlNode::Finally(l) => {
                let l = self.nnf(l, negate);
                if negate {
                    let ff = self.ff();
                    self.release(ff, l)
                } else {
                    let tt = self.tt();
                    self.until(tt, l)
                }
            }
            LtlNode::Globally(l) => {
                let l = self.nnf(l, negate);
                if negate {
                    let tt = self.tt();
                    self.until(tt, l)
                } else {
                    let ff = self.ff();
                    self.release(ff, l)
                }
            }
            LtlNode::And(l, r) | LtlNode::Or(l, r) => {
                let conjunction = matches!(self[f], LtlNode::And(_, _)) != negate;
                let l = self.nnf(l, negate);
                let r = self.nnf(r, negate);
                if conjunction {
                    self.and(l, r)
                } else {
                    self.or(l, r)
                }
            }
            LtlNode::Until(l, r) | LtlNode::Release(l, r) => {
                let until = matches!(self[f], LtlNode::Until(_, _)) != negate;
                let l = self.nnf(l, negate);
                let r = self.nnf(r, negate);
                if until {
                    self.until(l, r)
                } else {
                    self.release(l, r)
                }
            }
            LtlNode::Implies(l, r) => {
                let l = self.nnf(l, !negate);
                let r = self.nnf(r, negate);
                if negate {
                    self.and(l, r)
                } else {
                    self.or(l, r)
                }
            }
            LtlNode::Equiv(l, r) => {
                let pos_l = self.nnf(l, false);
                let neg_l = self.nnf(l, true);
                let pos_r = self.nnf(r, negate);
                let neg_r = self.nnf(r, !negate);
                let left = self.and(pos_l, pos_r);
                let right = self.and(neg_l, neg_r);
                self.or(left, right)
            }
        }
    }

    /// Simplifies the formula bottom-up with a fixed set of local rewrite rules.
    ///
    /// The result is equivalent to the input and in negation normal form
    /// over true, false, literals, `X`, `&&`, `||`, `U` and `V`,
    /// but not necessarily a fixed point of the rules.
    pub fn simplify(&mut self, f: LtlIndex) -> LtlIndex {
        use LtlNode::*;
        let f = self.rebuild(f, |arena, c| arena.simplify(c));
        match self[f].clone() {
            Not(operand) => {
                let pushed = self.negated(operand);
                if matches!(self[pushed], Not(_)) {
                    pushed
                } else {
                    self.simplify(pushed)
                }
            }
            Finally(l) => match self[l] {
                True | False => l,
                Until(ll, _) if self[ll].is_true() => l,
                Until(_, lr) => self.simplify_finally(lr),
                _ => self.simplify_finally(l),
            },
            Globally(l) => match self[l] {
                True | False => l,
                Release(ll, _) if self[ll].is_false() => l,
                // G (p V q) = G q
                Release(_, lr) => self.simplify_globally(lr),
                _ => self.simplify_globally(l),
            },
            Until(l, r) => self.simplify_until(f, l, r),
            Release(l, r) => self.simplify_release(f, l, r),
            Next(l) => match self[l] {
                True | False => l,
                _ if self.is_globally_finally(l) || self.is_finally_globally(l) => l,
                _ => f,
            },
            Implies(l, r) => {
                if self.syntactically_implies(l, r) {
                    return self.tt();
                }
                let not_l = self.negated(l);
                let disjunction = self.or(not_l, r);
                self.right_linked(disjunction)
            }
            Equiv(l, r) => {
                if self.syntactically_implies(l, r) && self.syntactically_implies(r, l) {
                    return self.tt();
                }
                let both = self.and(l, r);
                let both = self.right_linked(both);
                let not_l = self.negated(l);
                let not_r = self.negated(r);
                let neither = self.and(not_l, not_r);
                let neither = self.right_linked(neither);
                let disjunction = self.or(both, neither);
                self.right_linked(disjunction)
            }
            And(l, r) => self.simplify_and(f, l, r),
            Or(l, r) => self.simplify_or(f, l, r),
            True | False | Ap(_) => f,
        }
    }

    fn simplify_finally(&mut self, operand: LtlIndex) -> LtlIndex {
        let tt = self.tt();
        let until = self.until(tt, operand);
        self.simplify(until)
    }

    fn simplify_globally(&mut self, operand: LtlIndex) -> LtlIndex {
        let ff = self.ff();
        let release = self.release(ff, operand);
        self.simplify(release)
    }

    /// Matches `true U (false V _)`.
    fn is_finally_globally(&self, f: LtlIndex) -> bool {
        match self[f] {
            LtlNode::Until(l, r) => {
                self[l].is_true() && matches!(self[r], LtlNode::Release(rl, _) if self[rl].is_false())
            }
            _ => false,
        }
    }

    /// Matches `false V (true U _)`.
    fn is_globally_finally(&self, f: LtlIndex) -> bool {
        match self[f] {
            LtlNode::Release(l, r) => {
                self[l].is_false() && matches!(self[r], LtlNode::Until(rl, _) if self[rl].is_true())
            }
            _ => false,
        }
    }

    fn simplify_until(&mut self, f: LtlIndex, l: LtlIndex, r: LtlIndex) -> LtlIndex {
        use LtlNode::*;
        let (nl, nr) = (self[l].clone(), self[r].clone());
        if nr.is_true() || nr.is_false() || nl.is_false() || self.syntactically_implies(l, r) {
            return r;
        }
        // (p U q) U p = q U p
        if let Until(ll, lr) = nl {
            if ll == r {
                return self.until(lr, r);
            }
        }
        if let Until(rl, _) = nr {
            if self.syntactically_implies(l, rl) {
                return r;
            }
        }
        // X p U X q = X (p U q)
        if let (Next(ll), Next(rl)) = (&nl, &nr) {
            let until = self.until(*ll, *rl);
            return self.next(until);
        }
        if nl.is_true() {
            // F X p = X F p
            if let Next(rl) = nr {
                let until = self.until(l, rl);
                return self.next(until);
            }
            // F G F p = G F p
            if self.is_globally_finally(r) {
                return r;
            }
            return f;
        }
        let not_r = self.negated(r);
        if self.syntactically_implies(not_r, l) {
            let tt = self.tt();
            return self.until(tt, r);
        }
        f
    }

    fn simplify_release(&mut self, f: LtlIndex, l: LtlIndex, r: LtlIndex) -> LtlIndex {
        use LtlNode::*;
        let (nl, nr) = (self[l].clone(), self[r].clone());
        if nr.is_false() || nr.is_true() || nl.is_true() || self.syntactically_implies(r, l) {
            return r;
        }
        if nl.is_false() {
            match nr {
                // G (p V q) = G q
                Release(_, rr) => return self.release(l, rr),
                // G X p = X G p
                Next(rl) => {
                    let release = self.release(l, rl);
                    return self.next(release);
                }
                // G F G p = F G p
                _ if self.is_finally_globally(r) => return r,
                _ => (),
            }
        }
        if let Release(rl, _) = nr {
            if self.syntactically_implies(rl, l) {
                return r;
            }
        }
        if !nl.is_false() {
            let not_r = self.negated(r);
            if self.syntactically_implies(l, not_r) {
                let ff = self.ff();
                return self.release(ff, r);
            }
        }
        f
    }

    fn simplify_and(&mut self, f: LtlIndex, l: LtlIndex, r: LtlIndex) -> LtlIndex {
        use LtlNode::*;
        let (nl, nr) = (self[l].clone(), self[r].clone());
        // p && (q U p) = p
        if matches!(nr, Until(_, rr) if rr == l) {
            return l;
        }
        if matches!(nl, Until(_, lr) if lr == r) {
            return r;
        }
        // p && (q V p) = q V p
        if matches!(nr, Release(_, rr) if rr == l) {
            return r;
        }
        if matches!(nl, Release(_, lr) if lr == r) {
            return l;
        }
        match (&nl, &nr) {
            // (p U q) && (r U q) = (p && r) U q
            (Until(ll, lr), Until(rl, rr)) if lr == rr => {
                let conj = self.and(*ll, *rl);
                return self.until(conj, *lr);
            }
            // (p V q) && (p V r) = p V (q && r)
            (Release(ll, lr), Release(rl, rr)) if ll == rl => {
                let conj = self.and(*lr, *rr);
                return self.release(*rl, conj);
            }
            // X p && X q = X (p && q)
            (Next(ll), Next(rl)) => {
                let conj = self.and(*ll, *rl);
                return self.next(conj);
            }
            // (p V q) && (r U q) = p V q
            (Release(_, lr), Until(_, rr)) if lr == rr => return l,
            _ => (),
        }
        if l == r || nr.is_false() || nl.is_true() || self.syntactically_implies(r, l) {
            return r;
        }
        if nr.is_true() || nl.is_false() || self.syntactically_implies(l, r) {
            return l;
        }
        // F G p && F G q = F G (p && q)
        if self.is_finally_globally(l) && self.is_finally_globally(r) {
            let p = self.innermost_operand(l);
            let q = self.innermost_operand(r);
            let conj = self.and(p, q);
            let ff = self.ff();
            let globally = self.release(ff, conj);
            let tt = self.tt();
            return self.until(tt, globally);
        }
        let not_r = self.negated(r);
        if self.syntactically_implies(l, not_r) {
            return self.ff();
        }
        let not_l = self.negated(l);
        if self.syntactically_implies(r, not_l) {
            return self.ff();
        }
        f
    }

    fn simplify_or(&mut self, f: LtlIndex, l: LtlIndex, r: LtlIndex) -> LtlIndex {
        use LtlNode::*;
        let (nl, nr) = (self[l].clone(), self[r].clone());
        // p || (q U p) = q U p
        if matches!(nr, Until(_, rr) if rr == l) {
            return r;
        }
        // p || (q V p) = p
        if matches!(nr, Release(_, rr) if rr == l) {
            return l;
        }
        // (p U q) || (p U r) = p U (q || r)
        if let (Until(ll, lr), Until(rl, rr)) = (&nl, &nr) {
            if ll == rl {
                let disj = self.or(*lr, *rr);
                return self.until(*rl, disj);
            }
        }
        if l == r || nr.is_false() || nl.is_true() || self.syntactically_implies(r, l) {
            return l;
        }
        if nr.is_true() || nl.is_false() || self.syntactically_implies(l, r) {
            return r;
        }
        match (&nl, &nr) {
            // (p V q) || (r V q) = (p || r) V q
            (Release(ll, lr), Release(rl, rr)) if lr == rr => {
                let disj = self.or(*ll, *rl);
                return self.release(disj, *rr);
            }
            // (p V q) || (r U q) = r U q
            (Release(_, lr), Until(_, rr)) if lr == rr => return r,
            _ => (),
        }
        // G F p || G F q = G F (p || q)
        if self.is_globally_finally(l) && self.is_globally_finally(r) {
            let p = self.innermost_operand(l);
            let q = self.innermost_operand(r);
            let disj = self.or(p, q);
            let tt = self.tt();
            let finally = self.until(tt, disj);
            let ff = self.ff();
            return self.release(ff, finally);
        }
        let not_r = self.negated(r);
        if self.syntactically_implies(not_r, l) {
            return self.tt();
        }
        let not_l = self.negated(l);
        if self.syntactically_implies(not_l, r) {
            return self.tt();
        }
        f
    }

    /// The operand `p` of a formula `_ U (_ V p)` or `_ V (_ U p)`.
    fn innermost_operand(&self, f: LtlIndex) -> LtlIndex {
        match self[f] {
            LtlNode::Until(_, r) | LtlNode::Release(_, r) => match self[r] {
                LtlNode::Until(_, p) | LtlNode::Release(_, p) => p,
                _ => r,
            },
            _ => f,
        }
    }
}
