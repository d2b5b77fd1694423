/*!
The ordered rules: superposition, equality resolution, and equality factoring, guarded by the elimination order.

Maximality side-conditions only ever compare ground things: a comparison touching a non-ground term passes, and the admission policy discards any non-ground conclusion afterwards.
*/

use std::{cmp::Ordering, collections::BTreeSet};

use crate::{
    order::EliminationOrder,
    saturation::{assign_literal_set, ConsequenceFinder, Decomposition},
    structures::{clause::Clause, literal::Literal, term::Term},
    types::err::SaturationError,
};

/// The decompositions of a clause for ordered rule firing.
///
/// Every non-ground literal contributes both orientations.
/// Of the ground literals only the order-maximal one contributes, oriented with the larger term left; a positive maximal literal contributes only when its larger side is above both sides of every other positive ground literal.
pub(crate) fn build_decompositions(order: &EliminationOrder, c: Clause) -> Vec<Decomposition> {
    let literals = c.literal_set();
    let ground: BTreeSet<Literal> = literals.iter().copied().filter(|l| l.is_ground()).collect();

    let mut chosen: Vec<(bool, Term, Term, BTreeSet<Literal>)> = Vec::new();

    for &l in literals.iter().filter(|l| !l.is_ground()) {
        let Some((a, b)) = l.terms() else { continue };
        let mut rest = literals.clone();
        rest.remove(&l);
        chosen.push((l.is_negative(), a, b, rest.clone()));
        chosen.push((l.is_negative(), b, a, rest));
    }

    if let Some(l) = order.max_literal(&ground) {
        if let Some((a, b)) = l.terms() {
            let (s, t) = if order.compare_terms(a, b) == Ordering::Less {
                (b, a)
            } else {
                (a, b)
            };

            let eligible = l.is_negative()
                || ground
                    .iter()
                    .filter(|&&other| other != l && !other.is_negative())
                    .all(|other| {
                        let Some((x, y)) = other.terms() else { return true };
                        order.compare_terms(s, x) == Ordering::Greater
                            && order.compare_terms(s, y) == Ordering::Greater
                    });

            if eligible {
                let mut rest = literals.clone();
                rest.remove(&l);
                chosen.push((l.is_negative(), s, t, rest));
            }
        }
    }

    chosen
        .into_iter()
        .map(|(negative, s, t, rest)| {
            let gamma: BTreeSet<Literal> =
                rest.iter().copied().filter(|l| l.is_negative()).collect();
            let delta: BTreeSet<Literal> =
                rest.into_iter().filter(|l| !l.is_negative()).collect();
            Decomposition {
                negative,
                s,
                t,
                gamma,
                delta,
            }
        })
        .collect()
}

fn gt_terms(order: &EliminationOrder, a: Term, b: Term) -> bool {
    if a.is_ground() && b.is_ground() {
        order.compare_terms(a, b) == Ordering::Greater
    } else {
        true
    }
}

fn gt_literals(order: &EliminationOrder, a: Literal, b: Literal) -> bool {
    if a.is_ground() && b.is_ground() {
        order.compare_literals(a, b) == Ordering::Greater
    } else {
        true
    }
}

fn gte_literals(order: &EliminationOrder, a: Literal, b: Literal) -> bool {
    if a.is_ground() && b.is_ground() {
        order.compare_literals(a, b) != Ordering::Less
    } else {
        true
    }
}

fn term_gt_set(order: &EliminationOrder, t: Term, literals: &BTreeSet<Literal>) -> bool {
    if !t.is_ground() {
        return true;
    }
    literals.iter().all(|l| match l.terms() {
        None => true,
        Some((a, b)) => gt_terms(order, t, a) && gt_terms(order, t, b),
    })
}

fn literal_gt_set(order: &EliminationOrder, l: Literal, literals: &BTreeSet<Literal>) -> bool {
    if !l.is_ground() {
        return true;
    }
    literals.iter().all(|&other| gt_literals(order, l, other))
}

fn literal_gte_set(order: &EliminationOrder, l: Literal, literals: &BTreeSet<Literal>) -> bool {
    if !l.is_ground() {
        return true;
    }
    literals.iter().all(|&other| gte_literals(order, l, other))
}

impl ConsequenceFinder<'_> {
    /// Fires every ordered rule of the popped clause against the kept list.
    pub(crate) fn apply_rules_ordered(&mut self, c: Clause) -> Result<(), SaturationError> {
        let Some(target) = self.elimination_target() else {
            return Ok(());
        };
        let c_mentions_target = c.contains_name(target);

        let own = self.decompose(c);
        let kept = self.kept_snapshot();

        for d1 in own.iter() {
            for &c2 in &kept {
                // A pair is only productive when at least one side mentions the target.
                if !c_mentions_target && !c2.contains_name(target) {
                    continue;
                }
                if c2 == c {
                    continue;
                }
                let other = self.decompose(c2);
                for d2 in other.iter() {
                    match (d1.negative, d2.negative) {
                        (false, false) => {
                            self.right_superposition(d1, d2)?;
                            self.right_superposition(d2, d1)?;
                        }
                        (false, true) => self.left_superposition(d2, d1)?,
                        (true, false) => self.left_superposition(d1, d2)?,
                        (true, true) => {}
                    }
                }
            }

            if d1.negative {
                self.equality_resolution(d1)?;
            } else {
                for &l in &d1.delta {
                    let Some((a, b)) = l.terms() else { continue };
                    let mut rest = d1.delta.clone();
                    rest.remove(&l);
                    self.equality_factoring(d1, a, b, &rest)?;
                    self.equality_factoring(d1, b, a, &rest)?;
                }
            }
        }
        Ok(())
    }

    /// Right superposition: rewrites inside the larger side of the positive chosen literal with a positive equation of the other clause.
    fn right_superposition(
        &mut self,
        d1: &Decomposition,
        d2: &Decomposition,
    ) -> Result<(), SaturationError> {
        let paths = d1.s.subterm_paths();
        for (&sub, locs) in paths.iter() {
            if sub.is_var() {
                continue;
            }
            let Some((into, from)) = sub.unify(d2.s) else {
                continue;
            };

            let Some(gamma1) = assign_literal_set(&d1.gamma, into) else { continue };
            let Some(delta1) = assign_literal_set(&d1.delta, into) else { continue };
            let Some(gamma2) = assign_literal_set(&d2.gamma, from) else { continue };
            let Some(delta2) = assign_literal_set(&d2.delta, from) else { continue };

            let s = d1.s.assign(into);
            let t = d1.t.assign(into);
            let l = d2.s.assign(from);
            let r = d2.t.assign(from);

            let rewritten_lit = Literal::equality(s, t);
            let equation_lit = Literal::equality(l, r);
            if rewritten_lit.is_sentinel() || equation_lit.is_sentinel() {
                continue;
            }

            let ord = self.order();
            let conditions = gt_terms(ord, l, r)
                && gt_terms(ord, s, t)
                && term_gt_set(ord, l, &gamma2)
                && term_gt_set(ord, s, &gamma1)
                && literal_gt_set(ord, equation_lit, &delta2)
                && literal_gt_set(ord, rewritten_lit, &delta1);
            if !conditions {
                continue;
            }

            for loc in locs {
                let conclusion_lit = Literal::equality(s.replace(loc, r), t);
                let mut literals = gamma1.clone();
                literals.extend(gamma2.iter().copied());
                literals.extend(delta1.iter().copied());
                literals.extend(delta2.iter().copied());
                literals.insert(conclusion_lit);
                self.admit_derived(Clause::get(literals))?;
            }
        }
        Ok(())
    }

    /// Left superposition: the chosen literal of the first clause is negative; side-conditions relax to `≥` on its side.
    fn left_superposition(
        &mut self,
        d1: &Decomposition,
        d2: &Decomposition,
    ) -> Result<(), SaturationError> {
        let paths = d1.s.subterm_paths();
        for (&sub, locs) in paths.iter() {
            if sub.is_var() {
                continue;
            }
            let Some((into, from)) = sub.unify(d2.s) else {
                continue;
            };

            let Some(gamma1) = assign_literal_set(&d1.gamma, into) else { continue };
            let Some(delta1) = assign_literal_set(&d1.delta, into) else { continue };
            let Some(gamma2) = assign_literal_set(&d2.gamma, from) else { continue };
            let Some(delta2) = assign_literal_set(&d2.delta, from) else { continue };

            let s = d1.s.assign(into);
            let t = d1.t.assign(into);
            let l = d2.s.assign(from);
            let r = d2.t.assign(from);

            let rewritten_lit = Literal::disequality(s, t);
            let equation_lit = Literal::equality(l, r);
            if rewritten_lit.is_sentinel() || equation_lit.is_sentinel() {
                continue;
            }

            let ord = self.order();
            let mut surrounding = gamma1.clone();
            surrounding.extend(delta1.iter().copied());
            let conditions = gt_terms(ord, l, r)
                && gt_terms(ord, s, t)
                && term_gt_set(ord, l, &gamma2)
                && literal_gt_set(ord, equation_lit, &delta2)
                && literal_gte_set(ord, rewritten_lit, &surrounding);
            if !conditions {
                continue;
            }

            for loc in locs {
                let conclusion_lit = Literal::disequality(s.replace(loc, r), t);
                let mut literals = gamma1.clone();
                literals.extend(gamma2.iter().copied());
                literals.extend(delta1.iter().copied());
                literals.extend(delta2.iter().copied());
                literals.insert(conclusion_lit);
                self.admit_derived(Clause::get(literals))?;
            }
        }
        Ok(())
    }

    /// Equality resolution: a negative literal whose sides unify drops out.
    fn equality_resolution(&mut self, d: &Decomposition) -> Result<(), SaturationError> {
        let Some((into, from)) = d.s.unify(d.t) else {
            return Ok(());
        };

        let Some(gamma) = assign_literal_set(&d.gamma, into) else {
            return Ok(());
        };
        let Some(delta) = assign_literal_set(&d.delta, into) else {
            return Ok(());
        };
        let s = d.s.assign(into);
        let t = d.t.assign(into);

        let Some(gamma) = assign_literal_set(&gamma, from) else {
            return Ok(());
        };
        let Some(delta) = assign_literal_set(&delta, from) else {
            return Ok(());
        };
        let s = s.assign(from);
        let t = t.assign(from);

        let resolved = Literal::equality(s, t);
        if resolved == Literal::FALSE {
            return Ok(());
        }
        if resolved != Literal::TRUE {
            let mut surrounding = gamma.clone();
            surrounding.extend(delta.iter().copied());
            if !literal_gte_set(self.order(), resolved, &surrounding) {
                return Ok(());
            }
        }

        let mut literals = gamma;
        literals.extend(delta);
        self.admit_derived(Clause::get(literals))
    }

    /// Equality factoring: two positive literals with unifiable larger sides collapse into one, at the price of a disequality over their smaller sides.
    fn equality_factoring(
        &mut self,
        d: &Decomposition,
        s2: Term,
        t2: Term,
        delta_rest: &BTreeSet<Literal>,
    ) -> Result<(), SaturationError> {
        let Some((into, from)) = d.s.unify(s2) else {
            return Ok(());
        };

        let Some(gamma) = assign_literal_set(&d.gamma, into) else {
            return Ok(());
        };
        let Some(delta) = assign_literal_set(delta_rest, into) else {
            return Ok(());
        };
        let (s1, t1) = (d.s.assign(into), d.t.assign(into));
        let (s2, t2) = (s2.assign(into), t2.assign(into));

        let Some(gamma) = assign_literal_set(&gamma, from) else {
            return Ok(());
        };
        let Some(delta) = assign_literal_set(&delta, from) else {
            return Ok(());
        };
        let (s1, t1) = (s1.assign(from), t1.assign(from));
        let (s2, t2) = (s2.assign(from), t2.assign(from));

        let first = Literal::equality(s1, t1);
        let second = Literal::equality(s2, t2);
        if first == Literal::TRUE || second == Literal::TRUE {
            return Ok(());
        }
        if first.is_sentinel() || second.is_sentinel() {
            return Ok(());
        }

        let ord = self.order();
        let mut against = delta.clone();
        against.insert(second);
        let conditions = gt_terms(ord, s1, t1)
            && term_gt_set(ord, s1, &gamma)
            && literal_gte_set(ord, first, &against);
        if !conditions {
            return Ok(());
        }

        let mut literals = gamma;
        literals.extend(delta);
        literals.insert(Literal::equality(s1, t2));
        literals.insert(Literal::disequality(t1, t2));
        self.admit_derived(Clause::get(literals))
    }
}
