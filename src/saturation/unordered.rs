/*!
The unordered variant: every rule fires on syntactic matches, with no ordering guards and no unification.

Used when no name is being eliminated --- before a join, the point is to surface shared consequences, and restricting rule firing would hide some.
Non-ground conclusions are admitted, so the meta-variable clauses introduced by dereference kills keep participating.
*/

use std::collections::BTreeSet;

use crate::{
    saturation::{ConsequenceFinder, Decomposition},
    structures::{clause::Clause, literal::Literal, term::Term},
    types::err::SaturationError,
};

/// The decompositions of a clause for unordered rule firing: every literal, both orientations.
pub(crate) fn build_decompositions(c: Clause) -> Vec<Decomposition> {
    let literals = c.literal_set();
    let mut chosen = Vec::new();
    for &l in &literals {
        let Some((a, b)) = l.terms() else { continue };
        let mut rest = literals.clone();
        rest.remove(&l);
        let gamma: BTreeSet<Literal> = rest.iter().copied().filter(|l| l.is_negative()).collect();
        let delta: BTreeSet<Literal> = rest.into_iter().filter(|l| !l.is_negative()).collect();
        for (s, t) in [(a, b), (b, a)] {
            chosen.push(Decomposition {
                negative: l.is_negative(),
                s,
                t,
                gamma: gamma.clone(),
                delta: delta.clone(),
            });
        }
    }
    chosen
}

impl ConsequenceFinder<'_> {
    /// Fires every unordered rule of the popped clause against the kept list.
    pub(crate) fn apply_rules_unordered(&mut self, c: Clause) -> Result<(), SaturationError> {
        let own = self.decompose(c);
        let kept = self.kept_snapshot();

        for d1 in own.iter() {
            for &c2 in &kept {
                if c2 == c {
                    continue;
                }
                let other = self.decompose(c2);
                for d2 in other.iter() {
                    match (d1.negative, d2.negative) {
                        (false, false) => {
                            self.unordered_superposition(d1, d2)?;
                            self.unordered_superposition(d2, d1)?;
                        }
                        (false, true) => self.unordered_superposition(d2, d1)?,
                        (true, false) => self.unordered_superposition(d1, d2)?,
                        (true, true) => {}
                    }
                }
            }

            if d1.negative {
                self.unordered_resolution(d1)?;
            } else {
                for &l in &d1.delta {
                    let Some((a, b)) = l.terms() else { continue };
                    let mut rest = d1.delta.clone();
                    rest.remove(&l);
                    self.unordered_factoring(d1, a, b, &rest)?;
                    self.unordered_factoring(d1, b, a, &rest)?;
                }
            }
        }
        Ok(())
    }

    /// Rewrites every occurrence of the other clause's larger side inside the chosen literal.
    ///
    /// The sign of the conclusion literal follows the chosen literal, covering both the right and the left rule.
    fn unordered_superposition(
        &mut self,
        d1: &Decomposition,
        d2: &Decomposition,
    ) -> Result<(), SaturationError> {
        let paths = d1.s.subterm_paths();
        let Some(locs) = paths.get(&d2.s) else {
            return Ok(());
        };

        let mut surrounding = d1.gamma.clone();
        surrounding.extend(d1.delta.iter().copied());
        surrounding.extend(d2.gamma.iter().copied());
        surrounding.extend(d2.delta.iter().copied());
        if !self.size_bound().admits(surrounding.len() as u32) {
            return Ok(());
        }

        for loc in locs {
            let rewritten = d1.s.replace(loc, d2.t);
            let conclusion = if d1.negative {
                Literal::disequality(rewritten, d1.t)
            } else {
                Literal::equality(rewritten, d1.t)
            };
            let mut literals = surrounding.clone();
            literals.insert(conclusion);
            self.admit_derived(Clause::get(literals))?;
        }
        Ok(())
    }

    /// A negative literal over a single term drops out.
    fn unordered_resolution(&mut self, d: &Decomposition) -> Result<(), SaturationError> {
        if d.s != d.t {
            return Ok(());
        }
        let mut literals = d.gamma.clone();
        literals.extend(d.delta.iter().copied());
        self.admit_derived(Clause::get(literals))
    }

    /// Two positive literals sharing a side collapse, at the price of a disequality over the remaining sides.
    fn unordered_factoring(
        &mut self,
        d: &Decomposition,
        s2: Term,
        t2: Term,
        delta_rest: &BTreeSet<Literal>,
    ) -> Result<(), SaturationError> {
        if d.s != s2 {
            return Ok(());
        }
        let mut literals = d.gamma.clone();
        literals.extend(delta_rest.iter().copied());
        literals.insert(Literal::equality(d.s, t2));
        literals.insert(Literal::disequality(d.t, t2));
        self.admit_derived(Clause::get(literals))
    }
}
