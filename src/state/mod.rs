/*!
The symbolic abstract domain: sets of clauses, conjunctively interpreted.

An element over-approximates the set of reachable machine states by a finite conjunction of equational clauses.
Between public operations two invariants hold:

- No clause is strictly subsumed by another clause of the set.
- Every clause respects the configured size and rank bounds.

The transformers implement strongest postconditions over the clause representation:

- [handle_assignment](AbstractState::handle_assignment) flattens nested operands through temporaries so that the kill step only ever faces atomic or simple-deref destinations.
- [kill](AbstractState::kill) on a dereference renames the cell out of the way and adds the two-case expansion `∀X. [X] = old[X] ∨ X = a` --- every cell either kept its value, or is the written address.
- [kill_name](AbstractState::kill_name) projects a name out of the state: the consequence finder saturates with the name as elimination target, then every clause still mentioning it is dropped.

Joins are by [merge](AbstractState::merge): saturate both sides, keep the intersection, and cover the leftovers by pairwise disjunctions.
Saturating first lets the intersection capture shared *consequences* rather than syntactic overlap.

Operations that can run saturation return `Result`; the [empty-clause signal](crate::types::err::SaturationError) marks the state infeasible, and the driver recovers by dropping the edge.
*/

use std::{
    collections::BTreeSet,
    fmt,
    sync::atomic::{AtomicU64, Ordering as AtomicOrdering},
};

use ustr::ustr;

use crate::{
    config::{Config, DerefUpdate},
    misc::log::targets,
    program::{Assertion, Cond},
    saturation::ConsequenceFinder,
    smt,
    structures::{
        atom::Atom,
        clause::Clause,
        literal::Literal,
        term::{Name, Term, DEREF_NAME},
    },
    types::err::SaturationError,
};

/// Source of fresh marker names for in-flight dereference kills.
///
/// A fresh marker per invocation keeps nested kills from colliding.
static KILL_MARKERS: AtomicU64 = AtomicU64::new(0);

/// A set of clauses, conjunctively interpreted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AbstractState {
    clauses: BTreeSet<Clause>,
}

impl AbstractState {
    /// The empty state, satisfied by every machine state.
    pub fn new() -> AbstractState {
        AbstractState::default()
    }

    /// A state holding the given clauses.
    pub fn from_clauses(clauses: impl IntoIterator<Item = Clause>) -> AbstractState {
        AbstractState {
            clauses: clauses.into_iter().collect(),
        }
    }

    /// The number of clauses.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Whether the state holds no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Whether the clause is in the state.
    pub fn contains(&self, c: Clause) -> bool {
        self.clauses.contains(&c)
    }

    /// An iterator over the clauses, in identity order.
    pub fn iter(&self) -> impl Iterator<Item = Clause> + '_ {
        self.clauses.iter().copied()
    }

    /// Inserts a clause; tautologies are ignored.
    pub fn add_clause(&mut self, clause: Option<Clause>) {
        if let Some(c) = clause {
            self.clauses.insert(c);
        }
    }

    /// Inserts the unit clause `{t1 = t2}`, or `{t1 ≠ t2}` when `negative`.
    pub fn add_eq(&mut self, t1: Term, t2: Term, negative: bool) {
        self.add_clause(Clause::get([Literal::get(Atom::get(t1, t2), negative)]));
    }

    /// Removes the given clauses.
    pub fn remove_clauses(&mut self, clauses: &BTreeSet<Clause>) {
        for c in clauses {
            self.clauses.remove(c);
        }
    }

    /// Removes a single clause.
    pub fn remove_clause(&mut self, c: Clause) {
        self.clauses.remove(&c);
    }

    pub(crate) fn insert_clause(&mut self, c: Clause) {
        self.clauses.insert(c);
    }

    /// Whether the clause is strictly subsumed by a clause of the state.
    ///
    /// When the clause is small relative to the state it is cheaper to enumerate its proper sub-clauses and test membership than to scan the state.
    pub fn is_subsumed(&self, c: Clause) -> bool {
        let len = c.len();
        if len < 20 && ((1i64 << len) - 2) < self.clauses.len() as i64 {
            c.proper_subclauses()
                .into_iter()
                .any(|sub| self.clauses.contains(&sub))
        } else {
            self.clauses
                .iter()
                .any(|&c2| c2 != c && c2.subsumes(c))
        }
    }

    /// Removes every strictly subsumed clause.
    pub fn compactify(&mut self) {
        let subsumed: BTreeSet<Clause> = self
            .clauses
            .iter()
            .copied()
            .filter(|&c| self.is_subsumed(c))
            .collect();
        self.remove_clauses(&subsumed);
    }

    /// Renames a name throughout the state.
    pub fn rename(&mut self, old_name: Name, new_name: Name) {
        self.clauses = self
            .clauses
            .iter()
            .filter_map(|c| c.rename(old_name, new_name))
            .collect();
    }

    /// The state with every clause primed.
    pub fn prime(&self) -> AbstractState {
        AbstractState {
            clauses: self.clauses.iter().filter_map(|c| c.prime()).collect(),
        }
    }

    /// Converts edge assertions into clauses, then reports feasibility.
    ///
    /// Returns `false` when the solver refutes the extended state; the caller drops the edge.
    pub fn handle_assertions(&mut self, assertions: &[Assertion]) -> bool {
        for a in assertions {
            match a.cond {
                Cond::Eq => self.add_eq(a.lhs, a.rhs, false),
                Cond::Ne => self.add_eq(a.lhs, a.rhs, true),
                // Only `ge` and `gt` heads ever enter the term language: the lower conditions assert the negated upper ones.
                Cond::Le => self.add_eq(
                    Term::cmp("gt", a.lhs, a.rhs),
                    Term::boolean(true),
                    true,
                ),
                Cond::Lt => self.add_eq(
                    Term::cmp("ge", a.lhs, a.rhs),
                    Term::boolean(true),
                    true,
                ),
                Cond::Gt => self.add_eq(
                    Term::cmp("gt", a.lhs, a.rhs),
                    Term::boolean(true),
                    false,
                ),
                Cond::Ge => self.add_eq(
                    Term::cmp("ge", a.lhs, a.rhs),
                    Term::boolean(true),
                    false,
                ),
            }
        }

        if !smt::feasible(self) {
            log::trace!(target: targets::STATE, "assertions made the state infeasible");
            return false;
        }

        self.compactify();
        true
    }

    /// The strongest postcondition of `dst := src`, with `None` as havoc.
    ///
    /// Nested compound sub-terms are hoisted into fresh temporaries by recursive self-calls, so the final single assignment has flat operands.
    /// A destination name occurring in the source is routed via an intermediate temporary.
    /// Every temporary introduced here is killed before returning.
    pub fn handle_assignment(
        &mut self,
        dst: Term,
        src: Option<Term>,
        cfg: &Config,
    ) -> Result<(), SaturationError> {
        log::trace!(target: targets::STATE, "assign {dst} := {src:?}");

        let dst_rank = dst.rank();
        let mut tmps: Vec<Term> = Vec::new();

        let Some(mut src) = src else {
            let dst = if dst_rank > 1 {
                let (flat, hoisted) = self.eval_sub_terms(dst, cfg)?;
                tmps = hoisted;
                flat
            } else {
                dst
            };
            self.kill(dst, cfg)?;
            for tmp in tmps {
                self.kill(tmp, cfg)?;
            }
            return Ok(());
        };

        let src_rank = src.rank();
        let mut dst = dst;

        if src_rank > 1 {
            let (flat, hoisted) = self.eval_sub_terms(src, cfg)?;
            src = flat;
            tmps = hoisted;
        }
        if dst_rank > 1 {
            if src_rank > 0 {
                let tmp = Term::register("tmp");
                self.handle_simple_assignment(tmp, src, cfg)?;
                src = tmp;
                for tmp in tmps.drain(..) {
                    self.kill(tmp, cfg)?;
                }
            }
            let (flat, hoisted) = self.eval_sub_terms(dst, cfg)?;
            dst = flat;
            tmps = hoisted;
        }

        if src.contains_name(dst.name()) {
            let tmp = Term::register("tmp");
            self.handle_simple_assignment(tmp, src, cfg)?;
            src = tmp;
        }

        self.handle_simple_assignment(dst, src, cfg)?;

        for tmp in tmps {
            self.kill(tmp, cfg)?;
        }
        if src == Term::register("tmp") {
            self.kill(src, cfg)?;
        }
        Ok(())
    }

    /// Hoists every nested compound sub-term of `term` into a numbered temporary.
    fn eval_sub_terms(
        &mut self,
        term: Term,
        cfg: &Config,
    ) -> Result<(Term, Vec<Term>), SaturationError> {
        let mut counter = 0usize;
        self.eval_sub_terms_recursive(term, &mut counter, cfg)
    }

    fn eval_sub_terms_recursive(
        &mut self,
        term: Term,
        counter: &mut usize,
        cfg: &Config,
    ) -> Result<(Term, Vec<Term>), SaturationError> {
        let mut flattened: Vec<Term> = Vec::new();
        let mut tmps: Vec<Term> = Vec::new();
        for sub in term.args() {
            let mut sub = sub;
            if sub.arity() > 0 {
                let (flat, nested_tmps) = self.eval_sub_terms_recursive(sub, counter, cfg)?;
                let tmp = Term::register(&format!("tmp{counter}"));
                *counter += 1;
                tmps.push(tmp);
                self.handle_simple_assignment(tmp, flat, cfg)?;
                sub = tmp;
                for nested in nested_tmps {
                    self.kill(nested, cfg)?;
                }
            }
            flattened.push(sub);
        }
        Ok((Term::get(term.name(), &flattened), tmps))
    }

    fn handle_simple_assignment(
        &mut self,
        dst: Term,
        src: Term,
        cfg: &Config,
    ) -> Result<(), SaturationError> {
        self.kill(dst, cfg)?;
        self.add_eq(dst, src, false);
        Ok(())
    }

    /// Invalidates a destination operand.
    ///
    /// A dereference destination is handled per the configured [DerefUpdate] strategy; anything else kills its name.
    pub fn kill(&mut self, term: Term, cfg: &Config) -> Result<(), SaturationError> {
        if term.is_deref() {
            match cfg.deref_update {
                DerefUpdate::Weak => {
                    let addr = term.addr();
                    let marker = fresh_kill_marker();
                    let deref_name = Name::Sym(ustr(DEREF_NAME));

                    self.rename(deref_name, marker);
                    let renamed = term.rename(deref_name, marker);

                    self.add_clause(Clause::get([
                        Literal::equality(
                            Term::var().deref(),
                            Term::get(marker, &[Term::var()]),
                        ),
                        Literal::equality(Term::var(), addr),
                    ]));

                    return self.kill_name(renamed.name(), cfg);
                }
                DerefUpdate::Strong => {
                    // No-alias assumption: only the written cell is invalidated.
                    self.clauses.retain(|c| !clause_mentions_subterm(*c, term));
                    return Ok(());
                }
            }
        }

        self.kill_name(term.name(), cfg)
    }

    /// Projects a name out of the state.
    ///
    /// The consequence finder saturates with the name as elimination target; afterwards every clause still mentioning the name is dropped, which is a sound existential quantification over it.
    pub fn kill_name(&mut self, name: Name, cfg: &Config) -> Result<(), SaturationError> {
        log::trace!(target: targets::STATE, "kill {name:?}");

        ConsequenceFinder::new(self, Some(name), cfg).run()?;

        let dead: BTreeSet<Clause> = self
            .clauses
            .iter()
            .copied()
            .filter(|c| c.contains_name(name))
            .collect();
        self.remove_clauses(&dead);
        self.compactify();
        Ok(())
    }

    /// Closes the state under the unordered consequence relation, up to the configured bounds.
    pub fn saturate(&mut self, cfg: &Config) -> Result<(), SaturationError> {
        ConsequenceFinder::new(self, None, cfg).run()
    }

    /// Drops every clause exceeding a bound.
    pub fn remove_big_clauses(&mut self, cfg: &Config) {
        self.clauses.retain(|c| {
            cfg.max_clause_size.admits(c.len() as u32) && cfg.max_clause_rank.admits(c.rank())
        });
    }

    /// The set of all names occurring in the state.
    pub fn names(&self) -> BTreeSet<Name> {
        let mut names = BTreeSet::new();
        for c in &self.clauses {
            names.extend(c.names().iter().copied());
        }
        names
    }

    /// The set of atomic names occurring in the state.
    pub fn atomic_names(&self) -> BTreeSet<Name> {
        let mut names = BTreeSet::new();
        for c in &self.clauses {
            names.extend(c.atomic_names().iter().copied());
        }
        names
    }

    /// Whether the two states are bi-implied, by the solver.
    pub fn is_equivalent(&self, other: &AbstractState) -> bool {
        smt::equivalent(self, other)
    }

    /// The join of any number of states, folded pairwise.
    pub fn merge(states: Vec<AbstractState>, cfg: &Config) -> AbstractState {
        let mut to_merge = states;
        while to_merge.len() > 1 {
            let a = to_merge.pop().expect("two states remain");
            let b = to_merge.pop().expect("two states remain");
            to_merge.push(AbstractState::merge_two_states(a, b, cfg));
        }
        to_merge.pop().unwrap_or_default()
    }

    /// The join of two states.
    ///
    /// Both sides are saturated first (skipped when the size bound is unbounded, where closure is not meaningful), the intersection is kept, and every pair of leftover clauses contributes its disjunction.
    /// A side that turns out contradictory is bottom, and the join is the other side.
    pub fn merge_two_states(
        mut a: AbstractState,
        mut b: AbstractState,
        cfg: &Config,
    ) -> AbstractState {
        if cfg.max_clause_size.is_finite() {
            if a.saturate(cfg).is_err() {
                log::debug!(target: targets::MERGE, "left side infeasible, join is the right side");
                return b;
            }
            if b.saturate(cfg).is_err() {
                log::debug!(target: targets::MERGE, "right side infeasible, join is the left side");
                return a;
            }
        }

        let shared: BTreeSet<Clause> = a.clauses.intersection(&b.clauses).copied().collect();
        let left: Vec<Clause> = a.clauses.difference(&shared).copied().collect();
        let right: Vec<Clause> = b.clauses.difference(&shared).copied().collect();
        let mut merged = AbstractState { clauses: shared };

        for &c1 in &left {
            for &c2 in &right {
                merged.add_clause(c1.union(c2));
            }
        }

        merged.remove_big_clauses(cfg);
        merged.compactify();

        log::debug!(
            target: targets::MERGE,
            "joined {} and {} clauses into {}",
            a.len(),
            b.len(),
            merged.len()
        );
        merged
    }
}

/// Whether any literal of the clause contains the term as a sub-term.
fn clause_mentions_subterm(c: Clause, term: Term) -> bool {
    c.literals().iter().any(|l| match l.terms() {
        None => false,
        Some((s, t)) => {
            s.subterm_paths().contains_key(&term) || t.subterm_paths().contains_key(&term)
        }
    })
}

fn fresh_kill_marker() -> Name {
    let n = KILL_MARKERS.fetch_add(1, AtomicOrdering::Relaxed);
    Name::Sym(ustr(&format!("d_tmp{n}")))
}

impl fmt::Display for AbstractState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            return write!(f, "Empty");
        }
        let mut ordered: Vec<Clause> = self.clauses.iter().copied().collect();
        ordered.sort_by_key(|c| (c.len(), *c));
        for (i, c) in ordered.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{c}")?;
        }
        Ok(())
    }
}
