/*!
Consequence finding by saturation.

The finder closes a state's clause set under a fragment of first-order logic with equality, by paramodulation over the ground/one-meta-variable clauses the domain uses.
Its role inside the state is twofold:

- To derive the clauses that make subsequent subsumption (and the merge intersection) effective.
- To *eliminate* a chosen name: after saturation, every clause still mentioning the name is dropped, which yields a sound projection.

With an elimination target the rules run ordered, guarded by the [elimination order](crate::order) so the target is preferentially rewritten away and only ground conclusions are admitted; see [ordered].
Without a target an unordered variant applies every rule with syntactic matching and no guards; see [unordered].

# Worklist and admission

The finder keeps a worklist of pending clauses and an ordered list of kept clauses.
A derived clause is admitted unless it is a tautology, was already seen, is not ground (ordered variant), exceeds a bound, or is subsumed by the state.
Admitting the empty clause raises the [contradiction signal](SaturationError::EmptyClause); callers use it to mark a state infeasible.
The bounds guarantee termination even where unbounded saturation would diverge.

# Redundancy pruning

When enabled, every time more than the configured threshold of clauses has accumulated since the last snapshot the finder walks its kept clauses in clause order, asking the solver whether the accumulated context entails each non-unit clause; entailed clauses are dropped, the rest are asserted and kept.
Unit clauses are always asserted.
*/

mod ordered;
mod unordered;

use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap, HashSet},
    rc::Rc,
};

use crate::{
    config::{Bound, Config},
    misc::log::targets,
    order::EliminationOrder,
    smt::{self, Verdict},
    state::AbstractState,
    structures::{
        clause::Clause,
        literal::Literal,
        term::{Name, Term},
    },
    types::err::SaturationError,
};

/// One way of firing a rule on a clause: an oriented equation together with its contexts.
#[derive(Clone, Debug)]
pub(crate) struct Decomposition {
    /// The sign of the chosen literal.
    pub negative: bool,

    /// The larger side of the oriented equation.
    pub s: Term,

    /// The smaller side.
    pub t: Term,

    /// The other negative literals (the left context).
    pub gamma: BTreeSet<Literal>,

    /// The other positive literals (the right context).
    pub delta: BTreeSet<Literal>,
}

/// A saturation engine over one state.
pub struct ConsequenceFinder<'s> {
    state: &'s mut AbstractState,
    target: Option<Name>,
    order: Option<EliminationOrder>,

    max_clause_size: Bound,
    max_clause_rank: Bound,
    prune: bool,
    prune_threshold: usize,

    kept: Vec<Clause>,
    worklist: Vec<Clause>,
    seen: HashSet<Clause>,
    decompositions: HashMap<Clause, Rc<Vec<Decomposition>>>,

    pruning_snapshot: Vec<Clause>,
    time_to_prune: usize,
    false_literal_cache: HashMap<Literal, bool>,
}

impl<'s> ConsequenceFinder<'s> {
    /// A finder over the state, optionally eliminating `target`.
    ///
    /// With no target the unordered variant saturates without eliminating anything.
    pub fn new(state: &'s mut AbstractState, target: Option<Name>, cfg: &Config) -> Self {
        ConsequenceFinder {
            state,
            target,
            order: target.map(EliminationOrder::new),
            max_clause_size: cfg.max_clause_size,
            max_clause_rank: cfg.max_clause_rank,
            prune: cfg.prune_redundant,
            prune_threshold: cfg.prune_threshold,
            kept: Vec::new(),
            worklist: Vec::new(),
            seen: HashSet::new(),
            decompositions: HashMap::new(),
            pruning_snapshot: Vec::new(),
            time_to_prune: 0,
            false_literal_cache: HashMap::new(),
        }
    }

    /// Runs saturation to completion.
    ///
    /// On return the state has been extended by every derivable clause within the bounds.
    /// Elimination of the target, where requested, is completed by the caller dropping the clauses that still mention it.
    pub fn run(&mut self) -> Result<(), SaturationError> {
        log::trace!(target: targets::SATURATION, "saturating, eliminating {:?}", self.target);

        let initial: Vec<Clause> = self.state.iter().collect();
        for c in initial {
            self.admit(Some(c))?;
        }

        if self.prune {
            self.pruning_snapshot = self.kept.clone();
            self.time_to_prune = self.kept.len() + self.prune_threshold;
            self.prune_redundant();
        }

        loop {
            if self.prune && self.kept.len() > self.time_to_prune {
                self.prune_redundant();
                self.time_to_prune = self.kept.len() + self.prune_threshold;
                continue;
            }
            let Some(c) = self.worklist.pop() else {
                break;
            };
            match self.order {
                Some(_) => self.apply_rules_ordered(c)?,
                None => self.apply_rules_unordered(c)?,
            }
        }

        if self.prune {
            self.prune_redundant();
        }

        log::trace!(target: targets::SATURATION, "saturated to {} clauses", self.kept.len());
        Ok(())
    }

    /// Admits a clause into the worklist, the kept list, and the state.
    pub(crate) fn admit(&mut self, clause: Option<Clause>) -> Result<(), SaturationError> {
        let Some(c) = clause else {
            return Ok(());
        };
        if c.is_empty() {
            return Err(SaturationError::EmptyClause);
        }
        if !self.seen.insert(c) {
            return Ok(());
        }
        if self.state.is_subsumed(c) {
            return Ok(());
        }

        self.worklist.push(c);

        // When pruning, the kept list stays sorted under the clause order so each pass asserts a stable prefix.
        let position = match (&self.order, self.prune) {
            (Some(order), true) => {
                let kept = &self.kept;
                Some(kept.partition_point(|&k| order.compare_clauses(k, c) == Ordering::Less))
            }
            _ => None,
        };
        match position {
            Some(at) => self.kept.insert(at, c),
            None => self.kept.push(c),
        }

        self.state.insert_clause(c);
        Ok(())
    }

    /// Admits a rule conclusion, subject to the admission policy.
    pub(crate) fn admit_derived(
        &mut self,
        clause: Option<Clause>,
    ) -> Result<(), SaturationError> {
        let Some(c) = clause else {
            return Ok(());
        };
        if self.order.is_some() && !c.is_ground() {
            return Ok(());
        }
        if !self.max_clause_size.admits(c.len() as u32) {
            return Ok(());
        }
        if !self.max_clause_rank.admits(c.rank()) {
            return Ok(());
        }
        self.admit(Some(c))
    }

    pub(crate) fn size_bound(&self) -> Bound {
        self.max_clause_size
    }

    pub(crate) fn elimination_target(&self) -> Option<Name> {
        self.target
    }

    pub(crate) fn order(&self) -> &EliminationOrder {
        match &self.order {
            Some(order) => order,
            None => unreachable!("the ordered rules run only with an elimination target"),
        }
    }

    pub(crate) fn kept_snapshot(&self) -> Vec<Clause> {
        self.kept.clone()
    }

    /// The cached decompositions of a clause under the active variant.
    pub(crate) fn decompose(&mut self, c: Clause) -> Rc<Vec<Decomposition>> {
        if let Some(cached) = self.decompositions.get(&c) {
            return Rc::clone(cached);
        }
        let built = match &self.order {
            Some(order) => ordered::build_decompositions(order, c),
            None => unordered::build_decompositions(c),
        };
        let built = Rc::new(built);
        self.decompositions.insert(c, Rc::clone(&built));
        built
    }

    /// Redundancy elimination against the solver.
    ///
    /// Re-asserts the unchanged snapshot prefix, then walks the remainder: a non-unit clause entailed by the accumulated context is dropped everywhere, anything else is asserted and kept.
    fn prune_redundant(&mut self) {
        let before = self.kept.len();
        smt::with_session(|session| {
            let mut at = 0usize;
            let stable = self.kept.len().min(self.pruning_snapshot.len());
            while at < stable && self.kept[at] == self.pruning_snapshot[at] {
                session.assert_clause(self.kept[at]);
                at += 1;
            }

            while at < self.kept.len() {
                let c = self.kept[at];
                if c.len() == 1 {
                    session.assert_clause(c);
                    at += 1;
                    continue;
                }
                session.push();
                session.assert_not_clause(c);
                let verdict = session.check();
                session.pop();
                if verdict == Verdict::Unsat {
                    self.state.remove_clause(c);
                    self.worklist.retain(|&w| w != c);
                    self.kept.remove(at);
                } else {
                    session.assert_clause(c);
                    at += 1;
                }
            }
        });
        self.pruning_snapshot = self.kept.clone();

        log::trace!(
            target: targets::SATURATION,
            "pruned {} redundant clauses",
            before - self.kept.len()
        );
    }

    /// Simplifies a literal against the state, through the solver.
    ///
    /// A literal the state refutes becomes [Literal::FALSE]; a literal whose negation the state refutes is recorded as a unit and becomes [Literal::TRUE]; anything else is returned unchanged.
    pub fn simplify_literal(&mut self, l: Literal) -> Literal {
        if self.is_false_literal(l) {
            return Literal::FALSE;
        }
        if self.is_false_literal(l.negated()) {
            // A unit clause is never the empty clause, so admission cannot signal here.
            let _ = self.admit(Clause::get([l]));
            return Literal::TRUE;
        }
        l
    }

    fn is_false_literal(&mut self, l: Literal) -> bool {
        if let Some(&verdict) = self.false_literal_cache.get(&l) {
            return verdict;
        }
        let verdict = if l.is_sentinel() {
            l == Literal::FALSE
        } else {
            smt::with_state_session(self.state, |session| {
                session.assert_literal(l);
                session.check() == Verdict::Unsat
            })
        };
        self.false_literal_cache.insert(l, verdict);
        verdict
    }
}

/// Applies a meta-variable assignment across a literal set.
///
/// Returns `None` when some literal becomes tautologous (the whole context is then useless); contradictory literals drop out.
pub(crate) fn assign_literal_set(
    set: &BTreeSet<Literal>,
    value: Term,
) -> Option<BTreeSet<Literal>> {
    if value.is_var() {
        return Some(set.clone());
    }
    let mut out = BTreeSet::new();
    for l in set {
        let assigned = l.assign(value);
        if assigned == Literal::TRUE {
            return None;
        }
        if assigned == Literal::FALSE {
            continue;
        }
        out.insert(assigned);
    }
    Some(out)
}
