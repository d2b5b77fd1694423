/*!
Clauses, aka. finite sets of literals, interpreted as the disjunction of those literals.

- The empty clause is the contradiction, and raising it during saturation marks a state infeasible.
- Single literals are identified with the clause containing that literal (a 'unit' clause).

# Factory simplification

[Clause::get] simplifies before interning:

- The contradictory sentinel literal is dropped.
- The tautologous sentinel, or a complementary pair of literals, collapses the clause to a tautology, reported as `None`.

Tautologies have no representation: a conjunction of clauses never benefits from holding one.

Cached per clause: the name sets, the rank (the maximum literal rank), and groundness.
*/

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    sync::Arc,
    sync::RwLock,
};

use once_cell::sync::Lazy;

use crate::structures::{
    literal::Literal,
    term::Name,
};

/// An interned clause.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Clause(u32);

struct ClauseData {
    literals: Box<[Literal]>,
    rank: u32,
    ground: bool,
    names: Arc<BTreeSet<Name>>,
    atomic_names: Arc<BTreeSet<Name>>,
}

#[derive(Default)]
struct ClauseTable {
    rows: Vec<ClauseData>,
    index: HashMap<Box<[Literal]>, Option<Clause>>,
}

static CLAUSES: Lazy<RwLock<ClauseTable>> = Lazy::new(|| RwLock::new(ClauseTable::default()));

pub(crate) fn clear_table() {
    let mut table = CLAUSES.write().expect("clause table poisoned");
    *table = ClauseTable::default();
}

impl Clause {
    /// The canonical interned clause for a collection of literals, or `None` for a tautology.
    pub fn get(literals: impl IntoIterator<Item = Literal>) -> Option<Clause> {
        let set: BTreeSet<Literal> = literals.into_iter().collect();
        let key: Box<[Literal]> = set.iter().copied().collect();

        if let Some(value) = CLAUSES
            .read()
            .expect("clause table poisoned")
            .index
            .get(&key)
        {
            return *value;
        }

        let mut kept: BTreeSet<Literal> = set;
        kept.remove(&Literal::FALSE);

        let tautology = kept.contains(&Literal::TRUE)
            || kept.iter().any(|l| kept.contains(&l.negated()));

        let value = if tautology {
            None
        } else {
            let sorted: Box<[Literal]> = kept.iter().copied().collect();

            let mut names = BTreeSet::new();
            let mut atomic_names = BTreeSet::new();
            let mut rank = 0;
            let mut ground = true;
            for l in kept.iter() {
                if let Some(ns) = l.names() {
                    names.extend(ns.iter().copied());
                }
                if let Some(ns) = l.atomic_names() {
                    atomic_names.extend(ns.iter().copied());
                }
                rank = rank.max(l.rank());
                ground &= l.is_ground();
            }

            let mut table = CLAUSES.write().expect("clause table poisoned");
            if let Some(value) = table.index.get(&key) {
                return *value;
            }

            // The simplified literal set may already be interned under its own key.
            let value = match table.index.get(&sorted).copied() {
                Some(value) => value,
                None => {
                    let id = Clause(table.rows.len() as u32);
                    table.rows.push(ClauseData {
                        literals: sorted.clone(),
                        rank,
                        ground,
                        names: Arc::new(names),
                        atomic_names: Arc::new(atomic_names),
                    });
                    table.index.insert(sorted, Some(id));
                    Some(id)
                }
            };
            table.index.insert(key, value);
            return value;
        };

        CLAUSES
            .write()
            .expect("clause table poisoned")
            .index
            .insert(key, value);
        value
    }

    /// The empty clause, i.e. the contradiction.
    pub fn empty() -> Clause {
        match Clause::get([]) {
            Some(c) => c,
            // The empty literal set never simplifies to a tautology.
            None => unreachable!("the empty clause is not a tautology"),
        }
    }

    fn with_data<R>(self, f: impl FnOnce(&ClauseData) -> R) -> R {
        let table = CLAUSES.read().expect("clause table poisoned");
        f(&table.rows[self.0 as usize])
    }

    /// The literals of the clause, in canonical order.
    pub fn literals(self) -> Box<[Literal]> {
        self.with_data(|d| d.literals.clone())
    }

    /// The literals of the clause as a set.
    pub fn literal_set(self) -> BTreeSet<Literal> {
        self.with_data(|d| d.literals.iter().copied().collect())
    }

    /// The number of literals in the clause.
    pub fn len(self) -> usize {
        self.with_data(|d| d.literals.len())
    }

    /// Whether the clause is the contradiction.
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// The maximum literal rank.
    pub fn rank(self) -> u32 {
        self.with_data(|d| d.rank)
    }

    /// Whether the meta-variable does not occur in the clause.
    pub fn is_ground(self) -> bool {
        self.with_data(|d| d.ground)
    }

    /// The set of all names occurring in the clause.
    pub fn names(self) -> Arc<BTreeSet<Name>> {
        self.with_data(|d| d.names.clone())
    }

    /// The set of atomic names occurring in the clause.
    pub fn atomic_names(self) -> Arc<BTreeSet<Name>> {
        self.with_data(|d| d.atomic_names.clone())
    }

    /// Whether the given name occurs in the clause.
    pub fn contains_name(self, name: Name) -> bool {
        self.with_data(|d| d.names.contains(&name))
    }

    /// Whether every literal of `self` is a literal of `other`.
    pub fn subsumes(self, other: Clause) -> bool {
        if self.len() > other.len() {
            return false;
        }
        let these = self.literals();
        let those = other.literal_set();
        these.iter().all(|l| those.contains(l))
    }

    /// The positive literals.
    pub fn positive_literals(self) -> BTreeSet<Literal> {
        self.with_data(|d| {
            d.literals
                .iter()
                .copied()
                .filter(|l| !l.is_negative())
                .collect()
        })
    }

    /// The negative literals.
    pub fn negative_literals(self) -> BTreeSet<Literal> {
        self.with_data(|d| {
            d.literals
                .iter()
                .copied()
                .filter(|l| l.is_negative())
                .collect()
        })
    }

    /// The disjunction of two clauses.
    pub fn union(self, other: Clause) -> Option<Clause> {
        let mut lits = self.literal_set();
        lits.extend(other.literal_set());
        Clause::get(lits)
    }

    /// The clause without the given literal.
    pub fn remove_literal(self, l: Literal) -> Option<Clause> {
        let mut lits = self.literal_set();
        if !lits.remove(&l) {
            return Some(self);
        }
        Clause::get(lits)
    }

    /// The clause extended by the given literals.
    pub fn add_literals(self, extra: impl IntoIterator<Item = Literal>) -> Option<Clause> {
        let mut lits = self.literal_set();
        lits.extend(extra);
        Clause::get(lits)
    }

    /// Every proper non-empty sub-clause, used by the subsumption fast path.
    pub fn proper_subclauses(self) -> Vec<Clause> {
        let lits: Vec<Literal> = self.literals().to_vec();
        let n = lits.len();
        let mut out = Vec::new();
        if n == 0 {
            return out;
        }
        for mask in 1u32..((1u32 << n) - 1) {
            let subset = lits
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, l)| *l);
            if let Some(c) = Clause::get(subset) {
                out.push(c);
            }
        }
        out
    }

    /// The clause with `old_name` substituted by `new_name` throughout, or `None` if the substitution collapses it to a tautology.
    pub fn rename(self, old_name: Name, new_name: Name) -> Option<Clause> {
        if !self.contains_name(old_name) {
            return Some(self);
        }
        Clause::get(
            self.literals()
                .iter()
                .map(|l| l.rename(old_name, new_name)),
        )
    }

    /// The clause with every literal primed.
    pub fn prime(self) -> Option<Clause> {
        Clause::get(self.literals().iter().map(|l| l.prime()))
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.literals().iter().map(|l| format!("{l}")).collect();
        write!(f, "{}", rendered.join(" ; "))
    }
}
