/*!
Signed atoms.

A positive literal asserts its atom (`s = t`), a negative literal denies it (`s ≠ t`).
Two sentinel literals, [Literal::TRUE] and [Literal::FALSE], stand for the tautologous and the contradictory literal.

# Normalisation

The factory [Literal::get] maintains two invariants:

- Constant atom verdicts collapse into the sentinels.
- Comparison literals are always positive: a denied comparison is replaced by the asserted *inverted* comparison, so `¬(gt(a, b) = true)` interns as `le(a, b) = true`.

The second invariant makes complementary-pair detection in [the clause factory](crate::structures::clause) a plain membership test.
*/

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    sync::Arc,
    sync::RwLock,
};

use once_cell::sync::Lazy;

use crate::structures::{
    atom::{Atom, AtomValue},
    term::{Name, Term},
};

/// An interned literal.
///
/// The derived order is identity order, used only for canonical storage; the inference order on literals lives in [crate::order].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal(u32);

enum LiteralData {
    /// A sentinel: `true` for the tautologous literal, `false` for the contradictory one.
    Sentinel(bool),

    /// A signed atom.
    Signed { atom: Atom, negative: bool },
}

struct LiteralTable {
    rows: Vec<LiteralData>,
    index: HashMap<(Atom, bool), Literal>,
}

impl Default for LiteralTable {
    fn default() -> Self {
        // The sentinels are reserved so that `Literal::TRUE` and `Literal::FALSE` are plain constants.
        LiteralTable {
            rows: vec![LiteralData::Sentinel(true), LiteralData::Sentinel(false)],
            index: HashMap::new(),
        }
    }
}

static LITERALS: Lazy<RwLock<LiteralTable>> = Lazy::new(|| RwLock::new(LiteralTable::default()));

pub(crate) fn clear_table() {
    let mut table = LITERALS.write().expect("literal table poisoned");
    *table = LiteralTable::default();
}

impl Literal {
    /// The tautologous literal.
    pub const TRUE: Literal = Literal(0);

    /// The contradictory literal.
    pub const FALSE: Literal = Literal(1);

    /// The canonical literal for a factory verdict and a sign.
    pub fn get(value: AtomValue, negative: bool) -> Literal {
        let atom = match value {
            AtomValue::Const(b) => {
                return if b != negative {
                    Literal::TRUE
                } else {
                    Literal::FALSE
                };
            }
            AtomValue::Atom(atom) => atom,
        };

        if negative && atom.is_cmp() {
            return Literal::get(atom.inverted(), false);
        }

        if let Some(l) = LITERALS
            .read()
            .expect("literal table poisoned")
            .index
            .get(&(atom, negative))
        {
            return *l;
        }

        let mut table = LITERALS.write().expect("literal table poisoned");
        if let Some(l) = table.index.get(&(atom, negative)) {
            return *l;
        }
        let id = Literal(table.rows.len() as u32);
        table.rows.push(LiteralData::Signed { atom, negative });
        table.index.insert((atom, negative), id);
        id
    }

    /// The literal asserting `s = t`.
    pub fn equality(s: Term, t: Term) -> Literal {
        Literal::get(Atom::get(s, t), false)
    }

    /// The literal asserting `s ≠ t`.
    pub fn disequality(s: Term, t: Term) -> Literal {
        Literal::get(Atom::get(s, t), true)
    }

    fn with_data<R>(self, f: impl FnOnce(&LiteralData) -> R) -> R {
        let table = LITERALS.read().expect("literal table poisoned");
        f(&table.rows[self.0 as usize])
    }

    /// Whether the literal is one of the two sentinels.
    pub fn is_sentinel(self) -> bool {
        self.with_data(|d| matches!(d, LiteralData::Sentinel(_)))
    }

    /// Whether the literal denies its atom.
    ///
    /// Sentinels count as positive.
    pub fn is_negative(self) -> bool {
        self.with_data(|d| matches!(d, LiteralData::Signed { negative: true, .. }))
    }

    /// The atom, for non-sentinel literals.
    pub fn atom(self) -> Option<Atom> {
        self.with_data(|d| match d {
            LiteralData::Sentinel(_) => None,
            LiteralData::Signed { atom, .. } => Some(*atom),
        })
    }

    /// The two sides of the atom, for non-sentinel literals.
    pub fn terms(self) -> Option<(Term, Term)> {
        self.atom().map(Atom::terms)
    }

    /// The negation of the literal.
    pub fn negated(self) -> Literal {
        match self.atom() {
            None => {
                if self == Literal::TRUE {
                    Literal::FALSE
                } else {
                    Literal::TRUE
                }
            }
            Some(atom) => Literal::get(AtomValue::Atom(atom), !self.is_negative()),
        }
    }

    /// Whether the literal asserts a comparison term.
    pub fn is_cmp(self) -> bool {
        self.atom().is_some_and(Atom::is_cmp)
    }

    /// Whether the meta-variable does not occur in the literal.
    pub fn is_ground(self) -> bool {
        match self.atom() {
            None => true,
            Some(atom) => atom.is_ground(),
        }
    }

    /// The rank of the atom, with sentinels at rank 0.
    pub fn rank(self) -> u32 {
        self.atom().map_or(0, Atom::rank)
    }

    /// The set of all names occurring in the literal.
    pub fn names(self) -> Option<Arc<BTreeSet<Name>>> {
        self.atom().map(Atom::names)
    }

    /// The set of atomic names occurring in the literal.
    pub fn atomic_names(self) -> Option<Arc<BTreeSet<Name>>> {
        self.atom().map(Atom::atomic_names)
    }

    /// Whether the given name occurs in the literal.
    pub fn contains_name(self, name: Name) -> bool {
        self.atom().is_some_and(|a| a.contains_name(name))
    }

    /// The literal with the meta-variable substituted by `value`.
    pub fn assign(self, value: Term) -> Literal {
        if self.is_ground() {
            return self;
        }
        match self.atom() {
            None => self,
            Some(atom) => Literal::get(atom.assign(value), self.is_negative()),
        }
    }

    /// The literal with `old_name` substituted by `new_name`.
    pub fn rename(self, old_name: Name, new_name: Name) -> Literal {
        if !self.contains_name(old_name) {
            return self;
        }
        match self.atom() {
            None => self,
            Some(atom) => Literal::get(atom.rename(old_name, new_name), self.is_negative()),
        }
    }

    /// The literal with both sides primed.
    pub fn prime(self) -> Literal {
        match self.atom() {
            None => self,
            Some(atom) => Literal::get(atom.prime(), self.is_negative()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.terms() {
            None => write!(f, "{}", *self == Literal::TRUE),
            Some((s, t)) => {
                if self.is_cmp() {
                    write!(f, "{s}")
                } else if self.is_negative() {
                    write!(f, "{s} != {t}")
                } else {
                    write!(f, "{s} == {t}")
                }
            }
        }
    }
}
