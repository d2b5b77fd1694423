/*!
Interned equality atoms.

An atom is an unordered pair of terms `(s, t)` read as either:

- Structural equality of `s` and `t`, when `t` is not the boolean constant `true`, or:
- The truth of the comparison term `s`, when `t` is the boolean constant `true`.

The canonical orientation places the larger term (by interned identity) first, unless the right side is the `true` constant.

# Factory simplification

[Atom::get] simplifies before interning.
If both sides are syntactically equal the atom reduces to truth.
Otherwise the SMT simplifier is consulted to fold the pair to a constant boolean when possible.
As folding may succeed, the factory returns an [AtomValue] rather than an atom, and the verdict is cached with the interning table.
*/

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    sync::Arc,
    sync::RwLock,
};

use once_cell::sync::Lazy;

use crate::{
    smt,
    structures::term::{Name, Term},
};

/// The result of the atom factory: a constant verdict, or a proper interned atom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtomValue {
    /// The pair folded to a constant boolean.
    Const(bool),

    /// A proper atom.
    Atom(Atom),
}

/// An interned atom.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Atom(u32);

struct AtomData {
    terms: (Term, Term),
    names: Arc<BTreeSet<Name>>,
    atomic_names: Arc<BTreeSet<Name>>,
}

#[derive(Default)]
struct AtomTable {
    rows: Vec<AtomData>,
    index: HashMap<(Term, Term), AtomValue>,
}

static ATOMS: Lazy<RwLock<AtomTable>> = Lazy::new(|| RwLock::new(AtomTable::default()));

pub(crate) fn clear_table() {
    let mut table = ATOMS.write().expect("atom table poisoned");
    *table = AtomTable::default();
}

impl Atom {
    /// The canonical interned value for an unordered pair of terms.
    pub fn get(s: Term, t: Term) -> AtomValue {
        let (s, t) = if t != Term::boolean(true) && s < t {
            (t, s)
        } else {
            (s, t)
        };

        if let Some(value) = ATOMS
            .read()
            .expect("atom table poisoned")
            .index
            .get(&(s, t))
        {
            return *value;
        }

        if s == t {
            let value = AtomValue::Const(true);
            ATOMS
                .write()
                .expect("atom table poisoned")
                .index
                .insert((s, t), value);
            return value;
        }

        if let Some(b) = smt::fold_equality(s, t) {
            let value = AtomValue::Const(b);
            ATOMS
                .write()
                .expect("atom table poisoned")
                .index
                .insert((s, t), value);
            return value;
        }

        let mut names: BTreeSet<Name> = s.names().iter().copied().collect();
        names.extend(t.names().iter().copied());
        let mut atomic_names: BTreeSet<Name> = s.atomic_names().iter().copied().collect();
        atomic_names.extend(t.atomic_names().iter().copied());

        let mut table = ATOMS.write().expect("atom table poisoned");
        if let Some(value) = table.index.get(&(s, t)) {
            return *value;
        }
        let id = Atom(table.rows.len() as u32);
        table.rows.push(AtomData {
            terms: (s, t),
            names: Arc::new(names),
            atomic_names: Arc::new(atomic_names),
        });
        let value = AtomValue::Atom(id);
        table.index.insert((s, t), value);
        value
    }

    fn with_data<R>(self, f: impl FnOnce(&AtomData) -> R) -> R {
        let table = ATOMS.read().expect("atom table poisoned");
        f(&table.rows[self.0 as usize])
    }

    /// The two sides, in canonical orientation.
    pub fn terms(self) -> (Term, Term) {
        self.with_data(|d| d.terms)
    }

    /// Whether the atom asserts the truth of a comparison term.
    pub fn is_cmp(self) -> bool {
        self.terms().0.is_cmp()
    }

    /// Whether the meta-variable occurs in neither side.
    pub fn is_ground(self) -> bool {
        let (s, t) = self.terms();
        s.is_ground() && t.is_ground()
    }

    /// The maximum rank of the two sides.
    pub fn rank(self) -> u32 {
        let (s, t) = self.terms();
        s.rank().max(t.rank())
    }

    /// The set of all names occurring in the atom.
    pub fn names(self) -> Arc<BTreeSet<Name>> {
        self.with_data(|d| d.names.clone())
    }

    /// The set of atomic names occurring in the atom.
    pub fn atomic_names(self) -> Arc<BTreeSet<Name>> {
        self.with_data(|d| d.atomic_names.clone())
    }

    /// Whether the given name occurs in the atom.
    pub fn contains_name(self, name: Name) -> bool {
        self.with_data(|d| d.names.contains(&name))
    }

    /// The atom asserting the negated comparison.
    ///
    /// Only meaningful for comparison atoms.
    pub fn inverted(self) -> AtomValue {
        let (s, t) = self.terms();
        match s.inverted() {
            Some(inv) => Atom::get(inv, t),
            None => AtomValue::Atom(self),
        }
    }

    /// The atom with the meta-variable substituted by `value` on both sides.
    pub fn assign(self, value: Term) -> AtomValue {
        if self.is_ground() {
            return AtomValue::Atom(self);
        }
        let (s, t) = self.terms();
        Atom::get(s.assign(value), t.assign(value))
    }

    /// The atom with `old_name` substituted by `new_name` on both sides.
    pub fn rename(self, old_name: Name, new_name: Name) -> AtomValue {
        if !self.contains_name(old_name) {
            return AtomValue::Atom(self);
        }
        let (s, t) = self.terms();
        Atom::get(s.rename(old_name, new_name), t.rename(old_name, new_name))
    }

    /// The atom with both sides primed.
    pub fn prime(self) -> AtomValue {
        let (s, t) = self.terms();
        Atom::get(s.prime(), t.prime())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (s, t) = self.terms();
        if self.is_cmp() {
            write!(f, "{s}")
        } else {
            write!(f, "{s} == {t}")
        }
    }
}
