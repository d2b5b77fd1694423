/*!
Hash-consed first-order terms.

A term is a head [Name] applied to an ordered vector of sub-terms.
Names partition terms into kinds:

- *Constants* are integer names with no sub-terms.
  Note, constants are uninterpreted: the theory never evaluates arithmetic over them, and distinctness of two constants holds only when asserted.
- *Booleans* are the two constant terms `true` and `false`, encoded distinctly from the integers 0 and 1.
- *Registers* (and other atomic names) are symbolic variables identified by a string token.
- *Function applications* use the base heads `add`, `neg`, `mul`, `deref` together with the comparison heads (`eq`, `ne`, `ge`, `gt`, `le`, `lt`) and any further uninterpreted head.
  `add` and `mul` are multiset-commutative, and their sub-terms are held in a canonical order so that two semantically equal terms intern to the same value.

A distinguished term [Term::var] is the single meta-variable of the paramodulation rules.
The meta-variable is not quantified at the term level --- it is a convention of the saturation engine, see [crate::saturation].

# Interning

Terms are interned in a process-wide table: two structurally equal terms are the *same* value, and equality and hashing on [Term] compare identities rather than structure.
Each table row caches the data every client of a term asks for over and over:

- The rank of the term (1 + the maximum rank of a sub-term, 0 for leaves).
- The set of all names occurring in the term, and the set of atomic (leaf) names.
- The map from each sub-term to the positions at which it occurs.

The table grows for the lifetime of the process.
[reset](crate::structures::reset_interners) releases it, together with the other interning tables.

# Example

```rust
# use paravet::structures::term::Term;
let eax = Term::register("EAX");
let four = Term::int(4);

// Multiset-commutative heads intern to a single canonical value.
assert_eq!(eax + four, four + eax);

// Structural sharing: the sub-term is the interned value itself.
assert!((eax + four).deref().subterm_paths().contains_key(&eax));
```
*/

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    sync::Arc,
    sync::RwLock,
};

use once_cell::sync::Lazy;
use smallvec::{smallvec, SmallVec};
use ustr::{ustr, Ustr};

/// The token of the meta-variable.
///
/// The `!` prefix marks a name as internal: internal names are never primed and never produced by a decoder.
pub const VAR_NAME: &str = "!!x";

/// The head of a memory dereference.
pub const DEREF_NAME: &str = "deref";

/// A position of a sub-term within a term, as the sequence of child indices from the root.
pub type Path = SmallVec<[u8; 8]>;

/// The name at the head of a term.
///
/// The derived order places booleans below integers and integers below symbols, with symbols compared lexicographically.
/// The elimination order of [crate::order] builds on this as the final tie-break of its name key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Name {
    /// A boolean constant name.
    Bool(bool),

    /// An integer constant name.
    Int(i64),

    /// A symbolic name (register, stack slot, function head, temporary, ...).
    Sym(Ustr),
}

impl Name {
    /// The symbolic token of the name, if the name is symbolic.
    pub fn as_sym(&self) -> Option<Ustr> {
        match self {
            Name::Sym(s) => Some(*s),
            _ => None,
        }
    }

    /// True for the two boolean constant names.
    pub fn is_bool(&self) -> bool {
        matches!(self, Name::Bool(_))
    }

    /// True for integer constant names.
    pub fn is_int(&self) -> bool {
        matches!(self, Name::Int(_))
    }

    /// True for the heads of comparison terms.
    pub fn is_cmp_head(&self) -> bool {
        match self {
            Name::Sym(s) => {
                matches!(s.as_str(), "eq" | "ne" | "ge" | "gt" | "le" | "lt")
            }
            _ => false,
        }
    }

    /// True for the multiset-commutative heads.
    pub fn is_multiset_head(&self) -> bool {
        match self {
            Name::Sym(s) => matches!(s.as_str(), "add" | "mul"),
            _ => false,
        }
    }

    /// The comparison head denoting the negated comparison, with equality heads swapped and order heads inverted.
    pub fn inverted_cmp_head(&self) -> Option<Name> {
        let s = self.as_sym()?;
        let inverted = match s.as_str() {
            "eq" => "ne",
            "ne" => "eq",
            "ge" => "lt",
            "gt" => "le",
            "le" => "gt",
            "lt" => "ge",
            _ => return None,
        };
        Some(Name::Sym(ustr(inverted)))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::Bool(b) => write!(f, "{b}"),
            Name::Int(i) if *i < 0 => write!(f, "-{:#x}", -i),
            Name::Int(i) => write!(f, "{i:#x}"),
            Name::Sym(s) => write!(f, "{s}"),
        }
    }
}

/// An interned term.
///
/// The identifier is an index into the term table, so derived equality, hashing, and order are all identity-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Term(u32);

/// The cached data of an interned term.
struct TermData {
    name: Name,
    args: SmallVec<[Term; 2]>,
    rank: u32,
    ground: bool,
    names: Arc<BTreeSet<Name>>,
    atomic_names: Arc<BTreeSet<Name>>,
    paths: Arc<HashMap<Term, Vec<Path>>>,
}

#[derive(Default)]
struct TermTable {
    rows: Vec<TermData>,
    index: HashMap<(Name, SmallVec<[Term; 2]>), Term>,
    replace_memo: HashMap<(Term, Box<[u8]>, Term), Term>,
}

static TERMS: Lazy<RwLock<TermTable>> = Lazy::new(|| RwLock::new(TermTable::default()));

pub(crate) fn clear_table() {
    let mut table = TERMS.write().expect("term table poisoned");
    *table = TermTable::default();
}

impl Term {
    /// The canonical interned term for the given head and sub-terms.
    pub fn get(name: Name, args: &[Term]) -> Term {
        let mut args: SmallVec<[Term; 2]> = args.into();
        if name.is_multiset_head() {
            args.sort();
        }

        if let Some(t) = TERMS
            .read()
            .expect("term table poisoned")
            .index
            .get(&(name, args.clone()))
        {
            return *t;
        }

        // Derived data is computed outside the table lock, as it reads the children's rows.
        let rank = args.iter().map(|a| a.rank() + 1).max().unwrap_or(0);

        let mut names = BTreeSet::new();
        names.insert(name);
        let mut atomic_names = BTreeSet::new();
        if args.is_empty() {
            atomic_names.insert(name);
        }
        for a in &args {
            names.extend(a.names().iter().copied());
            atomic_names.extend(a.atomic_names().iter().copied());
        }
        let ground = !names.contains(&Name::Sym(ustr(VAR_NAME)));

        let child_paths: Vec<Arc<HashMap<Term, Vec<Path>>>> =
            args.iter().map(|a| a.subterm_paths()).collect();

        let mut table = TERMS.write().expect("term table poisoned");
        if let Some(t) = table.index.get(&(name, args.clone())) {
            return *t;
        }

        let id = Term(table.rows.len() as u32);

        let mut paths: HashMap<Term, Vec<Path>> = HashMap::new();
        paths.insert(id, vec![Path::new()]);
        for (i, sub) in child_paths.iter().enumerate() {
            for (&t, locs) in sub.iter() {
                let entry = paths.entry(t).or_default();
                for loc in locs {
                    let mut path: Path = smallvec![i as u8];
                    path.extend_from_slice(loc);
                    entry.push(path);
                }
            }
        }

        table.rows.push(TermData {
            name,
            args: args.clone(),
            rank,
            ground,
            names: Arc::new(names),
            atomic_names: Arc::new(atomic_names),
            paths: Arc::new(paths),
        });
        table.index.insert((name, args), id);
        id
    }

    /// The interned integer constant.
    pub fn int(value: i64) -> Term {
        Term::get(Name::Int(value), &[])
    }

    /// The interned boolean constant.
    pub fn boolean(value: bool) -> Term {
        Term::get(Name::Bool(value), &[])
    }

    /// The interned atomic term for a symbolic token.
    pub fn register(token: &str) -> Term {
        Term::get(Name::Sym(ustr(token)), &[])
    }

    /// The meta-variable.
    pub fn var() -> Term {
        Term::register(VAR_NAME)
    }

    /// The dereference of this term, read as the content of the memory cell this term addresses.
    pub fn deref(self) -> Term {
        Term::get(Name::Sym(ustr(DEREF_NAME)), &[self])
    }

    /// The comparison term with the given head over a pair of terms.
    pub fn cmp(head: &str, lhs: Term, rhs: Term) -> Term {
        Term::get(Name::Sym(ustr(head)), &[lhs, rhs])
    }

    fn with_data<R>(self, f: impl FnOnce(&TermData) -> R) -> R {
        let table = TERMS.read().expect("term table poisoned");
        f(&table.rows[self.0 as usize])
    }

    /// The head name.
    pub fn name(self) -> Name {
        self.with_data(|d| d.name)
    }

    /// The sub-terms, in canonical order.
    pub fn args(self) -> SmallVec<[Term; 2]> {
        self.with_data(|d| d.args.clone())
    }

    /// The number of sub-terms.
    pub fn arity(self) -> usize {
        self.with_data(|d| d.args.len())
    }

    /// 1 + the maximum rank of a sub-term, or 0 for a leaf.
    pub fn rank(self) -> u32 {
        self.with_data(|d| d.rank)
    }

    /// Whether the meta-variable does not occur in the term.
    pub fn is_ground(self) -> bool {
        self.with_data(|d| d.ground)
    }

    /// The set of all names occurring in the term.
    pub fn names(self) -> Arc<BTreeSet<Name>> {
        self.with_data(|d| d.names.clone())
    }

    /// The set of atomic (leaf) names occurring in the term.
    pub fn atomic_names(self) -> Arc<BTreeSet<Name>> {
        self.with_data(|d| d.atomic_names.clone())
    }

    /// Whether the given name occurs anywhere in the term.
    pub fn contains_name(self, name: Name) -> bool {
        self.with_data(|d| d.names.contains(&name))
    }

    /// The map from every sub-term of the term to its occurrence paths.
    pub fn subterm_paths(self) -> Arc<HashMap<Term, Vec<Path>>> {
        self.with_data(|d| d.paths.clone())
    }

    /// True for terms with no sub-terms.
    pub fn is_atomic(self) -> bool {
        self.arity() == 0
    }

    /// True for integer constants.
    pub fn is_const(self) -> bool {
        self.name().is_int()
    }

    /// True for the two boolean constants.
    pub fn is_bool(self) -> bool {
        self.name().is_bool()
    }

    /// True for atomic terms with a symbolic name, i.e. registers, stack slots, and temporaries.
    pub fn is_reg(self) -> bool {
        self.is_atomic() && !self.is_const() && !self.is_bool()
    }

    /// True for the meta-variable.
    pub fn is_var(self) -> bool {
        self.name() == Name::Sym(ustr(VAR_NAME))
    }

    /// True for comparison terms.
    pub fn is_cmp(self) -> bool {
        self.name().is_cmp_head()
    }

    /// True for memory dereferences.
    pub fn is_deref(self) -> bool {
        self.name() == Name::Sym(ustr(DEREF_NAME))
    }

    /// The address of a dereference.
    ///
    /// Only meaningful when [is_deref](Term::is_deref) holds.
    pub fn addr(self) -> Term {
        self.args()[0]
    }

    /// The comparison term denoting the negation of this comparison term, or the negated boolean constant.
    pub fn inverted(self) -> Option<Term> {
        if let Name::Bool(b) = self.name() {
            return Some(Term::boolean(!b));
        }
        let head = self.name().inverted_cmp_head()?;
        Some(Term::get(head, &self.args()))
    }

    /// The term with the sub-term at `path` overwritten by `new_sub`.
    ///
    /// Memoised per `(path, new_sub)`.
    pub fn replace(self, path: &[u8], new_sub: Term) -> Term {
        if path.is_empty() {
            return new_sub;
        }

        let key = (self, Box::<[u8]>::from(path), new_sub);
        if let Some(t) = TERMS
            .read()
            .expect("term table poisoned")
            .replace_memo
            .get(&key)
        {
            return *t;
        }

        let mut args = self.args();
        let i = path[0] as usize;
        args[i] = args[i].replace(&path[1..], new_sub);
        let value = Term::get(self.name(), &args);

        TERMS
            .write()
            .expect("term table poisoned")
            .replace_memo
            .insert(key, value);
        value
    }

    /// The term with every occurrence of the meta-variable substituted by `value`.
    pub fn assign(self, value: Term) -> Term {
        if self.is_ground() {
            return self;
        }
        if self.is_var() {
            return value;
        }
        let args: SmallVec<[Term; 2]> = self.args().iter().map(|a| a.assign(value)).collect();
        Term::get(self.name(), &args)
    }

    /// The term with every occurrence of `old_name` substituted by `new_name`.
    ///
    /// Shares the intact term when the old name is absent.
    pub fn rename(self, old_name: Name, new_name: Name) -> Term {
        if !self.contains_name(old_name) {
            return self;
        }
        let args: SmallVec<[Term; 2]> = self
            .args()
            .iter()
            .map(|a| a.rename(old_name, new_name))
            .collect();
        let name = if self.name() == old_name {
            new_name
        } else {
            self.name()
        };
        Term::get(name, &args)
    }

    /// First-order matching of two terms sharing the single meta-variable.
    ///
    /// On success returns a pair `(a, b)` such that `self.assign(a)` and `other.assign(b)` are the identical ground term.
    /// Unification refuses to instantiate the meta-variable with a boolean or a comparison term.
    pub fn unify(self, other: Term) -> Option<(Term, Term)> {
        if self.is_var() {
            if !other.is_ground() && !other.is_var() {
                return None;
            }
            if other.is_bool() || other.is_cmp() {
                return None;
            }
            return Some((other, Term::var()));
        }
        if other.is_var() {
            if !self.is_ground() && !self.is_var() {
                return None;
            }
            if self.is_bool() || self.is_cmp() {
                return None;
            }
            return Some((Term::var(), self));
        }
        if self.name() != other.name() || self.arity() != other.arity() {
            return None;
        }

        let mut this_side: Option<Term> = None;
        let mut other_side: Option<Term> = None;
        for (a, b) in self.args().into_iter().zip(other.args()) {
            let (x, y) = a.unify(b)?;
            if !x.is_var() {
                match this_side {
                    None => this_side = Some(x),
                    Some(seen) if seen == x => {}
                    Some(_) => return None,
                }
            }
            if !y.is_var() {
                match other_side {
                    None => other_side = Some(y),
                    Some(seen) if seen == y => {}
                    Some(_) => return None,
                }
            }
        }
        Some((
            this_side.unwrap_or_else(Term::var),
            other_side.unwrap_or_else(Term::var),
        ))
    }

    /// The term with every atomic name decorated by a trailing `'`, with an existing `'` removed instead.
    ///
    /// Internal names (prefixed `!`) are left alone.
    pub fn prime(self) -> Term {
        if self.is_atomic() {
            if let Name::Sym(s) = self.name() {
                let token = s.as_str();
                if !token.starts_with('!') {
                    return match token.strip_suffix('\'') {
                        Some(stripped) => Term::register(stripped),
                        None => Term::register(&format!("{token}'")),
                    };
                }
            }
            return self;
        }
        let args: SmallVec<[Term; 2]> = self.args().iter().map(|a| a.prime()).collect();
        Term::get(self.name(), &args)
    }

    /// The term with every atomic name decorated by an `OLD_` prefix, with an existing prefix removed instead.
    pub fn old(self) -> Term {
        if self.is_atomic() {
            if let Name::Sym(s) = self.name() {
                let token = s.as_str();
                if !token.starts_with('!') {
                    return match token.strip_prefix("OLD_") {
                        Some(stripped) => Term::register(stripped),
                        None => Term::register(&format!("OLD_{token}")),
                    };
                }
            }
            return self;
        }
        let args: SmallVec<[Term; 2]> = self.args().iter().map(|a| a.old()).collect();
        Term::get(self.name(), &args)
    }
}

impl std::ops::Add for Term {
    type Output = Term;

    fn add(self, rhs: Term) -> Term {
        Term::get(Name::Sym(ustr("add")), &[self, rhs])
    }
}

impl std::ops::Neg for Term {
    type Output = Term;

    fn neg(self) -> Term {
        Term::get(Name::Sym(ustr("neg")), &[self])
    }
}

impl std::ops::Sub for Term {
    type Output = Term;

    fn sub(self, rhs: Term) -> Term {
        self + (-rhs)
    }
}

impl std::ops::Mul for Term {
    type Output = Term;

    fn mul(self, rhs: Term) -> Term {
        Term::get(Name::Sym(ustr("mul")), &[self, rhs])
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        if self.is_atomic() {
            return write!(f, "{name}");
        }

        let args = self.args();
        let sub = |t: &Term| {
            // Sums are parenthesised inside products and negations.
            if t.name() == Name::Sym(ustr("add"))
                && matches!(name.as_sym().as_deref(), Some("mul") | Some("neg"))
            {
                format!("({t})")
            } else {
                format!("{t}")
            }
        };

        match name.as_sym().as_deref() {
            Some("add") => write!(f, "{} + {}", sub(&args[0]), sub(&args[1])),
            Some("mul") => write!(f, "{} * {}", sub(&args[0]), sub(&args[1])),
            Some("neg") => write!(f, "-{}", sub(&args[0])),
            Some(DEREF_NAME) => write!(f, "[{}]", args[0]),
            Some("eq") => write!(f, "{} == {}", args[0], args[1]),
            Some("ne") => write!(f, "{} != {}", args[0], args[1]),
            Some("ge") => write!(f, "{} >= {}", args[0], args[1]),
            Some("gt") => write!(f, "{} > {}", args[0], args[1]),
            Some("le") => write!(f, "{} <= {}", args[0], args[1]),
            Some("lt") => write!(f, "{} < {}", args[0], args[1]),
            _ => {
                let rendered: Vec<String> = args.iter().map(|a| format!("{a}")).collect();
                write!(f, "{name}({})", rendered.join(", "))
            }
        }
    }
}
