/*!
The simplification order steering ordered paramodulation.

The order is parameterised by an *elimination target*: the single atomic name the caller wants projected out of a state.
Heads compare by the key `(is-not-boolean, index in [add, neg, mul, deref] ∪ {target}, name)`, so:

- Boolean constant names are lightest.
- Unknown names precede the base operators.
- The target is the heaviest atomic name, and is therefore preferentially rewritten away.

Terms compare with the sub-term property first: a term is heavier than every proper sub-term.
Beyond the head key, multiset-commutative heads extend by multiset comparison of their children and every other head extends lexicographically.
Literals orient to `(max, min)` and compare major sides, then sign (negative above positive), then minor sides.
Clauses extend the literal order by multisets, with the empty clause heaviest.

All three comparisons are memoised, as is [max_literal](EliminationOrder::max_literal).
The memo tables live with one [EliminationOrder] value, which the consequence finder holds for a single elimination.
*/

use std::{
    cell::RefCell,
    cmp::Ordering,
    collections::{BTreeSet, HashMap},
};

use crate::structures::{
    clause::Clause,
    literal::Literal,
    term::{Name, Term},
};

/// A memoised comparison context for one elimination target.
pub struct EliminationOrder {
    target: Name,
    term_cache: RefCell<HashMap<(Term, Term), Ordering>>,
    literal_cache: RefCell<HashMap<(Literal, Literal), Ordering>>,
    clause_cache: RefCell<HashMap<(Clause, Clause), Ordering>>,
    max_literal_cache: RefCell<HashMap<Box<[Literal]>, Option<Literal>>>,
}

impl EliminationOrder {
    /// A fresh order with the given name heaviest.
    pub fn new(target: Name) -> Self {
        EliminationOrder {
            target,
            term_cache: RefCell::new(HashMap::new()),
            literal_cache: RefCell::new(HashMap::new()),
            clause_cache: RefCell::new(HashMap::new()),
            max_literal_cache: RefCell::new(HashMap::new()),
        }
    }

    /// The elimination target.
    pub fn target(&self) -> Name {
        self.target
    }

    fn name_index(&self, name: Name) -> i32 {
        if let Name::Sym(s) = name {
            match s.as_str() {
                "add" => return 0,
                "neg" => return 1,
                "mul" => return 2,
                "deref" => return 3,
                _ => {}
            }
        }
        if name == self.target {
            4
        } else {
            -1
        }
    }

    fn compare_names(&self, n1: Name, n2: Name) -> Ordering {
        let key = |n: Name| (!n.is_bool(), self.name_index(n), n);
        key(n1).cmp(&key(n2))
    }

    /// The order on terms.
    pub fn compare_terms(&self, t1: Term, t2: Term) -> Ordering {
        if t1 == t2 {
            return Ordering::Equal;
        }
        if let Some(&o) = self.term_cache.borrow().get(&(t1, t2)) {
            return o;
        }
        let o = self.compare_terms_raw(t1, t2);
        let mut cache = self.term_cache.borrow_mut();
        cache.insert((t1, t2), o);
        cache.insert((t2, t1), o.reverse());
        o
    }

    fn compare_terms_raw(&self, t1: Term, t2: Term) -> Ordering {
        // The sub-term property: anything at or above a proper sub-term of the other side decides.
        for t in t1.args() {
            if self.compare_terms(t, t2) != Ordering::Less {
                return Ordering::Greater;
            }
        }
        for t in t2.args() {
            if self.compare_terms(t, t1) != Ordering::Less {
                return Ordering::Less;
            }
        }

        let by_name = self.compare_names(t1.name(), t2.name());
        if by_name != Ordering::Equal {
            return by_name;
        }

        if t1.name().is_multiset_head() {
            let s1: BTreeSet<Term> = t1.args().into_iter().collect();
            let s2: BTreeSet<Term> = t2.args().into_iter().collect();
            self.compare_multisets(s1, s2, |a, b| self.compare_terms(a, b))
        } else {
            self.compare_lex(&t1.args(), &t2.args())
        }
    }

    fn compare_lex(&self, s1: &[Term], s2: &[Term]) -> Ordering {
        for (a, b) in s1.iter().zip(s2.iter()) {
            let o = self.compare_terms(*a, *b);
            if o != Ordering::Equal {
                return o;
            }
        }
        s1.len().cmp(&s2.len())
    }

    fn compare_multisets<T: Copy + Ord>(
        &self,
        s1: BTreeSet<T>,
        s2: BTreeSet<T>,
        compare: impl Fn(T, T) -> Ordering,
    ) -> Ordering {
        if s1 == s2 {
            return Ordering::Equal;
        }
        let common: BTreeSet<T> = s1.intersection(&s2).copied().collect();
        let d1: BTreeSet<T> = s1.difference(&common).copied().collect();
        let d2: BTreeSet<T> = s2.difference(&common).copied().collect();
        if d1.is_empty() {
            return Ordering::Less;
        }
        if d2.is_empty() {
            return Ordering::Greater;
        }
        let m1 = Self::max_by(&d1, &compare);
        let m2 = Self::max_by(&d2, &compare);
        match (m1, m2) {
            (Some(a), Some(b)) => compare(a, b),
            _ => Ordering::Equal,
        }
    }

    fn max_by<T: Copy>(set: &BTreeSet<T>, compare: &impl Fn(T, T) -> Ordering) -> Option<T> {
        let mut best: Option<T> = None;
        for &x in set {
            best = match best {
                None => Some(x),
                Some(b) => {
                    if compare(x, b) == Ordering::Greater {
                        Some(x)
                    } else {
                        Some(b)
                    }
                }
            };
        }
        best
    }

    /// The order on literals.
    ///
    /// Sentinel literals have no place in the order and compare below everything.
    pub fn compare_literals(&self, l1: Literal, l2: Literal) -> Ordering {
        if l1 == l2 {
            return Ordering::Equal;
        }
        if let Some(&o) = self.literal_cache.borrow().get(&(l1, l2)) {
            return o;
        }
        let o = self.compare_literals_raw(l1, l2);
        let mut cache = self.literal_cache.borrow_mut();
        cache.insert((l1, l2), o);
        cache.insert((l2, l1), o.reverse());
        o
    }

    fn oriented(&self, l: Literal) -> Option<(Term, Term)> {
        let (s, t) = l.terms()?;
        if self.compare_terms(s, t) == Ordering::Less {
            Some((t, s))
        } else {
            Some((s, t))
        }
    }

    fn compare_literals_raw(&self, l1: Literal, l2: Literal) -> Ordering {
        let (Some((max1, min1)), Some((max2, min2))) = (self.oriented(l1), self.oriented(l2))
        else {
            debug_assert!(false, "sentinel literal reached the order");
            return match (l1.is_sentinel(), l2.is_sentinel()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                _ => Ordering::Greater,
            };
        };

        let by_major = self.compare_terms(max1, max2);
        if by_major != Ordering::Equal {
            return by_major;
        }
        match (l1.is_negative(), l2.is_negative()) {
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }
        self.compare_terms(min1, min2)
    }

    /// The order on clauses, with the empty clause heaviest.
    pub fn compare_clauses(&self, c1: Clause, c2: Clause) -> Ordering {
        if c1 == c2 {
            return Ordering::Equal;
        }
        if let Some(&o) = self.clause_cache.borrow().get(&(c1, c2)) {
            return o;
        }
        let o = if c1.is_empty() {
            Ordering::Greater
        } else if c2.is_empty() {
            Ordering::Less
        } else {
            self.compare_multisets(c1.literal_set(), c2.literal_set(), |a, b| {
                self.compare_literals(a, b)
            })
        };
        let mut cache = self.clause_cache.borrow_mut();
        cache.insert((c1, c2), o);
        cache.insert((c2, c1), o.reverse());
        o
    }

    /// An order-maximal literal of a set, memoised per set.
    pub fn max_literal(&self, literals: &BTreeSet<Literal>) -> Option<Literal> {
        let key: Box<[Literal]> = literals.iter().copied().collect();
        if let Some(cached) = self.max_literal_cache.borrow().get(&key) {
            return *cached;
        }
        let max = Self::max_by(literals, &|a, b| self.compare_literals(a, b));
        self.max_literal_cache.borrow_mut().insert(key, max);
        max
    }
}
