use paravet::structures::{
    atom::{Atom, AtomValue},
    clause::Clause,
    literal::Literal,
    term::{Name, Term},
};

mod terms {
    use super::*;

    #[test]
    fn interning_identity() {
        let a = Term::register("EAX") + Term::int(4);
        let b = Term::register("EAX") + Term::int(4);
        assert_eq!(a, b);

        let c = Term::int(4) + Term::register("EAX");
        assert_eq!(a, c);
    }

    #[test]
    fn booleans_are_not_integers() {
        assert_ne!(Term::boolean(true), Term::int(1));
        assert_ne!(Term::boolean(false), Term::int(0));
    }

    #[test]
    fn rank_and_names() {
        let t = (Term::register("EBX") + Term::int(8)).deref();
        assert_eq!(t.rank(), 2);
        assert!(t.contains_name(Name::Int(8)));
        assert!(t.atomic_names().contains(&Term::register("EBX").name()));
        assert!(!t.atomic_names().contains(&t.name()));
    }

    #[test]
    fn subterm_paths_locate_occurrences() {
        let x = Term::register("x");
        let t = x + x.deref();
        let paths = t.subterm_paths();
        // One bare occurrence, one under the deref.
        assert_eq!(paths.get(&x).map(Vec::len), Some(2));
        assert_eq!(paths.get(&t).map(Vec::len), Some(1));
    }

    #[test]
    fn replace_at_path() {
        let x = Term::register("x");
        let t = x.deref() + Term::int(1);
        let paths = t.subterm_paths();
        let at_x = &paths[&x][0];
        assert_eq!(t.replace(at_x, Term::register("y")), Term::register("y").deref() + Term::int(1));
    }

    #[test]
    fn rename_round_trip() {
        let t = (Term::register("EAX") + Term::int(4)).deref();
        let old = Term::register("EAX").name();
        let new = Term::register("fresh").name();
        assert!(!t.contains_name(new));
        assert_eq!(t.rename(old, new).rename(new, old), t);
    }

    #[test]
    fn rename_shares_when_absent() {
        let t = Term::register("EAX") + Term::int(4);
        assert_eq!(t.rename(Term::register("EBX").name(), Term::register("ECX").name()), t);
    }

    #[test]
    fn assign_substitutes_the_meta_variable() {
        let v = Term::var();
        let t = v.deref() + Term::int(4);
        let assigned = t.assign(Term::register("EAX"));
        assert_eq!(assigned, Term::register("EAX").deref() + Term::int(4));
        assert!(assigned.is_ground());
    }

    #[test]
    fn unification_finds_the_shared_instance() {
        let v = Term::var();
        let pattern = v.deref();
        let ground = Term::register("EAX").deref();
        let (a, b) = pattern.unify(ground).expect("unifiable");
        assert_eq!(pattern.assign(a), ground.assign(b));
    }

    #[test]
    fn unification_refuses_booleans_and_comparisons() {
        let v = Term::var();
        assert!(v.unify(Term::boolean(true)).is_none());
        let cmp = Term::cmp("gt", Term::register("a"), Term::register("b"));
        assert!(v.unify(cmp).is_none());
    }

    #[test]
    fn unification_requires_a_single_instance() {
        let v = Term::var();
        let pattern = v + v.deref();
        // Same shape, but the meta-variable would need two values.
        let ground = Term::register("a") + Term::register("b").deref();
        assert!(pattern.unify(ground).is_none());

        let agreeing = Term::register("a") + Term::register("a").deref();
        assert!(pattern.unify(agreeing).is_some());
    }

    #[test]
    fn prime_toggles() {
        let eax = Term::register("EAX");
        assert_eq!(eax.prime(), Term::register("EAX'"));
        assert_eq!(eax.prime().prime(), eax);
        // Internal names stay untouched.
        assert_eq!(Term::var().prime(), Term::var());
    }

    #[test]
    fn old_toggles_atomic_names_only() {
        let t = Term::register("EAX") + Term::int(4);
        let decorated = t.old();
        assert_eq!(decorated, Term::register("OLD_EAX") + Term::int(4));
        assert_eq!(decorated.old(), t);
    }
}

mod atoms {
    use super::*;

    #[test]
    fn syntactic_equality_folds() {
        let x = Term::register("x");
        assert_eq!(Atom::get(x, x), AtomValue::Const(true));
    }

    #[test]
    fn orientation_is_canonical() {
        let a = Term::register("a");
        let b = Term::register("b");
        let one = Atom::get(a, b);
        let other = Atom::get(b, a);
        assert_eq!(one, other);
    }

    #[test]
    fn comparison_atoms_keep_the_truth_side() {
        let cmp = Term::cmp("gt", Term::register("a"), Term::register("b"));
        let AtomValue::Atom(atom) = Atom::get(cmp, Term::boolean(true)) else {
            panic!("comparison atoms do not fold");
        };
        assert!(atom.is_cmp());
        assert_eq!(atom.terms().0, cmp);
    }
}

mod literals {
    use super::*;

    #[test]
    fn sentinels_from_constant_atoms() {
        let x = Term::register("x");
        assert_eq!(Literal::get(Atom::get(x, x), false), Literal::TRUE);
        assert_eq!(Literal::get(Atom::get(x, x), true), Literal::FALSE);
    }

    #[test]
    fn negated_comparisons_normalise() {
        let a = Term::register("a");
        let b = Term::register("b");
        let denied_gt = Literal::disequality(Term::cmp("gt", a, b), Term::boolean(true));
        let asserted_le = Literal::equality(Term::cmp("le", a, b), Term::boolean(true));
        assert_eq!(denied_gt, asserted_le);
        assert!(!denied_gt.is_negative());
    }

    #[test]
    fn negation_involutes() {
        let l = Literal::equality(Term::register("a"), Term::register("b"));
        assert_eq!(l.negated().negated(), l);
        assert_eq!(Literal::TRUE.negated(), Literal::FALSE);
    }
}

mod clauses {
    use super::*;

    #[test]
    fn false_literals_drop() {
        let l = Literal::equality(Term::register("a"), Term::register("b"));
        let c = Clause::get([l, Literal::FALSE]).expect("not a tautology");
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn tautologies_collapse() {
        let l = Literal::equality(Term::register("a"), Term::register("b"));
        assert!(Clause::get([l, Literal::TRUE]).is_none());
        assert!(Clause::get([l, l.negated()]).is_none());
    }

    #[test]
    fn the_empty_clause_is_a_value() {
        let c = Clause::get([]).expect("the contradiction is representable");
        assert!(c.is_empty());
        assert_eq!(c, Clause::empty());
    }

    #[test]
    fn subsumption_is_literal_inclusion() {
        let a = Literal::equality(Term::register("a"), Term::int(0));
        let b = Literal::equality(Term::register("b"), Term::int(1));
        let small = Clause::get([a]).expect("clause");
        let large = Clause::get([a, b]).expect("clause");
        assert!(small.subsumes(large));
        assert!(!large.subsumes(small));
        assert!(small.subsumes(small));
    }

    #[test]
    fn subsumption_is_transitive() {
        let a = Literal::equality(Term::register("a"), Term::int(0));
        let b = Literal::equality(Term::register("b"), Term::int(1));
        let c = Literal::equality(Term::register("c"), Term::int(2));
        let c1 = Clause::get([a]).expect("clause");
        let c2 = Clause::get([a, b]).expect("clause");
        let c3 = Clause::get([a, b, c]).expect("clause");
        assert!(c1.subsumes(c2) && c2.subsumes(c3) && c1.subsumes(c3));
    }

    #[test]
    fn rename_can_collapse_to_a_tautology() {
        let a = Term::register("a");
        let b = Term::register("b");
        let c = Clause::get([
            Literal::equality(a, b),
            Literal::disequality(a, Term::register("c")),
        ])
        .expect("clause");
        // Renaming b to c makes the two literals complementary... after orientation both atoms coincide.
        let renamed = c.rename(b.name(), Term::register("c").name());
        assert!(renamed.is_none());
    }

    #[test]
    fn interning_identity() {
        let a = Literal::equality(Term::register("a"), Term::int(0));
        let b = Literal::equality(Term::register("b"), Term::int(1));
        assert_eq!(Clause::get([a, b]), Clause::get([b, a]));
    }
}
