use std::cmp::Ordering;

use paravet::{
    order::EliminationOrder,
    structures::{literal::Literal, term::Term},
};

fn sample_terms(target: Term) -> Vec<Term> {
    let a = Term::register("a");
    let b = Term::register("b");
    vec![
        Term::int(0),
        Term::int(4),
        Term::boolean(true),
        a,
        b,
        target,
        a + Term::int(4),
        a + b,
        -b,
        a * b,
        a.deref(),
        (a + Term::int(4)).deref(),
        target + Term::int(4),
        target.deref(),
    ]
}

mod term_order {
    use super::*;

    #[test]
    fn total_on_generated_terms() {
        let target = Term::register("kill_me");
        let order = EliminationOrder::new(target.name());
        let terms = sample_terms(target);

        for &t1 in &terms {
            for &t2 in &terms {
                let forward = order.compare_terms(t1, t2);
                let backward = order.compare_terms(t2, t1);
                assert_eq!(forward, backward.reverse(), "antisymmetry on {t1} / {t2}");
                if t1 != t2 {
                    assert_ne!(forward, Ordering::Equal, "strictness on {t1} / {t2}");
                }
            }
        }
    }

    #[test]
    fn transitive_on_generated_terms() {
        let target = Term::register("kill_me");
        let order = EliminationOrder::new(target.name());
        let terms = sample_terms(target);

        for &t1 in &terms {
            for &t2 in &terms {
                for &t3 in &terms {
                    if order.compare_terms(t1, t2) == Ordering::Greater
                        && order.compare_terms(t2, t3) == Ordering::Greater
                    {
                        assert_eq!(
                            order.compare_terms(t1, t3),
                            Ordering::Greater,
                            "transitivity on {t1} / {t2} / {t3}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn subterm_property() {
        let target = Term::register("kill_me");
        let order = EliminationOrder::new(target.name());

        for &t in &sample_terms(target) {
            for (&sub, _) in t.subterm_paths().iter() {
                if sub != t {
                    assert_eq!(
                        order.compare_terms(t, sub),
                        Ordering::Greater,
                        "sub-term property on {t} / {sub}"
                    );
                }
            }
        }
    }

    #[test]
    fn the_target_is_the_heaviest_atomic_name() {
        let target = Term::register("kill_me");
        let order = EliminationOrder::new(target.name());

        for atomic in [Term::int(0), Term::boolean(true), Term::register("a"), Term::register("zzz")] {
            assert_eq!(order.compare_terms(target, atomic), Ordering::Greater);
        }
    }

    #[test]
    fn booleans_are_lightest() {
        let order = EliminationOrder::new(Term::register("kill_me").name());
        for other in [Term::int(0), Term::register("a")] {
            assert_eq!(
                order.compare_terms(Term::boolean(true), other),
                Ordering::Less
            );
        }
    }
}

mod literal_order {
    use super::*;

    #[test]
    fn negative_above_positive_on_equal_sides() {
        let order = EliminationOrder::new(Term::register("kill_me").name());
        let a = Term::register("a");
        let b = Term::register("b");
        let positive = Literal::equality(a, b);
        let negative = Literal::disequality(a, b);
        assert_eq!(order.compare_literals(negative, positive), Ordering::Greater);
    }

    #[test]
    fn major_sides_decide() {
        let order = EliminationOrder::new(Term::register("kill_me").name());
        let small = Literal::equality(Term::register("a"), Term::int(0));
        let large = Literal::equality(Term::register("a").deref(), Term::int(0));
        assert_eq!(order.compare_literals(large, small), Ordering::Greater);
    }

    #[test]
    fn max_literal_is_maximal() {
        let order = EliminationOrder::new(Term::register("kill_me").name());
        let lits: std::collections::BTreeSet<Literal> = [
            Literal::equality(Term::register("a"), Term::int(0)),
            Literal::equality(Term::register("b").deref(), Term::int(1)),
            Literal::disequality(Term::register("a"), Term::register("b")),
        ]
        .into_iter()
        .collect();

        let max = order.max_literal(&lits).expect("non-empty");
        for &l in &lits {
            assert_ne!(order.compare_literals(l, max), Ordering::Greater);
        }
    }
}
