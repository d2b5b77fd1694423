use paravet::structures::{
    clause::Clause,
    literal::Literal,
    reset_interners,
    term::Term,
};

// This file holds the single reset test: a reset invalidates every outstanding
// identifier, so nothing else may run in the same process.
#[test]
fn reset_yields_a_fresh_working_table() {
    let before = Term::register("alpha") + Term::int(4);
    assert_eq!(before.rank(), 1);

    reset_interners();

    // Identity order restarts with the interning order of the fresh table.
    let first = Term::register("zeta");
    let second = Term::register("eta");
    assert!(first < second);

    // Interning, canonical forms, and the cached data all work as on first use.
    let t = Term::register("alpha") + Term::int(4);
    assert_eq!(t, Term::int(4) + Term::register("alpha"));
    assert_eq!(t.rank(), 1);
    assert!(t.contains_name(Term::int(4).name()));

    // The sentinel literals were re-reserved by the reset.
    assert_eq!(Literal::TRUE.negated(), Literal::FALSE);
    let unit = Literal::equality(first, Term::int(0));
    let c = Clause::get([unit]).expect("not a tautology");
    assert!(Clause::get([unit, Literal::FALSE]).is_some_and(|c2| c2 == c));
}
