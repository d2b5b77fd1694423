use paravet::{
    config::{Bound, Config, DerefUpdate},
    smt::{self, Verdict},
    state::AbstractState,
    structures::{clause::Clause, literal::Literal, term::Term},
};

fn entails_equality(state: &AbstractState, s: Term, t: Term) -> bool {
    smt::with_state_session(state, |session| {
        session.assert_equality(s, t, true);
        session.check() == Verdict::Unsat
    })
}

fn entails_disequality(state: &AbstractState, s: Term, t: Term) -> bool {
    smt::with_state_session(state, |session| {
        session.assert_equality(s, t, false);
        session.check() == Verdict::Unsat
    })
}

mod projection {
    use super::*;

    #[test]
    fn kill_name_removes_every_mention() {
        let cfg = Config::default();
        let eax = Term::register("EAX");
        let ecx = Term::register("ECX");

        let mut state = AbstractState::new();
        state.add_eq(eax, ecx, false);
        state.add_eq(ecx.deref(), Term::register("stk_8"), false);
        state.add_eq(ecx, Term::register("stk_4"), false);

        state.kill_name(ecx.name(), &cfg).expect("no contradiction");
        assert!(!state.names().contains(&ecx.name()));
    }

    #[test]
    fn kill_name_keeps_entailed_consequences() {
        let cfg = Config::default();
        let eax = Term::register("EAX");
        let ecx = Term::register("ECX");
        let slot = Term::register("stk_8");

        let mut state = AbstractState::new();
        state.add_eq(eax, ecx, false);
        state.add_eq(ecx.deref(), slot, false);

        state.kill_name(ecx.name(), &cfg).expect("no contradiction");
        assert!(entails_equality(&state, eax.deref(), slot));
    }

    #[test]
    fn kill_name_is_sound() {
        let cfg = Config::default();
        let eax = Term::register("EAX");
        let ecx = Term::register("ECX");

        let mut pre = AbstractState::new();
        pre.add_eq(eax, ecx, false);
        pre.add_eq(ecx, Term::int(0), false);
        pre.add_eq(Term::register("EBX"), ecx + Term::int(4), false);

        let mut post = pre.clone();
        post.kill_name(ecx.name(), &cfg).expect("no contradiction");

        // Everything that survives projection is a consequence of the pre-state.
        for clause in post.iter() {
            assert!(smt::entails_clause(&pre, clause), "not entailed: {clause}");
        }
    }
}

mod assignments {
    use super::*;

    #[test]
    fn simple_assignment_replaces_knowledge() {
        let cfg = Config::default();
        let eax = Term::register("EAX");

        let mut state = AbstractState::new();
        state.add_eq(eax, Term::int(1), false);
        state
            .handle_assignment(eax, Some(Term::int(2)), &cfg)
            .expect("no contradiction");

        assert!(entails_equality(&state, eax, Term::int(2)));
        assert!(!entails_equality(&state, eax, Term::int(1)));
    }

    #[test]
    fn self_referring_assignment_goes_through_a_temporary() {
        let cfg = Config::default();
        let ecx = Term::register("ECX");
        let slot = Term::register("stk_4");

        let mut state = AbstractState::new();
        state.add_eq(ecx, slot, false);
        state
            .handle_assignment(ecx, Some(ecx + Term::int(4)), &cfg)
            .expect("no contradiction");

        assert!(entails_equality(&state, ecx, slot + Term::int(4)));
        // The temporaries were killed on the way out.
        for name in state.names() {
            if let Some(sym) = name.as_sym() {
                assert!(!sym.as_str().starts_with("tmp"), "leaked temporary {sym}");
            }
        }
    }

    #[test]
    fn nested_operands_are_flattened() {
        let cfg = Config::default();
        let eax = Term::register("EAX");
        let ebx = Term::register("EBX");

        let mut state = AbstractState::new();
        state.add_eq(ebx, Term::int(8), false);
        state
            .handle_assignment(eax, Some((ebx + Term::int(4)).deref()), &cfg)
            .expect("no contradiction");

        assert!(entails_equality(&state, eax, (ebx + Term::int(4)).deref()));
    }

    #[test]
    fn havoc_forgets_the_destination() {
        let cfg = Config::default();
        let eax = Term::register("EAX");

        let mut state = AbstractState::new();
        state.add_eq(eax, Term::int(1), false);
        state.handle_assignment(eax, None, &cfg).expect("no contradiction");

        assert!(!entails_equality(&state, eax, Term::int(1)));
    }

    #[test]
    fn weak_store_keeps_other_cells_behind_disequality() {
        let cfg = Config::default();
        let x = Term::register("x");
        let y = Term::register("y");

        let mut state = AbstractState::new();
        state.add_eq(x.deref(), Term::int(1), false);
        state.add_eq(y.deref(), Term::int(2), false);
        state.add_eq(x, y, true);
        state
            .handle_assignment(x.deref(), Some(Term::int(3)), &cfg)
            .expect("no contradiction");

        assert!(entails_equality(&state, x.deref(), Term::int(3)));
        // The untouched cell survives because the addresses are known apart.
        assert!(entails_equality(&state, y.deref(), Term::int(2)));
    }

    #[test]
    fn strong_store_only_invalidates_the_written_cell() {
        let mut cfg = Config::default();
        cfg.deref_update = DerefUpdate::Strong;
        let x = Term::register("x");
        let y = Term::register("y");

        let mut state = AbstractState::new();
        state.add_eq(x.deref(), Term::int(1), false);
        state.add_eq(y.deref(), Term::int(2), false);
        state
            .handle_assignment(x.deref(), Some(Term::int(3)), &cfg)
            .expect("no contradiction");

        assert!(entails_equality(&state, x.deref(), Term::int(3)));
        assert!(entails_equality(&state, y.deref(), Term::int(2)));
    }
}

mod joins {
    use super::*;

    #[test]
    fn join_with_self_is_equivalent() {
        let cfg = Config::default();
        let mut s = AbstractState::new();
        s.add_eq(Term::register("EAX"), Term::int(0), false);
        s.add_eq(Term::register("EBX"), Term::register("EAX"), false);

        let joined = AbstractState::merge(vec![s.clone(), s.clone()], &cfg);
        assert!(joined.is_equivalent(&s));
    }

    #[test]
    fn join_is_entailed_by_both_sides() {
        let cfg = Config::default();
        let eax = Term::register("EAX");

        let mut s = AbstractState::new();
        s.add_eq(eax, Term::int(0), false);
        let mut t = AbstractState::new();
        t.add_eq(eax, Term::int(1), false);

        let joined = AbstractState::merge(vec![s.clone(), t.clone()], &cfg);
        for clause in joined.iter() {
            assert!(smt::entails_clause(&s, clause), "left side loses {clause}");
            assert!(smt::entails_clause(&t, clause), "right side loses {clause}");
        }
    }

    #[test]
    fn join_covers_both_branches() {
        let cfg = Config::default();
        let eax = Term::register("EAX");
        let slot = Term::register("stk_8");

        let mut found = AbstractState::new();
        found.add_eq(eax.deref(), slot, false);
        let mut missed = AbstractState::new();
        missed.add_eq(eax, Term::int(0), false);

        let joined = AbstractState::merge(vec![found, missed], &cfg);
        let holds = smt::with_state_session(&joined, |session| {
            session.assert_equality(eax, Term::int(0), true);
            session.assert_equality(eax.deref(), slot, true);
            session.check() == Verdict::Unsat
        });
        assert!(holds, "the disjunctive invariant was lost in the join");
    }

    #[test]
    fn bounds_discard_oversized_joins() {
        let cfg = Config {
            max_clause_size: Bound::Finite(1),
            max_clause_rank: Bound::Finite(0),
            ..Config::default()
        };
        let mut s = AbstractState::new();
        s.add_eq(Term::register("EAX"), Term::int(0), false);
        let mut t = AbstractState::new();
        t.add_eq(Term::register("EAX"), Term::int(1), false);

        let joined = AbstractState::merge(vec![s, t], &cfg);
        for clause in joined.iter() {
            assert!(clause.len() <= 1);
            assert!(clause.rank() == 0);
        }
    }
}

mod feasibility {
    use super::*;

    #[test]
    fn contradiction_is_detected() {
        let mut state = AbstractState::new();
        state.add_eq(Term::register("a"), Term::int(0), false);
        state.add_eq(Term::register("a"), Term::int(1), false);
        state.add_eq(Term::int(0), Term::int(1), true);
        assert!(!smt::feasible(&state));
    }

    #[test]
    fn adding_clauses_never_restores_feasibility() {
        let mut state = AbstractState::new();
        state.add_eq(Term::register("a"), Term::int(0), false);
        state.add_eq(Term::register("a"), Term::int(1), false);
        state.add_eq(Term::int(0), Term::int(1), true);
        assert!(!smt::feasible(&state));

        state.add_eq(Term::register("b"), Term::int(2), false);
        state.add_clause(Clause::get([
            Literal::equality(Term::register("c"), Term::int(0)),
            Literal::equality(Term::register("c"), Term::int(1)),
        ]));
        assert!(!smt::feasible(&state));
    }

    #[test]
    fn saturation_signals_the_empty_clause() {
        let cfg = Config::default();
        let a = Term::register("a");

        let mut state = AbstractState::new();
        state.add_eq(a, Term::int(0), false);
        state.add_eq(a, Term::int(0), true);

        // Projecting `a` rewrites the disequality into 0 ≠ 0, which is the empty clause.
        assert!(state.kill_name(a.name(), &cfg).is_err());
    }

    #[test]
    fn integers_are_uninterpreted_until_seeded() {
        let mut state = AbstractState::new();
        state.add_eq(Term::register("a"), Term::int(0), false);
        state.add_eq(Term::register("a"), Term::int(1), false);
        // Without the 0 ≠ 1 seed the constants may coincide.
        assert!(smt::feasible(&state));
    }
}
