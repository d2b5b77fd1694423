/*!
The bundled verification scenarios.

Each scenario pairs a program in the [instruction interface](crate::program) form with the property its analysis must discharge, and mirrors one benchmark of the reference suite: a searched-value invariant, a resource manager with an opaque selector, a kernel null-dereference pattern, allocation disjointness over list building, and a null return code.

The decoding pipeline is out of scope for the library, so the programs are recorded directly in decoded form: stack slots appear as `stk_*` names and comparisons through the `cmp1`/`cmp2` helpers, exactly as the stack pre-analysis and decoder would deliver them.

Scenarios are used by both the CLI binary and the integration tests.
*/

use crate::{
    analysis::{ForwardAnalyzer, Transformer},
    config::{Config, DerefUpdate},
    program::{cmp1, cmp2, register, stack_slot, Assignment, Cond, Instruction, Program},
    smt::{self, Verdict},
    structures::term::Term,
    types::err::{AnalysisError, ErrorKind, ProofError},
};

/// A named scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scenario {
    /// Proves that a non-null result of a search loop points at the searched value.
    FindLast,

    /// Proves two resource slots survive an opaque selector call.
    ResourceManager,

    /// Proves every memory load dereferences a non-null address.
    Cve20147841,

    /// Proves two fresh allocations are distinct, under the strong deref update.
    BuildLists,

    /// Proves a function returns zero on every path.
    NullRc,
}

impl Scenario {
    /// Every scenario, in benchmark order.
    pub fn all() -> [Scenario; 5] {
        [
            Scenario::FindLast,
            Scenario::ResourceManager,
            Scenario::Cve20147841,
            Scenario::BuildLists,
            Scenario::NullRc,
        ]
    }

    /// The scenario with the given name.
    pub fn from_name(name: &str) -> Option<Scenario> {
        match name {
            "find_last" => Some(Scenario::FindLast),
            "resource_manager" => Some(Scenario::ResourceManager),
            "cve_2014_7841" => Some(Scenario::Cve20147841),
            "build_lists" => Some(Scenario::BuildLists),
            "null_rc" => Some(Scenario::NullRc),
            _ => None,
        }
    }

    /// The benchmark name.
    pub fn name(self) -> &'static str {
        match self {
            Scenario::FindLast => "find_last",
            Scenario::ResourceManager => "resource_manager",
            Scenario::Cve20147841 => "cve_2014_7841",
            Scenario::BuildLists => "build_lists",
            Scenario::NullRc => "null_rc",
        }
    }

    /// Analyses the scenario's program and discharges its property.
    pub fn run(self, config: Config) -> Result<(), ErrorKind> {
        match self {
            Scenario::FindLast => find_last(config),
            Scenario::ResourceManager => resource_manager(config),
            Scenario::Cve20147841 => cve_2014_7841(config),
            Scenario::BuildLists => build_lists(config),
            Scenario::NullRc => null_rc(config),
        }
    }
}

/// A transformer modelling an opaque selector: the return register is havocked and the argument slot popped.
fn random_selector() -> Transformer {
    Box::new(|state, _block, cfg| {
        state.kill_name(register("EAX").name(), cfg)?;
        let esp = register("ESP");
        state.handle_assignment(esp, Some(esp + Term::int(4)), cfg)
    })
}

/// A transformer modelling a fresh allocation: the return register is havocked, asserted apart from every atomic name in the state, and the argument slot popped.
fn fresh_allocation() -> Transformer {
    Box::new(|state, _block, cfg| {
        let eax = register("EAX");
        state.kill_name(eax.name(), cfg)?;
        for name in state.atomic_names() {
            state.add_eq(eax, Term::get(name, &[]), true);
        }
        let esp = register("ESP");
        state.handle_assignment(esp, Some(esp + Term::int(4)), cfg)
    })
}

fn proof_failure(query: &str) -> ErrorKind {
    ProofError::Unproved(query.to_string()).into()
}

fn missing_return_state() -> ErrorKind {
    AnalysisError::Uninitialised.into()
}

/// A loop scanning an array for a value, recording the last position holding it.
///
/// At the return the result register is either still null or points at the value: `EAX ≠ 0 ∧ [EAX] ≠ stk_8` must be unsatisfiable.
fn find_last(config: Config) -> Result<(), ErrorKind> {
    let eax = register("EAX");
    let ecx = register("ECX");
    let arr = stack_slot(0x4);
    let value = stack_slot(0x8);
    let end = stack_slot(0xc);

    let mut program = Program::new();
    program
        .push(Instruction::fall(0x1000, 0x1001, vec![Assignment::set(eax, Term::int(0))]))
        .push(Instruction::fall(0x1001, 0x1002, vec![Assignment::set(ecx, arr)]))
        .push(Instruction::fall(
            0x1002,
            0x1003,
            vec![
                Assignment::set(cmp1(), ecx.deref()),
                Assignment::set(cmp2(), value),
            ],
        ))
        .push(Instruction::branch(0x1003, Cond::Eq, 0x1004, 0x1005))
        .push(Instruction::fall(0x1004, 0x1005, vec![Assignment::set(eax, ecx)]))
        .push(Instruction::fall(
            0x1005,
            0x1006,
            vec![Assignment::set(cmp1(), ecx), Assignment::set(cmp2(), end)],
        ))
        .push(Instruction::branch(0x1006, Cond::Ne, 0x1007, 0x1009))
        .push(Instruction::fall(
            0x1007,
            0x1008,
            vec![Assignment::set(ecx, ecx + Term::int(4))],
        ))
        .push(Instruction::jump(0x1008, 0x1002))
        .push(Instruction::ret(0x1009))
        .define_symbol("find_last", 0x1000);

    let mut analyzer = ForwardAnalyzer::new(program, config);
    analyzer.run_from("find_last")?;

    let ret_state = analyzer.return_state().ok_or_else(missing_return_state)?;
    let proved = smt::with_state_session(ret_state, |session| {
        session.assert_equality(eax, Term::int(0), true);
        session.assert_equality(eax.deref(), value, true);
        session.check() == Verdict::Unsat
    });
    if !proved {
        return Err(proof_failure("EAX != 0 && [EAX] != stk_8"));
    }
    Ok(())
}

/// Two resource slots are initialised, an opaque selector runs, and a third slot takes a branch-dependent value.
///
/// `stk_-14 ≠ 0 ∧ stk_-18 ≠ 1` must be unsatisfiable at the return.
fn resource_manager(config: Config) -> Result<(), ErrorKind> {
    let eax = register("EAX");
    let esp = register("ESP");
    let first = stack_slot(-0x14);
    let second = stack_slot(-0x18);
    let chosen = stack_slot(-0x1c);

    let mut program = Program::new();
    program
        .push(Instruction::fall(0x2000, 0x2001, vec![Assignment::set(first, Term::int(0))]))
        .push(Instruction::fall(0x2001, 0x2002, vec![Assignment::set(second, Term::int(1))]))
        .push(Instruction::fall(
            0x2002,
            0x2003,
            vec![Assignment::set(esp, esp - Term::int(4))],
        ))
        .push(Instruction::call(0x2003, 0x2100, 0x2004))
        .push(Instruction::fall(
            0x2004,
            0x2005,
            vec![Assignment::set(cmp1(), eax), Assignment::set(cmp2(), Term::int(2))],
        ))
        .push(Instruction::branch(0x2005, Cond::Eq, 0x2006, 0x2007))
        .push(Instruction::fall(0x2006, 0x2008, vec![Assignment::set(chosen, Term::int(2))]))
        .push(Instruction::fall(0x2007, 0x2008, vec![Assignment::set(chosen, eax)]))
        .push(Instruction::ret(0x2008))
        .define_symbol("resource_manager", 0x2000)
        .define_symbol("random_selector", 0x2100);

    let mut analyzer = ForwardAnalyzer::new(program, config);
    analyzer.set_transformer("random_selector", random_selector())?;
    // The integers of the theory are uninterpreted, so the distinctness of the small constants is seeded.
    analyzer.seed(Term::int(0), Term::int(1), true);
    analyzer.seed(Term::int(0), Term::int(2), true);
    analyzer.seed(Term::int(1), Term::int(2), true);
    analyzer.run_from("resource_manager")?;

    let ret_state = analyzer.return_state().ok_or_else(missing_return_state)?;
    let proved = smt::with_state_session(ret_state, |session| {
        session.assert_equality(first, Term::int(0), true);
        session.assert_equality(second, Term::int(1), true);
        session.check() == Verdict::Unsat
    });
    if !proved {
        return Err(proof_failure("stk_-14 != 0 && stk_-18 != 1"));
    }
    Ok(())
}

/// Loads through a pointer that is one of two seeded non-null globals, on either side of a branch.
///
/// Just before every memory load, the state must prove the address non-null.
fn cve_2014_7841(config: Config) -> Result<(), ErrorKind> {
    let eax = register("EAX");
    let ebx = register("EBX");
    let ecx = register("ECX");
    let v4 = 0x804f000u64;
    let v6 = 0x804f004u64;

    let mut program = Program::new();
    program
        .push(Instruction::fall(0x3000, 0x3001, vec![Assignment::set(eax, Term::int(v4 as i64))]))
        .push(Instruction::fall(0x3001, 0x3002, vec![Assignment::set(ebx, eax.deref())]))
        .push(Instruction::fall(
            0x3002,
            0x3003,
            vec![Assignment::set(cmp1(), ebx), Assignment::set(cmp2(), Term::int(0))],
        ))
        .push(Instruction::branch(0x3003, Cond::Eq, 0x3004, 0x3005))
        .push(Instruction::fall(0x3004, 0x3005, vec![Assignment::set(eax, Term::int(v6 as i64))]))
        .push(Instruction::fall(0x3005, 0x3006, vec![Assignment::set(ecx, eax.deref())]))
        .push(Instruction::ret(0x3006))
        .define_symbol("cve_2014_7841", 0x3000)
        .define_symbol("sctp_af_v4_specific", v4)
        .define_symbol("sctp_af_v6_specific", v6);

    let mut analyzer = ForwardAnalyzer::new(program, config);
    // The global struct addresses are not NULL.
    analyzer.seed(Term::int(v4 as i64), Term::int(0), true);
    analyzer.seed(Term::int(v6 as i64), Term::int(0), true);
    analyzer.run_from("cve_2014_7841")?;

    // Every memory load must be provably safe in the state just before its instruction.
    let cfg = analyzer.cfg().ok_or_else(missing_return_state)?.clone();
    for block in cfg.blocks() {
        let Some(entry_state) = analyzer.state_at(block.addr) else {
            continue;
        };
        let mut state = entry_state.clone();
        'block: for instruction in &block.instructions {
            for a in &instruction.assignments {
                let Some(src) = a.src else { continue };
                if !src.is_deref() {
                    continue;
                }
                let safe = smt::with_state_session(&state, |session| {
                    session.assert_equality(src.addr(), Term::int(0), false);
                    session.check() == Verdict::Unsat
                });
                if !safe {
                    return Err(proof_failure("memory load from a possibly-null address"));
                }
            }
            for a in &instruction.assignments {
                if state
                    .handle_assignment(a.dst, a.src, analyzer.config())
                    .is_err()
                {
                    // The replayed prefix is infeasible; later loads in this block are unreachable.
                    break 'block;
                }
            }
        }
    }
    Ok(())
}

/// Builds two one-element lists from fresh allocations and stores through their head pointers.
///
/// With the strong deref update, `stk_-c = stk_-10` must be unsatisfiable at the return.
fn build_lists(mut config: Config) -> Result<(), ErrorKind> {
    config.deref_update = DerefUpdate::Strong;

    let eax = register("EAX");
    let esp = register("ESP");
    let x = stack_slot(-0xc);
    let y = stack_slot(-0x10);

    let mut program = Program::new();
    program
        .push(Instruction::fall(
            0x4000,
            0x4001,
            vec![Assignment::set(esp, esp - Term::int(4))],
        ))
        .push(Instruction::call(0x4001, 0x4100, 0x4002))
        .push(Instruction::fall(0x4002, 0x4003, vec![Assignment::set(x, eax)]))
        .push(Instruction::fall(
            0x4003,
            0x4004,
            vec![Assignment::set(eax.deref(), Term::int(0))],
        ))
        .push(Instruction::fall(
            0x4004,
            0x4005,
            vec![Assignment::set(esp, esp - Term::int(4))],
        ))
        .push(Instruction::call(0x4005, 0x4100, 0x4006))
        .push(Instruction::fall(0x4006, 0x4007, vec![Assignment::set(y, eax)]))
        .push(Instruction::fall(
            0x4007,
            0x4008,
            vec![Assignment::set(eax.deref(), Term::int(0))],
        ))
        .push(Instruction::ret(0x4008))
        .define_symbol("build_lists", 0x4000)
        .define_symbol("allocate_list_item", 0x4100)
        .define_symbol("random_selector", 0x4200);

    let mut analyzer = ForwardAnalyzer::new(program, config);
    analyzer.set_transformer("allocate_list_item", fresh_allocation())?;
    analyzer.set_transformer("random_selector", random_selector())?;
    // Dummy slots that are never killed, so the allocation transformer has names to assert apart from.
    analyzer.seed(stack_slot(0x8), stack_slot(0xc), true);
    analyzer.run_from("build_lists")?;

    let ret_state = analyzer.return_state().ok_or_else(missing_return_state)?;
    let proved = smt::with_state_session(ret_state, |session| {
        session.assert_equality(x, y, false);
        session.check() == Verdict::Unsat
    });
    if !proved {
        return Err(proof_failure("stk_-c == stk_-10"));
    }
    Ok(())
}

/// Returns zero on both sides of a branch on the first argument.
///
/// `EAX ≠ 0` must be unsatisfiable at the return.
fn null_rc(config: Config) -> Result<(), ErrorKind> {
    let eax = register("EAX");
    let arg = stack_slot(0x4);

    let mut program = Program::new();
    program
        .push(Instruction::fall(
            0x5000,
            0x5001,
            vec![Assignment::set(cmp1(), arg), Assignment::set(cmp2(), Term::int(0))],
        ))
        .push(Instruction::branch(0x5001, Cond::Eq, 0x5002, 0x5003))
        .push(Instruction::fall(0x5002, 0x5004, vec![Assignment::set(eax, arg)]))
        .push(Instruction::fall(0x5003, 0x5004, vec![Assignment::set(eax, Term::int(0))]))
        .push(Instruction::ret(0x5004))
        .define_symbol("null_rc", 0x5000);

    let mut analyzer = ForwardAnalyzer::new(program, config);
    analyzer.run_from("null_rc")?;

    let ret_state = analyzer.return_state().ok_or_else(missing_return_state)?;
    let proved = smt::with_state_session(ret_state, |session| {
        session.assert_equality(eax, Term::int(0), true);
        session.check() == Verdict::Unsat
    });
    if !proved {
        return Err(proof_failure("EAX != 0"));
    }
    Ok(())
}
