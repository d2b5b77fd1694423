/*!
A library for verifying safety and functional-correctness properties of stripped x86 binaries by abstract interpretation over an equational clause domain.

paravet computes, for each program point, a sound over-approximation of the reachable machine states, represented as a finite conjunction of first-order clauses over uninterpreted terms with equality.
Discharging a user query reduces to asking an external solver whether the final state entails the negation of the query.

# Orientation

The heart of the library is the symbolic abstract domain and the machinery that keeps it precise:

- The [structures] are the hash-consed logical objects: terms, equality atoms, signed literals, and clauses.
- An [abstract state](state) is a set of clauses, conjunctively interpreted, with subsumption removal, assignment and assertion transformers, and a precision-preserving join.
- The [consequence finder](saturation) saturates a state under a fragment of equational logic by ordered paramodulation, guided by a [simplification order](order) parameterised by the symbol being eliminated.
  Projection of a symbol --- the abstract counterpart of existential quantification --- is saturation followed by dropping every clause that still mentions it.
- The [solver bridge](smt) translates states and queries into the external decision procedure for integers with uninterpreted functions and equality.

Around the domain sits a conventional analysis loop:

- The [instruction interface](program) is the form the driver consumes: assignments over term operands, successor edges carrying assertions, a symbol table.
  Binary parsing, instruction decoding, and the stack pre-analysis live outside the library and deliver this form.
- A [control-flow graph](cfg) is reconstructed per entry point, with back-edges identified by forward dominance.
- The [forward analyzer](analysis) runs the worklist fixpoint, joining states at merges and delegating calls to user-registered transformers.

Resource control is entirely by the two clause bounds of the [configuration](config): saturation and joins discard any clause past the size or rank bound, which preserves soundness at the price of precision and guarantees termination of the fixpoint.

# Example

Prove that a register holds zero after an assignment, by refuting the negated query against the final state:

```rust
use paravet::{
    config::Config,
    program::{register, Assignment, Instruction, Program},
    analysis::ForwardAnalyzer,
    smt::{self, Verdict},
    structures::term::Term,
};

let eax = register("EAX");

let mut program = Program::new();
program
    .push(Instruction::fall(0x1000, 0x1001, vec![Assignment::set(eax, Term::int(0))]))
    .push(Instruction::ret(0x1001))
    .define_symbol("zero", 0x1000);

let mut analyzer = ForwardAnalyzer::new(program, Config::default());
analyzer.run_from("zero").expect("analysis completes");

let ret_state = analyzer.return_state().expect("the return block was reached");
let proved = smt::with_state_session(ret_state, |session| {
    session.assert_equality(eax, Term::int(0), true);
    session.check() == Verdict::Unsat
});
assert!(proved);
```

The [scenarios] module carries the bundled benchmark programs and their properties, runnable from the `paravet_cli` binary.
*/

pub mod analysis;
pub mod cfg;
pub mod config;
pub mod misc;
pub mod order;
pub mod program;
pub mod saturation;
pub mod scenarios;
pub mod smt;
pub mod state;
pub mod structures;
pub mod types;
