/*!
The instruction interface the dataflow driver consumes.

Binary container parsing, instruction decoding, and the stack pre-analysis live outside this crate.
What the driver needs from them is captured here: instructions whose operands are already terms, whose effects are lists of [Assignment]s, and whose outgoing edges carry [Assertion]s and further assignments.
Stack slots arrive as the atomic names produced by [stack_slot], memory operands as `deref` terms.

Two operand conventions of the decoder are part of the driver contract:

- Comparison instructions record their operands in the helper registers [cmp1]/[cmp2], and conditional edges assert a condition over the pair.
  The driver kills both helpers after applying an edge.
- A return transfers to the pseudo-address [RETURN_ADDR], whose (empty) block is the analysis sink.

[Program] is the in-memory [InstructionSource]; a decoder would populate one from a code section, tests and the bundled scenarios populate one directly.
*/

use std::collections::BTreeMap;

use crate::{
    structures::term::Term,
    types::err::ProgramError,
};

/// A code address.
pub type Addr = u64;

/// The pseudo-address of the return sink.
pub const RETURN_ADDR: Addr = Addr::MAX;

/// A condition over a pair of terms, carried by a successor edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cond {
    /// The two terms are equal.
    Eq,

    /// The two terms differ.
    Ne,

    /// Strictly below.
    Lt,

    /// At most.
    Le,

    /// Strictly above.
    Gt,

    /// At least.
    Ge,
}

/// An assertion attached to a successor edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Assertion {
    /// The condition.
    pub cond: Cond,

    /// The left operand.
    pub lhs: Term,

    /// The right operand.
    pub rhs: Term,
}

impl Assertion {
    /// An assertion over the comparison helper registers.
    pub fn on_cmps(cond: Cond) -> Assertion {
        Assertion {
            cond,
            lhs: cmp1(),
            rhs: cmp2(),
        }
    }
}

/// A single assignment `dst := src`.
///
/// A missing source invalidates the destination: the analysis forgets everything it knew about it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Assignment {
    /// The destination operand: an atomic name or a dereference.
    pub dst: Term,

    /// The source operand, or `None` to havoc the destination.
    pub src: Option<Term>,
}

impl Assignment {
    /// The assignment `dst := src`.
    pub fn set(dst: Term, src: Term) -> Assignment {
        Assignment { dst, src: Some(src) }
    }

    /// The havoc of `dst`.
    pub fn havoc(dst: Term) -> Assignment {
        Assignment { dst, src: None }
    }
}

/// An outgoing control-flow edge of an instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuccessorEdge {
    /// The target address.
    pub target: Addr,

    /// Assertions holding along this edge.
    pub assertions: Vec<Assertion>,

    /// Assignments applied along this edge.
    pub assignments: Vec<Assignment>,
}

impl SuccessorEdge {
    /// An unconditional edge.
    pub fn to(target: Addr) -> SuccessorEdge {
        SuccessorEdge {
            target,
            assertions: Vec::new(),
            assignments: Vec::new(),
        }
    }

    /// An edge guarded by a condition over the comparison helpers.
    pub fn guarded(target: Addr, cond: Cond) -> SuccessorEdge {
        SuccessorEdge {
            target,
            assertions: vec![Assertion::on_cmps(cond)],
            assignments: Vec::new(),
        }
    }
}

/// The classification of an instruction's control transfer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum InstructionKind {
    /// Execution continues with the successors, no transfer of interest.
    #[default]
    Fall,

    /// An unconditional or conditional jump.
    Jump,

    /// A call; the target operand is a term, constant for direct calls.
    Call {
        /// The call target operand.
        target: Term,
    },

    /// A return.
    Ret,
}

/// A decoded instruction in the operand/assignment form the driver consumes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// The instruction's address.
    pub addr: Addr,

    /// The effect on the state, applied in order.
    pub assignments: Vec<Assignment>,

    /// The outgoing edges.
    pub successors: Vec<SuccessorEdge>,

    /// The control transfer classification.
    pub kind: InstructionKind,
}

impl Instruction {
    /// An instruction falling through to the next address.
    pub fn fall(addr: Addr, next: Addr, assignments: Vec<Assignment>) -> Instruction {
        Instruction {
            addr,
            assignments,
            successors: vec![SuccessorEdge::to(next)],
            kind: InstructionKind::Fall,
        }
    }

    /// A conditional jump over the comparison helpers.
    pub fn branch(addr: Addr, cond: Cond, taken: Addr, fallthrough: Addr) -> Instruction {
        let inverse = match cond {
            Cond::Eq => Cond::Ne,
            Cond::Ne => Cond::Eq,
            Cond::Lt => Cond::Ge,
            Cond::Le => Cond::Gt,
            Cond::Gt => Cond::Le,
            Cond::Ge => Cond::Lt,
        };
        Instruction {
            addr,
            assignments: Vec::new(),
            successors: vec![
                SuccessorEdge::guarded(fallthrough, inverse),
                SuccessorEdge::guarded(taken, cond),
            ],
            kind: InstructionKind::Jump,
        }
    }

    /// An unconditional jump.
    pub fn jump(addr: Addr, target: Addr) -> Instruction {
        Instruction {
            addr,
            assignments: Vec::new(),
            successors: vec![SuccessorEdge::to(target)],
            kind: InstructionKind::Jump,
        }
    }

    /// A direct call returning to `next`.
    ///
    /// The return-address push is the call's own assignment, matching the decoder convention.
    pub fn call(addr: Addr, target: Addr, next: Addr) -> Instruction {
        let esp = register("ESP");
        Instruction {
            addr,
            assignments: vec![Assignment::set(esp, esp - Term::int(4))],
            successors: vec![SuccessorEdge::to(next)],
            kind: InstructionKind::Call {
                target: Term::int(target as i64),
            },
        }
    }

    /// A return.
    pub fn ret(addr: Addr) -> Instruction {
        let esp = register("ESP");
        Instruction {
            addr,
            assignments: vec![Assignment::set(esp, esp + Term::int(4))],
            successors: vec![SuccessorEdge::to(RETURN_ADDR)],
            kind: InstructionKind::Ret,
        }
    }

    /// Whether the instruction is a call.
    pub fn is_call(&self) -> bool {
        matches!(self.kind, InstructionKind::Call { .. })
    }

    /// The call target operand, for calls.
    pub fn call_target(&self) -> Option<Term> {
        match &self.kind {
            InstructionKind::Call { target } => Some(*target),
            _ => None,
        }
    }

    /// Whether the instruction is a jump.
    pub fn is_jump(&self) -> bool {
        matches!(self.kind, InstructionKind::Jump)
    }

    /// Whether the instruction is a return.
    pub fn is_ret(&self) -> bool {
        matches!(self.kind, InstructionKind::Ret)
    }
}

/// A source of decoded instructions together with a symbol table.
///
/// This is the complete interface the driver requires from the decoding pipeline.
pub trait InstructionSource {
    /// The instruction at the given address.
    fn instruction(&self, addr: Addr) -> Result<&Instruction, ProgramError>;

    /// The address of a named symbol.
    fn symbol_addr(&self, name: &str) -> Option<Addr>;
}

/// An in-memory instruction source.
#[derive(Clone, Debug, Default)]
pub struct Program {
    instructions: BTreeMap<Addr, Instruction>,
    symbols: BTreeMap<String, Addr>,
}

impl Program {
    /// An empty program.
    pub fn new() -> Program {
        Program::default()
    }

    /// Records an instruction at its address.
    pub fn push(&mut self, instruction: Instruction) -> &mut Self {
        self.instructions.insert(instruction.addr, instruction);
        self
    }

    /// Records a symbol.
    pub fn define_symbol(&mut self, name: &str, addr: Addr) -> &mut Self {
        self.symbols.insert(name.to_string(), addr);
        self
    }

    /// An iterator over the recorded instructions, by address.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.values()
    }
}

impl InstructionSource for Program {
    fn instruction(&self, addr: Addr) -> Result<&Instruction, ProgramError> {
        self.instructions
            .get(&addr)
            .ok_or(ProgramError::MissingInstruction(addr))
    }

    fn symbol_addr(&self, name: &str) -> Option<Addr> {
        self.symbols.get(name).copied()
    }
}

/// The atomic term of a register or other symbolic operand.
pub fn register(token: &str) -> Term {
    Term::register(token)
}

/// The first comparison helper register.
pub fn cmp1() -> Term {
    Term::register("cmp1")
}

/// The second comparison helper register.
pub fn cmp2() -> Term {
    Term::register("cmp2")
}

/// The atomic name of a stack slot, as produced by the stack pre-analysis.
///
/// Offsets render in hexadecimal with an explicit sign, so the slot at `-0x14` is `stk_-14`.
pub fn stack_slot(offset: i64) -> Term {
    if offset < 0 {
        Term::register(&format!("stk_-{:x}", -offset))
    } else {
        Term::register(&format!("stk_{offset:x}"))
    }
}
