/*!
The bridge to the external decision procedure.

The domain reasons over uninterpreted functions with equality.
Its SMT image is deliberately shallow:

- Every atomic name --- *including the integer constants* --- translates to an integer constant named by its token.
  Distinctness of two integers holds only when a client asserts it, which keeps the solver inside the equality fragment the saturation calculus is complete for.
- The two boolean constant terms translate to the reserved integer constants `!true` and `!false`, asserted distinct once per session.
- Every compound head, the base operators and the comparison heads alike, is an uninterpreted function per `(name, arity)`.
- A literal is (dis)equality of its two sides, a clause the disjunction of its literals, a state the conjunction of its clauses, and the empty clause is `false`.
- The meta-variable is universally quantified *per clause*, over a fresh bound integer.

[Session] wraps a solver together with a translation cache and exposes the assert/push/pop/check surface the rest of the library relies on.
Solver handles are created per call site, scoped by [with_session]/[with_state_session]; assertions are pushed and popped around each query, so a solver never carries state across queries.

Translation caches are per-session: solver asts are scoped to their context, so the caches cannot live with the interning tables.
*/

use std::collections::HashMap;

use z3::{
    ast::{forall_const, Ast, Bool, Dynamic, Int},
    Config, Context, FuncDecl, SatResult, Solver, Sort,
};

use crate::{
    state::AbstractState,
    structures::{
        clause::Clause,
        literal::Literal,
        term::{Name, Term},
    },
};

/// The outcome of a `check`.
///
/// Clients only ever branch on `Unsat`; `Unknown` is deliberately conflated with `Sat` so that solver incompleteness degrades precision, not soundness.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The assertions are satisfiable.
    Sat,

    /// The assertions are unsatisfiable.
    Unsat,

    /// The solver could not decide.
    Unknown,
}

impl From<SatResult> for Verdict {
    fn from(value: SatResult) -> Self {
        match value {
            SatResult::Sat => Verdict::Sat,
            SatResult::Unsat => Verdict::Unsat,
            SatResult::Unknown => Verdict::Unknown,
        }
    }
}

fn name_token(name: Name) -> String {
    match name {
        Name::Bool(true) => "!true".to_string(),
        Name::Bool(false) => "!false".to_string(),
        Name::Int(i) => i.to_string(),
        Name::Sym(s) => s.to_string(),
    }
}

/// A translation cache from interned structures to solver asts, scoped to one solver context.
pub struct Translator<'ctx> {
    ctx: &'ctx Context,
    terms: HashMap<Term, Dynamic<'ctx>>,
    clauses: HashMap<Clause, Bool<'ctx>>,
    funcs: HashMap<(Name, usize), FuncDecl<'ctx>>,
}

impl<'ctx> Translator<'ctx> {
    /// A fresh translator over the given context.
    pub fn new(ctx: &'ctx Context) -> Self {
        Translator {
            ctx,
            terms: HashMap::new(),
            clauses: HashMap::new(),
            funcs: HashMap::new(),
        }
    }

    /// The integer-sorted ast of a term, with occurrences of the meta-variable replaced by `var` when given.
    pub fn term(&mut self, t: Term, var: Option<&Dynamic<'ctx>>) -> Dynamic<'ctx> {
        let cacheable = t.is_ground();
        if cacheable {
            if let Some(e) = self.terms.get(&t) {
                return e.clone();
            }
        }

        let expr = if t.is_atomic() {
            if t.is_var() {
                match var {
                    Some(v) => v.clone(),
                    // A bare meta-variable only reaches the solver through a quantified clause.
                    None => Dynamic::from_ast(&Int::new_const(self.ctx, name_token(t.name()))),
                }
            } else {
                Dynamic::from_ast(&Int::new_const(self.ctx, name_token(t.name())))
            }
        } else {
            let args: Vec<Dynamic<'ctx>> =
                t.args().iter().map(|a| self.term(*a, var)).collect();
            let arg_refs: Vec<&dyn Ast<'ctx>> = args.iter().map(|a| a as &dyn Ast).collect();
            self.func(t.name(), args.len()).apply(&arg_refs)
        };

        if cacheable {
            self.terms.insert(t, expr.clone());
        }
        expr
    }

    fn func(&mut self, name: Name, arity: usize) -> &FuncDecl<'ctx> {
        self.funcs.entry((name, arity)).or_insert_with(|| {
            let int = Sort::int(self.ctx);
            let domain: Vec<&Sort> = std::iter::repeat(&int).take(arity).collect();
            FuncDecl::new(self.ctx, name_token(name), &domain, &int)
        })
    }

    /// The boolean ast of a literal.
    pub fn literal(&mut self, l: Literal, var: Option<&Dynamic<'ctx>>) -> Bool<'ctx> {
        match l.terms() {
            None => Bool::from_bool(self.ctx, l == Literal::TRUE),
            Some((s, t)) => {
                let s = self.term(s, var);
                let t = self.term(t, var);
                let eq = s._eq(&t);
                if l.is_negative() {
                    eq.not()
                } else {
                    eq
                }
            }
        }
    }

    /// The boolean ast of a clause, with the meta-variable universally quantified over a fresh bound integer.
    pub fn clause(&mut self, c: Clause) -> Bool<'ctx> {
        if let Some(e) = self.clauses.get(&c) {
            return e.clone();
        }

        let expr = if c.is_empty() {
            Bool::from_bool(self.ctx, false)
        } else if c.is_ground() {
            let lits: Vec<Bool<'ctx>> = c
                .literals()
                .iter()
                .map(|l| self.literal(*l, None))
                .collect();
            match lits.as_slice() {
                [single] => single.clone(),
                _ => {
                    let refs: Vec<&Bool<'ctx>> = lits.iter().collect();
                    Bool::or(self.ctx, &refs)
                }
            }
        } else {
            let bound = Int::fresh_const(self.ctx, "!x");
            let bound_dynamic = Dynamic::from_ast(&bound);
            let lits: Vec<Bool<'ctx>> = c
                .literals()
                .iter()
                .map(|l| self.literal(*l, Some(&bound_dynamic)))
                .collect();
            let body = match lits.as_slice() {
                [single] => single.clone(),
                _ => {
                    let refs: Vec<&Bool<'ctx>> = lits.iter().collect();
                    Bool::or(self.ctx, &refs)
                }
            };
            forall_const(self.ctx, &[&bound], &[], &body)
        };

        self.clauses.insert(c, expr.clone());
        expr
    }

    /// The boolean ast of a state: the conjunction of its clauses.
    pub fn state(&mut self, state: &AbstractState) -> Bool<'ctx> {
        let clauses: Vec<Bool<'ctx>> = state.iter().map(|c| self.clause(c)).collect();
        match clauses.as_slice() {
            [] => Bool::from_bool(self.ctx, true),
            [single] => single.clone(),
            _ => {
                let refs: Vec<&Bool<'ctx>> = clauses.iter().collect();
                Bool::and(self.ctx, &refs)
            }
        }
    }
}

/// A solver handle together with its translation cache.
pub struct Session<'ctx> {
    translator: Translator<'ctx>,
    solver: Solver<'ctx>,
}

impl<'ctx> Session<'ctx> {
    /// A fresh session over the given context, with the boolean constants asserted distinct.
    pub fn new(ctx: &'ctx Context) -> Self {
        let mut translator = Translator::new(ctx);
        let solver = Solver::new(ctx);
        let yes = translator.term(Term::boolean(true), None);
        let no = translator.term(Term::boolean(false), None);
        solver.assert(&yes._eq(&no).not());
        Session { translator, solver }
    }

    /// Asserts every clause of a state.
    pub fn assert_state(&mut self, state: &AbstractState) {
        for c in state.iter() {
            self.assert_clause(c);
        }
    }

    /// Asserts a clause.
    pub fn assert_clause(&mut self, c: Clause) {
        let expr = self.translator.clause(c);
        self.solver.assert(&expr);
    }

    /// Asserts the negation of a clause.
    pub fn assert_not_clause(&mut self, c: Clause) {
        let expr = self.translator.clause(c).not();
        self.solver.assert(&expr);
    }

    /// Asserts a literal.
    pub fn assert_literal(&mut self, l: Literal) {
        let expr = self.translator.literal(l, None);
        self.solver.assert(&expr);
    }

    /// Asserts `s = t`, or `s ≠ t` when `negated`.
    pub fn assert_equality(&mut self, s: Term, t: Term, negated: bool) {
        let s = self.translator.term(s, None);
        let t = self.translator.term(t, None);
        let eq = s._eq(&t);
        self.solver.assert(&if negated { eq.not() } else { eq });
    }

    /// Pushes a backtracking point.
    pub fn push(&mut self) {
        self.solver.push();
    }

    /// Pops one backtracking point.
    pub fn pop(&mut self) {
        self.solver.pop(1);
    }

    /// Checks the current assertions.
    pub fn check(&mut self) -> Verdict {
        self.solver.check().into()
    }
}

/// Runs a closure over a fresh session.
pub fn with_session<R>(f: impl for<'ctx> FnOnce(&mut Session<'ctx>) -> R) -> R {
    let cfg = Config::new();
    let ctx = Context::new(&cfg);
    let mut session = Session::new(&ctx);
    f(&mut session)
}

/// Runs a closure over a fresh session with the state already asserted.
pub fn with_state_session<R>(
    state: &AbstractState,
    f: impl for<'ctx> FnOnce(&mut Session<'ctx>) -> R,
) -> R {
    with_session(|session| {
        session.assert_state(state);
        f(session)
    })
}

/// Whether the state has a model.
pub fn feasible(state: &AbstractState) -> bool {
    with_state_session(state, |session| session.check() != Verdict::Unsat)
}

/// Whether the state entails the clause.
pub fn entails_clause(state: &AbstractState, c: Clause) -> bool {
    with_state_session(state, |session| {
        session.assert_not_clause(c);
        session.check() == Verdict::Unsat
    })
}

/// Whether two states are equivalent, by refuting the negated bi-implication.
pub fn equivalent(a: &AbstractState, b: &AbstractState) -> bool {
    let cfg = Config::new();
    let ctx = Context::new(&cfg);
    let mut translator = Translator::new(&ctx);
    let solver = Solver::new(&ctx);

    let yes = translator.term(Term::boolean(true), None);
    let no = translator.term(Term::boolean(false), None);
    solver.assert(&yes._eq(&no).not());

    let ea = translator.state(a);
    let eb = translator.state(b);
    let both = Bool::and(&ctx, &[&ea.implies(&eb), &eb.implies(&ea)]);
    solver.assert(&both.not());
    Verdict::from(solver.check()) == Verdict::Unsat
}

thread_local! {
    static FOLD_CTX: Context = Context::new(&Config::new());
}

/// Attempts to fold the equality of two ground terms to a constant boolean with the solver's simplifier.
///
/// Within the uninterpreted image almost nothing folds; the hook exists so the atom factory and the simplifier agree on what a trivial atom is.
pub(crate) fn fold_equality(s: Term, t: Term) -> Option<bool> {
    if !s.is_ground() || !t.is_ground() {
        return None;
    }
    FOLD_CTX.with(|ctx| {
        let mut translator = Translator::new(ctx);
        let s = translator.term(s, None);
        let t = translator.term(t, None);
        s._eq(&t).simplify().as_bool()
    })
}
