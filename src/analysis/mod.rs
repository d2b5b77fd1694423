/*!
The forward dataflow driver.

The driver computes, for each basic block, a sound over-approximation of every machine state reaching it, as a fixpoint over the [CFG](crate::cfg):

1. While the main worklist is non-empty, pop a block and the incoming states, join them with the stored state, and on change apply every instruction's assignments to a copy.
   For every outgoing edge: apply the edge assertions (skipping the successor when they are infeasible), apply the edge assignments, kill the per-edge condition helpers `cmp1`/`cmp2`, and push the result --- deferring onto the delayed worklist when the edge is a back-edge and deferral is configured.
2. When the main worklist empties, drain one entry from the delayed worklist: re-join, and on change re-merge the stored state with the coarser saturating join before pushing the block back.
3. Terminate when both worklists are empty.

Both worklists are priority queues keyed by block address, so iteration order is deterministic.

# Calls

At a call whose target is a known symbolic function, the driver runs the user-registered [Transformer] against a copy of the state and generates only the intraprocedural successors.
A transformer is the only way the driver models non-analysed code; a call with an unresolved target is an unrecoverable error.

# Infeasibility

A state that collapses to the empty clause while being transformed is infeasible: the edge (or the whole block output) is dropped and the fixpoint continues.
*/

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap, HashSet},
};

use crate::{
    cfg::{BasicBlock, Cfg},
    config::Config,
    misc::log::targets,
    program::{cmp1, cmp2, Addr, InstructionSource, RETURN_ADDR},
    state::AbstractState,
    structures::term::Term,
    types::err::{AnalysisError, ErrorKind},
};

/// A user-supplied model of a called function.
///
/// Receives the state at the call, the call-site block, and the run configuration, and may call any public state operation.
pub type Transformer = Box<dyn Fn(&mut AbstractState, &BasicBlock, &Config) -> TransformerResult>;

/// The outcome of a transformer: the infeasibility signal propagates like any other state operation.
pub type TransformerResult = Result<(), crate::types::err::SaturationError>;

/// A priority worklist of blocks, each carrying the states that flowed to it since it was last popped.
#[derive(Default)]
struct BlockWorklist {
    heap: BinaryHeap<Reverse<Addr>>,
    queued: HashSet<Addr>,
    pending: HashMap<Addr, Vec<AbstractState>>,
}

impl BlockWorklist {
    fn push(&mut self, addr: Addr, state: AbstractState) {
        if self.queued.insert(addr) {
            self.heap.push(Reverse(addr));
        }
        self.pending.entry(addr).or_default().push(state);
    }

    fn pop(&mut self) -> Option<(Addr, Vec<AbstractState>)> {
        let Reverse(addr) = self.heap.pop()?;
        self.queued.remove(&addr);
        let states = self.pending.remove(&addr).unwrap_or_default();
        Some((addr, states))
    }

    fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn clear(&mut self) {
        self.heap.clear();
        self.queued.clear();
        self.pending.clear();
    }
}

/// The forward analyzer: per-block states over one entry point.
pub struct ForwardAnalyzer<S: InstructionSource> {
    source: S,
    config: Config,
    cfg: Option<Cfg>,
    states: HashMap<Addr, AbstractState>,
    worklist: BlockWorklist,
    delayed: BlockWorklist,
    transformers: HashMap<Addr, Transformer>,
    seeds: Vec<(Term, Term, bool)>,
}

impl<S: InstructionSource> ForwardAnalyzer<S> {
    /// An analyzer over an instruction source.
    pub fn new(source: S, config: Config) -> Self {
        ForwardAnalyzer {
            source,
            config,
            cfg: None,
            states: HashMap::new(),
            worklist: BlockWorklist::default(),
            delayed: BlockWorklist::default(),
            transformers: HashMap::new(),
            seeds: Vec::new(),
        }
    }

    /// The run configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The instruction source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The reconstructed graph, after initialisation.
    pub fn cfg(&self) -> Option<&Cfg> {
        self.cfg.as_ref()
    }

    /// Registers a transformer for a named function.
    pub fn set_transformer(
        &mut self,
        func_name: &str,
        transformer: Transformer,
    ) -> Result<(), ErrorKind> {
        let addr = self
            .source
            .symbol_addr(func_name)
            .ok_or_else(|| AnalysisError::UnknownSymbol(func_name.to_string()))?;
        self.transformers.insert(addr, transformer);
        Ok(())
    }

    /// Seeds the startup state with the clause `{dst = src}`, or `{dst ≠ src}` when `negative`.
    pub fn seed(&mut self, dst: Term, src: Term, negative: bool) {
        self.seeds.push((dst, src, negative));
    }

    /// The stored state at a block entry address.
    pub fn state_at(&self, addr: Addr) -> Option<&AbstractState> {
        self.states.get(&addr)
    }

    /// The stored state of the return sink.
    pub fn return_state(&self) -> Option<&AbstractState> {
        self.states.get(&RETURN_ADDR)
    }

    /// Analyses from a named entry point to fixpoint.
    pub fn run_from(&mut self, func_name: &str) -> Result<(), ErrorKind> {
        let addr = self
            .source
            .symbol_addr(func_name)
            .ok_or_else(|| AnalysisError::UnknownSymbol(func_name.to_string()))?;
        self.run_from_addr(addr)
    }

    /// Analyses from an entry address to fixpoint.
    pub fn run_from_addr(&mut self, addr: Addr) -> Result<(), ErrorKind> {
        self.init(addr)?;
        self.run()
    }

    fn init(&mut self, addr: Addr) -> Result<(), ErrorKind> {
        self.cfg = Some(Cfg::build(addr, &self.source)?);
        self.states.clear();
        self.worklist.clear();
        self.delayed.clear();

        let mut startup = AbstractState::new();
        for &(dst, src, negative) in &self.seeds {
            startup.add_eq(dst, src, negative);
        }
        self.worklist.push(addr, startup);
        Ok(())
    }

    fn run(&mut self) -> Result<(), ErrorKind> {
        loop {
            while let Some((addr, states)) = self.worklist.pop() {
                self.process_item(addr, states)?;
            }
            let Some((addr, states)) = self.delayed.pop() else {
                break;
            };
            self.process_delayed(addr, states);
        }
        Ok(())
    }

    fn process_item(&mut self, addr: Addr, incoming: Vec<AbstractState>) -> Result<(), ErrorKind> {
        log::debug!(target: targets::ANALYSIS, "processing block {addr:#x}");

        if !self.join_into(addr, incoming) {
            return Ok(());
        }
        if addr == RETURN_ADDR {
            return Ok(());
        }

        let state = match self.states.get(&addr) {
            Some(state) => state.clone(),
            None => return Ok(()),
        };

        let outputs = {
            let cfg = self.cfg.as_ref().ok_or(AnalysisError::Uninitialised)?;
            let Some(block) = cfg.block(addr) else {
                return Ok(());
            };
            self.apply_block(state, block)?
        };

        for (target, state, is_back) in outputs {
            if is_back && self.config.defer_back_edges {
                self.delayed.push(target, state);
            } else {
                self.worklist.push(target, state);
            }
        }
        Ok(())
    }

    /// Joins the incoming states with the stored state; reports whether anything changed.
    fn join_into(&mut self, addr: Addr, mut incoming: Vec<AbstractState>) -> bool {
        let current = self.states.get(&addr).cloned();
        if let Some(c) = &current {
            incoming.push(c.clone());
        }
        let merged = AbstractState::merge(incoming, &self.config);
        let changed = match &current {
            None => true,
            Some(c) => *c != merged,
        };
        self.states.insert(addr, merged);
        changed
    }

    /// Delayed re-merge: if the incoming join differs from the stored state, widen with the saturating two-state join and re-queue.
    fn process_delayed(&mut self, addr: Addr, incoming: Vec<AbstractState>) {
        let merged = AbstractState::merge(incoming, &self.config);
        match self.states.get(&addr) {
            None => self.worklist.push(addr, merged),
            Some(old) if old.is_equivalent(&merged) => {}
            Some(old) => {
                let widened =
                    AbstractState::merge_two_states(old.clone(), merged, &self.config);
                self.states.remove(&addr);
                self.worklist.push(addr, widened);
            }
        }
    }

    /// Applies every instruction of the block, then propagates along the outgoing edges.
    ///
    /// An infeasible state drops the whole block output.
    fn apply_block(
        &self,
        mut state: AbstractState,
        block: &BasicBlock,
    ) -> Result<Vec<(Addr, AbstractState, bool)>, ErrorKind> {
        for instruction in &block.instructions {
            for a in &instruction.assignments {
                if state.handle_assignment(a.dst, a.src, &self.config).is_err() {
                    log::debug!(
                        target: targets::ANALYSIS,
                        "block {:#x} infeasible at {:#x}",
                        block.addr,
                        instruction.addr
                    );
                    return Ok(Vec::new());
                }
            }
        }
        self.propagate(state, block)
    }

    fn propagate(
        &self,
        state: AbstractState,
        block: &BasicBlock,
    ) -> Result<Vec<(Addr, AbstractState, bool)>, ErrorKind> {
        if !block.is_call() {
            return Ok(self.propagate_intraprocedural(state, block));
        }

        let target = block.call_target().filter(|t| t.is_const());
        let addr = match target.map(|t| t.name()) {
            Some(crate::structures::term::Name::Int(addr)) if addr >= 0 => addr as Addr,
            _ => return Err(AnalysisError::UndeterminedCall(block.addr).into()),
        };
        let Some(transformer) = self.transformers.get(&addr) else {
            return Err(AnalysisError::UndeterminedCall(addr).into());
        };

        let mut called = state.clone();
        if transformer(&mut called, block, &self.config).is_err() {
            log::debug!(target: targets::ANALYSIS, "transformer at {addr:#x} found the state infeasible");
            return Ok(Vec::new());
        }
        Ok(self.propagate_intraprocedural(called, block))
    }

    fn propagate_intraprocedural(
        &self,
        state: AbstractState,
        block: &BasicBlock,
    ) -> Vec<(Addr, AbstractState, bool)> {
        let mut out = Vec::new();
        for edge in block.edges() {
            let mut next = state.clone();

            if !next.handle_assertions(&edge.assertions) {
                continue;
            }

            let mut feasible = true;
            for a in &edge.assignments {
                if next.handle_assignment(a.dst, a.src, &self.config).is_err() {
                    feasible = false;
                    break;
                }
            }
            if !feasible {
                continue;
            }

            // The condition helpers are dead once the edge has been taken.
            if next.kill_name(cmp1().name(), &self.config).is_err()
                || next.kill_name(cmp2().name(), &self.config).is_err()
            {
                continue;
            }

            let is_back = block.back_edge_targets.contains(&edge.target);
            out.push((edge.target, next, is_back));
        }
        out
    }
}
