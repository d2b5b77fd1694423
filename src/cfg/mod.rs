/*!
Control-flow graph reconstruction.

A graph is built per entry address over an [InstructionSource].
Block leaders are every target of an instruction with more than one successor, a call, a jump, or a return; a block runs from its leader until the next such instruction or the next leader.
Predecessor sets are filled in a second pass.

Back-edges are identified by forward dominance: an edge `u → v` is a back-edge iff `v` dominates `u`.
The dominator sets are computed over the block graph with the entry as root.
The distinguished return block, keyed by [RETURN_ADDR], has no instructions and no successors; it is the sink the driver reads final states from.
*/

use std::collections::{BTreeMap, BTreeSet};

use petgraph::{algo::dominators, graphmap::DiGraphMap};

use crate::{
    misc::log::targets,
    program::{Addr, Instruction, InstructionSource, SuccessorEdge, RETURN_ADDR},
    structures::term::Term,
    types::err::ProgramError,
};

/// A basic block: a maximal straight-line instruction sequence.
#[derive(Clone, Debug)]
pub struct BasicBlock {
    /// The entry address of the block.
    pub addr: Addr,

    /// The instructions, in address order; empty for the return block.
    pub instructions: Vec<Instruction>,

    /// The entry addresses of predecessor blocks.
    pub preds: BTreeSet<Addr>,

    /// The successors reached along back-edges.
    pub back_edge_targets: BTreeSet<Addr>,
}

impl BasicBlock {
    /// Whether this is the return sink.
    pub fn is_return(&self) -> bool {
        self.addr == RETURN_ADDR
    }

    /// The outgoing edges, carried by the final instruction.
    pub fn edges(&self) -> &[SuccessorEdge] {
        match self.instructions.last() {
            Some(instruction) => &instruction.successors,
            None => &[],
        }
    }

    /// The entry addresses of successor blocks.
    pub fn successor_addrs(&self) -> BTreeSet<Addr> {
        self.edges().iter().map(|e| e.target).collect()
    }

    /// Whether the block ends in a call.
    pub fn is_call(&self) -> bool {
        self.instructions.last().is_some_and(Instruction::is_call)
    }

    /// The call target operand of the final instruction, for call blocks.
    pub fn call_target(&self) -> Option<Term> {
        self.instructions.last().and_then(Instruction::call_target)
    }
}

/// The control-flow graph of one entry point.
#[derive(Clone, Debug)]
pub struct Cfg {
    /// The entry address.
    pub entry: Addr,

    blocks: BTreeMap<Addr, BasicBlock>,
}

impl Cfg {
    /// Reconstructs the graph reachable from `entry`.
    pub fn build(entry: Addr, source: &impl InstructionSource) -> Result<Cfg, ProgramError> {
        let leaders = collect_leaders(entry, source)?;

        let mut blocks: BTreeMap<Addr, BasicBlock> = BTreeMap::new();
        let mut worklist: Vec<Addr> = vec![entry];
        let mut seen: BTreeSet<Addr> = BTreeSet::new();
        seen.insert(entry);

        while let Some(addr) = worklist.pop() {
            let block = build_block(addr, source, &leaders)?;
            for succ in block.successor_addrs() {
                if seen.insert(succ) {
                    worklist.push(succ);
                }
            }
            blocks.insert(addr, block);
        }

        // Predecessors, in a second pass over the discovered blocks.
        let edges: Vec<(Addr, Addr)> = blocks
            .values()
            .flat_map(|b| b.successor_addrs().into_iter().map(move |s| (b.addr, s)))
            .collect();
        for (from, to) in &edges {
            if let Some(block) = blocks.get_mut(to) {
                block.preds.insert(*from);
            }
        }

        let mut cfg = Cfg { entry, blocks };
        cfg.mark_back_edges(&edges);

        log::debug!(
            target: targets::CFG,
            "built cfg at {entry:#x}: {} blocks",
            cfg.blocks.len()
        );
        Ok(cfg)
    }

    fn mark_back_edges(&mut self, edges: &[(Addr, Addr)]) {
        let mut graph: DiGraphMap<Addr, ()> = DiGraphMap::new();
        for addr in self.blocks.keys() {
            graph.add_node(*addr);
        }
        for (from, to) in edges {
            graph.add_edge(*from, *to, ());
        }

        let dominance = dominators::simple_fast(&graph, self.entry);
        let backward: Vec<(Addr, Addr)> = edges
            .iter()
            .filter(|(from, to)| {
                dominance
                    .dominators(*from)
                    .map(|mut doms| doms.any(|d| d == *to))
                    .unwrap_or(false)
            })
            .copied()
            .collect();

        for (from, to) in backward {
            if let Some(block) = self.blocks.get_mut(&from) {
                block.back_edge_targets.insert(to);
            }
        }
    }

    /// The block with the given entry address.
    pub fn block(&self, addr: Addr) -> Option<&BasicBlock> {
        self.blocks.get(&addr)
    }

    /// The entry block.
    pub fn entry_block(&self) -> Option<&BasicBlock> {
        self.blocks.get(&self.entry)
    }

    /// An iterator over every block, by entry address.
    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.values()
    }
}

/// Every block leader reachable from the entry: the entry itself, the targets of branching instructions, and every control-flow merge.
fn collect_leaders(
    entry: Addr,
    source: &impl InstructionSource,
) -> Result<BTreeSet<Addr>, ProgramError> {
    let mut leaders: BTreeSet<Addr> = BTreeSet::new();
    leaders.insert(entry);

    let mut visited: BTreeSet<Addr> = BTreeSet::new();
    let mut incoming: BTreeMap<Addr, BTreeSet<Addr>> = BTreeMap::new();
    let mut worklist: Vec<Addr> = vec![entry];

    while let Some(addr) = worklist.pop() {
        if addr == RETURN_ADDR || !visited.insert(addr) {
            continue;
        }
        let instruction = source.instruction(addr)?;
        let breaking = instruction.successors.len() != 1
            || instruction.is_call()
            || instruction.is_jump()
            || instruction.is_ret();
        for edge in &instruction.successors {
            incoming.entry(edge.target).or_default().insert(addr);
            worklist.push(edge.target);
            if breaking {
                leaders.insert(edge.target);
            }
        }
    }

    // A merge is a leader even when both flows arrive by fall-through.
    for (target, sources) in incoming {
        if sources.len() >= 2 {
            leaders.insert(target);
        }
    }

    Ok(leaders)
}

fn build_block(
    addr: Addr,
    source: &impl InstructionSource,
    leaders: &BTreeSet<Addr>,
) -> Result<BasicBlock, ProgramError> {
    let mut instructions = Vec::new();

    if addr != RETURN_ADDR {
        let mut cursor = addr;
        loop {
            let instruction = source.instruction(cursor)?.clone();
            let stop = instruction.successors.len() != 1
                || instruction.is_call()
                || instruction.is_jump()
                || instruction.is_ret();
            let next = instruction.successors.first().map(|e| e.target);
            instructions.push(instruction);
            if stop {
                break;
            }
            match next {
                Some(next) if !leaders.contains(&next) => cursor = next,
                _ => break,
            }
        }
    }

    Ok(BasicBlock {
        addr,
        instructions,
        preds: BTreeSet::new(),
        back_edge_targets: BTreeSet::new(),
    })
}
