use std::collections::BTreeSet;

use vesper_asm::Opcode;

use crate::{
    BlockId, ControlFlowGraph, DistinctWorklist, Function, OptimizeError, Terminator,
};

mod redundancy;

/// Which pass groups [`optimize`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeConfig {
    /// Drop `LINE` and `BREAKPOINT` instructions. Off by default so debug
    /// builds keep their debugger hooks.
    pub strip_debug: bool,
    /// Thread jumps through empty blocks and collect unreachable blocks.
    pub jump_threading: bool,
    /// Run the redundancy round: insert redundant operations, eliminate
    /// common subexpressions, then eliminate dead assignments.
    pub redundancy_elimination: bool,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        OptimizeConfig {
            strip_debug: false,
            jump_threading: true,
            redundancy_elimination: true,
        }
    }
}

/// Drives the optimization of one [`Function`].
///
/// [`FunctionOptimizer::begin`] lifts the function's bytecode into a
/// control-flow graph; the `pass_*` methods transform the graph in place;
/// [`FunctionOptimizer::commit`] lowers it back and writes the function's
/// code. The function itself is only touched by `commit`, so a failure at
/// any earlier point leaves it exactly as compiled.
#[derive(Debug)]
pub struct FunctionOptimizer<'a> {
    function: &'a mut Function,
    cfg: Option<ControlFlowGraph>,
    data_flow_dirty: bool,
}

impl<'a> FunctionOptimizer<'a> {
    /// Optimizer over `function`, with no graph built yet.
    pub fn new(function: &'a mut Function) -> FunctionOptimizer<'a> {
        FunctionOptimizer {
            function,
            cfg: None,
            data_flow_dirty: true,
        }
    }

    /// Disassemble the function and build the control-flow graph,
    /// discarding any graph from an earlier `begin`.
    pub fn begin(&mut self) -> Result<(), OptimizeError> {
        self.cfg = Some(ControlFlowGraph::build(
            &self.function.code,
            &self.function.default_argument_addresses,
        )?);
        self.data_flow_dirty = true;
        Ok(())
    }

    /// The current graph, if `begin` has run.
    pub fn cfg(&self) -> Option<&ControlFlowGraph> {
        self.cfg.as_ref()
    }

    fn cfg_mut(&mut self) -> Result<&mut ControlFlowGraph, OptimizeError> {
        self.cfg.as_mut().ok_or(OptimizeError::NoEntry)
    }

    fn require_data_flow(&mut self) -> Result<(), OptimizeError> {
        if self.data_flow_dirty {
            self.cfg_mut()?.analyze_data_flow()?;
            self.data_flow_dirty = false;
        }
        Ok(())
    }

    fn invalidate_data_flow(&mut self) {
        self.data_flow_dirty = true;
    }

    /// Assemble the graph and write the result back into the function.
    ///
    /// The largest entry of the default-argument table is patched to its
    /// block's new offset; every other entry is guaranteed unchanged by
    /// the frozen-block invariant.
    pub fn commit(&mut self) -> Result<(), OptimizeError> {
        let cfg = self.cfg.take().ok_or(OptimizeError::NoEntry)?;
        let assembly = cfg.assemble()?;

        let last = self
            .function
            .default_argument_addresses
            .iter()
            .copied()
            .enumerate()
            .max_by_key(|&(_, offset)| offset);
        if let Some((slot, offset)) = last {
            if let Some(&new_offset) = assembly.block_offsets.get(&BlockId(offset)) {
                self.function.default_argument_addresses[slot] = new_offset;
            }
        }
        #[cfg(debug_assertions)]
        if let Some((last_slot, _)) = last {
            for (slot, &offset) in self.function.default_argument_addresses.iter().enumerate() {
                debug_assert!(
                    slot == last_slot
                        || assembly.block_offsets.get(&BlockId(offset)) == Some(&offset),
                    "frozen default-argument block moved"
                );
            }
        }

        self.function.code = assembly.code;
        tracing::debug!(
            function = %self.function.name,
            slots = self.function.code.len(),
            "committed optimized bytecode"
        );
        Ok(())
    }

    /// Drop `LINE` and `BREAKPOINT` instructions from every reachable
    /// block.
    ///
    /// Frozen default-argument blocks are left alone so their recorded
    /// spans keep matching their content. Liveness stays valid: both
    /// opcodes have empty def/use sets.
    pub fn pass_strip_debug(&mut self) -> Result<(), OptimizeError> {
        let cfg = self.cfg_mut()?;
        let entry_id = cfg.entry_id();

        let mut worklist = DistinctWorklist::new();
        for frozen in cfg.frozen_defarg_block_ids() {
            worklist.exclude(frozen);
        }
        worklist.push(entry_id);

        let mut dropped = 0usize;
        while let Some(id) = worklist.pop() {
            let Some(block) = cfg.block_mut(id) else { continue };
            let before = block.instructions.len();
            block
                .instructions
                .retain(|inst| !matches!(inst.opcode, Opcode::Line | Opcode::Breakpoint));
            dropped += before - block.instructions.len();
            worklist.push_all(block.forward_edges.iter().copied());
        }

        if dropped > 0 {
            tracing::debug!(dropped, "stripped debug instructions");
        }
        Ok(())
    }

    /// Remove every block no other block branches to.
    ///
    /// Entry, exit and default-argument blocks are always kept; the
    /// external dispatch table must go on pointing at real blocks.
    pub fn pass_dead_block_elimination(&mut self) -> Result<(), OptimizeError> {
        let cfg = self.cfg_mut()?;
        cfg.entry_block()?;
        cfg.exit_block()?;

        let removed = cfg.remove_dead_blocks();
        if removed > 0 {
            tracing::debug!(removed, "removed dead blocks");
        }
        self.invalidate_data_flow();
        Ok(())
    }

    /// Rewire edges around empty blocks and turn conditionals whose arms
    /// agree into plain jumps, to a fixed point.
    ///
    /// The emptied blocks themselves are left for
    /// [`FunctionOptimizer::pass_dead_block_elimination`] to collect.
    pub fn pass_jump_threading(&mut self) -> Result<(), OptimizeError> {
        let cfg = self.cfg_mut()?;
        let entry_id = cfg.entry_id();
        let exit_id = cfg.exit_id();
        let defarg_ids: BTreeSet<BlockId> = cfg.defarg_block_ids().into_iter().collect();

        let mut any_change = false;

        // Every round that changes anything removes at least one edge or
        // conditional, so the fixed point arrives within |blocks| rounds.
        for _ in 0..=cfg.block_count() {
            let mut changed = false;

            let mut empties = Vec::new();
            let mut collapses = Vec::new();
            let mut worklist = DistinctWorklist::new();
            worklist.push(entry_id);
            while let Some(id) = worklist.pop() {
                let block = cfg.require_block(id)?;
                match block.terminator {
                    Terminator::Jump
                        if block.instructions.is_empty()
                            && id != entry_id
                            && id != exit_id
                            && !defarg_ids.contains(&id)
                            && block.forward_edges.len() == 1
                            && block.forward_edges[0] != id =>
                    {
                        empties.push(id);
                    }
                    Terminator::BranchIfNot { .. }
                        if block.forward_edges.len() == 2
                            && block.forward_edges[0] == block.forward_edges[1] =>
                    {
                        collapses.push(id);
                    }
                    _ => {}
                }
                worklist.push_all(block.forward_edges.iter().copied());
            }

            for id in empties {
                let block = cfg.require_block(id)?;
                let successor = block.forward_edges[0];
                let predecessors: Vec<BlockId> = block.back_edges.iter().copied().collect();
                for pred in predecessors {
                    cfg.require_block_mut(pred)?.replace_jump_target(id, successor);
                    cfg.require_block_mut(id)?.back_edges.remove(&pred);
                    cfg.require_block_mut(successor)?.back_edges.insert(pred);
                    changed = true;
                }
            }

            for id in collapses {
                let block = cfg.require_block_mut(id)?;
                let target = block.forward_edges[0];
                block.terminator = Terminator::Jump;
                block.forward_edges = vec![target];
                changed = true;
            }

            if changed {
                any_change = true;
            } else {
                break;
            }
        }

        if any_change {
            tracing::debug!("jump threading rewired edges");
            self.invalidate_data_flow();
        }
        Ok(())
    }
}

/// Run the canonical pass pipeline over `function` and commit the result.
///
/// On any failure the function keeps its pre-optimization bytecode and the
/// error is returned after being logged.
pub fn optimize(function: &mut Function, config: &OptimizeConfig) -> Result<(), OptimizeError> {
    let name = function.name.clone();
    let result = run_pipeline(function, config);
    if let Err(error) = &result {
        tracing::warn!(function = %name, %error, "optimization failed; keeping original bytecode");
    }
    result
}

fn run_pipeline(function: &mut Function, config: &OptimizeConfig) -> Result<(), OptimizeError> {
    let mut optimizer = FunctionOptimizer::new(function);
    optimizer.begin()?;

    if config.strip_debug {
        optimizer.pass_strip_debug()?;
    }
    if config.jump_threading {
        optimizer.pass_jump_threading()?;
        optimizer.pass_dead_block_elimination()?;
    }
    if config.redundancy_elimination {
        optimizer.pass_local_insert_redundant_operation()?;
        optimizer.pass_local_common_subexpression_elimination()?;
        optimizer.pass_dead_assignment_elimination()?;
    }
    if config.jump_threading {
        optimizer.pass_jump_threading()?;
        optimizer.pass_dead_block_elimination()?;
    }

    optimizer.commit()
}
