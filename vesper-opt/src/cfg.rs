use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;

use vesper_asm::{Instruction, Opcode};

use crate::{Block, BlockId, DistinctWorklist, OptimizeError, Terminator};

/// Output of [`ControlFlowGraph::assemble`]: the fresh bytecode stream and
/// the offset each emitted block landed at.
#[derive(Debug, Clone)]
pub struct Assembly {
    /// The assembled bytecode.
    pub code: Vec<i32>,
    /// Slot offset of every emitted block, keyed by id.
    pub block_offsets: BTreeMap<BlockId, i32>,
}

/// Control-flow graph over one function body.
///
/// Owns the blocks by value; blocks refer to one another by [`BlockId`],
/// which keeps the graph's cycles free of shared ownership. Built from a
/// bytecode stream by [`ControlFlowGraph::build`], lowered back by
/// [`ControlFlowGraph::assemble`].
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    blocks: Vec<Block>,
    entry_id: BlockId,
    exit_id: BlockId,
    instructions: Vec<Instruction>,
    defarg_offsets: Vec<i32>,
}

impl ControlFlowGraph {
    /// Lift `code` into a graph of basic blocks.
    ///
    /// `default_argument_addresses` is the function's external dispatch
    /// table; its offsets are block boundaries, and all but the largest
    /// mark blocks whose size and position must survive optimization.
    pub fn build(
        code: &[i32],
        default_argument_addresses: &[i32],
    ) -> Result<ControlFlowGraph, OptimizeError> {
        let mut defarg_offsets = default_argument_addresses.to_vec();
        defarg_offsets.sort_unstable();

        let mut cfg = ControlFlowGraph {
            blocks: Vec::new(),
            entry_id: BlockId::ENTRY,
            exit_id: BlockId::EXIT,
            instructions: Vec::new(),
            defarg_offsets,
        };
        cfg.disassemble(code)?;
        cfg.build_blocks()?;
        Ok(cfg)
    }

    /// Id of the synthetic entry block.
    pub fn entry_id(&self) -> BlockId {
        self.entry_id
    }

    /// Id of the synthetic exit block.
    pub fn exit_id(&self) -> BlockId {
        self.exit_id
    }

    /// All blocks, in no particular order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of blocks in the graph.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Look up a block by id.
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|block| block.id == id)
    }

    /// Look up a block by id, mutably.
    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|block| block.id == id)
    }

    pub(crate) fn require_block(&self, id: BlockId) -> Result<&Block, OptimizeError> {
        self.block(id).ok_or(OptimizeError::BlockNotFound(id))
    }

    pub(crate) fn require_block_mut(&mut self, id: BlockId) -> Result<&mut Block, OptimizeError> {
        self.block_mut(id).ok_or(OptimizeError::BlockNotFound(id))
    }

    /// The entry block.
    pub fn entry_block(&self) -> Result<&Block, OptimizeError> {
        self.block(self.entry_id).ok_or(OptimizeError::NoEntry)
    }

    /// The exit block.
    pub fn exit_block(&self) -> Result<&Block, OptimizeError> {
        self.block(self.exit_id).ok_or(OptimizeError::NoExit)
    }

    /// Ids of every default-argument assignment block.
    pub fn defarg_block_ids(&self) -> Vec<BlockId> {
        self.defarg_offsets.iter().map(|&o| BlockId(o)).collect()
    }

    /// Ids of the frozen default-argument blocks: all but the one at the
    /// largest offset, whose size and position may change.
    pub fn frozen_defarg_block_ids(&self) -> Vec<BlockId> {
        self.frozen_offsets().iter().map(|&o| BlockId(o)).collect()
    }

    fn frozen_offsets(&self) -> &[i32] {
        match self.defarg_offsets.len() {
            0 => &self.defarg_offsets[..0],
            len => &self.defarg_offsets[..len - 1],
        }
    }

    fn disassemble(&mut self, code: &[i32]) -> Result<(), OptimizeError> {
        let defarg_count = self.defarg_offsets.len();
        let mut ip = 0;
        while ip < code.len() {
            let inst = Instruction::parse(code, ip, defarg_count)?;
            ip += inst.stride;
            self.instructions.push(inst);
        }
        // The parse loop advances by exactly the decoded strides, so the
        // strides of `instructions` always sum to the code size.
        Ok(())
    }

    fn build_blocks(&mut self) -> Result<(), OptimizeError> {
        let mut entry = Block::new(self.entry_id);
        entry.forward_edges.push(BlockId(0));

        let mut exit = Block::new(self.exit_id);
        exit.terminator = Terminator::End;

        let mut blocks = vec![exit, entry];

        // Precompute the set of jump targets so a block can be cut where
        // another branch lands mid-stream.
        let mut jump_targets: BTreeSet<i32> = BTreeSet::new();
        let mut ip: i32 = 0;
        for inst in &self.instructions {
            let next_ip = ip + inst.stride as i32;
            match inst.opcode {
                Opcode::Jump => {
                    jump_targets.insert(inst.branch_ip);
                }
                Opcode::JumpIf
                | Opcode::JumpIfNot
                | Opcode::Iterate
                | Opcode::IterateBegin => {
                    jump_targets.insert(inst.branch_ip);
                    jump_targets.insert(next_ip);
                }
                Opcode::Return | Opcode::End => {
                    jump_targets.insert(self.exit_id.0);
                }
                Opcode::JumpToDefArgument => {
                    jump_targets.extend(self.defarg_offsets.iter().copied());
                }
                _ => {}
            }
            ip = next_ip;
        }

        let mut worklist = DistinctWorklist::new();
        worklist.push(BlockId(0));

        while let Some(block_id) = worklist.pop() {
            let mut block = Block::new(block_id);

            // Seek to the instruction at the head of the block.
            let mut ip: i32 = 0;
            let mut index = 0usize;
            while index < self.instructions.len() && ip < block_id.0 {
                ip += self.instructions[index].stride as i32;
                index += 1;
            }
            if ip != block_id.0 {
                return Err(OptimizeError::BlockNotFound(block_id));
            }
            let block_start = ip;

            // Consume instructions until a branch terminates the block or
            // the stream runs into another jump target. Branches are never
            // stored in the block; the terminator and edge order carry
            // them, so passes can edit the instruction tail freely.
            loop {
                let Some(inst) = self.instructions.get(index) else {
                    block.forward_edges.push(self.exit_id);
                    break;
                };
                index += 1;
                let next_ip = ip + inst.stride as i32;
                ip = next_ip;

                match inst.opcode {
                    Opcode::Jump => {
                        block.forward_edges.push(BlockId(inst.branch_ip));
                        worklist.push(BlockId(inst.branch_ip));
                        break;
                    }
                    Opcode::JumpIf => {
                        // Canonicalized to branch-if-not by swapping the
                        // edge order; the condition sense flips back when
                        // the block is assembled as JUMP_IF_NOT.
                        block.terminator = Terminator::BranchIfNot {
                            condition: inst.source0,
                        };
                        block.forward_edges.push(BlockId(inst.branch_ip));
                        block.forward_edges.push(BlockId(next_ip));
                        worklist.push(BlockId(next_ip));
                        worklist.push(BlockId(inst.branch_ip));
                        break;
                    }
                    Opcode::JumpIfNot => {
                        block.terminator = Terminator::BranchIfNot {
                            condition: inst.source0,
                        };
                        block.forward_edges.push(BlockId(next_ip));
                        block.forward_edges.push(BlockId(inst.branch_ip));
                        worklist.push(BlockId(next_ip));
                        worklist.push(BlockId(inst.branch_ip));
                        break;
                    }
                    Opcode::IterateBegin => {
                        block.terminator = Terminator::IterateBegin {
                            counter: inst.source0,
                            container: inst.source1,
                            value: inst.target,
                        };
                        block.forward_edges.push(BlockId(next_ip));
                        block.forward_edges.push(BlockId(inst.branch_ip));
                        worklist.push(BlockId(next_ip));
                        worklist.push(BlockId(inst.branch_ip));
                        break;
                    }
                    Opcode::Iterate => {
                        block.terminator = Terminator::Iterate {
                            counter: inst.source0,
                            container: inst.source1,
                            value: inst.target,
                        };
                        block.forward_edges.push(BlockId(next_ip));
                        block.forward_edges.push(BlockId(inst.branch_ip));
                        worklist.push(BlockId(next_ip));
                        worklist.push(BlockId(inst.branch_ip));
                        break;
                    }
                    Opcode::Return => {
                        // The return carries the result value, so it stays
                        // in the body; only the transfer to the exit block
                        // is lifted into the terminator.
                        block.instructions.push(inst.clone());
                        block.forward_edges.push(self.exit_id);
                        break;
                    }
                    Opcode::End => {
                        block.forward_edges.push(self.exit_id);
                        break;
                    }
                    Opcode::JumpToDefArgument => {
                        block.terminator = Terminator::DefargDispatch;
                        block.forward_edges.push(BlockId(next_ip));
                        worklist.push(BlockId(next_ip));
                        for &offset in &self.defarg_offsets {
                            block.forward_edges.push(BlockId(offset));
                            worklist.push(BlockId(offset));
                        }
                        break;
                    }
                    _ => {
                        block.instructions.push(inst.clone());
                        if jump_targets.contains(&next_ip) {
                            block.forward_edges.push(BlockId(next_ip));
                            worklist.push(BlockId(next_ip));
                            break;
                        }
                    }
                }
            }

            if self.frozen_offsets().contains(&block.id.0) {
                block.force_code_size = Some((ip - block_start) as usize);
            }

            blocks.push(block);
        }

        // Mirror the forward edges into predecessor sets.
        let mut edges = Vec::new();
        for block in &blocks {
            for &target in &block.forward_edges {
                edges.push((block.id, target));
            }
        }
        for (pred, succ) in edges {
            let Some(index) = blocks.iter().position(|block| block.id == succ) else {
                return Err(OptimizeError::BlockNotFound(succ));
            };
            blocks[index].back_edges.insert(pred);
        }

        self.blocks = blocks;
        Ok(())
    }

    /// Drop every block that is not the entry, the exit, or a
    /// default-argument block, and that no other block branches to.
    ///
    /// Returns the number of blocks removed. Safe to run repeatedly;
    /// blocks orphaned by a removal are collected by the next run.
    pub fn remove_dead_blocks(&mut self) -> usize {
        let defarg_ids: BTreeSet<BlockId> = self.defarg_block_ids().into_iter().collect();

        let condemned: Vec<BlockId> = self
            .blocks
            .iter()
            .filter(|block| {
                block.id != self.entry_id
                    && block.id != self.exit_id
                    && !defarg_ids.contains(&block.id)
                    && block.back_edges.is_empty()
            })
            .map(|block| block.id)
            .collect();

        for &id in &condemned {
            let targets = match self.block(id) {
                Some(block) => block.forward_edges.clone(),
                None => continue,
            };
            for target in targets {
                if let Some(successor) = self.block_mut(target) {
                    successor.back_edges.remove(&id);
                }
            }
        }

        self.blocks.retain(|block| !condemned.contains(&block.id));
        condemned.len()
    }

    /// Backward live-variable analysis to a fixed point.
    ///
    /// Recomputes every block's def/use sets, then sweeps the graph from
    /// the exit along back edges, each sweep visiting a block at most once
    /// through a distinct-history worklist, until no live set grows. The
    /// sets grow monotonically over a finite address universe, so the loop
    /// terminates.
    pub fn analyze_data_flow(&mut self) -> Result<(), OptimizeError> {
        self.entry_block()?;
        self.exit_block()?;

        for block in &mut self.blocks {
            block.update_def_use();
            block.ins = block.uses.clone();
            block.outs.clear();
        }

        loop {
            let mut changed = false;
            let mut worklist = DistinctWorklist::new();
            worklist.push(self.exit_id);

            while let Some(id) = worklist.pop() {
                let block = self.require_block(id)?;
                let forward_edges = block.forward_edges.clone();
                let back_edges: Vec<BlockId> = block.back_edges.iter().copied().collect();

                let mut incoming = BTreeSet::new();
                for edge in forward_edges {
                    incoming.extend(self.require_block(edge)?.ins.iter().copied());
                }

                let index = self
                    .blocks
                    .iter()
                    .position(|block| block.id == id)
                    .ok_or(OptimizeError::BlockNotFound(id))?;
                let block = &mut self.blocks[index];

                for address in incoming {
                    if block.outs.insert(address) {
                        changed = true;
                    }
                }

                let upward: Vec<_> = block.outs.difference(&block.defs).copied().collect();
                for address in upward {
                    if block.ins.insert(address) {
                        changed = true;
                    }
                }

                for address in block.terminator_uses() {
                    if block.ins.insert(address) {
                        changed = true;
                    }
                }

                worklist.push_all(back_edges);
            }

            if !changed {
                return Ok(());
            }
        }
    }

    /// Lower the graph back to a linear bytecode stream.
    ///
    /// Lays blocks out from the entry with a distinct-history worklist
    /// that yields each block's forward edges in order, so fall-through
    /// chains stay adjacent and their unconditional jumps are elided; then
    /// emits instructions and terminators with branch targets resolved
    /// through the fresh offsets. Frozen blocks are padded with
    /// `BREAKPOINT` up to their recorded size and fail the assembly if
    /// they outgrew it.
    pub fn assemble(&self) -> Result<Assembly, OptimizeError> {
        self.block(self.entry_id).ok_or(OptimizeError::NoEntry)?;

        let mut worklist = DistinctWorklist::new();
        worklist.push(self.entry_id);
        let mut order = Vec::new();
        while let Some(id) = worklist.pop() {
            let block = self.require_block(id)?;
            order.push(id);
            // Pushed in reverse so the LIFO pop visits the fall-through
            // edge first.
            for &edge in block.forward_edges.iter().rev() {
                worklist.push(edge);
            }
        }

        let mut block_offsets = BTreeMap::new();
        let mut sizes = BTreeMap::new();
        let mut ip = 0usize;
        for (position, &id) in order.iter().enumerate() {
            let block = self.require_block(id)?;
            block_offsets.insert(id, ip as i32);

            let include_jump = match block.forward_edges.first() {
                Some(&fall_through) => order.get(position + 1) != Some(&fall_through),
                None => false,
            };
            let mut size = block.bytecode_size(include_jump);
            if let Some(limit) = block.force_code_size {
                if size > limit {
                    return Err(OptimizeError::AssemblyOverflow {
                        block: id,
                        size,
                        limit,
                    });
                }
                size = limit;
            }
            sizes.insert(id, size);
            ip += size;
        }

        let mut code: Vec<i32> = Vec::with_capacity(ip);
        for (position, &id) in order.iter().enumerate() {
            let block = self.require_block(id)?;
            let block_start = code.len();
            let resolve = |edge: BlockId| -> Result<i32, OptimizeError> {
                block_offsets
                    .get(&edge)
                    .copied()
                    .ok_or(OptimizeError::BlockNotFound(edge))
            };

            for inst in &block.instructions {
                // Branches are carried by the terminator; one smuggled
                // into the body would emit a stale target.
                debug_assert!(!inst.is_branch(), "branch instruction in block {id}");
                if !inst.omit {
                    inst.encode(&mut code);
                }
            }

            match block.terminator {
                Terminator::Jump => {}
                Terminator::BranchIfNot { condition } => {
                    let target = *block
                        .forward_edges
                        .get(1)
                        .ok_or(OptimizeError::BlockNotFound(id))?;
                    Instruction::jump_if_not(condition, resolve(target)?).encode(&mut code);
                }
                Terminator::Iterate {
                    counter,
                    container,
                    value,
                }
                | Terminator::IterateBegin {
                    counter,
                    container,
                    value,
                } => {
                    let opcode = match block.terminator {
                        Terminator::Iterate { .. } => Opcode::Iterate,
                        _ => Opcode::IterateBegin,
                    };
                    let target = *block
                        .forward_edges
                        .get(1)
                        .ok_or(OptimizeError::BlockNotFound(id))?;
                    Instruction::iterate(opcode, counter, container, value, resolve(target)?)
                        .encode(&mut code);
                }
                Terminator::DefargDispatch => {
                    code.push(Opcode::JumpToDefArgument as i32);
                    for &edge in block.forward_edges.iter().skip(1) {
                        code.push(resolve(edge)?);
                    }
                }
                Terminator::End => {
                    code.push(Opcode::End as i32);
                }
            }

            if !matches!(block.terminator, Terminator::End) {
                if let Some(&fall_through) = block.forward_edges.first() {
                    if order.get(position + 1) != Some(&fall_through) {
                        Instruction::jump(resolve(fall_through)?).encode(&mut code);
                    }
                }
            }

            if let Some(limit) = block.force_code_size {
                while code.len() - block_start < limit {
                    code.push(Opcode::Breakpoint as i32);
                }
            }

            debug_assert_eq!(Some(&(code.len() - block_start)), sizes.get(&id));
        }

        Ok(Assembly {
            code,
            block_offsets,
        })
    }

    /// Dump a per-block summary of the graph through `tracing`.
    pub fn debug_print(&self) {
        tracing::debug!("------ CFG ------");
        tracing::debug!("blocks: {}", self.blocks.len());

        for block in &self.blocks {
            tracing::debug!("-- block {} ({})", block.id, block.terminator);
            tracing::debug!("   back edges: {}", block.back_edges.len());
            tracing::debug!(
                "   forward edges: [{}]",
                block.forward_edges.iter().join(", ")
            );
            tracing::debug!("   ins ({}): [{}]", block.ins.len(), block.ins.iter().join(", "));
            tracing::debug!(
                "   outs ({}): [{}]",
                block.outs.len(),
                block.outs.iter().join(", ")
            );
            if block.instructions.is_empty() {
                tracing::debug!("   instructions: none");
            } else {
                tracing::debug!("   instructions: {}", block.instructions.len());
                for inst in &block.instructions {
                    tracing::debug!("     {inst}");
                }
            }
        }
    }

    /// Dump the linear disassembly with slot offsets through `tracing`.
    pub fn debug_print_instructions(&self) {
        tracing::debug!("------ instructions ------");
        let mut ip = 0;
        for inst in &self.instructions {
            tracing::debug!("{ip}: {inst}");
            ip += inst.stride;
        }
    }
}
