//! The redundancy passes: dead-assignment elimination, block-local common
//! subexpression elimination, and the redundant-operation insertion that
//! seeds it.

use std::collections::BTreeMap;

use vesper_asm::{Address, DefUse, Instruction, OpExpression, Opcode};

use crate::optimizer::FunctionOptimizer;
use crate::{DistinctWorklist, OptimizeError};

/// An expression whose value is known to live at `target`, until either is
/// overwritten.
#[derive(Debug, Clone, Copy)]
struct AvailableExpression {
    expression: OpExpression,
    target: Address,
    removed: bool,
}

fn invalidate(availables: &mut [AvailableExpression], target: Address) {
    for available in availables {
        if !available.removed
            && (available.target == target || available.expression.uses(target))
        {
            available.removed = true;
        }
    }
}

impl FunctionOptimizer<'_> {
    /// Drop instructions that write a value no later code can observe.
    ///
    /// Walks each block's instructions in reverse against a live set
    /// seeded from the block's live-outs and terminator reads.
    /// Instructions that may have side effects are always kept.
    pub fn pass_dead_assignment_elimination(&mut self) -> Result<(), OptimizeError> {
        self.require_data_flow()?;
        let cfg = self.cfg_mut()?;
        let exit_id = cfg.exit_id();

        let mut removed = 0usize;
        let mut worklist = DistinctWorklist::new();
        worklist.push(exit_id);

        while let Some(id) = worklist.pop() {
            let Some(block) = cfg.block_mut(id) else { continue };

            let mut live = block.outs.clone();
            live.extend(block.terminator_uses());

            let mut kept: Vec<Instruction> = Vec::with_capacity(block.instructions.len());
            for inst in std::mem::take(&mut block.instructions).into_iter().rev() {
                let defines = inst.defuse.contains(DefUse::TARGET);
                if defines && !live.contains(&inst.target) && !inst.may_have_side_effects() {
                    removed += 1;
                    continue;
                }

                if defines {
                    live.remove(&inst.target);
                }
                if inst.defuse.contains(DefUse::SOURCE0) {
                    live.insert(inst.source0);
                }
                if inst.defuse.intersects(DefUse::SOURCE1 | DefUse::INDEX) {
                    live.insert(inst.source1);
                }
                if inst.defuse.contains(DefUse::VARARGS) {
                    live.extend(inst.varargs.iter().copied());
                }
                kept.push(inst);
            }
            kept.reverse();
            block.instructions = kept;

            worklist.push_all(block.back_edges.iter().copied());
        }

        if removed > 0 {
            tracing::debug!(removed, "eliminated dead assignments");
            self.invalidate_data_flow();
        }
        Ok(())
    }

    /// Reuse the result of expressions already computed within the same
    /// block.
    ///
    /// A matched recomputation is dropped and its target redirected to the
    /// slot that already holds the value. Redirections stay invisible to
    /// the rest of the graph: an assignment is materialized whenever the
    /// redirected-to slot is about to be overwritten, and at the block's
    /// end for every redirected slot that is live out.
    pub fn pass_local_common_subexpression_elimination(&mut self) -> Result<(), OptimizeError> {
        self.require_data_flow()?;
        let cfg = self.cfg_mut()?;
        let entry_id = cfg.entry_id();

        let mut elided = 0usize;
        let mut worklist = DistinctWorklist::new();
        worklist.push(entry_id);

        while let Some(id) = worklist.pop() {
            let Some(block) = cfg.block_mut(id) else { continue };
            worklist.push_all(block.forward_edges.iter().copied());

            let mut availables: Vec<AvailableExpression> = Vec::new();
            let mut swaps: BTreeMap<Address, Address> = BTreeMap::new();
            let mut keep: Vec<Instruction> = Vec::with_capacity(block.instructions.len());

            for mut inst in std::mem::take(&mut block.instructions) {
                let mut substituted = false;
                if inst.defuse.contains(DefUse::SOURCE0) {
                    if let Some(&redirect) = swaps.get(&inst.source0) {
                        inst.source0 = redirect;
                        substituted = true;
                    }
                }
                if inst.defuse.intersects(DefUse::SOURCE1 | DefUse::INDEX) {
                    if let Some(&redirect) = swaps.get(&inst.source1) {
                        inst.source1 = redirect;
                        substituted = true;
                    }
                }
                if inst.defuse.contains(DefUse::VARARGS) {
                    for address in &mut inst.varargs {
                        if let Some(&redirect) = swaps.get(address) {
                            *address = redirect;
                            substituted = true;
                        }
                    }
                }
                if substituted {
                    inst.sort_operands();
                }

                let expression = OpExpression::from_instruction(&inst);

                if let Some(expression) = expression {
                    if let Some(available) = availables
                        .iter()
                        .find(|av| !av.removed && av.expression == expression)
                    {
                        // The value is already in the available target;
                        // redirect later reads there instead of
                        // recomputing.
                        swaps.insert(inst.target, available.target);
                        elided += 1;
                        continue;
                    }
                }

                if inst.defuse.contains(DefUse::TARGET) {
                    let target = inst.target;

                    // Redirections into the slot about to be overwritten
                    // must be materialized first.
                    let rescued: Vec<(Address, Address)> = swaps
                        .iter()
                        .filter(|&(_, &value)| value == target)
                        .map(|(&key, &value)| (key, value))
                        .collect();
                    for (key, value) in rescued {
                        keep.push(Instruction::assign(key, value));
                        swaps.remove(&key);
                    }

                    invalidate(&mut availables, target);
                    swaps.remove(&target);

                    if let Some(expression) = expression {
                        if !expression.uses(target) {
                            availables.push(AvailableExpression {
                                expression,
                                target,
                                removed: false,
                            });
                        }
                    }
                }

                keep.push(inst);
            }

            for (&key, &value) in &swaps {
                if block.outs.contains(&key) {
                    keep.push(Instruction::assign(key, value));
                }
            }

            block.instructions = keep;
        }

        if elided > 0 {
            tracing::debug!(elided, "elided common subexpressions");
        }
        Ok(())
    }

    /// Replace copies out of expression results with a recomputation of
    /// the expression itself.
    ///
    /// `t = s` becomes `t = a op b` when `s` is known to hold `a op b`.
    /// On its own this enlarges the code; a following round of common
    /// subexpression and dead-assignment elimination merges the duplicates
    /// and deletes the originals, which is what removes the intermediate
    /// copies.
    pub fn pass_local_insert_redundant_operation(&mut self) -> Result<(), OptimizeError> {
        let cfg = self.cfg_mut()?;
        let entry_id = cfg.entry_id();

        let mut rewritten = 0usize;
        let mut worklist = DistinctWorklist::new();
        // Rewrites only ever grow code, so frozen blocks are left alone.
        for frozen in cfg.frozen_defarg_block_ids() {
            worklist.exclude(frozen);
        }
        worklist.push(entry_id);

        while let Some(id) = worklist.pop() {
            let Some(block) = cfg.block_mut(id) else { continue };
            worklist.push_all(block.forward_edges.iter().copied());

            let mut availables: Vec<AvailableExpression> = Vec::new();
            let mut out: Vec<Instruction> = Vec::with_capacity(block.instructions.len());

            for mut inst in std::mem::take(&mut block.instructions) {
                if inst.opcode == Opcode::Assign {
                    if let Some(available) = availables
                        .iter()
                        .find(|av| !av.removed && av.target == inst.source0)
                    {
                        inst = available.expression.to_instruction(inst.target);
                        rewritten += 1;
                    }
                }

                if inst.defuse.contains(DefUse::TARGET) {
                    let target = inst.target;
                    invalidate(&mut availables, target);
                    if let Some(expression) = OpExpression::from_instruction(&inst) {
                        if !expression.uses(target) {
                            availables.push(AvailableExpression {
                                expression,
                                target,
                                removed: false,
                            });
                        }
                    }
                }

                out.push(inst);
            }

            block.instructions = out;
        }

        if rewritten > 0 {
            tracing::debug!(rewritten, "expanded copies into redundant operations");
            self.invalidate_data_flow();
        }
        Ok(())
    }
}
