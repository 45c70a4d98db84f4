use core::fmt;
use std::collections::BTreeSet;

use vesper_asm::{Address, DefUse, Instruction};

/// Stable identity of a basic block within its [`ControlFlowGraph`].
///
/// While blocks are being built the id equals the slot offset of the
/// block's first instruction in the input stream, which lets raw branch
/// targets double as block ids. Once the graph is built the id is an
/// opaque handle; assembly computes fresh offsets per id.
///
/// [`ControlFlowGraph`]: crate::ControlFlowGraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct BlockId(pub i32);

impl BlockId {
    /// The synthetic entry block.
    pub const ENTRY: BlockId = BlockId(-1);
    /// The synthetic exit block.
    pub const EXIT: BlockId = BlockId(200_000_000);
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            BlockId::ENTRY => f.write_str("entry"),
            BlockId::EXIT => f.write_str("exit"),
            BlockId(id) => write!(f, "{id}"),
        }
    }
}

/// How a block hands control to its successors.
///
/// Branching never appears in a block's instruction list; it is carried
/// here, and [`ControlFlowGraph::assemble`] re-emits the matching branch
/// instruction with freshly resolved targets. The `forward_edges` order is
/// fall-through first: the edge at index 0 is taken when execution runs
/// off the end of the block, further edges are explicit branch targets.
///
/// [`ControlFlowGraph::assemble`]: crate::ControlFlowGraph::assemble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Terminator {
    /// Unconditional transfer to the single forward edge.
    Jump,
    /// Two-way branch: edge 0 when `condition` is truthy, edge 1 when it
    /// is falsy.
    BranchIfNot {
        /// Address tested by the branch.
        condition: Address,
    },
    /// Loop setup: edge 0 enters the body, edge 1 escapes an empty
    /// container.
    IterateBegin {
        /// Loop counter slot.
        counter: Address,
        /// Container being iterated.
        container: Address,
        /// Slot receiving the current element.
        value: Address,
    },
    /// Loop step: edge 0 continues the body, edge 1 escapes an exhausted
    /// container.
    Iterate {
        /// Loop counter slot.
        counter: Address,
        /// Container being iterated.
        container: Address,
        /// Slot receiving the current element.
        value: Address,
    },
    /// Default-argument dispatch: edge 0 falls through, the remaining
    /// edges are the per-parameter assignment blocks.
    DefargDispatch,
    /// Function exit; the block emits `END` and has no forward edges.
    End,
}

impl Terminator {
    fn name(&self) -> &'static str {
        match self {
            Terminator::Jump => "normal",
            Terminator::BranchIfNot { .. } => "branch-if-not",
            Terminator::IterateBegin { .. } => "iterate-begin",
            Terminator::Iterate { .. } => "iterate",
            Terminator::DefargDispatch => "defarg-dispatch",
            Terminator::End => "terminator",
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Basic block: a straight-line instruction sequence, a [`Terminator`],
/// ordered forward edges, and the block-local dataflow sets.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Stable identity within the graph.
    pub id: BlockId,
    /// How control leaves the block.
    pub terminator: Terminator,
    /// Exact slot count the block must occupy in the output, set on
    /// frozen default-argument blocks whose entry offsets an external
    /// jump table depends on. Assembly pads up to this size and fails if
    /// the block outgrew it.
    pub force_code_size: Option<usize>,
    /// Straight-line body; never contains a branch opcode.
    pub instructions: Vec<Instruction>,
    /// Successor ids, fall-through first.
    pub forward_edges: Vec<BlockId>,
    /// Predecessor ids.
    pub back_edges: BTreeSet<BlockId>,
    /// Addresses written by the block.
    pub defs: BTreeSet<Address>,
    /// Addresses read before any local write.
    pub uses: BTreeSet<Address>,
    /// Live-in set of the last liveness analysis.
    pub ins: BTreeSet<Address>,
    /// Live-out set of the last liveness analysis.
    pub outs: BTreeSet<Address>,
}

impl Block {
    /// Fresh block with a `Jump` terminator and no edges.
    pub fn new(id: BlockId) -> Block {
        Block {
            id,
            terminator: Terminator::Jump,
            force_code_size: None,
            instructions: Vec::new(),
            forward_edges: Vec::new(),
            back_edges: BTreeSet::new(),
            defs: BTreeSet::new(),
            uses: BTreeSet::new(),
            ins: BTreeSet::new(),
            outs: BTreeSet::new(),
        }
    }

    /// Recompute `defs` and `uses` from the instruction sequence and the
    /// terminator.
    ///
    /// An address counts as a use only when it is read before any local
    /// definition. The terminator executes after the body, so its reads
    /// are accounted for last and its writes (the iterator slots) never
    /// mask body reads.
    pub fn update_def_use(&mut self) {
        self.defs.clear();
        self.uses.clear();

        for inst in &self.instructions {
            if inst.defuse.contains(DefUse::SELF) {
                // self is never defined within a function body
                self.uses.insert(Address::SELF);
            }
            if inst.defuse.contains(DefUse::SOURCE0) && !self.defs.contains(&inst.source0) {
                self.uses.insert(inst.source0);
            }
            if inst.defuse.intersects(DefUse::SOURCE1 | DefUse::INDEX)
                && !self.defs.contains(&inst.source1)
            {
                self.uses.insert(inst.source1);
            }
            if inst.defuse.contains(DefUse::VARARGS) {
                for &address in &inst.varargs {
                    if !self.defs.contains(&address) {
                        self.uses.insert(address);
                    }
                }
            }
            if inst.defuse.contains(DefUse::TARGET) {
                self.defs.insert(inst.target);
            }
        }

        match self.terminator {
            Terminator::BranchIfNot { condition } => {
                if !self.defs.contains(&condition) {
                    self.uses.insert(condition);
                }
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
                if !self.defs.contains(&container) {
                    self.uses.insert(container);
                }
                self.defs.insert(value);
                self.defs.insert(counter);
            }
            Terminator::Jump | Terminator::DefargDispatch | Terminator::End => {}
        }
    }

    /// Addresses the terminator reads; always live at the end of the
    /// block.
    pub fn terminator_uses(&self) -> Vec<Address> {
        match self.terminator {
            Terminator::BranchIfNot { condition } => vec![condition],
            Terminator::Iterate {
                counter, container, ..
            }
            | Terminator::IterateBegin {
                counter, container, ..
            } => vec![container, counter],
            Terminator::Jump | Terminator::DefargDispatch | Terminator::End => Vec::new(),
        }
    }

    /// Slot count of the assembled block: instruction strides plus the
    /// terminator's branch instruction, plus a trailing unconditional
    /// jump when `include_jump` is set (the jump is elided whenever the
    /// fall-through target is laid out next).
    pub fn bytecode_size(&self, include_jump: bool) -> usize {
        let mut size: usize = self
            .instructions
            .iter()
            .filter(|inst| !inst.omit)
            .map(|inst| inst.stride)
            .sum();

        let trailing = if include_jump { 2 } else { 0 };
        size += match self.terminator {
            Terminator::Jump => trailing,
            Terminator::BranchIfNot { .. } => 3 + trailing,
            Terminator::Iterate { .. } | Terminator::IterateBegin { .. } => 5 + trailing,
            // The dispatch opcode plus one target slot per defarg edge.
            Terminator::DefargDispatch => self.forward_edges.len().max(1) + trailing,
            Terminator::End => 1,
        };

        size
    }

    /// Rewrite every forward edge that points at `from` to point at `to`.
    pub fn replace_jump_target(&mut self, from: BlockId, to: BlockId) {
        for edge in &mut self.forward_edges {
            if *edge == from {
                *edge = to;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesper_asm::Operator;

    #[test]
    fn def_use_respects_instruction_order() {
        let mut block = Block::new(BlockId(0));
        // stack(0) = stack(1) + stack(2); stack(3) = stack(0)
        block.instructions.push(Instruction::operation(
            Operator::Add,
            Address::stack(0),
            Address::stack(1),
            Address::stack(2),
        ));
        block
            .instructions
            .push(Instruction::assign(Address::stack(3), Address::stack(0)));
        block.update_def_use();

        assert!(block.defs.contains(&Address::stack(0)));
        assert!(block.defs.contains(&Address::stack(3)));
        assert!(block.uses.contains(&Address::stack(1)));
        assert!(block.uses.contains(&Address::stack(2)));
        // Read after a local write is not upward-exposed.
        assert!(!block.uses.contains(&Address::stack(0)));
    }

    #[test]
    fn iterator_terminator_defines_value_and_counter() {
        let mut block = Block::new(BlockId(0));
        block.terminator = Terminator::Iterate {
            counter: Address::stack(0),
            container: Address::stack(1),
            value: Address::stack(2),
        };
        block.update_def_use();
        assert!(block.defs.contains(&Address::stack(0)));
        assert!(block.defs.contains(&Address::stack(2)));
        assert!(block.uses.contains(&Address::stack(1)));
    }

    #[test]
    fn condition_read_is_masked_by_a_local_write() {
        let mut block = Block::new(BlockId(0));
        block
            .instructions
            .push(Instruction::assign(Address::stack(0), Address::stack(1)));
        block.terminator = Terminator::BranchIfNot {
            condition: Address::stack(0),
        };
        block.update_def_use();
        assert!(!block.uses.contains(&Address::stack(0)));
    }
}
