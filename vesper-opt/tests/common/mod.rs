#![allow(dead_code)]

use vesper_asm::{Address, Opcode};
use vesper_opt::ControlFlowGraph;

pub fn op(opcode: Opcode) -> i32 {
    opcode as i32
}

pub fn stack(index: u32) -> i32 {
    Address::stack(index).raw()
}

pub fn addr(index: u32) -> Address {
    Address::stack(index)
}

/// Every forward edge must be mirrored by a back edge, and conversely.
pub fn assert_edges_symmetric(cfg: &ControlFlowGraph) {
    for block in cfg.blocks() {
        for &target in &block.forward_edges {
            let successor = cfg.block(target).expect("edge target exists");
            assert!(
                successor.back_edges.contains(&block.id),
                "forward edge {} -> {} has no back edge",
                block.id,
                target
            );
        }
        for &source in &block.back_edges {
            let predecessor = cfg.block(source).expect("back edge source exists");
            assert!(
                predecessor.forward_edges.contains(&block.id),
                "back edge {} -> {} has no forward edge",
                source,
                block.id
            );
        }
    }
}

/// At a liveness fixed point, whatever is live into a successor must flow
/// out of (or be defined by) the block before it.
pub fn assert_liveness_monotone(cfg: &ControlFlowGraph) {
    for block in cfg.blocks() {
        for &target in &block.forward_edges {
            let successor = cfg.block(target).expect("edge target exists");
            for address in &successor.ins {
                assert!(
                    block.outs.contains(address) || block.defs.contains(address),
                    "{address} is live into {} but neither out of nor defined by {}",
                    target,
                    block.id
                );
            }
        }
    }
}
