mod common;

use common::{addr, assert_liveness_monotone, op, stack};
use vesper_asm::{Opcode, Operator};
use vesper_opt::{BlockId, ControlFlowGraph};

#[test]
fn straight_line_reads_are_upward_exposed() {
    let code = [
        op(Opcode::Operator),
        Operator::Add as i32,
        stack(1),
        stack(2),
        stack(0),
        op(Opcode::Return),
        stack(0),
        op(Opcode::End),
    ];
    let mut cfg = ControlFlowGraph::build(&code, &[]).unwrap();
    cfg.analyze_data_flow().unwrap();

    let block = cfg.block(BlockId(0)).unwrap();
    assert!(block.uses.contains(&addr(1)));
    assert!(block.uses.contains(&addr(2)));
    assert!(block.defs.contains(&addr(0)));
    // The operator result is consumed by the return in the same block.
    assert!(!block.uses.contains(&addr(0)));
    assert!(block.outs.is_empty());

    assert_liveness_monotone(&cfg);
}

#[test]
fn diamond_merges_arm_reads_into_the_condition_block() {
    let code = [
        op(Opcode::JumpIf),
        stack(0),
        8,
        op(Opcode::Assign),
        stack(1),
        stack(2),
        op(Opcode::Jump),
        11,
        op(Opcode::Assign),
        stack(1),
        stack(3),
        op(Opcode::Return),
        stack(1),
        op(Opcode::End),
    ];
    let mut cfg = ControlFlowGraph::build(&code, &[]).unwrap();
    cfg.analyze_data_flow().unwrap();

    let join = cfg.block(BlockId(11)).unwrap();
    assert_eq!(join.ins.iter().copied().collect::<Vec<_>>(), vec![addr(1)]);

    let then_arm = cfg.block(BlockId(3)).unwrap();
    assert!(then_arm.outs.contains(&addr(1)));
    assert!(then_arm.ins.contains(&addr(2)));

    let head = cfg.block(BlockId(0)).unwrap();
    assert!(head.ins.contains(&addr(0)), "branch condition is live in");
    assert!(head.ins.contains(&addr(2)));
    assert!(head.ins.contains(&addr(3)));
    assert!(!head.ins.contains(&addr(1)));

    assert_liveness_monotone(&cfg);
}

#[test]
fn iterator_container_and_counter_stay_live_around_the_loop() {
    let code = [
        op(Opcode::IterateBegin),
        stack(0),
        stack(1),
        15,
        stack(2),
        op(Opcode::Assign),
        stack(5),
        stack(2),
        op(Opcode::Iterate),
        stack(0),
        stack(1),
        15,
        stack(2),
        op(Opcode::Jump),
        5,
        op(Opcode::End),
    ];
    let mut cfg = ControlFlowGraph::build(&code, &[]).unwrap();
    cfg.analyze_data_flow().unwrap();

    let head = cfg.block(BlockId(0)).unwrap();
    assert!(head.defs.contains(&addr(0)), "counter is defined by the loop head");
    assert!(head.defs.contains(&addr(2)), "value is defined by the loop head");
    assert!(head.ins.contains(&addr(1)), "container flows into the loop head");

    let body = cfg.block(BlockId(5)).unwrap();
    assert!(body.ins.contains(&addr(1)));
    assert!(body.ins.contains(&addr(0)));

    let back_jump = cfg.block(BlockId(13)).unwrap();
    assert!(back_jump.outs.contains(&addr(0)), "counter is live around the loop");
    assert!(back_jump.outs.contains(&addr(1)), "container is live around the loop");

    assert_liveness_monotone(&cfg);
}

#[test]
fn analysis_is_stable_under_reanalysis() {
    let code = [
        op(Opcode::JumpIfNot),
        stack(0),
        8,
        op(Opcode::Assign),
        stack(1),
        stack(2),
        op(Opcode::Jump),
        0,
        op(Opcode::End),
    ];
    let mut cfg = ControlFlowGraph::build(&code, &[]).unwrap();
    cfg.analyze_data_flow().unwrap();
    let first: Vec<_> = cfg
        .blocks()
        .iter()
        .map(|b| (b.id, b.ins.clone(), b.outs.clone()))
        .collect();

    cfg.analyze_data_flow().unwrap();
    let second: Vec<_> = cfg
        .blocks()
        .iter()
        .map(|b| (b.id, b.ins.clone(), b.outs.clone()))
        .collect();

    assert_eq!(first, second);
}
