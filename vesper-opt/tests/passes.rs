mod common;

use common::{op, stack};
use vesper_asm::{Opcode, Operator};
use vesper_opt::{Function, FunctionOptimizer};

#[test]
fn dead_block_after_unconditional_jump_is_removed() {
    let mut function = Function::new(
        "dead_block",
        vec![
            op(Opcode::Jump),
            5,
            op(Opcode::Assign),
            stack(0),
            stack(1),
            op(Opcode::End),
        ],
    );

    let mut optimizer = FunctionOptimizer::new(&mut function);
    optimizer.begin().unwrap();
    optimizer.pass_dead_block_elimination().unwrap();
    optimizer.commit().unwrap();

    assert_eq!(function.code, vec![op(Opcode::End)]);
}

#[test]
fn dead_block_elimination_is_idempotent() {
    let code = vec![
        op(Opcode::Jump),
        5,
        op(Opcode::Assign),
        stack(0),
        stack(1),
        op(Opcode::End),
    ];

    let mut once = Function::new("once", code.clone());
    let mut optimizer = FunctionOptimizer::new(&mut once);
    optimizer.begin().unwrap();
    optimizer.pass_dead_block_elimination().unwrap();
    optimizer.commit().unwrap();

    let mut twice = Function::new("twice", code);
    let mut optimizer = FunctionOptimizer::new(&mut twice);
    optimizer.begin().unwrap();
    optimizer.pass_dead_block_elimination().unwrap();
    optimizer.pass_dead_block_elimination().unwrap();
    optimizer.commit().unwrap();

    assert_eq!(once.code, twice.code);
}

#[test]
fn conditional_with_identical_arms_collapses_to_nothing() {
    // if x: pass else: pass
    let mut function = Function::new(
        "collapse",
        vec![
            op(Opcode::JumpIf),
            stack(3),
            5,
            op(Opcode::Jump),
            5,
            op(Opcode::End),
        ],
    );

    let mut optimizer = FunctionOptimizer::new(&mut function);
    optimizer.begin().unwrap();
    optimizer.pass_jump_threading().unwrap();
    optimizer.pass_dead_block_elimination().unwrap();
    optimizer.commit().unwrap();

    assert_eq!(function.code, vec![op(Opcode::End)]);
}

#[test]
fn strip_debug_keeps_the_semantics() {
    let mut function = Function::new(
        "strip",
        vec![
            op(Opcode::Line),
            10,
            op(Opcode::Assign),
            stack(0),
            stack(1),
            op(Opcode::Breakpoint),
            op(Opcode::Return),
            stack(0),
            op(Opcode::End),
        ],
    );

    let mut optimizer = FunctionOptimizer::new(&mut function);
    optimizer.begin().unwrap();
    optimizer.pass_strip_debug().unwrap();
    optimizer.commit().unwrap();

    assert_eq!(
        function.code,
        vec![
            op(Opcode::Assign),
            stack(0),
            stack(1),
            op(Opcode::Return),
            stack(0),
            op(Opcode::End),
        ]
    );
}

#[test]
fn strip_debug_is_idempotent() {
    let code = vec![
        op(Opcode::Line),
        10,
        op(Opcode::Breakpoint),
        op(Opcode::End),
    ];

    let mut once = Function::new("once", code.clone());
    let mut optimizer = FunctionOptimizer::new(&mut once);
    optimizer.begin().unwrap();
    optimizer.pass_strip_debug().unwrap();
    optimizer.commit().unwrap();

    let mut twice = Function::new("twice", code);
    let mut optimizer = FunctionOptimizer::new(&mut twice);
    optimizer.begin().unwrap();
    optimizer.pass_strip_debug().unwrap();
    optimizer.pass_strip_debug().unwrap();
    optimizer.commit().unwrap();

    assert_eq!(once.code, twice.code);
}

#[test]
fn cse_merges_commutative_recomputation() {
    // s4 = s1 + s2; s5 = s2 + s1; assert(s4, s5)
    let mut function = Function::new(
        "cse",
        vec![
            op(Opcode::Operator),
            Operator::Add as i32,
            stack(1),
            stack(2),
            stack(4),
            op(Opcode::Operator),
            Operator::Add as i32,
            stack(2),
            stack(1),
            stack(5),
            op(Opcode::Assert),
            stack(4),
            stack(5),
            op(Opcode::End),
        ],
    );

    let mut optimizer = FunctionOptimizer::new(&mut function);
    optimizer.begin().unwrap();
    optimizer
        .pass_local_common_subexpression_elimination()
        .unwrap();
    optimizer.commit().unwrap();

    assert_eq!(
        function.code,
        vec![
            op(Opcode::Operator),
            Operator::Add as i32,
            stack(1),
            stack(2),
            stack(4),
            op(Opcode::Assert),
            stack(4),
            stack(4),
            op(Opcode::End),
        ]
    );
}

#[test]
fn cse_materializes_an_elided_value_that_is_live_out() {
    // The second s1+s2 is elided, but its target flows into the next
    // block, so the redirection must become a real assignment.
    let mut function = Function::new(
        "cse_live_out",
        vec![
            op(Opcode::Operator),
            Operator::Add as i32,
            stack(1),
            stack(2),
            stack(4),
            op(Opcode::Operator),
            Operator::Add as i32,
            stack(1),
            stack(2),
            stack(5),
            op(Opcode::Jump),
            12,
            op(Opcode::Return),
            stack(5),
            op(Opcode::End),
        ],
    );

    let mut optimizer = FunctionOptimizer::new(&mut function);
    optimizer.begin().unwrap();
    optimizer
        .pass_local_common_subexpression_elimination()
        .unwrap();
    optimizer.commit().unwrap();

    assert_eq!(
        function.code,
        vec![
            op(Opcode::Operator),
            Operator::Add as i32,
            stack(1),
            stack(2),
            stack(4),
            op(Opcode::Assign),
            stack(5),
            stack(4),
            op(Opcode::Return),
            stack(5),
            op(Opcode::End),
        ]
    );
}

#[test]
fn cse_rescues_a_redirect_before_its_source_is_overwritten() {
    // s4 = s1 + s2; s5 = s1 + s2 (elided, redirected to s4);
    // s6 = s5 (reads through the redirect); s4 = s2 + s3 clobbers the
    // slot the redirect points at, so s5 must be materialized first;
    // assert(s5, s4) still sees the old sum in s5.
    let mut function = Function::new(
        "cse_rescue",
        vec![
            op(Opcode::Operator),
            Operator::Add as i32,
            stack(1),
            stack(2),
            stack(4),
            op(Opcode::Operator),
            Operator::Add as i32,
            stack(1),
            stack(2),
            stack(5),
            op(Opcode::Assign),
            stack(6),
            stack(5),
            op(Opcode::Operator),
            Operator::Add as i32,
            stack(2),
            stack(3),
            stack(4),
            op(Opcode::Assert),
            stack(5),
            stack(4),
            op(Opcode::End),
        ],
    );

    let mut optimizer = FunctionOptimizer::new(&mut function);
    optimizer.begin().unwrap();
    optimizer
        .pass_local_common_subexpression_elimination()
        .unwrap();
    optimizer.commit().unwrap();

    assert_eq!(
        function.code,
        vec![
            op(Opcode::Operator),
            Operator::Add as i32,
            stack(1),
            stack(2),
            stack(4),
            op(Opcode::Assign),
            stack(6),
            stack(4),
            // The rescue lands ahead of the clobbering operator.
            op(Opcode::Assign),
            stack(5),
            stack(4),
            op(Opcode::Operator),
            Operator::Add as i32,
            stack(2),
            stack(3),
            stack(4),
            op(Opcode::Assert),
            stack(5),
            stack(4),
            op(Opcode::End),
        ]
    );
}

#[test]
fn dead_assignment_elimination_drops_unread_pure_writes() {
    let mut function = Function::new(
        "dae",
        vec![
            op(Opcode::Operator),
            Operator::Add as i32,
            stack(1),
            stack(2),
            stack(4),
            op(Opcode::Return),
            stack(1),
            op(Opcode::End),
        ],
    );

    let mut optimizer = FunctionOptimizer::new(&mut function);
    optimizer.begin().unwrap();
    optimizer.pass_dead_assignment_elimination().unwrap();
    optimizer.commit().unwrap();

    assert_eq!(
        function.code,
        vec![op(Opcode::Return), stack(1), op(Opcode::End)]
    );
}

#[test]
fn dead_assignment_elimination_never_touches_side_effects() {
    let mut function = Function::new(
        "dae_call",
        vec![
            op(Opcode::CallReturn),
            0,
            stack(0),
            2,
            stack(9),
            op(Opcode::Return),
            stack(1),
            op(Opcode::End),
        ],
    );

    let mut optimizer = FunctionOptimizer::new(&mut function);
    optimizer.begin().unwrap();
    optimizer.pass_dead_assignment_elimination().unwrap();
    optimizer.commit().unwrap();

    // The call's result is dead, but the call itself must survive.
    assert_eq!(function.code[0], op(Opcode::CallReturn));
}

#[test]
fn redundant_operation_round_trip_removes_the_copy() {
    // s4 = s1 + s2; s5 = s4; assert(s5, s1) -- the copy should dissolve
    // once the redundant operation is inserted and the duplicates merge.
    let mut function = Function::new(
        "copy_elision",
        vec![
            op(Opcode::Operator),
            Operator::Add as i32,
            stack(1),
            stack(2),
            stack(4),
            op(Opcode::Assign),
            stack(5),
            stack(4),
            op(Opcode::Assert),
            stack(5),
            stack(1),
            op(Opcode::End),
        ],
    );

    let mut optimizer = FunctionOptimizer::new(&mut function);
    optimizer.begin().unwrap();
    optimizer.pass_local_insert_redundant_operation().unwrap();
    optimizer
        .pass_local_common_subexpression_elimination()
        .unwrap();
    optimizer.pass_dead_assignment_elimination().unwrap();
    optimizer.commit().unwrap();

    assert_eq!(
        function.code,
        vec![
            op(Opcode::Operator),
            Operator::Add as i32,
            stack(1),
            stack(2),
            stack(4),
            op(Opcode::Assert),
            stack(4),
            stack(1),
            op(Opcode::End),
        ]
    );
}
