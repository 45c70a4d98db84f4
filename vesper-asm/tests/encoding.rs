use rstest::rstest;

use vesper_asm::{Address, DecodeError, DefUse, Instruction, Opcode, Operator};

fn stack(index: u32) -> i32 {
    Address::stack(index).raw()
}

fn roundtrip(code: &[i32], defarg_count: usize) -> Instruction {
    let inst = Instruction::parse(code, 0, defarg_count).expect("parse");
    assert_eq!(inst.stride, code.len(), "stride covers the whole stream");
    let mut out = Vec::new();
    inst.encode(&mut out);
    assert_eq!(out, code, "encode inverts parse");
    inst
}

#[test]
fn get_lays_out_source_before_index_before_target() {
    let code = [Opcode::Get as i32, stack(1), stack(2), stack(3)];
    let inst = roundtrip(&code, 0);
    assert_eq!(inst.source0, Address::stack(1));
    assert_eq!(inst.index_address(), Address::stack(2));
    assert_eq!(inst.target, Address::stack(3));
    assert_eq!(inst.defuse, DefUse::SOURCE0 | DefUse::INDEX | DefUse::TARGET);
}

#[test]
fn get_named_lays_out_target_name_value() {
    let code = [Opcode::GetNamed as i32, stack(4), 7, stack(5)];
    let inst = roundtrip(&code, 0);
    assert_eq!(inst.target, Address::stack(4));
    assert_eq!(inst.index_arg, 7);
    assert_eq!(inst.source0, Address::stack(5));
}

#[test]
fn call_target_slot_is_a_dummy_without_the_target_bit() {
    let code = [
        Opcode::Call as i32,
        2,
        stack(0),
        5,
        stack(1),
        stack(2),
        stack(9),
    ];
    let inst = roundtrip(&code, 0);
    assert_eq!(inst.source0, Address::stack(0));
    assert_eq!(inst.index_arg, 5);
    assert_eq!(inst.varargs, vec![Address::stack(1), Address::stack(2)]);
    assert_eq!(inst.target, Address::stack(9));
    assert!(!inst.defuse.contains(DefUse::TARGET));
    assert!(inst.may_have_side_effects());
}

#[test]
fn call_return_sets_the_target_bit() {
    let code = [Opcode::CallReturn as i32, 0, stack(0), 5, stack(9)];
    let inst = roundtrip(&code, 0);
    assert!(inst.defuse.contains(DefUse::TARGET));
    assert_eq!(inst.target, Address::stack(9));
}

#[test]
fn construct_dictionary_counts_pairs() {
    let code = [
        Opcode::ConstructDictionary as i32,
        2,
        stack(1),
        stack(2),
        stack(3),
        stack(4),
        stack(9),
    ];
    let inst = roundtrip(&code, 0);
    assert_eq!(inst.varargs.len(), 4);
    assert_eq!(inst.vararg_count(), 2);
    assert_eq!(inst.target, Address::stack(9));
    assert_eq!(inst.stride, 7);
}

#[test]
fn call_self_base_target_follows_the_arguments() {
    let code = [
        Opcode::CallSelfBase as i32,
        3,
        2,
        stack(1),
        stack(2),
        stack(9),
    ];
    let inst = roundtrip(&code, 0);
    assert_eq!(inst.index_arg, 3);
    assert_eq!(inst.varargs.len(), 2);
    assert_eq!(inst.target, Address::stack(9));
    assert!(inst.defuse.contains(DefUse::SELF));
}

#[test]
fn jump_to_def_argument_carries_one_slot_per_default() {
    let code = [Opcode::JumpToDefArgument as i32, 8, 20];
    let inst = roundtrip(&code, 2);
    assert_eq!(inst.stride, 3);
    assert_eq!(
        inst.varargs,
        vec![Address::from_raw(8), Address::from_raw(20)]
    );
    assert!(inst.defuse.is_empty());
}

#[test]
fn call_self_is_opaque_and_untouchable() {
    let inst = roundtrip(&[Opcode::CallSelf as i32], 0);
    assert!(inst.defuse.is_empty());
    assert!(inst.may_have_side_effects());
}

#[rstest]
#[case::operator(vec![Opcode::Operator as i32, Operator::Add as i32, stack(1), stack(2), stack(0)])]
#[case::set(vec![Opcode::Set as i32, stack(0), stack(1), stack(2)])]
#[case::assign(vec![Opcode::Assign as i32, stack(0), stack(1)])]
#[case::assign_typed_native(vec![Opcode::AssignTypedNative as i32, stack(3), stack(0), stack(1)])]
#[case::construct(vec![Opcode::Construct as i32, 4, 2, stack(1), stack(2), stack(0)])]
#[case::call_built_in(vec![Opcode::CallBuiltIn as i32, 12, 1, stack(1), stack(0)])]
#[case::yield_reserved(vec![Opcode::Yield as i32, 99])]
#[case::iterate(vec![Opcode::Iterate as i32, stack(0), stack(1), 40, stack(2)])]
#[case::line(vec![Opcode::Line as i32, 120])]
#[case::ret(vec![Opcode::Return as i32, stack(0)])]
#[case::box_int(vec![Opcode::BoxInt as i32, stack(0), Address::int_register(1).raw()])]
fn parse_then_encode_is_identity(#[case] code: Vec<i32>) {
    roundtrip(&code, 0);
}

#[test]
fn truncated_instruction_reports_bounds() {
    let code = [Opcode::Operator as i32, Operator::Add as i32, stack(1)];
    assert_eq!(
        Instruction::parse(&code, 0, 0),
        Err(DecodeError::OutOfBounds {
            offset: 0,
            needed: 5,
            len: 3
        })
    );
}

#[test]
fn unknown_opcode_reports_value_and_offset() {
    let code = [Opcode::Assign as i32, stack(0), stack(1), 97];
    assert_eq!(
        Instruction::parse(&code, 3, 0),
        Err(DecodeError::UnknownOpcode {
            value: 97,
            offset: 3
        })
    );
}

#[test]
fn unknown_operator_reports_its_slot() {
    let code = [Opcode::Operator as i32, 77, stack(1), stack(2), stack(0)];
    assert_eq!(
        Instruction::parse(&code, 0, 0),
        Err(DecodeError::UnknownOperator {
            value: 77,
            offset: 1
        })
    );
}

#[test]
fn negative_vararg_count_is_rejected() {
    let code = [Opcode::ConstructArray as i32, -2, stack(0)];
    assert!(matches!(
        Instruction::parse(&code, 0, 0),
        Err(DecodeError::OutOfBounds { .. })
    ));
}

#[test]
fn branch_classification_covers_the_jump_family_only() {
    assert!(Instruction::jump(0).is_branch());
    assert!(
        Instruction::parse(&[Opcode::JumpToDefArgument as i32, 3], 0, 1)
            .unwrap()
            .is_branch()
    );
    assert!(!Instruction::assign(Address::stack(0), Address::stack(1)).is_branch());
    // A return transfers control through the graph, not the stream.
    assert!(!Instruction::parse(&[Opcode::Return as i32, stack(0)], 0, 0)
        .unwrap()
        .is_branch());
}

#[test]
fn side_effect_free_opcodes_are_the_pure_assignments() {
    let pure = Instruction::parse(&[Opcode::Assign as i32, stack(0), stack(1)], 0, 0).unwrap();
    assert!(!pure.may_have_side_effects());

    let set = Instruction::parse(
        &[Opcode::SetMember as i32, 3, stack(0)],
        0,
        0,
    )
    .unwrap();
    assert!(set.may_have_side_effects());

    let assert_inst =
        Instruction::parse(&[Opcode::Assert as i32, stack(0), stack(1)], 0, 0).unwrap();
    assert!(assert_inst.may_have_side_effects());
}
