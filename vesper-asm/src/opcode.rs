use crate::DecodeError;

/// Opcode of a Vesper bytecode instruction.
///
/// The discriminant is the wire value of the opcode slot. The operand
/// layout that follows each opcode is fixed; see [`crate::Instruction::parse`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Opcode {
    /// Apply a variant operator to one or two sources.
    Operator = 0,
    /// Test whether an instance extends a script or native type.
    ExtendsTest = 1,
    /// Test whether a value is of a builtin type.
    IsBuiltin = 2,
    /// Subscript store: `target[index] = value`.
    Set = 3,
    /// Subscript load: `target = value[index]`.
    Get = 4,
    /// Named property store on an arbitrary base.
    SetNamed = 5,
    /// Named property load from an arbitrary base.
    GetNamed = 6,
    /// Store into a member of `self`.
    SetMember = 7,
    /// Load from a member of `self`.
    GetMember = 8,
    /// Plain copy assignment.
    Assign = 9,
    /// Assign the constant `true`.
    AssignTrue = 10,
    /// Assign the constant `false`.
    AssignFalse = 11,
    /// Assignment checked against a builtin type.
    AssignTypedBuiltin = 12,
    /// Assignment checked against a native class.
    AssignTypedNative = 13,
    /// Assignment checked against a script class.
    AssignTypedScript = 14,
    /// Conversion to a builtin type.
    CastToBuiltin = 15,
    /// Conversion to a native class.
    CastToNative = 16,
    /// Conversion to a script class.
    CastToScript = 17,
    /// Construct a builtin-typed value from arguments.
    Construct = 18,
    /// Construct an array from its elements.
    ConstructArray = 19,
    /// Construct a dictionary from key/value pairs.
    ConstructDictionary = 20,
    /// Method call discarding the result.
    Call = 21,
    /// Method call storing the result.
    CallReturn = 22,
    /// Call a builtin function.
    CallBuiltIn = 23,
    /// Call a method on `self` (opaque; currently unused by the compiler).
    CallSelf = 24,
    /// Call a base-class method on `self`.
    CallSelfBase = 25,
    /// Suspend the running function.
    Yield = 26,
    /// Suspend until a signal fires.
    YieldSignal = 27,
    /// Store the value a suspended function was resumed with.
    YieldResume = 28,
    /// Unconditional branch.
    Jump = 29,
    /// Branch when the condition is truthy.
    JumpIf = 30,
    /// Branch when the condition is falsy.
    JumpIfNot = 31,
    /// Dispatch into the default-argument assignment table.
    JumpToDefArgument = 32,
    /// Return a value to the caller.
    Return = 33,
    /// Begin iterating a container.
    IterateBegin = 34,
    /// Advance an iteration.
    Iterate = 35,
    /// Runtime assertion.
    Assert = 36,
    /// Debugger trap; a no-op in release builds.
    Breakpoint = 37,
    /// Source line marker for the debugger.
    Line = 38,
    /// End of the function body.
    End = 39,
    /// Move a bare integer into a typed register.
    BoxInt = 40,
    /// Move a bare real into a typed register.
    BoxReal = 41,
    /// Move a typed integer register back into a variant slot.
    UnboxInt = 42,
    /// Move a typed real register back into a variant slot.
    UnboxReal = 43,
}

impl Opcode {
    /// Decode a raw opcode slot, reporting `offset` on failure.
    pub fn from_raw(value: i32, offset: usize) -> Result<Self, DecodeError> {
        use Opcode::*;
        Ok(match value {
            0 => Operator,
            1 => ExtendsTest,
            2 => IsBuiltin,
            3 => Set,
            4 => Get,
            5 => SetNamed,
            6 => GetNamed,
            7 => SetMember,
            8 => GetMember,
            9 => Assign,
            10 => AssignTrue,
            11 => AssignFalse,
            12 => AssignTypedBuiltin,
            13 => AssignTypedNative,
            14 => AssignTypedScript,
            15 => CastToBuiltin,
            16 => CastToNative,
            17 => CastToScript,
            18 => Construct,
            19 => ConstructArray,
            20 => ConstructDictionary,
            21 => Call,
            22 => CallReturn,
            23 => CallBuiltIn,
            24 => CallSelf,
            25 => CallSelfBase,
            26 => Yield,
            27 => YieldSignal,
            28 => YieldResume,
            29 => Jump,
            30 => JumpIf,
            31 => JumpIfNot,
            32 => JumpToDefArgument,
            33 => Return,
            34 => IterateBegin,
            35 => Iterate,
            36 => Assert,
            37 => Breakpoint,
            38 => Line,
            39 => End,
            40 => BoxInt,
            41 => BoxReal,
            42 => UnboxInt,
            43 => UnboxReal,
            _ => return Err(DecodeError::UnknownOpcode { value, offset }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn raw_round_trip() {
        for op in Opcode::iter() {
            assert_eq!(Opcode::from_raw(op as i32, 0), Ok(op));
        }
    }

    #[test]
    fn unknown_value_is_rejected() {
        assert_eq!(
            Opcode::from_raw(97, 3),
            Err(DecodeError::UnknownOpcode { value: 97, offset: 3 })
        );
    }
}
