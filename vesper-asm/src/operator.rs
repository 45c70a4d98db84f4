use core::fmt;

/// Variant operator code carried by [`Opcode::Operator`] instructions.
///
/// The discriminant is the wire value of the operator slot.
///
/// [`Opcode::Operator`]: crate::Opcode::Operator
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Operator {
    Equal = 0,
    NotEqual = 1,
    Less = 2,
    LessEqual = 3,
    Greater = 4,
    GreaterEqual = 5,
    Add = 6,
    Subtract = 7,
    Multiply = 8,
    Divide = 9,
    Negate = 10,
    Positive = 11,
    Modulo = 12,
    StringConcat = 13,
    ShiftLeft = 14,
    ShiftRight = 15,
    BitAnd = 16,
    BitOr = 17,
    BitXor = 18,
    BitNegate = 19,
    And = 20,
    Or = 21,
    Xor = 22,
    Not = 23,
    In = 24,
}

impl Operator {
    /// Decode a raw operator slot.
    pub fn from_code(value: i32) -> Option<Self> {
        use Operator::*;
        Some(match value {
            0 => Equal,
            1 => NotEqual,
            2 => Less,
            3 => LessEqual,
            4 => Greater,
            5 => GreaterEqual,
            6 => Add,
            7 => Subtract,
            8 => Multiply,
            9 => Divide,
            10 => Negate,
            11 => Positive,
            12 => Modulo,
            13 => StringConcat,
            14 => ShiftLeft,
            15 => ShiftRight,
            16 => BitAnd,
            17 => BitOr,
            18 => BitXor,
            19 => BitNegate,
            20 => And,
            21 => Or,
            22 => Xor,
            23 => Not,
            24 => In,
            _ => return None,
        })
    }

    /// Whether `a op b == b op a` holds, so operands may be reordered.
    pub const fn is_commutative(self) -> bool {
        matches!(
            self,
            Operator::Add
                | Operator::Multiply
                | Operator::And
                | Operator::Or
                | Operator::Xor
                | Operator::BitAnd
                | Operator::BitOr
                | Operator::BitXor
        )
    }

    /// Whether the operator reads a single operand.
    pub const fn is_unary(self) -> bool {
        matches!(
            self,
            Operator::Negate | Operator::Positive | Operator::Not | Operator::BitNegate
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Negate => "negate",
            Operator::Positive => "positive",
            Operator::Modulo => "%",
            Operator::StringConcat => "concat",
            Operator::ShiftLeft => "<<",
            Operator::ShiftRight => ">>",
            Operator::BitAnd => "&",
            Operator::BitOr => "|",
            Operator::BitXor => "^",
            Operator::BitNegate => "~",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Xor => "xor",
            Operator::Not => "not",
            Operator::In => "in",
        };
        f.write_str(symbol)
    }
}
