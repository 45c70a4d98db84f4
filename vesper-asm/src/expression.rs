use core::cmp::Ordering;
use core::hash::{Hash, Hasher};

use crate::{Address, DefUse, Instruction, Opcode, Operator};

/// Result type tag of an expression.
///
/// The optimizer performs no type inference, so `Unknown` is the common
/// case; two `Unknown` tags compare equal and stay eligible for common
/// subexpression matching.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeTag {
    /// No type information.
    #[default]
    Unknown,
    /// Boolean result.
    Bool,
    /// Integer result.
    Int,
    /// Real result.
    Real,
}

/// Normalized view of an `ASSIGN` or `OPERATOR` instruction, suitable for
/// equality-based common subexpression matching.
///
/// Equality, ordering and hashing all work over a normalized key:
/// commutative binary operators order their operands so that
/// `source0 <= source1`, and unary operators consider `source0` alone.
#[derive(Debug, Clone, Copy)]
pub struct OpExpression {
    /// Either [`Opcode::Assign`] or [`Opcode::Operator`].
    pub opcode: Opcode,
    /// Operator of an `OPERATOR` expression; [`Operator::Equal`] for
    /// assignments.
    pub operator: Operator,
    /// Result type tag.
    pub expression_type: TypeTag,
    /// Slot usage of the originating instruction.
    pub defuse: DefUse,
    /// First operand.
    pub source0: Address,
    /// Second operand.
    pub source1: Address,
}

impl OpExpression {
    /// Build the normalized view of an expression-bearing instruction, or
    /// `None` when the instruction is not a plain assignment or operator
    /// application.
    pub fn from_instruction(instruction: &Instruction) -> Option<OpExpression> {
        match instruction.opcode {
            Opcode::Assign => Some(OpExpression {
                opcode: Opcode::Assign,
                operator: Operator::Equal,
                expression_type: TypeTag::Unknown,
                defuse: instruction.defuse,
                source0: instruction.source0,
                source1: Address::SELF,
            }),
            Opcode::Operator => Some(OpExpression {
                opcode: Opcode::Operator,
                operator: instruction.operator,
                expression_type: TypeTag::Unknown,
                defuse: instruction.defuse,
                source0: instruction.source0,
                source1: instruction.source1,
            }),
            _ => None,
        }
    }

    /// Materialize this expression into an instruction writing `target`.
    pub fn to_instruction(&self, target: Address) -> Instruction {
        match self.opcode {
            Opcode::Operator => {
                Instruction::operation(self.operator, target, self.source0, self.source1)
            }
            _ => Instruction::assign(target, self.source0),
        }
    }

    /// Whether the expression reads `address`.
    pub fn uses(&self, address: Address) -> bool {
        (self.defuse.contains(DefUse::SOURCE0) && self.source0 == address)
            || (self.defuse.contains(DefUse::SOURCE1) && self.source1 == address)
    }

    fn key(&self) -> (u8, u8, TypeTag, u32, u32, u32) {
        let (a, b) = self.normalized_operands();
        (
            self.opcode as u8,
            self.operator as u8,
            self.expression_type,
            self.defuse.bits(),
            a.raw() as u32,
            b.raw() as u32,
        )
    }

    fn normalized_operands(&self) -> (Address, Address) {
        if self.opcode == Opcode::Operator {
            if self.operator.is_unary() {
                return (self.source0, Address::SELF);
            }
            if self.operator.is_commutative() && self.source1 < self.source0 {
                return (self.source1, self.source0);
            }
        }
        (self.source0, self.source1)
    }
}

impl PartialEq for OpExpression {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for OpExpression {}

impl PartialOrd for OpExpression {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpExpression {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl Hash for OpExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}
