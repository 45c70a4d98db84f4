//! Instruction set primitives of the Vesper scripting VM.
//!
//! Vesper bytecode is a flat stream of 32-bit signed integers. Every
//! instruction starts with an opcode slot followed by a fixed, per-opcode
//! operand layout; operands that reference the runtime value store are
//! encoded [`Address`]es. This crate owns the layout table: [`Instruction::parse`]
//! lifts a slice of the stream into a structured record and
//! [`Instruction::encode`] writes it back, and the two are inverses for every
//! structurally valid instruction.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

mod address;
mod error;
mod expression;
mod instruction;
mod opcode;
mod operator;

pub use address::{Address, AddressKind, ADDR_BITS};
pub use error::DecodeError;
pub use expression::{OpExpression, TypeTag};
pub use instruction::{DefUse, Instruction};
pub use opcode::Opcode;
pub use operator::Operator;
