use thiserror::Error;

/// Failure while lifting a raw bytecode stream into instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The stream ends in the middle of an instruction.
    #[error(
        "bytecode ends mid-instruction: opcode at slot {offset} needs {needed} slots, \
         stream holds {len}"
    )]
    OutOfBounds {
        /// Slot offset of the instruction being decoded.
        offset: usize,
        /// Total slots the instruction requires.
        needed: usize,
        /// Length of the stream.
        len: usize,
    },
    /// A slot that should hold an opcode holds an unknown value.
    #[error("unknown opcode {value} at slot {offset}")]
    UnknownOpcode {
        /// The offending slot value.
        value: i32,
        /// Slot offset at which it was read.
        offset: usize,
    },
    /// An `OPERATOR` instruction carries an unknown operator code.
    #[error("unknown operator code {value} at slot {offset}")]
    UnknownOperator {
        /// The offending slot value.
        value: i32,
        /// Slot offset at which it was read.
        offset: usize,
    },
}
