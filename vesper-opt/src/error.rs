use thiserror::Error;

use vesper_asm::DecodeError;

use crate::BlockId;

/// Failure of a lifting, analysis or lowering step.
///
/// Decode errors surface before the graph exists; the structural kinds are
/// reachable only through API misuse or an internal bug; the overflow kind
/// means a transform grew a frozen default-argument block. In every case
/// the caller still holds the pre-optimization bytecode, since the
/// function is only written on a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OptimizeError {
    /// The input bytecode could not be lifted.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The graph has no entry block, or no graph was built.
    #[error("control-flow graph has no entry block")]
    NoEntry,
    /// The graph has no exit block.
    #[error("control-flow graph has no exit block")]
    NoExit,
    /// An edge references a block that does not exist.
    #[error("block {0} not found")]
    BlockNotFound(BlockId),
    /// A frozen default-argument block assembled past its recorded size.
    #[error("block {block} assembled to {size} slots, over its frozen size of {limit}")]
    AssemblyOverflow {
        /// The offending block.
        block: BlockId,
        /// Size the block assembled to.
        size: usize,
        /// The frozen size it must not exceed.
        limit: usize,
    },
}
