//! Control-flow-graph optimizer for Vesper bytecode.
//!
//! A compiled [`Function`] carries a linear bytecode stream. The optimizer
//! lifts that stream into a [`ControlFlowGraph`] of basic blocks, runs
//! analyses and transformation passes over the graph, and lowers the result
//! back to an equivalent, shorter stream:
//!
//! ```text
//! Function -> disassemble -> build blocks -> CFG
//!     -> (liveness analysis | passes)* -> assemble -> Function
//! ```
//!
//! [`FunctionOptimizer`] drives the lifecycle and exposes one method per
//! pass; [`optimize`] runs the canonical pipeline and leaves the function
//! untouched when anything fails.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

mod block;
mod cfg;
mod error;
mod function;
mod optimizer;
mod worklist;

pub use block::{Block, BlockId, Terminator};
pub use cfg::{Assembly, ControlFlowGraph};
pub use error::OptimizeError;
pub use function::{Constant, Function};
pub use optimizer::{optimize, FunctionOptimizer, OptimizeConfig};
pub use worklist::DistinctWorklist;
