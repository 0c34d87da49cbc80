//! Canonicalization and scheduling of IR trees.
//!
//! A function body goes through three steps here:
//!
//! 1. [`canonicalize`] rewrites the tree into a flat list of statements with no
//!    `Seq` or `ESeq` nodes, in which every `Call` sits directly below an
//!    expression statement or a move into a temporary.
//! 2. [`build_graph`] cuts that list into basic blocks.
//! 3. [`schedule`] orders the blocks into a trace in which every conditional
//!    jump is immediately followed by its false label.

mod blocks;
mod linearize;
mod trace;

pub use blocks::{build_graph, BasicBlock, BlockGraph};
pub use linearize::canonicalize;
pub use trace::schedule;
