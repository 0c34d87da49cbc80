//! The back end of a compiler for tree-shaped intermediate code.
//!
//! A function body arrives as one IR [ir::Stm]. [canon::canonicalize] flattens
//! it into a list of simple statements, [canon::build_graph] partitions that
//! list into basic blocks and [canon::schedule] orders the blocks into traces.
//! A [target::CodeGen] then selects instructions, and [regalloc::allocate]
//! assigns machine registers to their temporaries.

pub mod assem;
pub mod canon;
pub mod error;
pub mod ir;
mod prelude;
pub mod regalloc;
pub mod target;
pub mod temp;
