//! Intermediate representation: the expression tree handed over by the front
//! end, and the flat quadruple form derivable from its canonical shape.

mod ops;
pub mod quad;
mod tree;

pub use ops::{BinOp, RelOp};
pub use quad::{to_quads, Operand, Quad};
pub use tree::*;
