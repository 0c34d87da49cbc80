//! A MIPS32 target.

mod codegen;
mod frame;
pub mod registers;

pub use codegen::MipsGen;
pub use frame::MipsFrame;
