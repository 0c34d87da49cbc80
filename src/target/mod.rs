//! Target descriptions: what the back end needs to know about a machine.

pub mod mips;

use crate::{
    assem::Instr,
    ir::{Stm, Word},
    prelude::*,
    temp::{Label, Names, Temp},
};

/// The activation record of one function on some target.
pub trait Frame {
    fn name(&self) -> &Label;

    fn word_size(&self) -> Word;

    /// The frame pointer.
    fn fp(&self) -> Temp;

    /// The register holding a function's return value.
    fn rv(&self) -> Temp;

    /// The register holding the return address.
    fn ra(&self) -> Temp;

    /// The machine registers the allocator may assign, in order of preference.
    fn registers(&self) -> &[Temp];

    /// Reserve a new word in the frame, returning its offset from the frame pointer.
    fn alloc_local(&mut self) -> Word;

    /// An instruction storing `temp` to the frame slot at `offset`.
    fn spill_store(&self, offset: Word, temp: Temp) -> Instr;

    /// An instruction loading the frame slot at `offset` into `temp`.
    fn spill_load(&self, offset: Word, temp: Temp) -> Instr;

    /// Mark the registers that must still hold their values when the function returns.
    fn proc_entry_exit2(&self, instrs: Vec<Instr>) -> Vec<Instr>;
}

/// Instruction selection for one target.
pub trait CodeGen {
    type Frame: Frame;

    /// Select instructions for a single canonical statement.
    fn codegen(&self, frame: &Self::Frame, stm: &Stm, names: &Names) -> Result<Vec<Instr>>;

    /// Select instructions for a scheduled list of statements.
    fn codegen_all(&self, frame: &Self::Frame, stms: &[Stm], names: &Names) -> Result<Vec<Instr>> {
        let mut instrs = vec![];
        for stm in stms {
            instrs.extend(self.codegen(frame, stm, names)?);
        }
        Ok(instrs)
    }
}
