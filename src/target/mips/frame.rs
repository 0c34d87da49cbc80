use crate::{
    assem::Instr,
    ir::Word,
    target::Frame,
    temp::{Label, Temp},
};

use super::registers::*;

const WORD_SIZE: Word = 4;

#[derive(Debug, Clone)]
pub struct MipsFrame {
    name: Label,
    locals: usize,
    registers: Vec<Temp>,
}

impl MipsFrame {
    pub fn new(name: Label) -> Self {
        Self::with_registers(name, COLORABLE.to_vec())
    }

    /// A frame whose functions may only use the given registers.
    pub fn with_registers(name: Label, registers: Vec<Temp>) -> Self {
        Self {
            name,
            locals: 0,
            registers,
        }
    }
}

impl Frame for MipsFrame {
    fn name(&self) -> &Label {
        &self.name
    }

    fn word_size(&self) -> Word {
        WORD_SIZE
    }

    fn fp(&self) -> Temp {
        FP
    }

    fn rv(&self) -> Temp {
        V0
    }

    fn ra(&self) -> Temp {
        RA
    }

    fn registers(&self) -> &[Temp] {
        &self.registers
    }

    fn alloc_local(&mut self) -> Word {
        self.locals += 1;
        -(self.locals as Word) * WORD_SIZE
    }

    fn spill_store(&self, offset: Word, temp: Temp) -> Instr {
        Instr::oper(format!("sw 's0, {}('s1)", offset), vec![], vec![temp, self.fp()])
    }

    fn spill_load(&self, offset: Word, temp: Temp) -> Instr {
        Instr::oper(format!("lw 'd0, {}('s0)", offset), vec![temp], vec![self.fp()])
    }

    fn proc_entry_exit2(&self, mut instrs: Vec<Instr>) -> Vec<Instr> {
        let mut live_at_exit = vec![ZERO, RA, SP];
        live_at_exit.extend_from_slice(CALLEE_SAVES);
        instrs.push(Instr::Oper {
            assem: String::new(),
            dst: vec![],
            src: live_at_exit,
            jump: Some(vec![]),
        });
        instrs
    }
}
