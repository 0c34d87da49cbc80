use crate::{
    assem::Instr,
    ir::{BinOp, Branch, Exp, RelOp, Stm, Word},
    prelude::*,
    target::{CodeGen, Frame},
    temp::{Label, Names, Temp},
};

use super::{registers::*, MipsFrame};

/// Maximal-munch instruction selection for MIPS32.
#[derive(Debug, Default, Clone, Copy)]
pub struct MipsGen;

impl CodeGen for MipsGen {
    type Frame = MipsFrame;

    fn codegen(&self, frame: &MipsFrame, stm: &Stm, names: &Names) -> Result<Vec<Instr>> {
        let mut generator = Generator {
            frame,
            names,
            instructions: vec![],
        };
        generator.munch_stm(stm)?;
        Ok(generator.instructions)
    }
}

/// Whether `value` fits in the signed 16-bit immediate field.
fn is_immediate(value: Word) -> bool {
    i16::try_from(value).is_ok()
}

/// Split an address into base expression and constant offset, if it has that shape.
fn base_offset(address: &Exp) -> Option<(&Exp, Word)> {
    match address {
        Exp::BinOp(BinOp::Plus, base, offset) => match (&**base, &**offset) {
            (base, Exp::Const(n)) | (Exp::Const(n), base) if is_immediate(*n) => Some((base, *n)),
            _ => None,
        },
        Exp::BinOp(BinOp::Minus, base, offset) => match &**offset {
            Exp::Const(n) if is_immediate(-*n) => Some((base, -*n)),
            _ => None,
        },
        _ => None,
    }
}

struct Generator<'a> {
    frame: &'a MipsFrame,
    names: &'a Names,
    instructions: Vec<Instr>,
}

impl<'a> Generator<'a> {
    /// Registers a call may overwrite.
    fn call_defs(&self) -> Vec<Temp> {
        let mut defs = vec![self.frame.rv(), V1, self.frame.ra()];
        defs.extend_from_slice(CALLER_SAVES);
        defs.extend_from_slice(ARGUMENT_REGISTERS);
        defs
    }

    fn emit(&mut self, instr: Instr) {
        trace!("Selected {}", instr);
        self.instructions.push(instr);
    }

    /// Emit an instruction defining a fresh temporary, and return that temporary.
    fn emit_result<F: FnOnce(Temp) -> Instr>(&mut self, gen: F) -> Temp {
        let result = self.names.next_temp();
        self.emit(gen(result));
        result
    }

    fn munch_stm(&mut self, stm: &Stm) -> Result<()> {
        match stm {
            Stm::Seq(first, second) => {
                self.munch_stm(first)?;
                self.munch_stm(second)
            }
            Stm::Label(label) => {
                self.emit(Instr::label(label.clone()));
                Ok(())
            }
            Stm::Move(target, source) => self.munch_move(target, source),
            Stm::Branch(Branch::Jump { target, labels }) => self.munch_jump(target, labels),
            Stm::Branch(Branch::CJump {
                op,
                lhs,
                rhs,
                true_label,
                false_label,
            }) => self.munch_cjump(*op, lhs, rhs, true_label, false_label),
            Stm::Exp(Exp::Call(function, args)) => self.munch_call(function, args).map(|_| ()),
            Stm::Exp(exp) => self.munch_exp(exp).map(|_| ()),
        }
    }

    fn munch_move(&mut self, target: &Exp, source: &Exp) -> Result<()> {
        match (target, source) {
            (Exp::Mem(address), _) => {
                let (base, offset) = match base_offset(address) {
                    Some((base, offset)) => (self.munch_exp(base)?, offset),
                    None => (self.munch_exp(address)?, 0),
                };
                let value = self.munch_exp(source)?;
                self.emit(Instr::oper(
                    format!("sw 's1, {}('s0)", offset),
                    vec![],
                    vec![base, value],
                ));
            }
            (Exp::Temp(dst), Exp::Const(value)) => {
                self.emit(Instr::oper(format!("li 'd0, {}", value), vec![*dst], vec![]));
            }
            (Exp::Temp(dst), _) => {
                let src = self.munch_exp(source)?;
                self.emit(Instr::mov("move 'd0, 's0", *dst, src));
            }
            _ => return invariant(format!("cannot move into {}", target)),
        }
        Ok(())
    }

    fn munch_jump(&mut self, target: &Exp, labels: &[Label]) -> Result<()> {
        if let Exp::Name(label) = target {
            self.emit(Instr::jump("j 'j0", vec![], vec![label.clone()]));
        } else {
            let address = self.munch_exp(target)?;
            self.emit(Instr::jump("jr 's0", vec![address], labels.to_vec()));
        }
        Ok(())
    }

    /// Jumps to the true label when the comparison holds, and otherwise falls
    /// through to the false label, which the scheduler has placed right after.
    fn munch_cjump(
        &mut self,
        op: RelOp,
        lhs: &Exp,
        rhs: &Exp,
        true_label: &Label,
        false_label: &Label,
    ) -> Result<()> {
        let mnemonic = match op {
            RelOp::Eq => "beq",
            RelOp::Ne => "bne",
            RelOp::Lt => "blt",
            RelOp::Gt => "bgt",
            RelOp::Le => "ble",
            RelOp::Ge => "bge",
            RelOp::ULt => "bltu",
            RelOp::UGt => "bgtu",
            RelOp::ULe => "bleu",
            RelOp::UGe => "bgeu",
        };
        let lhs = self.munch_exp(lhs)?;
        let rhs = self.munch_exp(rhs)?;
        self.emit(Instr::jump(
            format!("{} 's0, 's1, 'j0", mnemonic),
            vec![lhs, rhs],
            vec![true_label.clone(), false_label.clone()],
        ));
        Ok(())
    }

    fn munch_call(&mut self, function: &Exp, args: &[Exp]) -> Result<Temp> {
        let mut src = match function {
            Exp::Name(_) => vec![],
            _ => vec![self.munch_exp(function)?],
        };
        src.extend(self.munch_args(args)?);

        let assem = match function {
            Exp::Name(label) => format!("jal {}", label),
            _ => "jalr 's0".to_string(),
        };
        self.emit(Instr::oper(assem, self.call_defs(), src));
        Ok(self.frame.rv())
    }

    /// Move each argument into its argument register, returning the registers used.
    fn munch_args(&mut self, args: &[Exp]) -> Result<Vec<Temp>> {
        if args.len() > ARGUMENT_REGISTERS.len() {
            return Err(BackendError::TooManyArguments {
                supported: ARGUMENT_REGISTERS.len(),
                given: args.len(),
            });
        }

        let mut registers = Vec::with_capacity(args.len());
        for (arg, &register) in args.iter().zip(ARGUMENT_REGISTERS) {
            let value = self.munch_exp(arg)?;
            self.emit(Instr::mov("move 'd0, 's0", register, value));
            registers.push(register);
        }
        Ok(registers)
    }

    fn munch_exp(&mut self, exp: &Exp) -> Result<Temp> {
        let temp = match exp {
            Exp::Temp(temp) => *temp,
            Exp::Const(0) => ZERO,
            Exp::Const(value) => {
                self.emit_result(|r| Instr::oper(format!("li 'd0, {}", value), vec![r], vec![]))
            }
            Exp::Name(label) => {
                self.emit_result(|r| Instr::oper(format!("la 'd0, {}", label), vec![r], vec![]))
            }
            Exp::Call(function, args) => self.munch_call(function, args)?,
            Exp::Mem(address) => match base_offset(address) {
                Some((base, offset)) => {
                    let base = self.munch_exp(base)?;
                    self.emit_result(|r| {
                        Instr::oper(format!("lw 'd0, {}('s0)", offset), vec![r], vec![base])
                    })
                }
                None => {
                    let address = self.munch_exp(address)?;
                    self.emit_result(|r| Instr::oper("lw 'd0, 0('s0)", vec![r], vec![address]))
                }
            },
            Exp::BinOp(op, lhs, rhs) => self.munch_binop(*op, lhs, rhs)?,
            Exp::ESeq(..) => return invariant(format!("unexpected eseq in {}", exp)),
        };
        Ok(temp)
    }

    fn munch_binop(&mut self, op: BinOp, lhs: &Exp, rhs: &Exp) -> Result<Temp> {
        let immediate = match (op, lhs, rhs) {
            (BinOp::Plus, e, Exp::Const(n)) | (BinOp::Plus, Exp::Const(n), e) if is_immediate(*n) => {
                Some(("addi", e, *n))
            }
            (BinOp::Minus, e, Exp::Const(n)) if is_immediate(-*n) => Some(("addi", e, -*n)),
            (BinOp::And, e, Exp::Const(n)) | (BinOp::And, Exp::Const(n), e) if is_immediate(*n) => {
                Some(("andi", e, *n))
            }
            (BinOp::Or, e, Exp::Const(n)) | (BinOp::Or, Exp::Const(n), e) if is_immediate(*n) => {
                Some(("ori", e, *n))
            }
            (BinOp::Xor, e, Exp::Const(n)) | (BinOp::Xor, Exp::Const(n), e) if is_immediate(*n) => {
                Some(("xori", e, *n))
            }
            (BinOp::LShift, e, Exp::Const(n)) if (0..32).contains(n) => Some(("sll", e, *n)),
            (BinOp::RShift, e, Exp::Const(n)) if (0..32).contains(n) => Some(("srl", e, *n)),
            (BinOp::ArShift, e, Exp::Const(n)) if (0..32).contains(n) => Some(("sra", e, *n)),
            _ => None,
        };

        if let Some((mnemonic, operand, value)) = immediate {
            let operand = self.munch_exp(operand)?;
            return Ok(self.emit_result(|r| {
                Instr::oper(
                    format!("{} 'd0, 's0, {}", mnemonic, value),
                    vec![r],
                    vec![operand],
                )
            }));
        }

        let mnemonic = match op {
            BinOp::Plus => "add",
            BinOp::Minus => "sub",
            BinOp::Mul => "mul",
            BinOp::Div => "div",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::LShift => "sllv",
            BinOp::RShift => "srlv",
            BinOp::ArShift => "srav",
        };
        let lhs = self.munch_exp(lhs)?;
        let rhs = self.munch_exp(rhs)?;
        Ok(self.emit_result(|r| {
            Instr::oper(format!("{} 'd0, 's0, 's1", mnemonic), vec![r], vec![lhs, rhs])
        }))
    }
}
