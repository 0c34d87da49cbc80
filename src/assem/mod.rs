//! Abstract machine instructions, as produced by instruction selection.
//!
//! An instruction carries an assembly template and the temporaries it reads and
//! writes. Operands appear in the template as `'s0`, `'d0` and `'j0`
//! placeholders, which refer to the source list, the destination list and the
//! jump list by index. The register allocator only ever looks at the lists.

use std::fmt::{self, Display, Formatter};

use crate::temp::{Label, Temp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    /// An ordinary operation. `jump` is `None` if control falls through to the
    /// next instruction, otherwise it lists every possible target.
    Oper {
        assem: String,
        dst: Vec<Temp>,
        src: Vec<Temp>,
        jump: Option<Vec<Label>>,
    },
    /// A register-to-register copy, which coalescing may eliminate.
    Move { assem: String, dst: Temp, src: Temp },
    /// The definition of a label.
    Label { assem: String, label: Label },
}
impl Instr {
    pub fn oper<S: Into<String>>(assem: S, dst: Vec<Temp>, src: Vec<Temp>) -> Self {
        Self::Oper {
            assem: assem.into(),
            dst,
            src,
            jump: None,
        }
    }

    pub fn jump<S: Into<String>>(assem: S, src: Vec<Temp>, targets: Vec<Label>) -> Self {
        Self::Oper {
            assem: assem.into(),
            dst: vec![],
            src,
            jump: Some(targets),
        }
    }

    pub fn mov<S: Into<String>>(assem: S, dst: Temp, src: Temp) -> Self {
        Self::Move {
            assem: assem.into(),
            dst,
            src,
        }
    }

    pub fn label(label: Label) -> Self {
        Self::Label {
            assem: format!("{}:", label),
            label,
        }
    }

    /// The temporaries this instruction writes.
    pub fn defs(&self) -> &[Temp] {
        match self {
            Self::Oper { dst, .. } => dst,
            Self::Move { dst, .. } => std::slice::from_ref(dst),
            Self::Label { .. } => &[],
        }
    }

    /// The temporaries this instruction reads.
    pub fn uses(&self) -> &[Temp] {
        match self {
            Self::Oper { src, .. } => src,
            Self::Move { src, .. } => std::slice::from_ref(src),
            Self::Label { .. } => &[],
        }
    }

    pub fn jumps(&self) -> Option<&[Label]> {
        match self {
            Self::Oper {
                jump: Some(targets),
                ..
            } => Some(targets),
            _ => None,
        }
    }

    pub fn as_move(&self) -> Option<(Temp, Temp)> {
        match self {
            Self::Move { dst, src, .. } => Some((*dst, *src)),
            _ => None,
        }
    }

    /// Replace every temporary read or written by this instruction.
    pub fn rename<F: FnMut(Temp) -> Temp>(&mut self, mut f: F) {
        match self {
            Self::Oper { dst, src, .. } => {
                for temp in dst.iter_mut().chain(src.iter_mut()) {
                    *temp = f(*temp);
                }
            }
            Self::Move { dst, src, .. } => {
                *dst = f(*dst);
                *src = f(*src);
            }
            Self::Label { .. } => (),
        }
    }

    /// Fill in the template, naming each temporary with `name`.
    pub fn format<F: Fn(Temp) -> String>(&self, name: F) -> String {
        let (assem, jumps) = match self {
            Self::Oper { assem, jump, .. } => (assem, jump.as_deref().unwrap_or(&[])),
            Self::Move { assem, .. } => (assem, &[][..]),
            Self::Label { assem, .. } => return assem.clone(),
        };

        let mut result = String::with_capacity(assem.len());
        let mut chars = assem.chars().peekable();
        while let Some(ch) = chars.next() {
            let list = match (ch, chars.peek()) {
                ('\'', Some(&kind @ ('s' | 'd' | 'j'))) => kind,
                _ => {
                    result.push(ch);
                    continue;
                }
            };
            chars.next();

            let mut index = 0usize;
            let mut digits = 0;
            while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
                index = index * 10 + digit as usize;
                digits += 1;
                chars.next();
            }

            let operand = match list {
                _ if digits == 0 => None,
                's' => self.uses().get(index).map(|t| name(*t)),
                'd' => self.defs().get(index).map(|t| name(*t)),
                _ => jumps.get(index).map(ToString::to_string),
            };
            match operand {
                Some(operand) => result.push_str(&operand),
                // Leave malformed placeholders in place so they show up in the output.
                None => {
                    result.push('\'');
                    result.push(list);
                    if digits > 0 {
                        result.push_str(&index.to_string());
                    }
                }
            }
        }
        result
    }
}
impl Display for Instr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.format(|t| t.to_string()))
    }
}
