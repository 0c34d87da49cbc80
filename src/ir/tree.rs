use std::fmt::{self, Display, Formatter};

use crate::temp::{Label, Temp};

use super::{BinOp, RelOp};

pub type Word = i64;

/// An IR expression: something that computes a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exp {
    /// An integer constant.
    Const(Word),
    /// The address of a label.
    Name(Label),
    /// The contents of a temporary.
    Temp(Temp),
    /// A binary operation on two operands, evaluated left to right.
    BinOp(BinOp, Box<Exp>, Box<Exp>),
    /// The contents of one word of memory at the given address.
    Mem(Box<Exp>),
    /// A call of a function with the given arguments, evaluated left to right.
    Call(Box<Exp>, Vec<Exp>),
    /// A statement evaluated for its side effects, followed by the result expression.
    ESeq(Box<Stm>, Box<Exp>),
}
impl Exp {
    pub fn binop(op: BinOp, lhs: Exp, rhs: Exp) -> Self {
        Self::BinOp(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn mem(address: Exp) -> Self {
        Self::Mem(Box::new(address))
    }

    pub fn call(function: Exp, args: Vec<Exp>) -> Self {
        Self::Call(Box::new(function), args)
    }

    pub fn eseq(stm: Stm, exp: Exp) -> Self {
        Self::ESeq(Box::new(stm), Box::new(exp))
    }

    pub fn name<S: Into<String>>(name: S) -> Self {
        Self::Name(Label::named(name))
    }

    /// Temporaries, names and constants are simple: they can be used as an
    /// operand without any evaluation.
    pub fn is_simple(&self) -> bool {
        matches!(self, Self::Const(_) | Self::Name(_) | Self::Temp(_))
    }
}
impl Display for Exp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        fn operand(f: &mut Formatter, exp: &Exp) -> fmt::Result {
            match exp {
                Exp::BinOp(..) => write!(f, "({})", exp),
                _ => write!(f, "{}", exp),
            }
        }

        match self {
            Self::Const(value) => write!(f, "{}", value),
            Self::Name(label) => write!(f, "{}", label),
            Self::Temp(temp) => write!(f, "{}", temp),
            Self::BinOp(op, lhs, rhs) => {
                operand(f, lhs)?;
                write!(f, " {} ", op)?;
                operand(f, rhs)
            }
            Self::Mem(address) => write!(f, "mem[{}]", address),
            Self::Call(function, args) => {
                write!(
                    f,
                    "call {}({})",
                    function,
                    args.iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
            Self::ESeq(stm, exp) => write!(f, "eseq {{ {}; {} }}", stm, exp),
        }
    }
}

/// A control transfer. Every basic block ends with exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Branch {
    /// Jump to the address computed by `target`, which is one of `labels`.
    Jump { target: Exp, labels: Vec<Label> },
    /// Evaluate `lhs` and `rhs`, compare them, and jump to one of two labels.
    CJump {
        op: RelOp,
        lhs: Exp,
        rhs: Exp,
        true_label: Label,
        false_label: Label,
    },
}
impl Branch {
    /// An unconditional jump to a known label.
    pub fn jump(label: Label) -> Self {
        Self::Jump {
            target: Exp::Name(label.clone()),
            labels: vec![label],
        }
    }
}
impl Display for Branch {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Jump {
                target: Exp::Name(label),
                ..
            } => write!(f, "jump {}", label),
            Self::Jump { target, labels } => {
                let labels = labels
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "jump {} [{}]", target, labels)
            }
            Self::CJump {
                op,
                lhs,
                rhs,
                true_label,
                false_label,
            } => write!(
                f,
                "if {} {} {} goto {} else {}",
                lhs, op, rhs, true_label, false_label
            ),
        }
    }
}

/// An IR statement: something evaluated only for its side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stm {
    /// Evaluate the first statement, then the second.
    Seq(Box<Stm>, Box<Stm>),
    /// Define a label as the current code address.
    Label(Label),
    /// Store the source in the target, which is a temporary or a memory location.
    Move(Exp, Exp),
    /// Transfer control.
    Branch(Branch),
    /// Evaluate an expression and discard its result.
    Exp(Exp),
}
impl Stm {
    pub fn seq(first: Stm, second: Stm) -> Self {
        Self::Seq(Box::new(first), Box::new(second))
    }

    pub fn jump(label: Label) -> Self {
        Self::Branch(Branch::jump(label))
    }

    pub fn cjump(op: RelOp, lhs: Exp, rhs: Exp, true_label: Label, false_label: Label) -> Self {
        Self::Branch(Branch::CJump {
            op,
            lhs,
            rhs,
            true_label,
            false_label,
        })
    }

    /// The statement that does nothing.
    pub fn nop() -> Self {
        Self::Exp(Exp::Const(0))
    }

    /// Whether this statement is the evaluation of a constant, which has no effect.
    pub fn is_nop(&self) -> bool {
        matches!(self, Self::Exp(Exp::Const(_)))
    }
}
impl Display for Stm {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Seq(first, second) => write!(f, "{}; {}", first, second),
            Self::Label(label) => write!(f, "{}:", label),
            Self::Move(target, source) => write!(f, "{} = {}", target, source),
            Self::Branch(branch) => branch.fmt(f),
            Self::Exp(exp) => exp.fmt(f),
        }
    }
}

/// Join a list of statements into a right-nested sequence.
pub fn seq<I: IntoIterator<Item = Stm>>(statements: I) -> Stm
where
    I::IntoIter: DoubleEndedIterator,
{
    statements
        .into_iter()
        .rev()
        .reduce(|rest, stm| Stm::seq(stm, rest))
        .unwrap_or_else(Stm::nop)
}
