//! Quadruples: statements whose operands are all simple.

use std::fmt::{self, Display, Formatter};

use crate::{
    canon::canonicalize,
    prelude::*,
    temp::{Label, Names, Temp},
};

use super::{BinOp, Branch, Exp, RelOp, Stm, Word};

/// A simple operand: a temporary, the address of a label, or a constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Temp(Temp),
    Name(Label),
    Const(Word),
}
impl Display for Operand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Temp(temp) => temp.fmt(f),
            Self::Name(label) => label.fmt(f),
            Self::Const(value) => value.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Quad {
    /// Load the word at an address into a temporary.
    Load { dst: Temp, address: Operand },
    /// Store a value to the word at an address.
    Store { address: Operand, value: Operand },
    BinOp {
        op: BinOp,
        dst: Temp,
        lhs: Operand,
        rhs: Operand,
    },
    Move { dst: Temp, src: Operand },
    Call {
        function: Operand,
        args: Vec<Operand>,
        dst: Option<Temp>,
    },
    Jump { target: Operand, labels: Vec<Label> },
    CJump {
        op: RelOp,
        lhs: Operand,
        rhs: Operand,
        true_label: Label,
        false_label: Label,
    },
    Label(Label),
}
impl Display for Quad {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Load { dst, address } => write!(f, "{} = load {}", dst, address),
            Self::Store { address, value } => write!(f, "store {}, {}", address, value),
            Self::BinOp { op, dst, lhs, rhs } => write!(f, "{} = {} {} {}", dst, lhs, op, rhs),
            Self::Move { dst, src } => write!(f, "{} = {}", dst, src),
            Self::Call {
                function,
                args,
                dst,
            } => {
                if let Some(dst) = dst {
                    write!(f, "{} = ", dst)?;
                }
                let args = args
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "call {}({})", function, args)
            }
            Self::Jump {
                target: Operand::Name(label),
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
            Self::Label(label) => write!(f, "{}:", label),
        }
    }
}

/// Lower an arbitrary statement into quadruples.
///
/// Every nested complex expression is first given its own temporary; the
/// canonicalizer then lifts those assignments out, leaving statements that map
/// one-to-one onto quads.
pub fn to_quads(stm: Stm, names: &Names) -> Result<Vec<Quad>> {
    let simplifier = Simplifier { names };
    let canonical = canonicalize(simplifier.stm(stm), names)?;

    let mut quads = Vec::with_capacity(canonical.len());
    for stm in canonical {
        quads.extend(to_quad(stm)?);
    }
    Ok(quads)
}

/// Converts a canonical statement to a quad. Evaluating a simple expression for
/// its effect does nothing, so it yields no quad at all.
fn to_quad(stm: Stm) -> Result<Option<Quad>> {
    let quad = match stm {
        Stm::Label(label) => Quad::Label(label),
        Stm::Branch(Branch::Jump { target, labels }) => Quad::Jump {
            target: operand(target)?,
            labels,
        },
        Stm::Branch(Branch::CJump {
            op,
            lhs,
            rhs,
            true_label,
            false_label,
        }) => Quad::CJump {
            op,
            lhs: operand(lhs)?,
            rhs: operand(rhs)?,
            true_label,
            false_label,
        },
        Stm::Move(Exp::Mem(address), value) => Quad::Store {
            address: operand(*address)?,
            value: operand(value)?,
        },
        Stm::Move(Exp::Temp(dst), source) => match source {
            Exp::Mem(address) => Quad::Load {
                dst,
                address: operand(*address)?,
            },
            Exp::BinOp(op, lhs, rhs) => Quad::BinOp {
                op,
                dst,
                lhs: operand(*lhs)?,
                rhs: operand(*rhs)?,
            },
            Exp::Call(function, args) => Quad::Call {
                function: operand(*function)?,
                args: operands(args)?,
                dst: Some(dst),
            },
            simple => Quad::Move {
                dst,
                src: operand(simple)?,
            },
        },
        Stm::Exp(Exp::Call(function, args)) => Quad::Call {
            function: operand(*function)?,
            args: operands(args)?,
            dst: None,
        },
        Stm::Exp(exp) if exp.is_simple() => return Ok(None),
        other => return invariant(format!("statement has no quad form: {}", other)),
    };
    Ok(Some(quad))
}

fn operand(exp: Exp) -> Result<Operand> {
    match exp {
        Exp::Temp(temp) => Ok(Operand::Temp(temp)),
        Exp::Name(label) => Ok(Operand::Name(label)),
        Exp::Const(value) => Ok(Operand::Const(value)),
        other => invariant(format!(
            "expected a temporary, name or constant, but got {}",
            other
        )),
    }
}

fn operands(exps: Vec<Exp>) -> Result<Vec<Operand>> {
    exps.into_iter().map(operand).collect()
}

/// Rewrites every expression in an operand position into a simple one, by
/// wrapping it as `ESeq(Move(t, e), t)`. The moves are lifted out later by
/// canonicalization.
struct Simplifier<'n> {
    names: &'n Names,
}
impl Simplifier<'_> {
    fn stm(&self, stm: Stm) -> Stm {
        match stm {
            Stm::Seq(first, second) => Stm::seq(self.stm(*first), self.stm(*second)),
            Stm::Label(label) => Stm::Label(label),
            Stm::Branch(Branch::Jump { target, labels }) => Stm::Branch(Branch::Jump {
                target: self.simple(target),
                labels,
            }),
            Stm::Branch(Branch::CJump {
                op,
                lhs,
                rhs,
                true_label,
                false_label,
            }) => Stm::cjump(op, self.simple(lhs), self.simple(rhs), true_label, false_label),
            Stm::Move(target @ Exp::Mem(_), source) => {
                Stm::Move(self.target(target), self.simple(source))
            }
            Stm::Move(target, source) => Stm::Move(self.target(target), self.exp(source)),
            Stm::Exp(call @ Exp::Call(..)) => Stm::Exp(self.exp(call)),
            Stm::Exp(exp) => Stm::Exp(self.simple(exp)),
        }
    }

    /// Simplify the inside of a move target without turning the target itself
    /// into a temporary.
    fn target(&self, target: Exp) -> Exp {
        match target {
            Exp::Mem(address) => Exp::mem(self.simple(*address)),
            Exp::ESeq(stm, target) => Exp::eseq(self.stm(*stm), self.target(*target)),
            other => other,
        }
    }

    fn exp(&self, exp: Exp) -> Exp {
        match exp {
            Exp::BinOp(op, lhs, rhs) => Exp::binop(op, self.simple(*lhs), self.simple(*rhs)),
            Exp::Mem(address) => Exp::mem(self.simple(*address)),
            Exp::ESeq(stm, exp) => Exp::eseq(self.stm(*stm), self.simple(*exp)),
            Exp::Call(function, args) => Exp::call(
                self.simple(*function),
                args.into_iter().map(|arg| self.simple(arg)).collect(),
            ),
            simple => simple,
        }
    }

    /// Returns the expression as a temporary, name or constant.
    fn simple(&self, exp: Exp) -> Exp {
        let exp = self.exp(exp);
        if exp.is_simple() {
            exp
        } else {
            let temp = Exp::Temp(self.names.next_temp());
            Exp::eseq(Stm::Move(temp.clone(), exp), temp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_quads {
        ($stm:expr, $expected:expr) => {{
            let names = Names::new();
            let quads = to_quads($stm, &names)
                .unwrap()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>();

            assert_eq!($expected, quads)
        }};
    }

    fn temp(id: usize) -> Exp {
        Exp::Temp(Temp::Virtual(id))
    }

    #[test]
    fn nested_arithmetic_is_split_into_simple_steps() {
        assert_quads!(
            Stm::Move(
                temp(10),
                Exp::binop(
                    BinOp::Plus,
                    Exp::binop(BinOp::Mul, temp(11), Exp::Const(2)),
                    Exp::mem(temp(12))
                )
            ),
            vec!["t1 = t11 * 2", "t3 = t1", "t2 = load t12", "t10 = t3 + t2"]
        )
    }

    #[test]
    fn store_keeps_its_memory_target() {
        assert_quads!(
            Stm::Move(
                Exp::mem(Exp::binop(BinOp::Plus, temp(10), Exp::Const(4))),
                Exp::binop(BinOp::Minus, temp(11), Exp::Const(1))
            ),
            vec!["t1 = t10 + 4", "t3 = t1", "t2 = t11 - 1", "store t3, t2"]
        )
    }

    #[test]
    fn call_arguments_are_simple() {
        assert_quads!(
            Stm::Exp(Exp::call(
                Exp::name("g"),
                vec![Exp::binop(BinOp::Plus, temp(10), Exp::Const(1)), Exp::Const(7)]
            )),
            vec!["t1 = t10 + 1", "call g(t1, 7)"]
        )
    }

    #[test]
    fn branches_map_directly() {
        assert_quads!(
            crate::ir::seq([
                Stm::Label(Label::named("top")),
                Stm::cjump(
                    RelOp::Le,
                    Exp::mem(temp(10)),
                    Exp::Const(0),
                    Label::named("top"),
                    Label::named("out")
                ),
                Stm::Label(Label::named("out")),
                Stm::jump(Label::named("top")),
            ]),
            vec![
                "top:",
                "t1 = load t10",
                "if t1 <= 0 goto top else out",
                "out:",
                "jump top"
            ]
        )
    }

    #[test]
    fn discarded_simple_value_produces_no_quad() {
        assert_quads!(
            Stm::Exp(Exp::binop(BinOp::Plus, temp(10), Exp::Const(1))),
            vec!["t1 = t10 + 1"]
        )
    }
}
