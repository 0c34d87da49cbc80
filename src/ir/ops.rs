use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Plus,
    Minus,
    Mul,
    Div,
    And,
    Or,
    Xor,
    LShift,
    RShift,
    ArShift,
}
impl Display for BinOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::LShift => "<<",
            Self::RShift => ">>",
            Self::ArShift => ">>>",
        })
    }
}

/// A relational operator, as used by conditional jumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    ULt,
    UGt,
    ULe,
    UGe,
}
impl RelOp {
    /// The operator that holds exactly when this one does not.
    pub fn negate(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Lt => Self::Ge,
            Self::Ge => Self::Lt,
            Self::Gt => Self::Le,
            Self::Le => Self::Gt,
            Self::ULt => Self::UGe,
            Self::UGe => Self::ULt,
            Self::UGt => Self::ULe,
            Self::ULe => Self::UGt,
        }
    }
}
impl Display for RelOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::ULt => "<u",
            Self::UGt => ">u",
            Self::ULe => "<=u",
            Self::UGe => ">=u",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negation_is_an_involution() {
        use RelOp::*;
        for op in [Eq, Ne, Lt, Gt, Le, Ge, ULt, UGt, ULe, UGe] {
            assert_ne!(op, op.negate());
            assert_eq!(op, op.negate().negate());
        }
    }
}
