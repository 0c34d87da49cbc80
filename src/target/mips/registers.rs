use crate::temp::Temp;

pub const ZERO: Temp = Temp::Register("zero");
pub const V0: Temp = Temp::Register("v0");
pub const V1: Temp = Temp::Register("v1");
pub const A0: Temp = Temp::Register("a0");
pub const A1: Temp = Temp::Register("a1");
pub const A2: Temp = Temp::Register("a2");
pub const A3: Temp = Temp::Register("a3");
pub const T0: Temp = Temp::Register("t0");
pub const T1: Temp = Temp::Register("t1");
pub const T2: Temp = Temp::Register("t2");
pub const T3: Temp = Temp::Register("t3");
pub const T4: Temp = Temp::Register("t4");
pub const T5: Temp = Temp::Register("t5");
pub const T6: Temp = Temp::Register("t6");
pub const T7: Temp = Temp::Register("t7");
pub const T8: Temp = Temp::Register("t8");
pub const T9: Temp = Temp::Register("t9");
pub const S0: Temp = Temp::Register("s0");
pub const S1: Temp = Temp::Register("s1");
pub const S2: Temp = Temp::Register("s2");
pub const S3: Temp = Temp::Register("s3");
pub const S4: Temp = Temp::Register("s4");
pub const S5: Temp = Temp::Register("s5");
pub const S6: Temp = Temp::Register("s6");
pub const S7: Temp = Temp::Register("s7");
pub const SP: Temp = Temp::Register("sp");
pub const FP: Temp = Temp::Register("fp");
pub const RA: Temp = Temp::Register("ra");

/// First four arguments are passed in registers; there is no stack passing.
pub const ARGUMENT_REGISTERS: &[Temp] = &[A0, A1, A2, A3];

pub const CALLER_SAVES: &[Temp] = &[T0, T1, T2, T3, T4, T5, T6, T7, T8, T9];

pub const CALLEE_SAVES: &[Temp] = &[S0, S1, S2, S3, S4, S5, S6, S7];

/// Every register the allocator may hand out, caller-saves first.
pub const COLORABLE: &[Temp] = &[
    T0, T1, T2, T3, T4, T5, T6, T7, T8, T9, V0, V1, A0, A1, A2, A3, S0, S1, S2, S3, S4, S5, S6,
    S7,
];
