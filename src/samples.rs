//! Hand-built IR fragments to drive the pipeline with.

use tree_backend::{
    ir::{self, BinOp, Exp, RelOp, Stm},
    target::mips::registers::{FP, V0},
    temp::{Label, Names},
};

use crate::commandline::Sample;

impl Sample {
    pub fn build(self, names: &Names) -> (Label, Stm) {
        match self {
            Sample::NestedCalls => (Label::named("nested_calls"), nested_calls()),
            Sample::Branches => (Label::named("branches"), branches(names)),
            Sample::Pressure => (Label::named("pressure"), pressure(names)),
        }
    }
}

fn f(args: Vec<Exp>) -> Exp {
    Exp::call(Exp::name("f"), args)
}

/// `f(f(1, 2), f(f(3, 4), 5))`
fn nested_calls() -> Stm {
    let inner = f(vec![f(vec![Exp::Const(3), Exp::Const(4)]), Exp::Const(5)]);
    Stm::Exp(f(vec![f(vec![Exp::Const(1), Exp::Const(2)]), inner]))
}

/// Sum the first ten words of the array at `a`, returning the total.
fn branches(names: &Names) -> Stm {
    let (a, i, sum) = (
        Exp::Temp(names.next_temp()),
        Exp::Temp(names.next_temp()),
        Exp::Temp(names.next_temp()),
    );
    let (test, body, done) = (Label::named("test"), Label::named("body"), Label::named("done"));
    let element = Exp::mem(Exp::binop(
        BinOp::Plus,
        a.clone(),
        Exp::binop(BinOp::Mul, i.clone(), Exp::Const(4)),
    ));

    ir::seq(vec![
        Stm::Move(a, Exp::mem(Exp::binop(BinOp::Plus, Exp::Temp(FP), Exp::Const(8)))),
        Stm::Move(i.clone(), Exp::Const(0)),
        Stm::Move(sum.clone(), Exp::Const(0)),
        Stm::Label(test.clone()),
        Stm::cjump(RelOp::Lt, i.clone(), Exp::Const(10), body.clone(), done.clone()),
        Stm::Label(body),
        Stm::Move(sum.clone(), Exp::binop(BinOp::Plus, sum.clone(), element)),
        Stm::Move(i.clone(), Exp::binop(BinOp::Plus, i, Exp::Const(1))),
        Stm::jump(test),
        Stm::Label(done),
        Stm::Move(Exp::Temp(V0), sum),
    ])
}

/// Load eight words and only then add them up, so all eight are live at once.
fn pressure(names: &Names) -> Stm {
    let base = Exp::Temp(names.next_temp());
    let values: Vec<Exp> = (0..8).map(|_| Exp::Temp(names.next_temp())).collect();

    let loads: Vec<Stm> = values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let address = Exp::binop(BinOp::Plus, base.clone(), Exp::Const(4 * index as i64));
            Stm::Move(value.clone(), Exp::mem(address))
        })
        .collect();
    let total = values
        .iter()
        .cloned()
        .reduce(|total, value| Exp::binop(BinOp::Plus, total, value))
        .unwrap_or(Exp::Const(0));

    ir::seq(
        std::iter::once(Stm::Move(base, Exp::Temp(FP)))
            .chain(loads)
            .chain(std::iter::once(Stm::Move(Exp::Temp(V0), total)))
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use tree_backend::canon::canonicalize;

    use super::*;

    #[test]
    fn pressure_loads_every_word_before_the_sum() {
        let names = Names::new();
        let (_, stm) = Sample::Pressure.build(&names);
        let statements = canonicalize(stm, &names).unwrap();

        assert_eq!(10, statements.len());
        assert_eq!("t1 = $fp", statements[0].to_string());
        assert!(statements[9].to_string().starts_with("$v0 = "));
    }
}
