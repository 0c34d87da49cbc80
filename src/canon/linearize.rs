use crate::{
    ir::{Branch, Exp, Stm},
    prelude::*,
    temp::Names,
};

/// Rewrite an arbitrary statement into an equivalent list of canonical statements.
///
/// The result contains no `Seq` or `ESeq` nodes, and the parent of every `Call`
/// is either an expression statement or a move into a temporary. Statements
/// that only evaluate a constant are dropped.
pub fn canonicalize(stm: Stm, names: &Names) -> Result<Vec<Stm>> {
    let linearizer = Linearizer { names };
    let statements = flatten(linearizer.do_stm(stm)?);
    debug!("Canonicalized into {} statements", statements.len());
    Ok(statements)
}

struct Linearizer<'n> {
    names: &'n Names,
}
impl Linearizer<'_> {
    /// Pull the side effects out of a list of expressions that are evaluated left to
    /// right. Returns the statements to run first, and the remaining side-effect-free
    /// expressions, one per input expression.
    fn reorder(&self, exps: Vec<Exp>) -> Result<(Stm, Vec<Exp>)> {
        let mut exps = exps.into_iter();
        let head = match exps.next() {
            None => return Ok((Stm::nop(), vec![])),
            Some(head) => head,
        };

        // A call may clobber temporaries used by its neighbours, so its result
        // always goes to a fresh temporary first.
        let head = match head {
            call @ Exp::Call(..) => {
                let temp = Exp::Temp(self.names.next_temp());
                Exp::eseq(Stm::Move(temp.clone(), call), temp)
            }
            other => other,
        };

        let (stms, exp) = self.do_exp(head)?;
        // A call can still surface from the tail of an ESeq.
        let (stms, exp) = match exp {
            call @ Exp::Call(..) => {
                let temp = Exp::Temp(self.names.next_temp());
                (merge(stms, Stm::Move(temp.clone(), call)), temp)
            }
            other => (stms, other),
        };
        let (rest_stms, mut rest) = self.reorder(exps.collect())?;

        if commutes(&rest_stms, &exp) {
            rest.insert(0, exp);
            Ok((merge(stms, rest_stms), rest))
        } else {
            let temp = Exp::Temp(self.names.next_temp());
            let saved = merge(stms, Stm::Move(temp.clone(), exp));
            rest.insert(0, temp);
            Ok((merge(saved, rest_stms), rest))
        }
    }

    fn reorder_stm<const N: usize, F>(&self, exps: [Exp; N], build: F) -> Result<Stm>
    where
        F: FnOnce([Exp; N]) -> Stm,
    {
        let (stms, exps) = self.reorder(exps.into())?;
        Ok(merge(stms, build(take(exps)?)))
    }

    fn reorder_exp<const N: usize, F>(&self, exps: [Exp; N], build: F) -> Result<(Stm, Exp)>
    where
        F: FnOnce([Exp; N]) -> Exp,
    {
        let (stms, exps) = self.reorder(exps.into())?;
        Ok((stms, build(take(exps)?)))
    }

    /// Reorder the function and arguments of a call, which are evaluated in that order.
    fn reorder_call(&self, function: Exp, args: Vec<Exp>) -> Result<(Stm, Exp)> {
        let mut exps = Vec::with_capacity(args.len() + 1);
        exps.push(function);
        exps.extend(args);

        let (stms, mut exps) = self.reorder(exps)?;
        if exps.is_empty() {
            return invariant("call lost its function expression during reordering");
        }
        let function = exps.remove(0);
        Ok((stms, Exp::call(function, exps)))
    }

    fn do_stm(&self, stm: Stm) -> Result<Stm> {
        match stm {
            Stm::Seq(first, second) => Ok(merge(self.do_stm(*first)?, self.do_stm(*second)?)),
            Stm::Branch(Branch::Jump { target, labels }) => {
                self.reorder_stm([target], |[target]| {
                    Stm::Branch(Branch::Jump { target, labels })
                })
            }
            Stm::Branch(Branch::CJump {
                op,
                lhs,
                rhs,
                true_label,
                false_label,
            }) => self.reorder_stm([lhs, rhs], |[lhs, rhs]| {
                Stm::cjump(op, lhs, rhs, true_label, false_label)
            }),
            Stm::Move(Exp::Temp(temp), Exp::Call(function, args)) => {
                let (stms, call) = self.reorder_call(*function, args)?;
                Ok(merge(stms, Stm::Move(Exp::Temp(temp), call)))
            }
            Stm::Move(Exp::Temp(temp), Exp::ESeq(stm, source)) => {
                self.do_stm(Stm::seq(*stm, Stm::Move(Exp::Temp(temp), *source)))
            }
            Stm::Move(Exp::Temp(temp), source) => {
                self.reorder_stm([source], |[source]| Stm::Move(Exp::Temp(temp), source))
            }
            Stm::Move(Exp::Mem(address), source) => {
                self.reorder_stm([*address, source], |[address, source]| {
                    Stm::Move(Exp::mem(address), source)
                })
            }
            Stm::Move(Exp::ESeq(stm, target), source) => {
                self.do_stm(Stm::seq(*stm, Stm::Move(*target, source)))
            }
            Stm::Move(target, _) => invariant(format!("invalid move target: {}", target)),
            Stm::Exp(Exp::Call(function, args)) => {
                let (stms, call) = self.reorder_call(*function, args)?;
                Ok(merge(stms, Stm::Exp(call)))
            }
            Stm::Exp(Exp::ESeq(stm, exp)) => self.do_stm(Stm::seq(*stm, Stm::Exp(*exp))),
            Stm::Exp(exp) => self.reorder_stm([exp], |[exp]| Stm::Exp(exp)),
            label @ Stm::Label(_) => Ok(label),
        }
    }

    fn do_exp(&self, exp: Exp) -> Result<(Stm, Exp)> {
        match exp {
            Exp::BinOp(op, lhs, rhs) => {
                self.reorder_exp([*lhs, *rhs], |[lhs, rhs]| Exp::binop(op, lhs, rhs))
            }
            Exp::Mem(address) => self.reorder_exp([*address], |[address]| Exp::mem(address)),
            Exp::ESeq(stm, exp) => {
                let stms = self.do_stm(*stm)?;
                let (exp_stms, exp) = self.do_exp(*exp)?;
                Ok((merge(stms, exp_stms), exp))
            }
            Exp::Call(function, args) => self.reorder_call(*function, args),
            simple => Ok((Stm::nop(), simple)),
        }
    }
}

fn take<const N: usize>(exps: Vec<Exp>) -> Result<[Exp; N]> {
    exps.try_into().or_else(|exps: Vec<Exp>| {
        invariant(format!(
            "expected {} expressions after reordering, got {}",
            N,
            exps.len()
        ))
    })
}

/// Join two statements, dropping either if it only evaluates a constant.
fn merge(first: Stm, second: Stm) -> Stm {
    if first.is_nop() {
        second
    } else if second.is_nop() {
        first
    } else {
        Stm::seq(first, second)
    }
}

/// Conservative approximation of whether `stm` may run before `exp` is evaluated
/// without changing the value of `exp`.
fn commutes(stm: &Stm, exp: &Exp) -> bool {
    stm.is_nop() || matches!(exp, Exp::Name(_) | Exp::Const(_))
}

/// Get rid of the `Seq` nodes, preserving statement order.
fn flatten(stm: Stm) -> Vec<Stm> {
    let mut result = vec![];
    let mut pending = vec![stm];

    while let Some(stm) = pending.pop() {
        match stm {
            Stm::Seq(first, second) => {
                pending.push(*second);
                pending.push(*first);
            }
            nop if nop.is_nop() => (),
            other => result.push(other),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use crate::{
        ir::{seq, BinOp, RelOp},
        temp::{Label, Temp},
    };

    use super::*;

    macro_rules! assert_canonicalizes {
        ($stm:expr, $expected:expr) => {{
            let names = Names::new();
            let canonical = canonicalize($stm, &names)
                .unwrap()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>();

            assert_eq!($expected, canonical)
        }};
    }

    fn f(args: Vec<Exp>) -> Exp {
        Exp::call(Exp::name("f"), args)
    }

    fn temp(id: usize) -> Exp {
        Exp::Temp(Temp::Virtual(id))
    }

    /// Checks that no `Seq`/`ESeq` survives and that every call is at a statement boundary.
    fn assert_canonical(stms: &[Stm]) {
        fn no_nested_calls(exp: &Exp) -> bool {
            match exp {
                Exp::Call(..) | Exp::ESeq(..) => false,
                Exp::BinOp(_, lhs, rhs) => no_nested_calls(lhs) && no_nested_calls(rhs),
                Exp::Mem(address) => no_nested_calls(address),
                _ => true,
            }
        }

        for stm in stms {
            let ok = match stm {
                Stm::Seq(..) => false,
                Stm::Label(_) => true,
                Stm::Move(Exp::Temp(_), Exp::Call(function, args))
                | Stm::Exp(Exp::Call(function, args)) => {
                    no_nested_calls(function) && args.iter().all(no_nested_calls)
                }
                Stm::Move(target, source) => no_nested_calls(target) && no_nested_calls(source),
                Stm::Exp(exp) => no_nested_calls(exp),
                Stm::Branch(Branch::Jump { target, .. }) => no_nested_calls(target),
                Stm::Branch(Branch::CJump { lhs, rhs, .. }) => {
                    no_nested_calls(lhs) && no_nested_calls(rhs)
                }
            };
            assert!(ok, "not canonical: {}", stm);
        }
    }

    #[test]
    fn nested_calls_are_hoisted_in_argument_order() {
        assert_canonicalizes!(
            Stm::Exp(f(vec![
                f(vec![Exp::Const(1), Exp::Const(2)]),
                f(vec![f(vec![Exp::Const(3), Exp::Const(4)]), Exp::Const(5)]),
            ])),
            vec![
                "t1 = call f(1, 2)",
                "t4 = t1",
                "t3 = call f(3, 4)",
                "t2 = call f(t3, 5)",
                "call f(t4, t2)",
            ]
        )
    }

    #[test]
    fn seq_is_flattened_in_order() {
        let a = Label::named("a");
        let b = Label::named("b");
        assert_canonicalizes!(
            seq([
                Stm::Label(a.clone()),
                Stm::seq(Stm::Move(temp(9), Exp::Const(1)), Stm::Label(b)),
                Stm::jump(a),
            ]),
            vec!["a:", "t9 = 1", "b:", "jump a"]
        )
    }

    #[test]
    fn eseq_statement_is_pulled_before_the_expression() {
        assert_canonicalizes!(
            Stm::Move(
                temp(9),
                Exp::binop(
                    BinOp::Plus,
                    Exp::Const(1),
                    Exp::eseq(Stm::Move(temp(8), Exp::Const(2)), temp(8))
                )
            ),
            vec!["t8 = 2", "t9 = 1 + t8"]
        )
    }

    #[test]
    fn non_commuting_operand_is_saved_to_a_temp() {
        // t7 must be read before the ESeq on the right overwrites it.
        assert_canonicalizes!(
            Stm::Move(
                temp(9),
                Exp::binop(
                    BinOp::Plus,
                    temp(7),
                    Exp::eseq(Stm::Move(temp(7), Exp::Const(2)), temp(7))
                )
            ),
            vec!["t1 = t7", "t7 = 2", "t9 = t1 + t7"]
        )
    }

    #[test]
    fn move_into_eseq_target_runs_statement_first() {
        assert_canonicalizes!(
            Stm::Move(
                Exp::eseq(Stm::Move(temp(8), Exp::Const(4)), Exp::mem(temp(8))),
                Exp::Const(1)
            ),
            vec!["t8 = 4", "mem[t8] = 1"]
        )
    }

    #[test]
    fn call_inside_memory_address_is_hoisted() {
        assert_canonicalizes!(
            Stm::Move(Exp::mem(f(vec![])), Exp::Const(3)),
            vec!["t1 = call f()", "mem[t1] = 3"]
        )
    }

    #[test]
    fn call_in_conditional_jump_is_hoisted() {
        assert_canonicalizes!(
            Stm::cjump(
                RelOp::Lt,
                f(vec![]),
                Exp::Const(0),
                Label::named("yes"),
                Label::named("no")
            ),
            vec!["t1 = call f()", "if t1 < 0 goto yes else no"]
        )
    }

    #[test]
    fn call_at_the_end_of_an_eseq_is_hoisted() {
        assert_canonicalizes!(
            Stm::Move(
                temp(8),
                Exp::binop(
                    BinOp::Plus,
                    Exp::eseq(Stm::Move(temp(9), Exp::Const(1)), f(vec![])),
                    Exp::Const(1)
                )
            ),
            vec!["t9 = 1", "t1 = call f()", "t8 = t1 + 1"]
        )
    }

    #[test]
    fn call_argument_ending_in_a_call_is_hoisted() {
        assert_canonicalizes!(
            Stm::Exp(Exp::call(
                Exp::name("g"),
                vec![Exp::eseq(Stm::Move(temp(9), Exp::Const(1)), f(vec![]))]
            )),
            vec!["t9 = 1", "t1 = call f()", "call g(t1)"]
        )
    }

    #[test]
    fn constant_statements_are_dropped() {
        assert_canonicalizes!(
            seq([Stm::nop(), Stm::Exp(Exp::Const(7)), Stm::Label(Label::named("x"))]),
            vec!["x:"]
        )
    }

    #[test]
    fn invalid_move_target_is_an_invariant_violation() {
        let names = Names::new();
        let result = canonicalize(Stm::Move(Exp::Const(1), Exp::Const(2)), &names);

        assert!(matches!(result, Err(BackendError::Invariant(_))));
    }

    #[test]
    fn canonical_form_has_no_nested_calls() {
        let names = Names::new();
        let tree = seq([
            Stm::Move(
                Exp::mem(Exp::binop(BinOp::Plus, f(vec![temp(20)]), Exp::Const(4))),
                Exp::binop(BinOp::Mul, f(vec![f(vec![])]), Exp::mem(f(vec![]))),
            ),
            Stm::Exp(Exp::eseq(
                Stm::Exp(f(vec![Exp::binop(BinOp::Minus, f(vec![]), temp(21))])),
                Exp::Const(0),
            )),
            Stm::Branch(Branch::Jump {
                target: f(vec![]),
                labels: vec![Label::named("a"), Label::named("b")],
            }),
            Stm::cjump(
                RelOp::Lt,
                Exp::eseq(Stm::Move(temp(22), Exp::Const(1)), f(vec![temp(22)])),
                Exp::mem(Exp::eseq(Stm::nop(), f(vec![]))),
                Label::named("a"),
                Label::named("b"),
            ),
            Stm::Exp(f(vec![Exp::eseq(Stm::Move(temp(23), Exp::Const(1)), f(vec![]))])),
        ]);

        let canonical = canonicalize(tree, &names).unwrap();
        assert_canonical(&canonical);
    }

    #[test]
    fn canonicalizing_twice_changes_nothing() {
        let names = Names::new();
        let tree = Stm::seq(
            Stm::Exp(f(vec![
                f(vec![Exp::Const(1), Exp::Const(2)]),
                f(vec![f(vec![Exp::Const(3), Exp::Const(4)]), Exp::Const(5)]),
            ])),
            Stm::seq(
                Stm::Move(
                    Exp::mem(temp(30)),
                    Exp::binop(BinOp::Plus, Exp::mem(temp(31)), f(vec![])),
                ),
                Stm::Move(
                    temp(32),
                    Exp::binop(
                        BinOp::Plus,
                        Exp::eseq(Stm::Move(temp(33), Exp::Const(1)), f(vec![])),
                        Exp::Const(1),
                    ),
                ),
            ),
        );

        let once = canonicalize(tree, &names).unwrap();
        let twice = canonicalize(seq(once.clone()), &names).unwrap();

        assert_eq!(once, twice);
    }
}
