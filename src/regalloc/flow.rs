use std::collections::HashMap;

use crate::{assem::Instr, prelude::*, temp::Label};

/// The control-flow graph of an instruction list, one node per instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowGraph {
    successors: Vec<Vec<usize>>,
}

impl FlowGraph {
    /// An instruction with a jump list continues at each of its targets; any
    /// other instruction falls through to the next one.
    pub fn build(instrs: &[Instr]) -> Result<Self> {
        let labels: HashMap<&Label, usize> = instrs
            .iter()
            .enumerate()
            .filter_map(|(index, instr)| match instr {
                Instr::Label { label, .. } => Some((label, index)),
                _ => None,
            })
            .collect();

        let mut successors = Vec::with_capacity(instrs.len());
        for (index, instr) in instrs.iter().enumerate() {
            let next = match instr.jumps() {
                Some(targets) => {
                    let mut next = Vec::with_capacity(targets.len());
                    for target in targets {
                        match labels.get(target) {
                            Some(&target) => next.push(target),
                            None => {
                                return invariant(format!("jump to undefined label {}", target))
                            }
                        }
                    }
                    next
                }
                None if index + 1 < instrs.len() => vec![index + 1],
                None => vec![],
            };
            successors.push(next);
        }

        Ok(Self { successors })
    }

    pub fn len(&self) -> usize {
        self.successors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    pub fn successors(&self, node: usize) -> &[usize] {
        &self.successors[node]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temp::Temp;

    #[test]
    fn straight_line_code_falls_through() {
        let instrs = vec![
            Instr::oper("li 'd0, 1", vec![Temp::Virtual(1)], vec![]),
            Instr::oper("li 'd0, 2", vec![Temp::Virtual(2)], vec![]),
        ];
        let flow = FlowGraph::build(&instrs).unwrap();

        assert_eq!(&[1], flow.successors(0));
        assert!(flow.successors(1).is_empty());
        assert_eq!(2, flow.len());
    }

    #[test]
    fn no_instructions_give_an_empty_graph() {
        let flow = FlowGraph::build(&[]).unwrap();

        assert!(flow.is_empty());
    }

    #[test]
    fn jumps_continue_at_their_targets_only() {
        let top = Label::named("top");
        let instrs = vec![
            Instr::label(top.clone()),
            Instr::jump(
                "beq 's0, 's0, 'j0",
                vec![Temp::Virtual(1)],
                vec![top.clone(), Label::named("out")],
            ),
            Instr::label(Label::named("out")),
            Instr::jump("j 'j0", vec![], vec![top]),
        ];
        let flow = FlowGraph::build(&instrs).unwrap();

        assert_eq!(&[0, 2], flow.successors(1));
        assert_eq!(&[0], flow.successors(3));
    }

    #[test]
    fn empty_jump_list_ends_the_function() {
        let instrs = vec![
            Instr::jump("", vec![Temp::Register("ra")], vec![]),
            Instr::oper("nop", vec![], vec![]),
        ];
        let flow = FlowGraph::build(&instrs).unwrap();

        assert!(flow.successors(0).is_empty());
    }

    #[test]
    fn jump_to_unknown_label_is_an_error() {
        let instrs = vec![Instr::jump("j 'j0", vec![], vec![Label::named("nowhere")])];

        assert!(matches!(FlowGraph::build(&instrs), Err(BackendError::Invariant(_))));
    }
}
