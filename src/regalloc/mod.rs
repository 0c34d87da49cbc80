//! Register allocation by iterated register coalescing.
//!
//! Each round computes liveness over the instruction list, builds the
//! interference graph and tries to color it with the frame's registers. Any
//! temporary that cannot be colored is moved to the frame by [spill::rewrite]
//! and the next round starts over on the rewritten list.

mod color;
mod flow;
mod graph;
mod liveness;
mod spill;

use std::collections::{BTreeSet, HashMap};

use crate::{
    assem::Instr,
    prelude::*,
    target::Frame,
    temp::{Names, Temp},
};

pub use color::{color, Coloring};
pub use flow::FlowGraph;
pub use graph::InterferenceGraph;
pub use liveness::Liveness;

/// A successful register assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// The register of every temporary in the final instruction list.
    pub colors: HashMap<Temp, Temp>,
    /// Every temporary that was moved to the frame, in the order it happened.
    pub spilled: Vec<Temp>,
    /// Number of build and color rounds.
    pub rounds: usize,
}

impl Allocation {
    pub fn register(&self, temp: Temp) -> Option<Temp> {
        self.colors.get(&temp).copied()
    }

    /// The assembly name of the register assigned to `temp`.
    pub fn name(&self, temp: Temp) -> String {
        self.register(temp).unwrap_or(temp).to_string()
    }

    /// Replace every temporary with its register, dropping copies that have
    /// become moves from a register to itself.
    pub fn apply(&self, instrs: Vec<Instr>) -> Result<Vec<Instr>> {
        let mut output = Vec::with_capacity(instrs.len());
        for mut instr in instrs {
            if let Some(temp) = instr
                .defs()
                .iter()
                .chain(instr.uses())
                .find(|&&temp| !self.colors.contains_key(&temp))
            {
                return invariant(format!("no register was assigned to {}", temp));
            }
            instr.rename(|temp| self.colors[&temp]);
            match instr.as_move() {
                Some((dst, src)) if dst == src => trace!("Dropping {}", instr),
                _ => output.push(instr),
            }
        }
        Ok(output)
    }
}

fn distinct_temps(instrs: &[Instr]) -> usize {
    instrs
        .iter()
        .flat_map(|instr| instr.defs().iter().chain(instr.uses()))
        .filter(|temp| !temp.is_register())
        .collect::<BTreeSet<_>>()
        .len()
}

/// Assign a register from `frame` to every temporary of `instrs`.
///
/// Returns the instruction list with spill code inserted, still in terms of
/// temporaries, along with the assignment. Fails with
/// [BackendError::NonConvergence] if spilling has not settled after one more
/// round than there are temporaries.
pub fn allocate<F: Frame>(
    mut instrs: Vec<Instr>,
    frame: &mut F,
    names: &Names,
) -> Result<(Vec<Instr>, Allocation)> {
    let max_rounds = distinct_temps(&instrs) + 1;
    let mut spilled = vec![];
    let mut unspillable = BTreeSet::new();

    for round in 1..=max_rounds {
        let flow = FlowGraph::build(&instrs)?;
        let liveness = Liveness::compute(&instrs, &flow);
        let graph = InterferenceGraph::build(&instrs, &liveness, frame.registers());
        trace!("Interference graph for {}:\n{}", frame.name(), graph);

        let coloring = color(graph, frame.registers(), &unspillable);
        debug!(
            "Round {} for {}: {} moves coalesced, {} spills",
            round,
            frame.name(),
            coloring.coalesced_moves,
            coloring.spilled.len()
        );

        if coloring.spilled.is_empty() {
            info!(
                "Allocated registers for {} in {} rounds, {} spilled",
                frame.name(),
                round,
                spilled.len()
            );
            let allocation = Allocation {
                colors: coloring.colors,
                spilled,
                rounds: round,
            };
            return Ok((instrs, allocation));
        }

        let (rewritten, created) = spill::rewrite(instrs, &coloring.spilled, frame, names);
        instrs = rewritten;
        unspillable.extend(created);
        spilled.extend(coloring.spilled);
    }

    Err(BackendError::NonConvergence { rounds: max_rounds })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        target::mips::{registers::*, MipsFrame},
        temp::Label,
    };

    fn frame(registers: &[Temp]) -> MipsFrame {
        MipsFrame::with_registers(Label::named("f"), registers.to_vec())
    }

    /// Check that no two temporaries live at the same time share a register.
    fn assert_no_false_sharing(instrs: &[Instr], allocation: &Allocation) {
        let flow = FlowGraph::build(instrs).unwrap();
        let liveness = Liveness::compute(instrs, &flow);
        for (node, instr) in instrs.iter().enumerate() {
            for &def in instr.defs() {
                for &live in liveness.live_out(node) {
                    if live == def || instr.as_move().map(|(_, src)| src) == Some(live) {
                        continue;
                    }
                    assert_ne!(
                        allocation.register(def),
                        allocation.register(live),
                        "{} and {} are both live after {}",
                        def,
                        live,
                        instr
                    );
                }
            }
        }
    }

    #[test]
    fn few_temps_color_in_one_round() {
        let names = Names::new();
        let (a, b, c) = (names.next_temp(), names.next_temp(), names.next_temp());
        let instrs = vec![
            Instr::oper("li 'd0, 1", vec![a], vec![]),
            Instr::oper("li 'd0, 2", vec![b], vec![]),
            Instr::oper("add 'd0, 's0, 's1", vec![c], vec![a, b]),
            Instr::oper("sw 's0, 0('s1)", vec![], vec![c, SP]),
        ];
        let mut frame = frame(&[T0, T1, T2]);

        let (instrs, allocation) = allocate(instrs, &mut frame, &names).unwrap();

        assert_eq!(1, allocation.rounds);
        assert!(allocation.spilled.is_empty());
        assert_no_false_sharing(&instrs, &allocation);
        assert_eq!(Some(SP), allocation.register(SP));
        assert_eq!("$t1", allocation.name(a));
    }

    #[test]
    fn pressure_spills_and_reallocates() {
        let names = Names::new();
        let (a, b, c) = (names.next_temp(), names.next_temp(), names.next_temp());
        let instrs = vec![
            Instr::oper("li 'd0, 1", vec![a], vec![]),
            Instr::oper("li 'd0, 2", vec![b], vec![]),
            Instr::oper("li 'd0, 3", vec![c], vec![]),
            Instr::oper("use 's0", vec![], vec![c]),
            Instr::oper("use 's0", vec![], vec![b]),
            Instr::oper("use 's0", vec![], vec![a]),
        ];
        let mut frame = frame(&[T0, T1]);

        let (instrs, allocation) = allocate(instrs, &mut frame, &names).unwrap();

        assert_eq!(vec![a], allocation.spilled);
        assert_eq!(2, allocation.rounds);
        assert_no_false_sharing(&instrs, &allocation);

        let text: Vec<_> = allocation
            .apply(instrs)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(8, text.len());
        assert_eq!("sw $t0, -4($fp)", text[1]);
        assert_eq!("lw $t0, -4($fp)", text[6]);
    }

    #[test]
    fn colors_never_exceed_the_palette() {
        let names = Names::new();
        let temps: Vec<Temp> = (0..6).map(|_| names.next_temp()).collect();
        let mut instrs: Vec<Instr> = temps
            .iter()
            .map(|&temp| Instr::oper("li 'd0, 1", vec![temp], vec![]))
            .collect();
        for pair in temps.chunks(2).rev() {
            instrs.push(Instr::oper("use 's0, 's1", vec![], pair.to_vec()));
        }
        let palette = [T0, T1, T2];
        let mut frame = frame(&palette);

        let (instrs, allocation) = allocate(instrs, &mut frame, &names).unwrap();

        assert!(!allocation.spilled.is_empty());
        assert!(allocation.spilled.iter().all(|temp| !temp.is_register()));
        assert_no_false_sharing(&instrs, &allocation);
        for instr in &instrs {
            for &temp in instr.defs().iter().chain(instr.uses()) {
                let register = allocation.register(temp).unwrap();
                assert!(palette.contains(&register) || register == FP);
            }
        }
    }

    #[test]
    fn move_from_a_register_to_itself_is_removed() {
        let names = Names::new();
        let instrs = vec![
            Instr::mov("move 'd0, 's0", A0, A0),
            Instr::oper("jal g", vec![V0], vec![A0]),
        ];
        let mut frame = frame(&[A0, V0]);

        let (instrs, allocation) = allocate(instrs, &mut frame, &names).unwrap();
        let instrs = allocation.apply(instrs).unwrap();

        assert_eq!(vec!["jal g"], instrs.iter().map(ToString::to_string).collect::<Vec<_>>());
    }

    #[test]
    fn coalesced_copies_disappear() {
        let names = Names::new();
        let (a, b) = (names.next_temp(), names.next_temp());
        let instrs = vec![
            Instr::oper("li 'd0, 1", vec![a], vec![]),
            Instr::mov("move 'd0, 's0", b, a),
            Instr::mov("move 'd0, 's0", A0, b),
            Instr::oper("jal g", vec![V0], vec![A0]),
        ];
        let mut frame = frame(&[T0, A0, V0]);

        let (instrs, allocation) = allocate(instrs, &mut frame, &names).unwrap();
        let text: Vec<_> = allocation
            .apply(instrs)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(vec!["li $a0, 1", "jal g"], text);
    }

    #[test]
    fn empty_palette_does_not_converge() {
        let names = Names::new();
        let a = names.next_temp();
        let instrs = vec![
            Instr::oper("li 'd0, 1", vec![a], vec![]),
            Instr::oper("use 's0", vec![], vec![a]),
        ];
        let mut frame = frame(&[]);

        assert_eq!(
            Err(BackendError::NonConvergence { rounds: 2 }),
            allocate(instrs, &mut frame, &names)
        );
    }
}
