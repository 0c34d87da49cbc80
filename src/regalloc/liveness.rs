use std::collections::BTreeSet;

use crate::{assem::Instr, prelude::*, temp::Temp};

use super::flow::FlowGraph;

/// The temporaries live on entry to and exit from every instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Liveness {
    live_in: Vec<BTreeSet<Temp>>,
    live_out: Vec<BTreeSet<Temp>>,
}

impl Liveness {
    /// Solve the backward dataflow equations
    /// `in[n] = use[n] ∪ (out[n] − def[n])` and `out[n] = ∪ in[s]` for every successor `s`.
    pub fn compute(instrs: &[Instr], flow: &FlowGraph) -> Self {
        let count = flow.len();
        let mut live_in = vec![BTreeSet::new(); count];
        let mut live_out = vec![BTreeSet::new(); count];

        let mut iterations = 0;
        let mut changed = true;
        while changed {
            changed = false;
            iterations += 1;

            for node in (0..count).rev() {
                let out: BTreeSet<Temp> = flow
                    .successors(node)
                    .iter()
                    .flat_map(|&succ| live_in[succ].iter().copied())
                    .collect();

                let instr = &instrs[node];
                let mut new_in: BTreeSet<Temp> = out
                    .iter()
                    .filter(|temp| !instr.defs().contains(temp))
                    .copied()
                    .collect();
                new_in.extend(instr.uses().iter().copied());

                if new_in != live_in[node] || out != live_out[node] {
                    changed = true;
                    live_in[node] = new_in;
                    live_out[node] = out;
                }
            }
        }

        trace!("Liveness reached a fixed point after {} iterations", iterations);
        Self { live_in, live_out }
    }

    pub fn live_in(&self, node: usize) -> &BTreeSet<Temp> {
        &self.live_in[node]
    }

    pub fn live_out(&self, node: usize) -> &BTreeSet<Temp> {
        &self.live_out[node]
    }
}
