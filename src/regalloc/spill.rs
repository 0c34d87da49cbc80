use std::collections::{BTreeSet, HashMap};

use crate::{
    assem::Instr,
    prelude::*,
    target::Frame,
    temp::{Names, Temp},
};

/// Move every spilled temporary into its own frame slot.
///
/// Each instruction that reads a spilled temporary is preceded by a load into a
/// fresh temporary, and each instruction that writes one is followed by a store
/// from a fresh temporary, so every new temporary lives only around a single
/// instruction. Returns the rewritten instructions and the new temporaries.
pub fn rewrite<F: Frame>(
    instrs: Vec<Instr>,
    spilled: &[Temp],
    frame: &mut F,
    names: &Names,
) -> (Vec<Instr>, BTreeSet<Temp>) {
    let slots: HashMap<Temp, _> = spilled
        .iter()
        .map(|&temp| (temp, frame.alloc_local()))
        .collect();
    let mut created = BTreeSet::new();
    let mut output = Vec::with_capacity(instrs.len());

    for mut instr in instrs {
        let mut loads = vec![];
        let mut stores = vec![];
        let mut replacements: HashMap<Temp, Temp> = HashMap::new();

        for &temp in instr.uses().iter().chain(instr.defs()) {
            let Some(&offset) = slots.get(&temp) else {
                continue;
            };
            if replacements.contains_key(&temp) {
                continue;
            }
            let fresh = names.next_temp();
            created.insert(fresh);
            replacements.insert(temp, fresh);
            if instr.uses().contains(&temp) {
                loads.push(frame.spill_load(offset, fresh));
            }
            if instr.defs().contains(&temp) {
                stores.push(frame.spill_store(offset, fresh));
            }
        }

        if !replacements.is_empty() {
            trace!("Rewriting {} for spilled temporaries", instr);
            instr.rename(|temp| replacements.get(&temp).copied().unwrap_or(temp));
        }
        output.extend(loads);
        output.push(instr);
        output.extend(stores);
    }

    (output, created)
}
