use anyhow::Result;
use clap::Parser;
use log::info;
use tree_backend::{
    canon::{build_graph, canonicalize, schedule},
    ir::to_quads,
    regalloc::allocate,
    target::{
        mips::{MipsFrame, MipsGen},
        CodeGen, Frame,
    },
    temp::Names,
};

use crate::commandline::{Operation, Options};

mod commandline;
mod samples;

fn main() -> Result<()> {
    let options = Options::parse();
    stderrlog::new().verbosity(options.verbose).init()?;

    let names = Names::new();
    match options.operation {
        Operation::Canon { sample } => {
            let (_, body) = sample.build(&names);
            for stm in canonicalize(body, &names)? {
                println!("{}", stm);
            }
        }
        Operation::Quads { sample } => {
            let (_, body) = sample.build(&names);
            for quad in to_quads(body, &names)? {
                println!("{}", quad);
            }
        }
        Operation::Trace { sample } => {
            let (_, body) = sample.build(&names);
            let graph = build_graph(canonicalize(body, &names)?, &names)?;
            info!("Scheduling {} basic blocks", graph.blocks.len());
            for stm in schedule(graph, &names)? {
                println!("{}", stm);
            }
        }
        Operation::Alloc { sample, backend } => {
            let (label, body) = sample.build(&names);
            let graph = build_graph(canonicalize(body, &names)?, &names)?;
            let statements = schedule(graph, &names)?;

            let mut frame = MipsFrame::with_registers(label, backend.palette());
            let instrs = MipsGen.codegen_all(&frame, &statements, &names)?;
            let instrs = frame.proc_entry_exit2(instrs);
            let (instrs, allocation) = allocate(instrs, &mut frame, &names)?;

            println!("{}:", frame.name());
            for instr in allocation.apply(instrs)? {
                let line = instr.to_string();
                if line.ends_with(':') {
                    println!("{}", line);
                } else if !line.is_empty() {
                    println!("    {}", line);
                }
            }
            info!(
                "{} rounds, spilled: {:?}",
                allocation.rounds,
                allocation
                    .spilled
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
            );
        }
    }

    Ok(())
}
