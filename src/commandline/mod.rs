use clap::{Args, Parser, Subcommand, ValueEnum};
use tree_backend::{target::mips::registers::COLORABLE, temp::Temp};

#[derive(Debug, Parser)]
#[clap(about = "Run the back end of a tree-IR compiler over a sample fragment")]
pub struct Options {
    #[clap(subcommand)]
    pub operation: Operation,
    #[clap(short, long, default_value_t = 1)]
    pub verbose: usize,
}

#[derive(Debug, Subcommand)]
pub enum Operation {
    /// Print the canonical statements of a fragment
    Canon {
        #[clap(value_enum)]
        sample: Sample,
    },
    /// Print the quadruples of a fragment
    Quads {
        #[clap(value_enum)]
        sample: Sample,
    },
    /// Print the scheduled traces of a fragment
    Trace {
        #[clap(value_enum)]
        sample: Sample,
    },
    /// Select MIPS instructions for a fragment and allocate its registers
    Alloc {
        #[clap(value_enum)]
        sample: Sample,
        #[clap(flatten)]
        backend: BackendOptions,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Sample {
    /// Calls nested inside call arguments
    NestedCalls,
    /// A loop summing an array
    Branches,
    /// Many values live at the same time
    Pressure,
}

#[derive(Debug, Args)]
pub struct BackendOptions {
    #[clap(short, long)]
    /// Only allocate the first N colorable registers
    registers: Option<usize>,
}

impl BackendOptions {
    pub fn palette(&self) -> Vec<Temp> {
        let count = self.registers.unwrap_or(COLORABLE.len()).min(COLORABLE.len());
        COLORABLE[..count].to_vec()
    }
}
