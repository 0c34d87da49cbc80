use std::fmt::{self, Display, Formatter};

use crate::{
    ir::{Branch, Stm},
    prelude::*,
    temp::{Label, Names},
};

/// A straight-line run of statements, entered only through its label and left
/// only through its branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    pub label: Label,
    /// The statements between the label and the branch. Never contains a label or a branch.
    pub body: Vec<Stm>,
    pub branch: Branch,
}
impl BasicBlock {
    /// The label followed by the body, without the terminating branch.
    pub fn labelled_body(self) -> impl Iterator<Item = Stm> {
        std::iter::once(Stm::Label(self.label)).chain(self.body)
    }

    /// Every statement of the block, in order.
    pub fn into_statements(self) -> impl Iterator<Item = Stm> {
        let Self {
            label,
            body,
            branch,
        } = self;
        std::iter::once(Stm::Label(label))
            .chain(body)
            .chain(std::iter::once(Stm::Branch(branch)))
    }
}
impl Display for BasicBlock {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        writeln!(f, "    {}:", self.label)?;
        for stm in &self.body {
            writeln!(f, "        {}", stm)?;
        }
        writeln!(f, "        {}", self.branch)
    }
}

/// The basic blocks of one function, in their original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockGraph {
    pub blocks: Vec<BasicBlock>,
    /// The label that control falls through to when the function is done.
    /// No block carries it: the scheduler places it after the last trace.
    pub exit_label: Label,
}
impl Display for BlockGraph {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for block in &self.blocks {
            block.fmt(f)?;
        }
        writeln!(f, "    {}:", self.exit_label)
    }
}

/// Partition a list of canonical statements into basic blocks.
///
/// A block starts at every label and ends at every branch. A block without a label
/// gets a fresh one; a block without a branch gets a jump to the next block, or
/// to the exit label if it is the last block.
pub fn build_graph(statements: Vec<Stm>, names: &Names) -> Result<BlockGraph> {
    let exit_label = names.next_label();
    let mut blocks: Vec<BasicBlock> = vec![];
    let mut current: Option<(Label, Vec<Stm>)> = None;

    for stm in statements {
        match stm {
            Stm::Label(label) => {
                if let Some((open_label, body)) = current.take() {
                    blocks.push(BasicBlock {
                        label: open_label,
                        body,
                        branch: Branch::jump(label.clone()),
                    });
                }
                current = Some((label, vec![]));
            }
            Stm::Branch(branch) => {
                let (label, body) = current.take().unwrap_or_else(|| (names.next_label(), vec![]));
                blocks.push(BasicBlock {
                    label,
                    body,
                    branch,
                });
            }
            Stm::Seq(..) => return invariant("unexpected sequence in canonical statement list"),
            other => {
                current
                    .get_or_insert_with(|| (names.next_label(), vec![]))
                    .1
                    .push(other);
            }
        }
    }

    if let Some((label, body)) = current {
        blocks.push(BasicBlock {
            label,
            body,
            branch: Branch::jump(exit_label.clone()),
        });
    }

    trace!(
        "Partitioned statements into {} blocks, exit at {}",
        blocks.len(),
        exit_label
    );
    Ok(BlockGraph { blocks, exit_label })
}
