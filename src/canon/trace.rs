use std::collections::{HashMap, VecDeque};

use crate::{
    ir::{Branch, Exp, Stm},
    prelude::*,
    temp::{Label, Names},
};

use super::{BasicBlock, BlockGraph};

/// Order the blocks of a graph into a single list of statements.
///
/// The result satisfies the canonical-form properties of its input, and in
/// addition every conditional jump is immediately followed by its false label.
/// Unconditional jumps to a block that can be placed right after them are
/// removed. The exit label comes last.
pub fn schedule(graph: BlockGraph, names: &Names) -> Result<Vec<Stm>> {
    let BlockGraph { blocks, exit_label } = graph;
    let mut scheduler = TraceScheduler::new(blocks, names)?;
    scheduler.build_trace()?;

    let mut output = scheduler.output;
    output.push(Stm::Label(exit_label));
    Ok(output)
}

struct TraceScheduler<'n> {
    /// Blocks in their original order. Whenever there is no better candidate,
    /// tracing starts from the front of this queue; blocks that were traced in
    /// the meantime are skipped.
    work_queue: VecDeque<Label>,
    /// Untraced blocks by label. A block is removed when it is traced.
    untraced: HashMap<Label, BasicBlock>,
    output: Vec<Stm>,
    names: &'n Names,
}
impl<'n> TraceScheduler<'n> {
    fn new(blocks: Vec<BasicBlock>, names: &'n Names) -> Result<Self> {
        let mut work_queue = VecDeque::with_capacity(blocks.len());
        let mut untraced = HashMap::with_capacity(blocks.len());

        for block in blocks {
            work_queue.push_back(block.label.clone());
            if let Some(duplicate) = untraced.insert(block.label.clone(), block) {
                return invariant(format!("duplicate block label: {}", duplicate.label));
            }
        }

        Ok(Self {
            work_queue,
            untraced,
            output: vec![],
            names,
        })
    }

    fn build_trace(&mut self) -> Result<()> {
        while let Some(label) = self.work_queue.pop_front() {
            if self.untraced.contains_key(&label) {
                trace!("Starting trace at {}", label);
                self.trace(label)?;
            }
        }
        Ok(())
    }

    /// Write the block with the given label to the output, followed by as many
    /// of its untraced successors as can be chained onto it.
    fn trace(&mut self, label: Label) -> Result<()> {
        let mut next = Some(label);

        while let Some(label) = next.take() {
            let block = match self.untraced.remove(&label) {
                Some(block) => block,
                None => return invariant(format!("attempted to re-trace block {}", label)),
            };

            match &block.branch {
                Branch::Jump {
                    target: Exp::Name(target),
                    ..
                } if self.untraced.contains_key(target) => {
                    // Fall through into the target instead of jumping to it.
                    next = Some(target.clone());
                    self.output.extend(block.labelled_body());
                }
                Branch::Jump { .. } => self.output.extend(block.into_statements()),
                Branch::CJump {
                    op,
                    lhs,
                    rhs,
                    true_label,
                    false_label,
                } => {
                    if self.untraced.contains_key(false_label) {
                        next = Some(false_label.clone());
                        self.output.extend(block.into_statements());
                    } else if self.untraced.contains_key(true_label) {
                        let negated = Stm::cjump(
                            op.negate(),
                            lhs.clone(),
                            rhs.clone(),
                            false_label.clone(),
                            true_label.clone(),
                        );
                        next = Some(true_label.clone());
                        self.output.extend(block.labelled_body());
                        self.output.push(negated);
                    } else {
                        // Both targets are placed already: branch to a new false
                        // label that jumps on to the real one.
                        let fresh = self.names.next_label();
                        trace!(
                            "Both targets of the branch in {} are traced, adding {}",
                            block.label,
                            fresh
                        );
                        let cjump = Stm::cjump(
                            *op,
                            lhs.clone(),
                            rhs.clone(),
                            true_label.clone(),
                            fresh.clone(),
                        );
                        let jump = Stm::jump(false_label.clone());
                        self.output.extend(block.labelled_body());
                        self.output.push(cjump);
                        self.output.push(Stm::Label(fresh));
                        self.output.push(jump);
                    }
                }
            }
        }
        Ok(())
    }
}
