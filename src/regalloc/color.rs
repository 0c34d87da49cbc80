//! Iterated register coalescing over an interference graph.
//!
//! Every node is in exactly one [NodeState] and every move in exactly one
//! [MoveState]; the worklists below are the non-trivial states made explicit.

use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::{prelude::*, temp::Temp};

use super::graph::{InterferenceGraph, MoveId, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Precolored,
    Initial,
    Simplify,
    Freeze,
    Spill,
    Coalesced,
    OnStack,
    Colored,
    Spilled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoveState {
    Worklist,
    Active,
    Coalesced,
    Constrained,
    Frozen,
}

/// The outcome of one coloring attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coloring {
    /// The register assigned to every temporary that got one, machine registers included.
    pub colors: HashMap<Temp, Temp>,
    /// Temporaries that could not be colored, in ascending order.
    pub spilled: Vec<Temp>,
    pub coalesced_moves: usize,
}

/// Color `graph` with the registers of `palette`.
///
/// Temporaries in `unspillable` are only chosen as spill candidates when no
/// other candidate is left.
pub fn color(
    graph: InterferenceGraph,
    palette: &[Temp],
    unspillable: &BTreeSet<Temp>,
) -> Coloring {
    let mut colorer = Colorer::new(graph, palette, unspillable);
    colorer.make_worklist();
    loop {
        if let Some(node) = colorer.simplify_worklist.pop_front() {
            colorer.simplify(node);
        } else if let Some(m) = colorer.worklist_moves.pop_first() {
            colorer.coalesce(m);
        } else if let Some(node) = colorer.freeze_worklist.pop_first() {
            colorer.freeze(node);
        } else if !colorer.spill_worklist.is_empty() {
            colorer.select_spill();
        } else {
            break;
        }
    }
    colorer.assign_colors();
    colorer.into_coloring()
}

struct Colorer<'a> {
    graph: InterferenceGraph,
    palette: &'a [Temp],
    k: usize,
    spill_cost: Vec<f64>,
    node_state: Vec<NodeState>,
    move_state: Vec<MoveState>,
    alias: Vec<NodeId>,
    color: Vec<Option<Temp>>,

    simplify_worklist: VecDeque<NodeId>,
    freeze_worklist: BTreeSet<NodeId>,
    spill_worklist: BTreeSet<NodeId>,
    worklist_moves: BTreeSet<MoveId>,
    active_moves: BTreeSet<MoveId>,
    select_stack: Vec<NodeId>,
}

impl<'a> Colorer<'a> {
    fn new(graph: InterferenceGraph, palette: &'a [Temp], unspillable: &BTreeSet<Temp>) -> Self {
        let node_count = graph.nodes.len();
        let (node_state, color) = graph
            .nodes
            .iter()
            .map(|node| {
                if node.precolored {
                    (NodeState::Precolored, Some(node.temp))
                } else {
                    (NodeState::Initial, None)
                }
            })
            .unzip();
        let spill_cost = graph
            .nodes
            .iter()
            .map(|node| {
                if unspillable.contains(&node.temp) {
                    f64::INFINITY
                } else {
                    node.occurrences as f64
                }
            })
            .collect();

        Self {
            move_state: vec![MoveState::Worklist; graph.moves.len()],
            worklist_moves: (0..graph.moves.len()).collect(),
            graph,
            palette,
            k: palette.len(),
            spill_cost,
            node_state,
            alias: (0..node_count).collect(),
            color,
            simplify_worklist: VecDeque::new(),
            freeze_worklist: BTreeSet::new(),
            spill_worklist: BTreeSet::new(),
            active_moves: BTreeSet::new(),
            select_stack: vec![],
        }
    }

    fn is_precolored(&self, node: NodeId) -> bool {
        self.node_state[node] == NodeState::Precolored
    }

    /// Precolored nodes have unbounded degree.
    fn degree(&self, node: NodeId) -> usize {
        if self.is_precolored(node) {
            usize::MAX
        } else {
            self.graph.nodes[node].degree
        }
    }

    /// Neighbours still present in the graph.
    fn adjacent(&self, node: NodeId) -> Vec<NodeId> {
        self.graph.nodes[node]
            .adj_list
            .iter()
            .copied()
            .filter(|&n| !matches!(self.node_state[n], NodeState::OnStack | NodeState::Coalesced))
            .collect()
    }

    /// Moves of `node` that may still be coalesced.
    fn node_moves(&self, node: NodeId) -> Vec<MoveId> {
        self.graph.nodes[node]
            .move_list
            .iter()
            .copied()
            .filter(|&m| matches!(self.move_state[m], MoveState::Active | MoveState::Worklist))
            .collect()
    }

    fn move_related(&self, node: NodeId) -> bool {
        !self.node_moves(node).is_empty()
    }

    fn set_state(&mut self, node: NodeId, state: NodeState) {
        match self.node_state[node] {
            NodeState::Simplify => self.simplify_worklist.retain(|&n| n != node),
            NodeState::Freeze => {
                self.freeze_worklist.remove(&node);
            }
            NodeState::Spill => {
                self.spill_worklist.remove(&node);
            }
            _ => (),
        }
        match state {
            NodeState::Simplify => self.simplify_worklist.push_back(node),
            NodeState::Freeze => {
                self.freeze_worklist.insert(node);
            }
            NodeState::Spill => {
                self.spill_worklist.insert(node);
            }
            NodeState::OnStack => self.select_stack.push(node),
            _ => (),
        }
        self.node_state[node] = state;
    }

    fn set_move_state(&mut self, m: MoveId, state: MoveState) {
        match self.move_state[m] {
            MoveState::Worklist => {
                self.worklist_moves.remove(&m);
            }
            MoveState::Active => {
                self.active_moves.remove(&m);
            }
            _ => (),
        }
        match state {
            MoveState::Worklist => {
                self.worklist_moves.insert(m);
            }
            MoveState::Active => {
                self.active_moves.insert(m);
            }
            _ => (),
        }
        self.move_state[m] = state;
    }

    fn make_worklist(&mut self) {
        for node in 0..self.graph.nodes.len() {
            if self.is_precolored(node) {
                continue;
            }
            let state = if self.degree(node) >= self.k {
                NodeState::Spill
            } else if self.move_related(node) {
                NodeState::Freeze
            } else {
                NodeState::Simplify
            };
            self.set_state(node, state);
        }
    }

    fn simplify(&mut self, node: NodeId) {
        self.node_state[node] = NodeState::Initial;
        self.set_state(node, NodeState::OnStack);
        trace!("Simplified {}", self.graph.nodes[node].temp);
        for neighbour in self.adjacent(node) {
            self.decrement_degree(neighbour);
        }
    }

    fn decrement_degree(&mut self, node: NodeId) {
        if self.is_precolored(node) {
            return;
        }
        let degree = self.graph.nodes[node].degree;
        self.graph.nodes[node].degree = degree.saturating_sub(1);
        if degree == self.k && self.node_state[node] == NodeState::Spill {
            let mut nodes = self.adjacent(node);
            nodes.push(node);
            self.enable_moves(&nodes);
            let state = if self.move_related(node) {
                NodeState::Freeze
            } else {
                NodeState::Simplify
            };
            self.set_state(node, state);
        }
    }

    fn enable_moves(&mut self, nodes: &[NodeId]) {
        for &node in nodes {
            for m in self.node_moves(node) {
                if self.move_state[m] == MoveState::Active {
                    self.set_move_state(m, MoveState::Worklist);
                }
            }
        }
    }

    fn alias(&mut self, node: NodeId) -> NodeId {
        let parent = self.alias[node];
        if parent == node {
            return node;
        }
        let root = self.alias(parent);
        self.alias[node] = root;
        root
    }

    fn coalesce(&mut self, m: MoveId) {
        // The move has already left the worklist set.
        self.move_state[m] = MoveState::Constrained;

        let mv = self.graph.moves[m];
        let x = self.alias(mv.dst);
        let y = self.alias(mv.src);
        let (u, v) = if self.is_precolored(y) { (y, x) } else { (x, y) };

        if u == v {
            self.set_move_state(m, MoveState::Coalesced);
            self.add_work_list(u);
        } else if self.is_precolored(v) || self.graph.adjacent(u, v) {
            self.set_move_state(m, MoveState::Constrained);
            self.add_work_list(u);
            self.add_work_list(v);
        } else if (self.is_precolored(u) && self.adjacent(v).into_iter().all(|t| self.ok(t, u)))
            || (!self.is_precolored(u) && self.conservative(u, v))
        {
            self.set_move_state(m, MoveState::Coalesced);
            self.combine(u, v);
            self.add_work_list(u);
        } else {
            self.set_move_state(m, MoveState::Active);
        }
    }

    fn add_work_list(&mut self, node: NodeId) {
        if self.node_state[node] == NodeState::Freeze
            && !self.move_related(node)
            && self.degree(node) < self.k
        {
            self.set_state(node, NodeState::Simplify);
        }
    }

    /// George: `t` does not stand in the way of merging its neighbour into `r`.
    fn ok(&self, t: NodeId, r: NodeId) -> bool {
        self.degree(t) < self.k || self.is_precolored(t) || self.graph.adjacent(t, r)
    }

    /// Briggs: the merged node would have fewer than k neighbours of significant degree.
    fn conservative(&self, u: NodeId, v: NodeId) -> bool {
        let neighbours: BTreeSet<NodeId> =
            self.adjacent(u).into_iter().chain(self.adjacent(v)).collect();
        let significant = neighbours
            .into_iter()
            .filter(|&n| self.degree(n) >= self.k)
            .count();
        significant < self.k
    }

    fn combine(&mut self, u: NodeId, v: NodeId) {
        trace!(
            "Coalescing {} into {}",
            self.graph.nodes[v].temp,
            self.graph.nodes[u].temp
        );
        self.set_state(v, NodeState::Coalesced);
        self.alias[v] = u;

        for m in self.graph.nodes[v].move_list.clone() {
            if !self.graph.nodes[u].move_list.contains(&m) {
                self.graph.nodes[u].move_list.push(m);
            }
        }
        self.enable_moves(&[v]);

        for t in self.adjacent(v) {
            self.graph.add_edge(t, u);
            self.decrement_degree(t);
        }
        if self.degree(u) >= self.k && self.node_state[u] == NodeState::Freeze {
            self.set_state(u, NodeState::Spill);
        }
    }

    fn freeze(&mut self, node: NodeId) {
        // Already taken off the freeze worklist.
        self.node_state[node] = NodeState::Initial;
        self.set_state(node, NodeState::Simplify);
        self.freeze_moves(node);
    }

    fn freeze_moves(&mut self, u: NodeId) {
        for m in self.node_moves(u) {
            let mv = self.graph.moves[m];
            let v = if self.alias(mv.dst) == self.alias(u) {
                self.alias(mv.src)
            } else {
                self.alias(mv.dst)
            };
            self.set_move_state(m, MoveState::Frozen);
            if self.node_state[v] == NodeState::Freeze
                && !self.move_related(v)
                && self.degree(v) < self.k
            {
                self.set_state(v, NodeState::Simplify);
            }
        }
    }

    /// Pick the cheapest node relative to its degree, lowest id first on ties.
    fn select_spill(&mut self) {
        let mut best: Option<(NodeId, f64)> = None;
        for &node in &self.spill_worklist {
            let priority = self.spill_cost[node] / self.degree(node).max(1) as f64;
            match best {
                Some((_, best_priority)) if priority >= best_priority => {}
                _ => best = Some((node, priority)),
            }
        }
        if let Some((node, _)) = best {
            trace!("Selected {} as a potential spill", self.graph.nodes[node].temp);
            self.set_state(node, NodeState::Simplify);
            self.freeze_moves(node);
        }
    }

    fn assign_colors(&mut self) {
        while let Some(node) = self.select_stack.pop() {
            let mut ok_colors: Vec<Temp> = self.palette.to_vec();
            let neighbours: Vec<NodeId> =
                self.graph.nodes[node].adj_list.iter().copied().collect();
            for neighbour in neighbours {
                let alias = self.alias(neighbour);
                if let Some(color) = self.color[alias] {
                    ok_colors.retain(|&c| c != color);
                }
            }
            match ok_colors.first() {
                Some(&color) => {
                    self.color[node] = Some(color);
                    self.node_state[node] = NodeState::Colored;
                }
                None => {
                    trace!("Spilling {}", self.graph.nodes[node].temp);
                    self.node_state[node] = NodeState::Spilled;
                }
            }
        }

        for node in 0..self.graph.nodes.len() {
            if self.node_state[node] == NodeState::Coalesced {
                let alias = self.alias(node);
                self.color[node] = self.color[alias];
            }
        }
    }

    fn into_coloring(self) -> Coloring {
        let mut coloring = Coloring {
            coalesced_moves: self
                .move_state
                .iter()
                .filter(|&&state| state == MoveState::Coalesced)
                .count(),
            ..Coloring::default()
        };
        for (id, node) in self.graph.nodes.iter().enumerate() {
            if self.node_state[id] == NodeState::Spilled {
                coloring.spilled.push(node.temp);
            } else if let Some(color) = self.color[id] {
                coloring.colors.insert(node.temp, color);
            }
        }
        coloring
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assem::Instr,
        regalloc::{flow::FlowGraph, liveness::Liveness},
    };

    const R0: Temp = Temp::Register("r0");
    const R1: Temp = Temp::Register("r1");

    fn t(id: usize) -> Temp {
        Temp::Virtual(id)
    }

    fn color_instrs(instrs: &[Instr], palette: &[Temp]) -> Coloring {
        let flow = FlowGraph::build(instrs).unwrap();
        let liveness = Liveness::compute(instrs, &flow);
        let graph = InterferenceGraph::build(instrs, &liveness, palette);
        color(graph, palette, &BTreeSet::new())
    }

    #[test]
    fn two_live_temps_with_one_register_spill_exactly_one() {
        let coloring = color_instrs(
            &[
                Instr::oper("li 'd0, 1", vec![t(1)], vec![]),
                Instr::oper("li 'd0, 2", vec![t(2)], vec![]),
                Instr::oper("use 's0, 's1", vec![], vec![t(1), t(2)]),
            ],
            &[R0],
        );

        assert_eq!(vec![t(1)], coloring.spilled);
        assert_eq!(Some(&R0), coloring.colors.get(&t(2)));
    }

    #[test]
    fn independent_temps_share_a_register() {
        let coloring = color_instrs(
            &[
                Instr::oper("li 'd0, 1", vec![t(1)], vec![]),
                Instr::oper("use 's0", vec![], vec![t(1)]),
                Instr::oper("li 'd0, 2", vec![t(2)], vec![]),
                Instr::oper("use 's0", vec![], vec![t(2)]),
            ],
            &[R0, R1],
        );

        assert!(coloring.spilled.is_empty());
        assert_eq!(Some(&R0), coloring.colors.get(&t(1)));
        assert_eq!(Some(&R0), coloring.colors.get(&t(2)));
    }

    #[test]
    fn copy_ends_are_coalesced() {
        let coloring = color_instrs(
            &[
                Instr::oper("li 'd0, 1", vec![t(1)], vec![]),
                Instr::oper("li 'd0, 2", vec![t(3)], vec![]),
                Instr::mov("move 'd0, 's0", t(2), t(1)),
                Instr::oper("use 's0, 's1", vec![], vec![t(2), t(3)]),
            ],
            &[R0, R1],
        );

        assert_eq!(1, coloring.coalesced_moves);
        assert_eq!(coloring.colors.get(&t(1)), coloring.colors.get(&t(2)));
        assert_ne!(coloring.colors.get(&t(1)), coloring.colors.get(&t(3)));
    }

    #[test]
    fn copy_into_a_register_takes_that_register() {
        let coloring = color_instrs(
            &[
                Instr::oper("li 'd0, 1", vec![t(1)], vec![]),
                Instr::mov("move 'd0, 's0", R1, t(1)),
                Instr::oper("jal f", vec![], vec![R1]),
            ],
            &[R0, R1],
        );

        assert_eq!(1, coloring.coalesced_moves);
        assert_eq!(Some(&R1), coloring.colors.get(&t(1)));
        assert_eq!(Some(&R1), coloring.colors.get(&R1));
    }

    #[test]
    fn registers_keep_their_own_color_and_are_never_spilled() {
        let coloring = color_instrs(
            &[
                Instr::oper("li 'd0, 1", vec![t(1)], vec![]),
                Instr::oper("li 'd0, 2", vec![t(2)], vec![]),
                Instr::oper("def 'd0", vec![R0], vec![]),
                Instr::oper("use 's0, 's1, 's2", vec![], vec![t(1), t(2), R0]),
            ],
            &[R0],
        );

        assert_eq!(Some(&R0), coloring.colors.get(&R0));
        assert!(coloring.spilled.iter().all(|temp| !temp.is_register()));
        assert_eq!(vec![t(1), t(2)], coloring.spilled);
    }

    #[test]
    fn unspillable_temps_are_chosen_last() {
        let instrs = [
            Instr::oper("li 'd0, 1", vec![t(1)], vec![]),
            Instr::oper("li 'd0, 2", vec![t(2)], vec![]),
            Instr::oper("use 's0, 's1", vec![], vec![t(1), t(2)]),
        ];
        let flow = FlowGraph::build(&instrs).unwrap();
        let liveness = Liveness::compute(&instrs, &flow);
        let graph = InterferenceGraph::build(&instrs, &liveness, &[R0]);

        let unspillable: BTreeSet<Temp> = [t(1)].into_iter().collect();
        let coloring = color(graph, &[R0], &unspillable);

        assert_eq!(vec![t(2)], coloring.spilled);
    }
}
