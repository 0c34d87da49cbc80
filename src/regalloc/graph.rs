use std::{
    collections::{BTreeSet, HashMap},
    fmt::{self, Display, Formatter},
};

use crate::{assem::Instr, temp::Temp};

use super::liveness::Liveness;

pub type NodeId = usize;
pub type MoveId = usize;

#[derive(Debug, Clone)]
pub struct Node {
    pub temp: Temp,
    pub precolored: bool,
    /// Number of neighbours. Not tracked for precolored nodes.
    pub degree: usize,
    /// Neighbours. Not tracked for precolored nodes, whose neighbourhood is unbounded.
    pub adj_list: BTreeSet<NodeId>,
    pub move_list: Vec<MoveId>,
    /// Number of times the temporary is read or written.
    pub occurrences: usize,
}

/// A register-to-register copy that coalescing may remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub src: NodeId,
    pub dst: NodeId,
}

/// Symmetric adjacency matrix, one bit per ordered pair of nodes.
#[derive(Debug, Clone)]
struct AdjacencySet {
    size: usize,
    bits: Vec<u64>,
}

impl AdjacencySet {
    fn new(size: usize) -> Self {
        Self {
            size,
            bits: vec![0; (size * size + 63) / 64],
        }
    }

    fn bit(&self, u: NodeId, v: NodeId) -> (usize, u64) {
        let index = u * self.size + v;
        (index / 64, 1 << (index % 64))
    }

    fn insert(&mut self, u: NodeId, v: NodeId) {
        let (word, mask) = self.bit(u, v);
        self.bits[word] |= mask;
    }

    fn contains(&self, u: NodeId, v: NodeId) -> bool {
        let (word, mask) = self.bit(u, v);
        self.bits[word] & mask != 0
    }
}

#[derive(Debug, Clone)]
pub struct InterferenceGraph {
    pub nodes: Vec<Node>,
    pub moves: Vec<Move>,
    index: HashMap<Temp, NodeId>,
    adj_set: AdjacencySet,
}

impl InterferenceGraph {
    /// Build the graph for an instruction list from its liveness.
    ///
    /// Every temporary that appears in an instruction becomes a node, machine
    /// registers as precolored nodes. Registers outside `palette`, such as the
    /// stack pointer, are never handed out, so they get neither interference
    /// edges nor move edges.
    pub fn build(instrs: &[Instr], liveness: &Liveness, palette: &[Temp]) -> Self {
        let mut occurrences: HashMap<Temp, usize> = HashMap::new();
        for instr in instrs {
            for &temp in instr.defs().iter().chain(instr.uses()) {
                *occurrences.entry(temp).or_default() += 1;
            }
        }
        let temps: BTreeSet<Temp> = occurrences.keys().copied().collect();

        let nodes: Vec<Node> = temps
            .iter()
            .map(|&temp| Node {
                temp,
                precolored: temp.is_register(),
                degree: 0,
                adj_list: BTreeSet::new(),
                move_list: vec![],
                occurrences: occurrences[&temp],
            })
            .collect();
        let index = temps.iter().enumerate().map(|(id, &temp)| (temp, id)).collect();

        let mut graph = Self {
            adj_set: AdjacencySet::new(nodes.len()),
            nodes,
            moves: vec![],
            index,
        };

        let allocatable = |temp: &Temp| !temp.is_register() || palette.contains(temp);

        for (node, instr) in instrs.iter().enumerate() {
            let live_out = liveness.live_out(node);
            match instr.as_move() {
                Some((dst, src)) if dst == src => {}
                Some((dst, _)) if !allocatable(&dst) => {}
                Some((dst, src)) => {
                    for live in live_out {
                        if *live != src && allocatable(live) {
                            graph.add_edge(graph.index[&dst], graph.index[live]);
                        }
                    }
                    if allocatable(&src) {
                        graph.add_move(graph.index[&src], graph.index[&dst]);
                    }
                }
                None => {
                    for def in instr.defs().iter().filter(|&def| allocatable(def)) {
                        for live in live_out.iter().chain(instr.defs()) {
                            if allocatable(live) {
                                graph.add_edge(graph.index[def], graph.index[live]);
                            }
                        }
                    }
                }
            }
        }

        graph
    }

    pub fn node(&self, temp: Temp) -> Option<NodeId> {
        self.index.get(&temp).copied()
    }

    /// Whether two nodes interfere. Distinct machine registers always do.
    pub fn adjacent(&self, u: NodeId, v: NodeId) -> bool {
        if u != v && self.nodes[u].precolored && self.nodes[v].precolored {
            return self.nodes[u].temp != self.nodes[v].temp;
        }
        self.adj_set.contains(u, v)
    }

    pub fn add_edge(&mut self, u: NodeId, v: NodeId) {
        if u == v || self.adjacent(u, v) {
            return;
        }
        self.adj_set.insert(u, v);
        self.adj_set.insert(v, u);
        for (a, b) in [(u, v), (v, u)] {
            let node = &mut self.nodes[a];
            if !node.precolored {
                node.adj_list.insert(b);
                node.degree += 1;
            }
        }
    }

    fn add_move(&mut self, src: NodeId, dst: NodeId) {
        let id = self.moves.len();
        self.moves.push(Move { src, dst });
        self.nodes[src].move_list.push(id);
        self.nodes[dst].move_list.push(id);
    }
}

impl Display for InterferenceGraph {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for node in self.nodes.iter().filter(|node| !node.precolored) {
            write!(f, "{:>8} [{}]:", node.temp.to_string(), node.degree)?;
            for &neighbour in &node.adj_list {
                write!(f, " {}", self.nodes[neighbour].temp)?;
            }
            writeln!(f)?;
        }
        for m in &self.moves {
            writeln!(
                f,
                "{:>8} <- {}",
                self.nodes[m.dst].temp.to_string(),
                self.nodes[m.src].temp
            )?;
        }
        Ok(())
    }
}
