use std::collections::{HashMap, VecDeque};

use petgraph::Direction;
use petgraph::stable_graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::Serialize;

use crate::graph::CodeGraph;
use crate::graph::edge::EdgeKind;
use crate::graph::node::{GraphNode, NodeKind};

/// A node reached from the seed set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Neighbor {
    pub key: String,
    pub kind: NodeKind,
    /// Hops from the nearest seed; seeds have depth 0.
    pub depth: usize,
}

/// Breadth-first expansion from `seeds` along edges in both directions, up to `depth` hops.
///
/// An edge is followed only if `predicate(edge kind, node on the far side)` holds. Unknown seed
/// keys are ignored. Results are in discovery order, seeds first.
pub fn neighborhood<F>(graph: &CodeGraph, seeds: &[&str], depth: usize, predicate: F) -> Vec<Neighbor>
where
    F: Fn(&EdgeKind, &GraphNode) -> bool,
{
    let mut queue: VecDeque<NodeIndex> = VecDeque::new();
    let mut depths: HashMap<NodeIndex, usize> = HashMap::new();
    let mut order: Vec<NodeIndex> = Vec::new();

    for seed in seeds {
        if let Some(idx) = graph.index_of(seed)
            && !depths.contains_key(&idx)
        {
            depths.insert(idx, 0);
            order.push(idx);
            queue.push_back(idx);
        }
    }

    while let Some(current) = queue.pop_front() {
        let current_depth = depths[&current];
        if current_depth >= depth {
            continue;
        }
        for direction in [Direction::Outgoing, Direction::Incoming] {
            for edge in graph.edges_in_order(current, direction) {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                if depths.contains_key(&other) || !predicate(edge.weight(), &graph.graph[other]) {
                    continue;
                }
                depths.insert(other, current_depth + 1);
                order.push(other);
                queue.push_back(other);
            }
        }
    }

    order
        .into_iter()
        .map(|idx| {
            let node = &graph.graph[idx];
            Neighbor {
                key: node.key(),
                kind: node.kind(),
                depth: depths[&idx],
            }
        })
        .collect()
}

/// Predicate accepting edges whose tag is one of `kinds`; an empty list accepts every edge.
pub fn edge_filter(kinds: &[EdgeKind]) -> impl Fn(&EdgeKind, &GraphNode) -> bool + '_ {
    move |edge, _| kinds.is_empty() || kinds.iter().any(|k| k.same_kind(edge))
}
