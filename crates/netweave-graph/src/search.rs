//! Depth-bounded shortest-path search.
//!
//! Every path query in the engine reduces to one primitive: all shortest
//! paths between a set of start nodes and a set of end nodes, over a chosen
//! set of edge kinds, never deeper than a mandatory bound. The search runs a
//! level-by-level BFS from each start, keeps every equal-length predecessor,
//! and enumerates the resulting shortest-path DAG for each reached end.

use crate::edge::{Edge, EdgeKind};
use crate::graph::{EdgeDirection, EdgeId, NodeId, TopologyGraph};
use std::collections::{HashMap, HashSet};

/// Parameters for a shortest-path search.
pub struct PathQuery<'a> {
    pub kinds: &'a [EdgeKind],
    pub direction: EdgeDirection,
    /// Maximum number of edges in a returned path.
    pub max_depth: usize,
    /// Only edges accepted by this filter are traversed.
    pub filter: Option<&'a dyn Fn(&Edge) -> bool>,
}

impl<'a> PathQuery<'a> {
    /// Undirected search over `kinds`, bounded by `max_depth` edges.
    pub fn undirected(kinds: &'a [EdgeKind], max_depth: usize) -> Self {
        Self {
            kinds,
            direction: EdgeDirection::Both,
            max_depth,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: &'a dyn Fn(&Edge) -> bool) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// One shortest path: `nodes.len() == edges.len() + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRecord {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
}

impl PathRecord {
    /// Number of edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn start(&self) -> NodeId {
        self.nodes[0]
    }

    pub fn end(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }

    /// Position of `node` along the path.
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.nodes.iter().position(|&n| n == node)
    }
}

type Predecessors = HashMap<NodeId, Vec<(NodeId, EdgeId)>>;

impl TopologyGraph {
    /// Finds every shortest path from each node in `from` to each node in `to`.
    ///
    /// Paths are returned grouped by start node (in the order given), then
    /// by end node, then in a stable predecessor order. A start that is also
    /// an end yields a zero-length path.
    pub fn shortest_paths(&self, from: &[NodeId], to: &[NodeId], query: &PathQuery<'_>) -> Vec<PathRecord> {
        let mut paths = Vec::new();
        let targets: HashSet<NodeId> = to.iter().copied().collect();

        for &start in from {
            if self.node(start).is_none() {
                continue;
            }
            let (dist, preds) = self.bounded_bfs(start, &targets, query);

            let mut seen_targets = HashSet::new();
            for &end in to {
                if !seen_targets.insert(end) || !dist.contains_key(&end) {
                    continue;
                }
                let mut tail = vec![end];
                let mut tail_edges = Vec::new();
                enumerate(start, end, &preds, &mut tail, &mut tail_edges, &mut paths);
            }
        }

        paths
    }

    fn bounded_bfs(
        &self,
        start: NodeId,
        targets: &HashSet<NodeId>,
        query: &PathQuery<'_>,
    ) -> (HashMap<NodeId, usize>, Predecessors) {
        let mut dist: HashMap<NodeId, usize> = HashMap::new();
        let mut preds: Predecessors = HashMap::new();
        let mut frontier = vec![start];
        let mut remaining: HashSet<NodeId> = targets.iter().copied().collect();

        dist.insert(start, 0);
        remaining.remove(&start);

        let mut depth = 0;
        while !frontier.is_empty() && depth < query.max_depth && !remaining.is_empty() {
            let mut next = Vec::new();

            for &current in &frontier {
                for adj in self.neighbors(current, query.kinds, query.direction) {
                    let accepted = match (query.filter, self.edge(adj.edge)) {
                        (_, None) => false,
                        (Some(filter), Some(edge)) => filter(edge),
                        (None, Some(_)) => true,
                    };
                    if !accepted {
                        continue;
                    }

                    match dist.get(&adj.node) {
                        None => {
                            dist.insert(adj.node, depth + 1);
                            preds.insert(adj.node, vec![(current, adj.edge)]);
                            next.push(adj.node);
                        }
                        Some(&d) if d == depth + 1 => {
                            if let Some(list) = preds.get_mut(&adj.node) {
                                list.push((current, adj.edge));
                            }
                        }
                        Some(_) => {}
                    }
                }
            }

            for node in &next {
                remaining.remove(node);
            }
            frontier = next;
            depth += 1;
        }

        (dist, preds)
    }
}

/// Walks the predecessor DAG back from the head of `tail` to `start`.
fn enumerate(
    start: NodeId,
    current: NodeId,
    preds: &Predecessors,
    tail: &mut Vec<NodeId>,
    tail_edges: &mut Vec<EdgeId>,
    out: &mut Vec<PathRecord>,
) {
    if current == start {
        let mut nodes = tail.clone();
        let mut edges = tail_edges.clone();
        nodes.reverse();
        edges.reverse();
        out.push(PathRecord { nodes, edges });
        return;
    }

    let Some(list) = preds.get(&current) else {
        return;
    };
    for &(prev, edge) in list {
        tail.push(prev);
        tail_edges.push(edge);
        enumerate(start, prev, preds, tail, tail_edges, out);
        tail.pop();
        tail_edges.pop();
    }
}
