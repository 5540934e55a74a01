//! Core graph data structure.
//!
//! `TopologyGraph` wraps a petgraph `StableDiGraph` and adds a natural-key
//! index so importers can upsert by switch name, vrfcidr or VLAN name.
//! Stable indices let algorithms delete and recreate edges (bridge
//! reversal, reseeding) without invalidating node handles.

use crate::edge::{Edge, EdgeKind};
use chrono::{Duration, Utc};
use netweave_core::{Network, NodeKind, Switch, TopologyNode, Vlan, Vrf};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Unique identifier for a node in the graph.
pub type NodeId = NodeIndex;

/// Unique identifier for an edge in the graph.
pub type EdgeId = EdgeIndex;

/// Which edges of a node to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    Outgoing,
    Incoming,
    Both,
}

impl EdgeDirection {
    fn directions(self) -> &'static [Direction] {
        match self {
            EdgeDirection::Outgoing => &[Direction::Outgoing],
            EdgeDirection::Incoming => &[Direction::Incoming],
            EdgeDirection::Both => &[Direction::Outgoing, Direction::Incoming],
        }
    }
}

/// One adjacency as seen from a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjacent {
    /// The node on the other end.
    pub node: NodeId,
    pub edge: EdgeId,
    /// True when the edge points away from the node it was read from.
    pub outgoing: bool,
}

/// The network topology graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyGraph {
    /// The underlying petgraph graph.
    pub(crate) graph: StableDiGraph<TopologyNode, Edge>,

    /// Maps (kind, natural key) to graph node indexes. Rebuilt after load.
    #[serde(skip)]
    key_index: HashMap<(NodeKind, String), NodeId>,
}

impl TopologyGraph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the natural-key index from node weights.
    pub fn rebuild_index(&mut self) {
        self.key_index = self
            .graph
            .node_indices()
            .filter_map(|idx| {
                let node = self.graph.node_weight(idx)?;
                Some(((node.kind(), node.key()), idx))
            })
            .collect();
    }

    /// Inserts a node, or replaces the weight of the node with the same key.
    ///
    /// Returns the index and whether the node was newly created.
    pub fn upsert_node(&mut self, node: TopologyNode) -> (NodeId, bool) {
        let key = (node.kind(), node.key());
        if let Some(&idx) = self.key_index.get(&key) {
            if let Some(weight) = self.graph.node_weight_mut(idx) {
                *weight = node;
            }
            return (idx, false);
        }

        let idx = self.graph.add_node(node);
        self.key_index.insert(key, idx);
        (idx, true)
    }

    /// Gets the node index for a natural key.
    pub fn get_index(&self, kind: NodeKind, key: &str) -> Option<NodeId> {
        self.key_index.get(&(kind, key.to_string())).copied()
    }

    /// Gets a node by kind and natural key.
    pub fn get_node(&self, kind: NodeKind, key: &str) -> Option<&TopologyNode> {
        self.node(self.get_index(kind, key)?)
    }

    /// Gets a node by its graph index.
    pub fn node(&self, index: NodeId) -> Option<&TopologyNode> {
        self.graph.node_weight(index)
    }

    pub fn node_mut(&mut self, index: NodeId) -> Option<&mut TopologyNode> {
        self.graph.node_weight_mut(index)
    }

    /// Natural key of the node at `index`.
    pub fn key_of(&self, index: NodeId) -> Option<String> {
        self.node(index).map(TopologyNode::key)
    }

    pub fn switch(&self, name: &str) -> Option<&Switch> {
        self.get_node(NodeKind::Switch, name)?.as_switch()
    }

    pub fn switch_mut(&mut self, name: &str) -> Option<&mut Switch> {
        let idx = self.get_index(NodeKind::Switch, name)?;
        self.node_mut(idx)?.as_switch_mut()
    }

    pub fn network(&self, vrfcidr: &str) -> Option<&Network> {
        self.get_node(NodeKind::Network, vrfcidr)?.as_network()
    }

    pub fn vrf(&self, name: &str) -> Option<&Vrf> {
        self.get_node(NodeKind::Vrf, name)?.as_vrf()
    }

    pub fn vlan(&self, name: &str) -> Option<&Vlan> {
        self.get_node(NodeKind::Vlan, name)?.as_vlan()
    }

    pub fn vlan_mut(&mut self, name: &str) -> Option<&mut Vlan> {
        let idx = self.get_index(NodeKind::Vlan, name)?;
        self.node_mut(idx)?.as_vlan_mut()
    }

    /// All nodes of a kind, ordered by natural key.
    pub fn nodes_of(&self, kind: NodeKind) -> Vec<NodeId> {
        let mut nodes: Vec<(String, NodeId)> = self
            .key_index
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|((_, key), idx)| (key.clone(), *idx))
            .collect();
        nodes.sort();
        nodes.into_iter().map(|(_, idx)| idx).collect()
    }

    /// Iterates over all switches in index order.
    pub fn switches(&self) -> impl Iterator<Item = &Switch> {
        self.graph.node_weights().filter_map(TopologyNode::as_switch)
    }

    /// Iterates over all networks in index order.
    pub fn networks(&self) -> impl Iterator<Item = (NodeId, &Network)> {
        self.graph
            .node_indices()
            .filter_map(move |idx| Some((idx, self.graph.node_weight(idx)?.as_network()?)))
    }

    /// Adds an edge between two nodes.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, edge: Edge) -> EdgeId {
        self.graph.add_edge(from, to, edge)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.graph.edge_weight(id)
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.graph.edge_weight_mut(id)
    }

    /// Source and target of an edge.
    pub fn endpoints(&self, id: EdgeId) -> Option<(NodeId, NodeId)> {
        self.graph.edge_endpoints(id)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        self.graph.remove_edge(id)
    }

    /// Every edge of the given kinds, in index order.
    pub fn edges_of(&self, kinds: &[EdgeKind]) -> Vec<EdgeId> {
        self.graph
            .edge_indices()
            .filter(|&id| {
                self.graph
                    .edge_weight(id)
                    .map_or(false, |e| kinds.contains(&e.kind))
            })
            .collect()
    }

    /// Deletes every edge of the given kinds. Returns how many were removed.
    pub fn remove_edges_of(&mut self, kinds: &[EdgeKind]) -> usize {
        let doomed = self.edges_of(kinds);
        for id in &doomed {
            self.graph.remove_edge(*id);
        }
        doomed.len()
    }

    /// Deletes every edge not seen within `max_age`. Returns how many were removed.
    pub fn prune_edges_older_than(&mut self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let expired: Vec<EdgeId> = self
            .graph
            .edge_indices()
            .filter(|&id| {
                self.graph
                    .edge_weight(id)
                    .map_or(false, |e| e.last_seen < cutoff)
            })
            .collect();

        for &id in &expired {
            let (from, to) = match self.endpoints(id) {
                Some((f, t)) => (self.key_of(f).unwrap_or_default(), self.key_of(t).unwrap_or_default()),
                None => continue,
            };
            if let Some(edge) = self.graph.remove_edge(id) {
                info!("Expired Edge: {} {} -> {}", edge.kind, from, to);
            }
        }
        self.rebuild_index();
        expired.len()
    }

    /// Deletes every node not seen within `max_age` along with its edges.
    /// Returns how many nodes were removed.
    pub fn prune_nodes_older_than(&mut self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let expired: Vec<NodeId> = self
            .graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .node_weight(idx)
                    .map_or(false, |n| n.last_seen() < cutoff)
            })
            .collect();

        for &idx in &expired {
            if let Some(node) = self.graph.remove_node(idx) {
                info!("Expired Node: {} {}", node.kind(), node.key());
            }
        }
        self.rebuild_index();
        expired.len()
    }

    /// First directed edge `from -> to` of `kind` accepted by `matches`.
    pub fn find_edge<F>(&self, from: NodeId, to: NodeId, kind: EdgeKind, matches: F) -> Option<EdgeId>
    where
        F: Fn(&Edge) -> bool,
    {
        let mut found: Vec<EdgeId> = self
            .graph
            .edges_directed(from, Direction::Outgoing)
            .filter(|e| e.target() == to && e.weight().kind == kind && matches(e.weight()))
            .map(|e| e.id())
            .collect();
        found.sort();
        found.into_iter().next()
    }

    /// Inserts `edge` unless an edge `from -> to` of the same kind accepted by
    /// `same` already exists, in which case its payload and timestamp are replaced.
    ///
    /// Returns the edge id and whether it was newly created.
    pub fn upsert_edge<F>(&mut self, from: NodeId, to: NodeId, edge: Edge, same: F) -> (EdgeId, bool)
    where
        F: Fn(&Edge) -> bool,
    {
        match self.find_edge(from, to, edge.kind, same) {
            Some(id) => {
                if let Some(existing) = self.graph.edge_weight_mut(id) {
                    *existing = edge;
                }
                (id, false)
            }
            None => (self.graph.add_edge(from, to, edge), true),
        }
    }

    /// Adjacent nodes through edges of the given kinds, ordered by the
    /// neighbor's natural key and then by edge index.
    pub fn neighbors(&self, node: NodeId, kinds: &[EdgeKind], direction: EdgeDirection) -> Vec<Adjacent> {
        let mut found: Vec<(String, Adjacent)> = Vec::new();

        for &dir in direction.directions() {
            for e in self.graph.edges_directed(node, dir) {
                if !kinds.contains(&e.weight().kind) {
                    continue;
                }
                let (other, outgoing) = match dir {
                    Direction::Outgoing => (e.target(), true),
                    Direction::Incoming => (e.source(), false),
                };
                // A self-loop shows up in both directions; keep one copy
                if other == node && !outgoing {
                    continue;
                }
                let key = self.key_of(other).unwrap_or_default();
                found.push((
                    key,
                    Adjacent {
                        node: other,
                        edge: e.id(),
                        outgoing,
                    },
                ));
            }
        }

        found.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.edge.cmp(&b.1.edge)));
        found.into_iter().map(|(_, adj)| adj).collect()
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns graph statistics.
    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            edges: self.edge_count(),
            ..Default::default()
        };
        for node in self.graph.node_weights() {
            match node.kind() {
                NodeKind::Switch => stats.switches += 1,
                NodeKind::Network => stats.networks += 1,
                NodeKind::Vrf => stats.vrfs += 1,
                NodeKind::Vlan => stats.vlans += 1,
                NodeKind::Supernet => stats.supernets += 1,
            }
        }
        stats
    }
}

/// Node and edge counts by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub switches: usize,
    pub networks: usize,
    pub vrfs: usize,
    pub vlans: usize,
    pub supernets: usize,
    pub edges: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{EdgeDetail, LinkInfo};

    fn switch(graph: &mut TopologyGraph, name: &str, distance: u32) -> NodeId {
        graph
            .upsert_node(TopologyNode::Switch(Switch::new(name, distance)))
            .0
    }

    fn nei(parent: &str, pport: &str, child: &str, cport: &str) -> Edge {
        Edge::with_detail(
            EdgeKind::Nei,
            EdgeDetail::Link(LinkInfo::new(parent, pport, child, cport)),
        )
    }

    #[test]
    fn test_upsert_node_keeps_index() {
        let mut graph = TopologyGraph::new();
        let (a, created) = graph.upsert_node(TopologyNode::Switch(Switch::new("a", 1000)));
        assert!(created);
        let (again, created) = graph.upsert_node(TopologyNode::Switch(Switch::new("a", 3)));
        assert!(!created);
        assert_eq!(a, again);
        assert_eq!(graph.switch("a").unwrap().distance, 3);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_neighbors_by_direction() {
        let mut graph = TopologyGraph::new();
        let a = switch(&mut graph, "a", 0);
        let b = switch(&mut graph, "b", 1);
        let c = switch(&mut graph, "c", 1);
        graph.add_edge(a, c, nei("a", "p2", "c", "p1"));
        graph.add_edge(a, b, nei("a", "p1", "b", "p1"));

        let out = graph.neighbors(a, &EdgeKind::NEIGHBOR, EdgeDirection::Outgoing);
        let names: Vec<String> = out.iter().filter_map(|n| graph.key_of(n.node)).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert!(out.iter().all(|n| n.outgoing));

        assert!(graph
            .neighbors(a, &EdgeKind::NEIGHBOR, EdgeDirection::Incoming)
            .is_empty());
        let back = graph.neighbors(b, &EdgeKind::NEIGHBOR, EdgeDirection::Both);
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].node, a);
        assert!(!back[0].outgoing);
    }

    #[test]
    fn test_upsert_edge_and_removal() {
        let mut graph = TopologyGraph::new();
        let a = switch(&mut graph, "a", 0);
        let b = switch(&mut graph, "b", 1);

        let same_ports = |e: &Edge| e.link().map_or(false, |l| l.parent_port == "p1");
        let (first, created) = graph.upsert_edge(a, b, nei("a", "p1", "b", "p2"), same_ports);
        assert!(created);
        let (second, created) = graph.upsert_edge(a, b, nei("a", "p1", "b", "p2"), same_ports);
        assert!(!created);
        assert_eq!(first, second);

        graph.add_edge(a, b, Edge::new(EdgeKind::Switched));
        assert_eq!(graph.remove_edges_of(&EdgeKind::NEIGHBOR), 1);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.stats().switches, 2);
    }

    #[test]
    fn test_rebuild_index() {
        let mut graph = TopologyGraph::new();
        switch(&mut graph, "a", 0);
        let mut copy = graph.clone();
        copy.key_index.clear();
        assert!(copy.switch("a").is_none());
        copy.rebuild_index();
        assert!(copy.switch("a").is_some());
    }

    #[test]
    fn test_prune_stale_edges() {
        let mut graph = TopologyGraph::new();
        let a = switch(&mut graph, "a", 0);
        let b = switch(&mut graph, "b", 1);
        let c = switch(&mut graph, "c", 1);
        let stale = graph.add_edge(a, b, nei("a", "p1", "b", "p1"));
        graph.add_edge(a, c, nei("a", "p2", "c", "p1"));
        graph.edge_mut(stale).unwrap().last_seen = Utc::now() - Duration::hours(48);

        assert_eq!(graph.prune_edges_older_than(Duration::hours(24)), 1);
        assert!(graph.edge(stale).is_none());
        assert_eq!(graph.edge_count(), 1);
        let left = graph.neighbors(a, &EdgeKind::NEIGHBOR, EdgeDirection::Outgoing);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].node, c);

        // fresh edges survive a second sweep
        assert_eq!(graph.prune_edges_older_than(Duration::hours(24)), 0);
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_prune_stale_switch() {
        let mut graph = TopologyGraph::new();
        let a = switch(&mut graph, "a", 0);
        let b = switch(&mut graph, "b", 1);
        let c = switch(&mut graph, "c", 2);
        graph.add_edge(a, b, nei("a", "p1", "b", "p1"));
        graph.add_edge(b, c, nei("b", "p2", "c", "p1"));
        graph.switch_mut("b").unwrap().last_seen = Utc::now() - Duration::hours(72);

        assert_eq!(graph.prune_nodes_older_than(Duration::hours(24)), 1);
        assert!(graph.switch("b").is_none());
        assert!(graph.get_index(NodeKind::Switch, "b").is_none());
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.nodes_of(NodeKind::Switch), vec![a, c]);
        assert_eq!(graph.stats().switches, 2);
    }
}
