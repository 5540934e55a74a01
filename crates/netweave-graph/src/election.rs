//! VLAN root election.
//!
//! A bridge domain is the set of VLANs joined by BRIDGE edges across
//! management groups. Election runs in two passes: each VLAN first picks
//! the lowest-priority switch inside its own group, then the VLAN holding
//! the lowest priority across the whole domain links to its switch with a
//! ROOT edge and turns every BRIDGE edge in the domain to point away from it.

use crate::edge::{BridgeInfo, Edge, EdgeDetail, EdgeKind};
use crate::graph::{EdgeDirection, EdgeId, NodeId, TopologyGraph};
use crate::search::PathQuery;
use chrono::Utc;
use netweave_core::{NodeKind, TopologyNode, DEFAULT_DEPTH};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, warn};

/// Counters from one election pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSummary {
    /// VLANs with a local root.
    pub local_roots: usize,
    /// VLANs linked to a global root.
    pub roots: usize,
    /// Domains where more than one VLAN held the lowest priority.
    pub ties: usize,
    /// BRIDGE edges turned around.
    pub reversed: usize,
}

impl TopologyGraph {
    /// Every VLAN reachable from `vlan` through BRIDGE edges in either
    /// direction, `vlan` included, ordered by name.
    pub fn bridge_domain(&self, vlan: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::from([vlan]);
        let mut queue = VecDeque::from([vlan]);

        while let Some(current) = queue.pop_front() {
            for adj in self.neighbors(current, &[EdgeKind::Bridge], EdgeDirection::Both) {
                if seen.insert(adj.node) {
                    queue.push_back(adj.node);
                }
            }
        }

        let mut members: Vec<(String, NodeId)> = seen
            .into_iter()
            .filter_map(|idx| Some((self.key_of(idx)?, idx)))
            .collect();
        members.sort();
        members.into_iter().map(|(_, idx)| idx).collect()
    }

    /// The switch a VLAN's ROOT edge points at, if any.
    pub fn root_of(&self, vlan: NodeId) -> Option<(NodeId, u32)> {
        let adj = self
            .neighbors(vlan, &[EdgeKind::Root], EdgeDirection::Outgoing)
            .into_iter()
            .next()?;
        let priority = match self.edge(adj.edge)?.detail {
            EdgeDetail::Root { priority } => priority,
            _ => 0,
        };
        Some((adj.node, priority))
    }

    fn switch_mgmt(&self, name: &str) -> Option<String> {
        self.switch(name)?.mgmt.clone()
    }
}

/// Bridge priority a switch reports when none is configured. A VLAN whose
/// best priority is this default has no local root.
pub const DEFAULT_BRIDGE_PRIORITY: u32 = 32768;

/// Runs local and bridged root election over every VLAN.
pub struct RootElection<'a> {
    graph: &'a mut TopologyGraph,
    /// Bound, in edges, on the walk from the root switch to each bridged VLAN.
    depth: usize,
}

impl<'a> RootElection<'a> {
    pub fn new(graph: &'a mut TopologyGraph) -> Self {
        Self {
            graph,
            depth: DEFAULT_DEPTH,
        }
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Runs both passes.
    pub fn run(&mut self) -> ElectionSummary {
        info!("Local Switch Domain Root Election");
        let local_roots = self.find_local_root();
        info!("Bridged Switch Domain Root Election");
        let mut summary = self.find_bridged_root();
        summary.local_roots = local_roots;
        summary
    }

    /// Records, per VLAN, the member switch with the lowest priority that is
    /// nonzero and below the default. Ties go to the first switch by name.
    /// Returns how many VLANs have one.
    pub fn find_local_root(&mut self) -> usize {
        let mut found = 0;

        for vlan in self.graph.nodes_of(NodeKind::Vlan) {
            let mut best: Option<(String, u32)> = None;
            for adj in self
                .graph
                .neighbors(vlan, &[EdgeKind::Switched], EdgeDirection::Outgoing)
            {
                let priority = self
                    .graph
                    .edge(adj.edge)
                    .and_then(Edge::switched)
                    .map_or(0, |s| s.priority);
                if priority == 0 || priority >= DEFAULT_BRIDGE_PRIORITY {
                    continue;
                }
                if best.as_ref().map_or(true, |(_, p)| priority < *p) {
                    if let Some(name) = self.graph.key_of(adj.node) {
                        best = Some((name, priority));
                    }
                }
            }

            if best.is_some() {
                found += 1;
            }
            if let Some(v) = self.graph.node_mut(vlan).and_then(TopologyNode::as_vlan_mut) {
                debug!("Local Root: {} {:?}", v.name(), best);
                v.local_root = best.as_ref().map(|(name, _)| name.clone());
                v.local_priority = best.map(|(_, p)| p);
            }
        }

        found
    }

    /// Links each domain's lowest-priority VLAN to its local root switch.
    ///
    /// When the lowest priority is held by more than one VLAN the ambiguity
    /// is logged and bridge orientation is left as it was.
    pub fn find_bridged_root(&mut self) -> ElectionSummary {
        let mut summary = ElectionSummary::default();

        for vlan in self.graph.nodes_of(NodeKind::Vlan) {
            let Some((vname, own, root_switch)) = self.local_root(vlan) else {
                self.drop_roots(vlan, None);
                continue;
            };

            let others = self
                .graph
                .bridge_domain(vlan)
                .into_iter()
                .filter(|&idx| idx != vlan)
                .filter_map(|idx| self.graph.node(idx)?.as_vlan()?.local_priority)
                .min();

            if others.map_or(false, |low| own > low) {
                self.drop_roots(vlan, None);
                continue;
            }

            let Some(switch_idx) = self.graph.get_index(NodeKind::Switch, &root_switch) else {
                continue;
            };
            self.link_root(vlan, switch_idx, &vname, &root_switch, own);
            summary.roots += 1;

            if others.map_or(true, |low| own < low) {
                summary.reversed += self.correct_bridge_direction(vlan, &root_switch);
            } else {
                warn!(
                    "Duplicate Root Found across another domain: {} rs:{}",
                    vname, root_switch
                );
                summary.ties += 1;
            }
        }

        summary
    }

    fn local_root(&self, vlan: NodeId) -> Option<(String, u32, String)> {
        let v = self.graph.node(vlan)?.as_vlan()?;
        Some((v.name(), v.local_priority?, v.local_root.clone()?))
    }

    /// Removes ROOT edges from `vlan`, except the one to `keep`.
    fn drop_roots(&mut self, vlan: NodeId, keep: Option<NodeId>) {
        let stale: Vec<EdgeId> = self
            .graph
            .neighbors(vlan, &[EdgeKind::Root], EdgeDirection::Outgoing)
            .into_iter()
            .filter(|adj| Some(adj.node) != keep)
            .map(|adj| adj.edge)
            .collect();
        for id in stale {
            debug!("Removing stale ROOT edge from {:?}", self.graph.key_of(vlan));
            self.graph.remove_edge(id);
        }
    }

    fn link_root(&mut self, vlan: NodeId, switch: NodeId, vname: &str, root_switch: &str, priority: u32) {
        self.drop_roots(vlan, Some(switch));
        let edge = Edge::with_detail(EdgeKind::Root, EdgeDetail::Root { priority });
        let (_, created) = self.graph.upsert_edge(vlan, switch, edge, |_| true);
        if created {
            info!("New: Root for VLAN ({})-[:ROOT]->({})", vname, root_switch);
        } else {
            debug!("Updating Root for VLAN ({})-[:ROOT]->({})", vname, root_switch);
        }
    }

    /// Turns every BRIDGE edge in `vlan`'s domain to point away from
    /// `root_switch`. Each VLAN is reversed into at most once per call.
    /// Returns how many edges were reversed.
    pub fn correct_bridge_direction(&mut self, vlan: NodeId, root_switch: &str) -> usize {
        let Some(root_idx) = self.graph.get_index(NodeKind::Switch, root_switch) else {
            return 0;
        };
        let Some(root_mgmt) = self.graph.switch_mgmt(root_switch) else {
            return 0;
        };

        let mut visited: HashSet<String> = HashSet::new();
        let mut reversed = 0;
        let kinds = [EdgeKind::Bridge, EdgeKind::Root];

        for remote in self.graph.bridge_domain(vlan) {
            if remote == vlan {
                continue;
            }

            let query = PathQuery::undirected(&kinds, self.depth);
            let Some(path) = self
                .graph
                .shortest_paths(&[root_idx], &[remote], &query)
                .into_iter()
                .next()
            else {
                continue;
            };

            let mut domain = root_mgmt.clone();
            for (i, &edge_id) in path.edges.iter().enumerate() {
                let far = path.nodes[i + 1];
                let far_vlan = self
                    .graph
                    .node(far)
                    .and_then(TopologyNode::as_vlan)
                    .map(|v| (v.name(), v.mgmt.clone()));

                let Some(bridge) = self.graph.edge(edge_id).and_then(Edge::bridge).cloned() else {
                    continue;
                };
                let Some((far_name, far_mgmt)) = far_vlan else {
                    continue;
                };

                let parent_mgmt = self.graph.switch_mgmt(&bridge.parent_switch);
                if parent_mgmt.as_deref() != Some(domain.as_str()) && visited.insert(far_name) {
                    if self.reverse_bridge(edge_id) {
                        reversed += 1;
                    }
                }
                domain = far_mgmt;
            }
        }

        reversed
    }

    /// Deletes a BRIDGE edge and recreates it with direction and switch roles
    /// swapped, keeping its timestamp.
    fn reverse_bridge(&mut self, id: EdgeId) -> bool {
        let Some((parent, child)) = self.graph.endpoints(id) else {
            return false;
        };
        let Some(old) = self.graph.remove_edge(id) else {
            return false;
        };
        let Some(info) = old.bridge().cloned() else {
            self.graph.add_edge(parent, child, old);
            return false;
        };

        info!(
            "Update: Reversing Bridge Direction: {} {}",
            info.parent_switch, info.child_switch
        );
        let flipped = Edge {
            kind: EdgeKind::Bridge,
            last_seen: old.last_seen,
            detail: EdgeDetail::Bridge(BridgeInfo {
                parent_switch: info.child_switch,
                child_switch: info.parent_switch,
            }),
        };
        self.graph.add_edge(child, parent, flipped);
        true
    }
}

/// Creates or refreshes the BRIDGE edge between two VLANs. An edge in either
/// direction counts as existing. Returns true when a new edge was created.
pub(crate) fn upsert_bridge(
    graph: &mut TopologyGraph,
    parent_vlan: NodeId,
    child_vlan: NodeId,
    parent_switch: &str,
    child_switch: &str,
) -> bool {
    let existing = graph
        .find_edge(parent_vlan, child_vlan, EdgeKind::Bridge, |_| true)
        .or_else(|| graph.find_edge(child_vlan, parent_vlan, EdgeKind::Bridge, |_| true));

    if let Some(id) = existing {
        if let Some(edge) = graph.edge_mut(id) {
            edge.last_seen = Utc::now();
        }
        return false;
    }

    let edge = Edge::with_detail(
        EdgeKind::Bridge,
        EdgeDetail::Bridge(BridgeInfo {
            parent_switch: parent_switch.to_string(),
            child_switch: child_switch.to_string(),
        }),
    );
    graph.add_edge(parent_vlan, child_vlan, edge);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{SwitchRecord, TopologyBuilder, VlanRecord};
    use netweave_core::EngineConfig;

    /// Two management groups sharing VLAN 100, bridged west -> east.
    fn two_domains(east_priority: u32, west_priority: u32) -> TopologyGraph {
        let config = EngineConfig::default();
        let mut graph = TopologyGraph::new();
        let mut builder = TopologyBuilder::new(&mut graph, &config);
        builder.upsert_switch(&SwitchRecord::new("e1", "east"));
        builder.upsert_switch(&SwitchRecord::new("e2", "east"));
        builder.upsert_switch(&SwitchRecord::new("w1", "west"));
        for (mgmt, switch, priority) in [
            ("east", "e1", east_priority),
            ("east", "e2", east_priority + 4096),
            ("west", "w1", west_priority),
        ] {
            builder
                .upsert_vlan_membership(&VlanRecord {
                    mgmt: mgmt.into(),
                    vid: 100,
                    switch: switch.into(),
                    priority,
                    ..Default::default()
                })
                .unwrap();
        }

        let east = graph.get_index(NodeKind::Vlan, "east-100").unwrap();
        let west = graph.get_index(NodeKind::Vlan, "west-100").unwrap();
        assert!(upsert_bridge(&mut graph, west, east, "w1", "e1"));
        graph
    }

    fn bridge_direction(graph: &TopologyGraph) -> (String, String) {
        let id = graph.edges_of(&[EdgeKind::Bridge])[0];
        let (from, to) = graph.endpoints(id).unwrap();
        (graph.key_of(from).unwrap(), graph.key_of(to).unwrap())
    }

    #[test]
    fn test_local_root_ignores_zero() {
        let mut graph = two_domains(0, 20);
        let found = RootElection::new(&mut graph).find_local_root();
        assert_eq!(found, 2);
        let east = graph.vlan("east-100").unwrap();
        assert_eq!(east.local_root.as_deref(), Some("e2"));
        assert_eq!(east.local_priority, Some(4096));
    }

    #[test]
    fn test_default_priority_is_not_a_root() {
        let mut graph = two_domains(10, DEFAULT_BRIDGE_PRIORITY);
        let found = RootElection::new(&mut graph).find_local_root();
        assert_eq!(found, 1);
        let west = graph.vlan("west-100").unwrap();
        assert!(west.local_root.is_none());
        assert!(west.local_priority.is_none());

        let mut graph = two_domains(10, DEFAULT_BRIDGE_PRIORITY - 1);
        assert_eq!(RootElection::new(&mut graph).find_local_root(), 2);
        assert_eq!(graph.vlan("west-100").unwrap().local_root.as_deref(), Some("w1"));
    }

    #[test]
    fn test_lower_priority_wins_and_bridge_turns() {
        let mut graph = two_domains(10, 20);
        let summary = RootElection::new(&mut graph).run();

        assert_eq!(summary.roots, 1);
        assert_eq!(summary.reversed, 1);
        assert_eq!(graph.edges_of(&[EdgeKind::Root]).len(), 1);

        let east = graph.get_index(NodeKind::Vlan, "east-100").unwrap();
        let (root, priority) = graph.root_of(east).unwrap();
        assert_eq!(graph.key_of(root).unwrap(), "e1");
        assert_eq!(priority, 10);

        assert_eq!(bridge_direction(&graph), ("east-100".into(), "west-100".into()));
        let id = graph.edges_of(&[EdgeKind::Bridge])[0];
        assert_eq!(graph.edge(id).unwrap().bridge().unwrap().parent_switch, "e1");
    }

    #[test]
    fn test_depth_bounds_bridge_correction() {
        // e1 -ROOT- east-100 -BRIDGE- west-100 is two edges away
        let mut graph = two_domains(10, 20);
        let summary = RootElection::new(&mut graph).with_depth(1).run();
        assert_eq!(summary.roots, 1);
        assert_eq!(summary.reversed, 0);
        assert_eq!(bridge_direction(&graph), ("west-100".into(), "east-100".into()));

        let summary = RootElection::new(&mut graph).with_depth(2).run();
        assert_eq!(summary.reversed, 1);
        assert_eq!(bridge_direction(&graph), ("east-100".into(), "west-100".into()));
    }

    #[test]
    fn test_rerun_is_stable() {
        let mut graph = two_domains(10, 20);
        RootElection::new(&mut graph).run();
        let second = RootElection::new(&mut graph).run();
        assert_eq!(second.reversed, 0);
        assert_eq!(graph.edges_of(&[EdgeKind::Root]).len(), 1);
        assert_eq!(graph.edges_of(&[EdgeKind::Bridge]).len(), 1);
    }

    #[test]
    fn test_tie_leaves_bridges_alone() {
        let mut graph = two_domains(10, 10);
        let summary = RootElection::new(&mut graph).run();

        assert_eq!(summary.ties, 2);
        assert_eq!(summary.reversed, 0);
        assert_eq!(bridge_direction(&graph), ("west-100".into(), "east-100".into()));
    }

    #[test]
    fn test_new_winner_replaces_old_root() {
        let mut graph = two_domains(10, 20);
        RootElection::new(&mut graph).run();

        let w1 = graph.get_index(NodeKind::Switch, "w1").unwrap();
        let west = graph.get_index(NodeKind::Vlan, "west-100").unwrap();
        let id = graph
            .find_edge(west, w1, EdgeKind::Switched, |_| true)
            .unwrap();
        if let EdgeDetail::Switched(info) = &mut graph.edge_mut(id).unwrap().detail {
            info.priority = 5;
        }

        RootElection::new(&mut graph).run();
        assert_eq!(graph.edges_of(&[EdgeKind::Root]).len(), 1);
        let (root, _) = graph.root_of(west).unwrap();
        assert_eq!(root, w1);
        assert_eq!(bridge_direction(&graph), ("west-100".into(), "east-100".into()));
    }
}
