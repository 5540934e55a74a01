//! VLAN topology batch.
//!
//! After VLAN and trunk data is imported this batch derives everything the
//! VLAN queries rely on: elected descriptions, the VLAN sets that actually
//! cross each trunk, BRIDGE edges between management groups and finally the
//! root election.

use crate::edge::{Edge, EdgeKind};
use crate::election::{upsert_bridge, ElectionSummary, RootElection};
use crate::graph::{EdgeDirection, NodeId, TopologyGraph};
use netweave_core::{
    compact_range, intersect_ranges, traversing_vlans, vlan_name, EngineConfig, NodeKind,
    TopologyNode, VlanSet, DEFAULT_DEPTH,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Description switches report for VLANs without a name.
const NONAME: &str = "NONAME";

/// Description used when no switch names a VLAN.
const UNKNOWN_DESCRIPTION: &str = "Unknown";

/// One trunk port as configured on one switch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrunkRecord {
    pub switch: String,
    pub port: String,
    /// Allowed VLANs, e.g. `1-10,20`.
    pub vlans: String,
    pub native: Option<u16>,
    pub channel: Option<String>,
    pub description: Option<String>,
}

/// Counters from one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanTopologySummary {
    pub descriptions: usize,
    pub bridges: usize,
    pub election: ElectionSummary,
}

/// Derives VLAN descriptions, trunk VLAN sets, bridges and roots.
pub struct VlanTopology<'a> {
    graph: &'a mut TopologyGraph,
    depth: usize,
}

impl<'a> VlanTopology<'a> {
    pub fn new(graph: &'a mut TopologyGraph) -> Self {
        Self {
            graph,
            depth: DEFAULT_DEPTH,
        }
    }

    /// Uses the configured traversal depth for bridge correction.
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.depth = config.default_depth;
        self
    }

    /// Descriptions, then bridge domains, then root election.
    pub fn update_all(&mut self) -> VlanTopologySummary {
        info!("Updating VLAN Topology (Descriptions, Bridges, and Roots)");
        let descriptions = self.update_descriptions();
        let bridges = self.update_bridge_domains();
        let election = RootElection::new(self.graph).with_depth(self.depth).run();
        VlanTopologySummary {
            descriptions,
            bridges,
            election,
        }
    }

    /// Sets each VLAN's description to the one most of its switches report.
    ///
    /// `NONAME` is ignored, ties go to the alphabetically first description,
    /// and VLANs nobody names become `Unknown`. Returns how many changed.
    pub fn update_descriptions(&mut self) -> usize {
        let mut changed = 0;

        for vlan in self.graph.nodes_of(NodeKind::Vlan) {
            let mut votes: BTreeMap<String, usize> = BTreeMap::new();
            for adj in self
                .graph
                .neighbors(vlan, &[EdgeKind::Switched], EdgeDirection::Outgoing)
            {
                let desc = self
                    .graph
                    .edge(adj.edge)
                    .and_then(Edge::switched)
                    .and_then(|s| s.description.clone());
                match desc {
                    Some(d) if d != NONAME && !d.is_empty() => *votes.entry(d).or_default() += 1,
                    _ => {}
                }
            }

            let mut winner: Option<(&String, usize)> = None;
            for (desc, &count) in &votes {
                if winner.map_or(true, |(_, best)| count > best) {
                    winner = Some((desc, count));
                }
            }
            let top = winner.map_or_else(|| UNKNOWN_DESCRIPTION.to_string(), |(d, _)| d.clone());

            if let Some(v) = self.graph.node_mut(vlan).and_then(TopologyNode::as_vlan_mut) {
                if v.description != top {
                    debug!("Updating top description for VLAN:{} Desc:{}", v.name(), top);
                    v.description = top;
                    changed += 1;
                }
            }
        }

        changed
    }

    /// VLAN ids present on each switch.
    fn local_vlans(&self) -> HashMap<String, VlanSet> {
        let mut cache: HashMap<String, VlanSet> = HashMap::new();
        for id in self.graph.edges_of(&[EdgeKind::Switched]) {
            let Some((vlan, switch)) = self.graph.endpoints(id) else {
                continue;
            };
            let vid = self.graph.node(vlan).and_then(TopologyNode::as_vlan).map(|v| v.vid);
            let name = self.graph.key_of(switch);
            if let (Some(vid), Some(name)) = (vid, name) {
                cache.entry(name).or_default().insert(vid);
            }
        }
        cache
    }

    /// Annotates every neighbor link whose two ends both appear in `trunks`
    /// with its allowed and traversing VLAN sets. Returns how many links
    /// were updated.
    pub fn update_link_vlans(&mut self, trunks: &[TrunkRecord]) -> usize {
        info!("Updating trunk VLANs from {} trunk records", trunks.len());
        let ports: HashMap<(&str, &str), &TrunkRecord> = trunks
            .iter()
            .map(|t| ((t.switch.as_str(), t.port.as_str()), t))
            .collect();
        let local = self.local_vlans();
        let empty = VlanSet::new();
        let mut updated = 0;

        for id in self.graph.edges_of(&EdgeKind::NEIGHBOR) {
            let Some(link) = self.graph.edge(id).and_then(Edge::link) else {
                continue;
            };
            let parent = ports.get(&(link.parent_switch.as_str(), link.parent_port.as_str()));
            let child = ports.get(&(link.child_switch.as_str(), link.child_port.as_str()));
            let (Some(parent), Some(child)) = (parent, child) else {
                debug!(
                    "Link not in trunk records ({}, {}) ({}, {})",
                    link.parent_switch, link.parent_port, link.child_switch, link.child_port
                );
                continue;
            };

            let allowed = match intersect_ranges(&parent.vlans, &child.vlans) {
                Ok(set) => set,
                Err(err) => {
                    warn!(
                        "Skipping trunk {} {} -> {} {}: {}",
                        parent.switch, parent.port, child.switch, child.port, err
                    );
                    continue;
                }
            };
            let traversing = traversing_vlans(
                &allowed,
                local.get(&link.parent_switch).unwrap_or(&empty),
                local.get(&link.child_switch).unwrap_or(&empty),
            );
            if traversing.is_empty() {
                debug!(
                    "No VLANs on link {} {} -> {} {}",
                    parent.switch, parent.port, child.switch, child.port
                );
            }

            let (parent, child) = (*parent, *child);
            if let Some(link) = self.graph.edge_mut(id).and_then(Edge::link_mut) {
                link.trunk_vlans = Some(compact_range(&allowed));
                link.traversing = traversing;
                link.native_vlan = parent.native;
                link.parent_channel = parent.channel.clone();
                link.child_channel = child.channel.clone();
                link.description = parent.description.clone();
                updated += 1;
            }
        }

        updated
    }

    /// Creates or refreshes BRIDGE edges for every VLAN that crosses a
    /// neighbor link between two management groups. Returns how many new
    /// bridges were created.
    pub fn update_bridge_domains(&mut self) -> usize {
        let local = self.local_vlans();
        let mut created = 0;

        for id in self.graph.edges_of(&EdgeKind::NEIGHBOR) {
            let Some((parent, child)) = self.graph.endpoints(id) else {
                continue;
            };
            let Some(traversing) = self.graph.edge(id).and_then(Edge::link).map(|l| l.traversing.clone())
            else {
                continue;
            };
            let (Some((pname, pmgmt)), Some((cname, cmgmt))) =
                (self.switch_group(parent), self.switch_group(child))
            else {
                continue;
            };
            if pmgmt == cmgmt {
                continue;
            }

            let (Some(pvids), Some(cvids)) = (local.get(&pname), local.get(&cname)) else {
                continue;
            };
            for &vid in pvids.intersection(cvids) {
                if !traversing.contains(&vid) {
                    debug!(
                        "Switches adjacent, missing traversing VLAN to bridge: v:{}, ps:{}, cs:{}",
                        vid, pname, cname
                    );
                    continue;
                }
                let pv = vlan_name(&pmgmt, vid);
                let cv = vlan_name(&cmgmt, vid);
                let (Some(pv_idx), Some(cv_idx)) = (
                    self.graph.get_index(NodeKind::Vlan, &pv),
                    self.graph.get_index(NodeKind::Vlan, &cv),
                ) else {
                    continue;
                };

                if upsert_bridge(self.graph, pv_idx, cv_idx, &pname, &cname) {
                    info!("New: Bridge ({})-[:BRIDGE]->({}) Relationship", pv, cv);
                    created += 1;
                } else {
                    debug!("Updating VLAN {}-[:BRIDGE]-{} Relationship", pv, cv);
                }
            }
        }

        created
    }

    fn switch_group(&self, idx: NodeId) -> Option<(String, String)> {
        let sw = self.graph.node(idx)?.as_switch()?;
        Some((sw.name.clone(), sw.mgmt.clone()?))
    }
}
