//! Layer-2 paths over NEI and NEI_EQ links.

use super::{PathFinder, QueryOptions};
use crate::edge::{Edge, EdgeKind};
use crate::graph::{EdgeId, NodeId};
use crate::search::PathQuery;
use netweave_core::{Result, ResultFormat, ResultTree, TopologyError, TreeKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

/// How a hop was walked relative to the link's stored parent to child
/// direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// Walked parent to child.
    Forward,
    /// Walked child to parent; From/To are the link's child/parent.
    Reverse,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Forward => "forward",
            Orientation::Reverse => "reverse",
        }
    }
}

/// One trunk link on a switched path, labelled from the path's start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchedHop {
    /// 1-based position along the path.
    pub hop: usize,
    pub from_switch: String,
    pub from_port: String,
    pub from_channel: Option<String>,
    pub to_switch: String,
    pub to_port: String,
    pub to_channel: Option<String>,
    pub orientation: Orientation,
    pub kind: EdgeKind,
    pub trunk_vlans: Option<String>,
    pub native_vlan: Option<u16>,
    pub description: Option<String>,
}

impl SwitchedHop {
    pub fn to_tree(&self) -> ResultTree {
        let name = format!(
            "#{} {}({}) -> {}({})",
            self.hop, self.from_switch, self.from_port, self.to_switch, self.to_port
        );
        let mut tree = ResultTree::new(name, TreeKind::SwitchedHop);
        tree.set("From Switch", &self.from_switch)
            .set("From Port", &self.from_port)
            .set_opt("From Channel", self.from_channel.as_ref())
            .set("To Switch", &self.to_switch)
            .set("To Port", &self.to_port)
            .set_opt("To Channel", self.to_channel.as_ref())
            .set("Link", self.kind.as_str())
            .set("Orientation", self.orientation.as_str())
            .set_opt("Link VLANs", self.trunk_vlans.as_ref())
            .set_opt("Native VLAN", self.native_vlan)
            .set_opt("Description", self.description.as_ref())
            .set("distance", self.hop);
        tree
    }
}

/// Result of tracing between two switch sets.
pub(super) struct SwitchedTrace {
    /// Number of shortest paths found, zero-length ones included.
    pub paths: usize,
    pub hops: Vec<SwitchedHop>,
}

impl<'a> PathFinder<'a> {
    /// All shortest switched paths between switches matching `from` and `to`.
    ///
    /// Patterns are regular expressions matched against whole switch names.
    /// Every distinct link is reported once, at the smallest hop it was seen
    /// at; with `onepath` only the first link per hop is kept.
    pub fn switched_path(&self, from: &str, to: &str, opts: &QueryOptions) -> Result<ResultTree> {
        opts.format.ensure_in(&ResultFormat::ALL)?;
        info!("Query: Finding Switched Paths ({} --> {})", from, to);

        let sources = self.reachable_switches(from)?;
        let targets = self.reachable_switches(to)?;
        let trace = self.trace_switched(&sources, &targets, opts.vlan, opts.depth, opts.onepath);
        if trace.paths == 0 {
            return Err(TopologyError::no_path("switched", from, to));
        }

        let mut tree = ResultTree::new(format!("{} -> {}", from, to), TreeKind::SwitchedPath);
        tree.set_opt("VLAN", opts.vlan);
        fill_switched(&mut tree, &trace.hops, opts.onepath);
        Ok(tree)
    }

    /// Traces switched hops between two switch sets, following only trunks
    /// that carry `vlan` when one is given.
    pub(super) fn trace_switched(
        &self,
        sources: &[NodeId],
        targets: &[NodeId],
        vlan: Option<u16>,
        depth: usize,
        onepath: bool,
    ) -> SwitchedTrace {
        let carries = move |e: &Edge| match vlan {
            Some(vid) => e.link().map_or(false, |l| l.traversing.contains(&vid)),
            None => true,
        };
        let query = PathQuery::undirected(&EdgeKind::NEIGHBOR, depth.saturating_mul(2)).with_filter(&carries);
        let paths = self.graph.shortest_paths(sources, targets, &query);

        let mut by_edge: HashMap<EdgeId, SwitchedHop> = HashMap::new();
        for path in &paths {
            for (i, &edge_id) in path.edges.iter().enumerate() {
                let Some(hop) = self.switched_hop(edge_id, path.nodes[i], i + 1) else {
                    continue;
                };
                match by_edge.get(&edge_id) {
                    Some(seen) if seen.hop <= hop.hop => {}
                    _ => {
                        by_edge.insert(edge_id, hop);
                    }
                }
            }
        }

        let mut hops: Vec<SwitchedHop> = by_edge.into_values().collect();
        hops.sort_by(|a, b| {
            (a.hop, &a.from_switch, &a.to_switch, &a.from_port)
                .cmp(&(b.hop, &b.from_switch, &b.to_switch, &b.from_port))
        });

        if onepath {
            let mut seen = BTreeSet::new();
            hops.retain(|h| seen.insert(h.hop));
        }
        debug!("Switched trace: {} paths, {} links", paths.len(), hops.len());

        SwitchedTrace {
            paths: paths.len(),
            hops,
        }
    }

    /// Labels one link as walked from `near`.
    fn switched_hop(&self, edge_id: EdgeId, near: NodeId, hop: usize) -> Option<SwitchedHop> {
        let edge = self.graph.edge(edge_id)?;
        let link = edge.link()?;
        let (parent, _) = self.graph.endpoints(edge_id)?;

        let orientation = if parent == near {
            Orientation::Forward
        } else {
            Orientation::Reverse
        };
        let (from, from_port, from_channel, to, to_port, to_channel) = match orientation {
            Orientation::Forward => (
                &link.parent_switch,
                &link.parent_port,
                &link.parent_channel,
                &link.child_switch,
                &link.child_port,
                &link.child_channel,
            ),
            Orientation::Reverse => (
                &link.child_switch,
                &link.child_port,
                &link.child_channel,
                &link.parent_switch,
                &link.parent_port,
                &link.parent_channel,
            ),
        };

        Some(SwitchedHop {
            hop,
            from_switch: from.clone(),
            from_port: from_port.clone(),
            from_channel: from_channel.clone(),
            to_switch: to.clone(),
            to_port: to_port.clone(),
            to_channel: to_channel.clone(),
            orientation,
            kind: edge.kind,
            trunk_vlans: link.trunk_vlans.clone(),
            native_vlan: link.native_vlan,
            description: link.description.clone(),
        })
    }
}

/// Adds hop children and the Links/Distance summary to a switched path tree.
pub(super) fn fill_switched(tree: &mut ResultTree, hops: &[SwitchedHop], onepath: bool) {
    let distance = hops.iter().map(|h| h.hop).max().unwrap_or(0);
    tree.set("Links", hops.len()).set("Distance", distance);
    if onepath && distance > 0 {
        let coverage = 100.0 * hops.len() as f64 / distance as f64;
        tree.set("Traversal Coverage", coverage);
    }
    for hop in hops {
        tree.add_child(hop.to_tree());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{SwitchRecord, TopologyBuilder};
    use crate::distance::{DistanceEngine, NeighborRecord};
    use crate::graph::TopologyGraph;
    use netweave_core::EngineConfig;

    /// a (seed) -> b -> d, a -> c -> d: two equal-cost paths to d.
    fn diamond(config: &EngineConfig) -> TopologyGraph {
        let mut graph = TopologyGraph::new();
        let mut builder = TopologyBuilder::new(&mut graph, config);
        for name in ["a", "b", "c", "d", "island"] {
            builder.upsert_switch(&SwitchRecord::new(name, "campus"));
        }
        DistanceEngine::new(&mut graph, config)
            .unwrap()
            .import_neighbors(&[
                NeighborRecord::new("a", "p1", "b", "p1"),
                NeighborRecord::new("a", "p2", "c", "p1"),
                NeighborRecord::new("b", "p2", "d", "p1"),
                NeighborRecord::new("c", "p2", "d", "p2"),
            ]);
        graph
    }

    fn config() -> EngineConfig {
        EngineConfig::default().with_seeds(["a"])
    }

    #[test]
    fn test_all_equal_cost_links() {
        let config = config();
        let graph = diamond(&config);
        let finder = PathFinder::new(&graph, &config);

        let tree = finder.switched_path("a", "d", &QueryOptions::default()).unwrap();
        assert_eq!(tree.get("Links").unwrap().as_int(), Some(4));
        assert_eq!(tree.get("Distance").unwrap().as_int(), Some(2));
        assert!(tree.get("Traversal Coverage").is_none());
        let first = &tree.children[0];
        assert_eq!(first.get("From Switch").unwrap().as_str(), Some("a"));
        assert_eq!(first.get("Orientation").unwrap().as_str(), Some("forward"));
    }

    #[test]
    fn test_onepath_one_per_hop() {
        let config = config();
        let graph = diamond(&config);
        let finder = PathFinder::new(&graph, &config);

        let tree = finder
            .switched_path("a", "d", &QueryOptions::default().onepath())
            .unwrap();
        assert_eq!(tree.child_count(), 2);
        assert_eq!(tree.get("Traversal Coverage").unwrap().as_float(), Some(100.0));
    }

    #[test]
    fn test_reverse_labels() {
        let config = config();
        let graph = diamond(&config);
        let finder = PathFinder::new(&graph, &config);

        let tree = finder
            .switched_path("d", "a", &QueryOptions::default().onepath())
            .unwrap();
        let first = &tree.children[0];
        assert_eq!(first.get("From Switch").unwrap().as_str(), Some("d"));
        assert_eq!(first.get("Orientation").unwrap().as_str(), Some("reverse"));
        assert_eq!(first.get("From Port").unwrap().as_str(), Some("p1"));
        assert_eq!(first.get("To Switch").unwrap().as_str(), Some("b"));
    }

    #[test]
    fn test_vlan_filter_and_errors() {
        let config = config();
        let graph = diamond(&config);
        let finder = PathFinder::new(&graph, &config);

        // no trunk data imported: nothing carries VLAN 10
        assert!(matches!(
            finder.switched_path("a", "d", &QueryOptions::default().with_vlan(10)),
            Err(TopologyError::NoPath { .. })
        ));
        assert!(matches!(
            finder.switched_path("a", "island", &QueryOptions::default()),
            Err(TopologyError::NotInTopology { .. })
        ));
        assert!(matches!(
            finder.switched_path("a", "zz", &QueryOptions::default()),
            Err(TopologyError::NotFound { .. })
        ));
    }
}
