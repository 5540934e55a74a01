//! Layer-3 paths over routing edges inside one VRF.

use super::switched::fill_switched;
use super::{PathFinder, QueryOptions};
use crate::edge::{Edge, EdgeKind};
use crate::graph::{EdgeDirection, NodeId};
use crate::search::{PathQuery, PathRecord};
use ipnet::Ipv4Net;
use netweave_core::{Result, ResultFormat, ResultTree, TopologyError, TreeKind};
use std::collections::{BTreeSet, HashMap};
use std::net::Ipv4Addr;
use tracing::{debug, info};

/// Converts a router's edge distance from the source network into a hop
/// number. The first router is one edge away; every later router sits two
/// edges (network, router) further.
pub fn routed_hop(distance: usize) -> usize {
    if distance <= 1 {
        1
    } else {
        (distance - 1) / 2 + 1
    }
}

/// Two routers joined by a point-to-point network.
#[derive(Debug, Clone)]
struct RouterPair {
    from: NodeId,
    to: NodeId,
    from_ip: Option<Ipv4Addr>,
    to_ip: Option<Ipv4Addr>,
    transit: NodeId,
    /// Edge distance of `from` from the source network.
    distance: usize,
}

impl<'a> PathFinder<'a> {
    /// Routed hops between two networks given as IPs, CIDRs or hostnames.
    ///
    /// Returns `Ok(None)` when both sides sit behind the same router and no
    /// router-to-router hop is needed.
    pub fn routed_path(&self, net1: &str, net2: &str, opts: &QueryOptions) -> Result<Option<ResultTree>> {
        opts.format.ensure_in(&ResultFormat::ALL)?;
        let vrf = opts.vrf.as_deref().unwrap_or(self.config.default_vrf.as_str());
        info!("Query: Finding Routed Paths ({} --> {}) in {}", net1, net2, vrf);

        let src = self.resolve_cidr(net1)?;
        let dst = self.resolve_cidr(net2)?;
        self.trace_routed(src, dst, vrf, opts)
    }

    /// Routed hops between two prefixes inside `vrf`.
    pub(super) fn trace_routed(
        &self,
        src: Ipv4Net,
        dst: Ipv4Net,
        vrf: &str,
        opts: &QueryOptions,
    ) -> Result<Option<ResultTree>> {
        let sources: Vec<NodeId> = self.networks_with(src, Some(vrf)).iter().map(|n| n.idx).collect();
        if sources.is_empty() {
            return Err(TopologyError::not_found("network", format!("{}-{}", vrf, src)));
        }
        let targets: Vec<NodeId> = self.networks_with(dst, Some(vrf)).iter().map(|n| n.idx).collect();
        if targets.is_empty() {
            return Err(TopologyError::not_found("network", format!("{}-{}", vrf, dst)));
        }

        let in_vrf = |e: &Edge| e.vrf() == Some(vrf);
        let query = PathQuery::undirected(&EdgeKind::ROUTING, opts.double_depth()).with_filter(&in_vrf);
        let paths = self.graph.shortest_paths(&sources, &targets, &query);
        if paths.is_empty() {
            return Err(TopologyError::no_path("routed", src.to_string(), dst.to_string()));
        }

        let pairs = self.router_pairs(&paths, vrf);
        if pairs.is_empty() {
            debug!("No router hops between {} and {}", src, dst);
            return Ok(None);
        }

        let mut tree = ResultTree::new(format!("{} -> {}", src, dst), TreeKind::RoutedPath);
        tree.set("VRF", vrf);

        let mut seen_hops = BTreeSet::new();
        let mut max_hop = 0;
        for pair in &pairs {
            let hop = routed_hop(pair.distance);
            if opts.onepath && !seen_hops.insert(hop) {
                continue;
            }
            max_hop = max_hop.max(hop);
            tree.add_child(self.routed_hop_tree(pair, hop, opts));
        }

        tree.set("Hops", tree.child_count()).set("Max Hops", max_hop);
        Ok(Some(tree))
    }

    /// Router pairs joined by a transit network, both on some shortest path,
    /// each kept only in the orientation closer to the source.
    fn router_pairs(&self, paths: &[PathRecord], vrf: &str) -> Vec<RouterPair> {
        let mut found: HashMap<(NodeId, NodeId, NodeId), RouterPair> = HashMap::new();

        for path in paths {
            for (d, &router) in path.nodes.iter().enumerate() {
                let is_router = self
                    .graph
                    .node(router)
                    .and_then(|n| n.as_switch())
                    .map_or(false, |s| s.is_router());
                if !is_router {
                    continue;
                }

                for (transit, from_ip, peer, to_ip) in self.transit_peers(router, vrf) {
                    if path.position(peer).is_none() {
                        continue;
                    }
                    let key = (router, peer, transit);
                    if found.get(&key).map_or(false, |p| p.distance <= d) {
                        continue;
                    }
                    found.insert(
                        key,
                        RouterPair {
                            from: router,
                            to: peer,
                            from_ip,
                            to_ip,
                            transit,
                            distance: d,
                        },
                    );
                }
            }
        }

        let mut pairs: Vec<RouterPair> = found
            .values()
            .filter(|p| {
                found
                    .get(&(p.to, p.from, p.transit))
                    .map_or(true, |rev| p.distance < rev.distance)
            })
            .cloned()
            .collect();
        pairs.sort_by(|a, b| {
            (a.distance, self.name_of(a.from), self.name_of(a.to), self.name_of(a.transit))
                .cmp(&(b.distance, self.name_of(b.from), self.name_of(b.to), self.name_of(b.transit)))
        });
        pairs
    }

    /// (transit network, own gateway, peer router, peer gateway) for every
    /// point-to-point network on `router` in `vrf`.
    fn transit_peers(&self, router: NodeId, vrf: &str) -> Vec<(NodeId, Option<Ipv4Addr>, NodeId, Option<Ipv4Addr>)> {
        let mut peers = Vec::new();
        let gateway = |edge| self.graph.edge(edge).and_then(Edge::route).and_then(|r| r.gateway);

        for near in self.graph.neighbors(router, &[EdgeKind::Routed], EdgeDirection::Incoming) {
            if self.graph.edge(near.edge).and_then(Edge::vrf) != Some(vrf) {
                continue;
            }
            for far in self.graph.neighbors(near.node, &[EdgeKind::Routed], EdgeDirection::Outgoing) {
                if far.node == router || self.graph.edge(far.edge).and_then(Edge::vrf) != Some(vrf) {
                    continue;
                }
                peers.push((near.node, gateway(near.edge), far.node, gateway(far.edge)));
            }
        }
        peers
    }

    fn routed_hop_tree(&self, pair: &RouterPair, hop: usize, opts: &QueryOptions) -> ResultTree {
        let from = self.name_of(pair.from);
        let to = self.name_of(pair.to);
        let transit = self.graph.node(pair.transit).and_then(|n| n.as_network());

        let mut tree = ResultTree::new(format!("#{} {} -> {}", hop, from, to), TreeKind::RoutedHop);
        tree.set("From Router", from.as_str())
            .set_opt("From IP", pair.from_ip.map(|ip| ip.to_string()))
            .set("To Router", to.as_str())
            .set_opt("To IP", pair.to_ip.map(|ip| ip.to_string()))
            .set_opt("Transit", transit.map(|n| n.cidr.to_string()))
            .set_opt("VLAN", transit.and_then(|n| n.vlan))
            .set("distance", hop);

        if opts.l2path {
            let vlan = transit.and_then(|n| n.vlan);
            let trace = self.trace_switched(&[pair.from], &[pair.to], vlan, opts.depth, opts.onepath);
            if !trace.hops.is_empty() {
                let mut l2 = ResultTree::new(format!("{} -> {}", from, to), TreeKind::SwitchedPath);
                l2.set_opt("VLAN", vlan);
                fill_switched(&mut l2, &trace.hops, opts.onepath);
                tree.add_child(l2);
            }
        }
        tree
    }
}
