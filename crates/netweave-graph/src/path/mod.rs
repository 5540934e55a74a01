//! Path discovery across layers.
//!
//! `PathFinder` answers four questions against a read-only graph:
//!
//! - **switched**: which trunk links join two switches (L2)
//! - **routed**: which routers a packet crosses inside one VRF (L3)
//! - **security**: which firewalls sit between two VRFs (L4)
//! - **full**: all of the above stitched together between two hosts
//!
//! Every search is bounded by `QueryOptions::depth`. Layers where one hop is
//! two graph edges (router, network, router) search twice as deep.

mod full;
mod routed;
mod security;
mod switched;

pub use routed::routed_hop;
pub use switched::{Orientation, SwitchedHop};

use crate::edge::EdgeKind;
use crate::graph::{EdgeDirection, NodeId, TopologyGraph};
use crate::locate::{HostLocator, NameResolver, SystemResolver};
use ipnet::Ipv4Net;
use netweave_core::{
    longest_match, EngineConfig, Endpoint, Network, NodeKind, Result, ResultFormat, TopologyError,
    TopologyNode, DEFAULT_DEPTH,
};
use regex::Regex;
use std::net::Ipv4Addr;
use tracing::debug;

/// Per-call query options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Keep one hop per distance instead of every equal-cost hop.
    pub onepath: bool,
    /// Traversal bound in hops.
    pub depth: usize,
    /// VRF for routed queries; the configured default when unset.
    pub vrf: Option<String>,
    /// Attach the switched path under each routed hop.
    pub l2path: bool,
    /// Only follow trunks carrying this VLAN.
    pub vlan: Option<u16>,
    pub format: ResultFormat,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            onepath: false,
            depth: DEFAULT_DEPTH,
            vrf: None,
            l2path: false,
            vlan: None,
            format: ResultFormat::default(),
        }
    }
}

impl QueryOptions {
    pub fn onepath(mut self) -> Self {
        self.onepath = true;
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_vrf(mut self, vrf: impl Into<String>) -> Self {
        self.vrf = Some(vrf.into());
        self
    }

    pub fn with_l2path(mut self) -> Self {
        self.l2path = true;
        self
    }

    pub fn with_vlan(mut self, vlan: u16) -> Self {
        self.vlan = Some(vlan);
        self
    }

    pub fn with_format(mut self, format: ResultFormat) -> Self {
        self.format = format;
        self
    }

    /// Search bound for layers where a hop spans two edges.
    fn double_depth(&self) -> usize {
        self.depth.saturating_mul(2)
    }
}

/// A network an endpoint resolved to.
#[derive(Debug, Clone)]
struct NetworkMatch {
    idx: NodeId,
    cidr: Ipv4Net,
    vrf: String,
    vrfcidr: String,
    gateway: Option<Ipv4Addr>,
}

/// Read-only path queries over one graph snapshot.
pub struct PathFinder<'a> {
    graph: &'a TopologyGraph,
    config: &'a EngineConfig,
    locator: Option<&'a dyn HostLocator>,
    resolver: &'a dyn NameResolver,
}

impl<'a> PathFinder<'a> {
    /// A finder that resolves names through the system resolver and knows
    /// no host locations.
    pub fn new(graph: &'a TopologyGraph, config: &'a EngineConfig) -> Self {
        Self {
            graph,
            config,
            locator: None,
            resolver: &SystemResolver,
        }
    }

    pub fn with_locator(mut self, locator: &'a dyn HostLocator) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn with_resolver(mut self, resolver: &'a dyn NameResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Most specific network prefix holding `ip`, or `0.0.0.0/0`.
    pub fn find_cidr(&self, ip: Ipv4Addr) -> Ipv4Net {
        longest_match(ip, self.graph.networks().map(|(_, n)| n.cidr))
    }

    /// Resolves an IP, CIDR or hostname to a network prefix.
    fn resolve_cidr(&self, input: &str) -> Result<Ipv4Net> {
        match Endpoint::parse(input) {
            Endpoint::Ip(ip) => Ok(self.find_cidr(ip)),
            Endpoint::Cidr(net) => Ok(net),
            Endpoint::Host(host) => {
                let ip = self.resolver.resolve(&host)?;
                debug!("Resolved {} to {}", host, ip);
                Ok(self.find_cidr(ip))
            }
        }
    }

    /// Resolves an IP or hostname to an address. CIDRs have none.
    fn resolve_ip(&self, input: &str) -> Result<Option<Ipv4Addr>> {
        match Endpoint::parse(input) {
            Endpoint::Ip(ip) => Ok(Some(ip)),
            Endpoint::Cidr(_) => Ok(None),
            Endpoint::Host(host) => Ok(Some(self.resolver.resolve(&host)?)),
        }
    }

    /// Networks with exactly this prefix, ordered by vrfcidr, optionally
    /// restricted to one VRF.
    fn networks_with(&self, cidr: Ipv4Net, vrf: Option<&str>) -> Vec<NetworkMatch> {
        let mut found: Vec<NetworkMatch> = self
            .graph
            .networks()
            .filter(|(_, n)| n.cidr == cidr && vrf.map_or(true, |v| n.vrf == v))
            .map(|(idx, n)| network_match(idx, n))
            .collect();
        found.sort_by(|a, b| a.vrfcidr.cmp(&b.vrfcidr));
        found
    }

    /// The first network an endpoint resolves to.
    fn network_for(&self, input: &str, vrf: Option<&str>) -> Result<NetworkMatch> {
        let cidr = self.resolve_cidr(input)?;
        self.networks_with(cidr, vrf)
            .into_iter()
            .next()
            .ok_or_else(|| TopologyError::not_found("network", input))
    }

    /// Switches whose whole name matches `pattern`, ordered by name.
    fn switches_matching(&self, pattern: &str) -> Result<Vec<NodeId>> {
        let re = Regex::new(&format!("^(?:{})$", pattern))?;
        Ok(self
            .graph
            .nodes_of(NodeKind::Switch)
            .into_iter()
            .filter(|&idx| {
                self.graph
                    .key_of(idx)
                    .map_or(false, |name| re.is_match(&name))
            })
            .collect())
    }

    /// Matching switches that some seed reaches. Fails with `NotFound` when
    /// nothing matches and `NotInTopology` when nothing matching is reached.
    fn reachable_switches(&self, pattern: &str) -> Result<Vec<NodeId>> {
        let matched = self.switches_matching(pattern)?;
        if matched.is_empty() {
            return Err(TopologyError::not_found("switch", pattern));
        }

        let max = self.config.max_distance;
        let reached: Vec<NodeId> = matched
            .iter()
            .copied()
            .filter(|&idx| {
                self.graph
                    .node(idx)
                    .and_then(TopologyNode::as_switch)
                    .map_or(false, |s| s.distance < max)
            })
            .collect();

        if reached.is_empty() {
            let switch = self.graph.key_of(matched[0]).unwrap_or_default();
            return Err(TopologyError::NotInTopology { switch });
        }
        Ok(reached)
    }

    /// First-hop router of a network: the primary when known, else the standby.
    fn router_of(&self, network: NodeId) -> Option<NodeId> {
        [EdgeKind::RoutedBy, EdgeKind::RoutedStandby]
            .iter()
            .find_map(|&kind| {
                self.graph
                    .neighbors(network, &[kind], EdgeDirection::Outgoing)
                    .first()
                    .map(|adj| adj.node)
            })
    }

    fn name_of(&self, idx: NodeId) -> String {
        self.graph.key_of(idx).unwrap_or_default()
    }
}

fn network_match(idx: NodeId, n: &Network) -> NetworkMatch {
    NetworkMatch {
        idx,
        cidr: n.cidr,
        vrf: n.vrf.clone(),
        vrfcidr: n.vrfcidr(),
        gateway: n.gateway,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{NetworkRecord, SwitchRecord, TopologyBuilder};
    use crate::locate::StaticDirectory;

    fn graph(config: &EngineConfig) -> TopologyGraph {
        let mut graph = TopologyGraph::new();
        let mut builder = TopologyBuilder::new(&mut graph, config);
        builder.upsert_switch(&SwitchRecord::new("core1", "campus").router());
        builder.upsert_switch(&SwitchRecord::new("lost1", "campus"));
        for (vrf, cidr) in [("corp", "10.0.0.0/8"), ("corp", "10.1.1.0/24"), ("lab", "10.1.1.0/24")] {
            builder
                .upsert_network(&NetworkRecord::new(vrf, cidr.parse().unwrap(), "core1"))
                .unwrap();
        }
        graph
    }

    #[test]
    fn test_find_cidr() {
        let config = EngineConfig::default().with_seeds(["core1"]);
        let graph = graph(&config);
        let finder = PathFinder::new(&graph, &config);

        assert_eq!(finder.find_cidr(Ipv4Addr::new(10, 1, 1, 9)).to_string(), "10.1.1.0/24");
        assert_eq!(finder.find_cidr(Ipv4Addr::new(10, 7, 0, 1)).to_string(), "10.0.0.0/8");
        assert_eq!(finder.find_cidr(Ipv4Addr::new(192, 168, 0, 1)).to_string(), "0.0.0.0/0");
    }

    #[test]
    fn test_endpoint_resolution() {
        let config = EngineConfig::default().with_seeds(["core1"]);
        let graph = graph(&config);
        let names = StaticDirectory::new().with_name("printer1", Ipv4Addr::new(10, 1, 1, 50));
        let finder = PathFinder::new(&graph, &config).with_resolver(&names);

        let net = finder.network_for("printer1", None).unwrap();
        assert_eq!(net.vrfcidr, "corp-10.1.1.0/24");
        let net = finder.network_for("10.1.1.50", Some("lab")).unwrap();
        assert_eq!(net.vrfcidr, "lab-10.1.1.0/24");
        assert!(matches!(
            finder.network_for("nohost", None),
            Err(TopologyError::Lookup { .. })
        ));
        assert!(matches!(
            finder.network_for("172.16.0.1", None),
            Err(TopologyError::NotFound { .. })
        ));
    }

    #[test]
    fn test_switch_patterns() {
        let config = EngineConfig::default().with_seeds(["core1"]);
        let graph = graph(&config);
        let finder = PathFinder::new(&graph, &config);

        assert_eq!(finder.switches_matching("core.*").unwrap().len(), 1);
        // anchored: "ore1" must not match "core1"
        assert!(finder.switches_matching("ore1").unwrap().is_empty());
        assert!(matches!(
            finder.reachable_switches("nothing"),
            Err(TopologyError::NotFound { .. })
        ));
        assert!(matches!(
            finder.reachable_switches("lost1"),
            Err(TopologyError::NotInTopology { .. })
        ));
        assert!(matches!(
            finder.switches_matching("(unclosed"),
            Err(TopologyError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_options_builder() {
        let opts = QueryOptions::default().onepath().with_depth(5).with_vrf("corp");
        assert!(opts.onepath);
        assert_eq!(opts.double_depth(), 10);
        assert_eq!(opts.vrf.as_deref(), Some("corp"));
        assert_eq!(QueryOptions::default().depth, DEFAULT_DEPTH);
    }
}
