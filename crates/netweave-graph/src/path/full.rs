//! End-to-end paths between two hosts.

use super::switched::fill_switched;
use super::{NetworkMatch, PathFinder, QueryOptions};
use crate::graph::NodeId;
use crate::locate::HostLocation;
use netweave_core::{NodeKind, Result, ResultFormat, ResultTree, Scalar, TopologyError, TreeKind};
use std::net::Ipv4Addr;
use tracing::{debug, info};

/// One resolved end of a full path.
struct Side {
    label: String,
    ip: Option<Ipv4Addr>,
    net: NetworkMatch,
    location: Option<HostLocation>,
}

impl<'a> PathFinder<'a> {
    /// The complete path between two endpoints (IPs, CIDRs or hostnames).
    ///
    /// Segments in order: source host, source switched path, source gateway,
    /// routed and security paths, destination gateway, destination switched
    /// path, destination host. Segments that do not apply are left out.
    /// Switched segments need a host locator; without one they are skipped.
    pub fn full_path(&self, src: &str, dst: &str, opts: &QueryOptions) -> Result<ResultTree> {
        opts.format.ensure_in(&ResultFormat::ALL)?;
        info!("Query: Finding Full Path ({} --> {})", src, dst);

        let no_path = |err: TopologyError| match err {
            TopologyError::NotFound { .. } => TopologyError::no_path("full", src, dst),
            other => other,
        };
        let src_side = self.endpoint_side(src).map_err(no_path)?;
        let dst_side = self.endpoint_side(dst).map_err(no_path)?;

        let routing = src_side.net.vrfcidr != dst_side.net.vrfcidr;
        let switching = match (&src_side.location, &dst_side.location) {
            (Some(a), Some(b)) => !(a.switch == b.switch && a.vlan == b.vlan),
            _ => routing,
        };
        debug!("Full path routing:{} switching:{}", routing, switching);

        let mut tree = ResultTree::new(format!("{} -> {}", src, dst), TreeKind::FullPath);
        tree.add_child(host_marker("Src Host", &src_side));

        if switching && !routing {
            let from = self.host_switch(&src_side);
            let to = self.host_switch(&dst_side);
            if let (Some(from), Some(to)) = (from, to) {
                let vlan = src_side.location.as_ref().map(|l| l.vlan);
                if let Some(l2) = self.l2_segment(from, to, vlan, opts) {
                    tree.add_child(l2);
                }
            }
        }

        if routing {
            if switching {
                let host = self.host_switch(&src_side);
                let router = self.router_of(src_side.net.idx);
                if let (Some(host), Some(router)) = (host, router) {
                    let vlan = src_side.location.as_ref().map(|l| l.vlan);
                    if let Some(l2) = self.l2_segment(host, router, vlan, opts) {
                        tree.add_child(l2);
                    }
                }
            }

            tree.add_child(self.gateway_marker("Src Gateway", &src_side));
            for segment in self.full_routed_path(&src_side, &dst_side, opts)? {
                tree.add_child(segment);
            }
            tree.add_child(self.gateway_marker("Dst Gateway", &dst_side));

            if switching {
                let router = self.router_of(dst_side.net.idx);
                let host = self.host_switch(&dst_side);
                if let (Some(router), Some(host)) = (router, host) {
                    let vlan = dst_side.location.as_ref().map(|l| l.vlan);
                    if let Some(l2) = self.l2_segment(router, host, vlan, opts) {
                        tree.add_child(l2);
                    }
                }
            }
        }

        tree.add_child(host_marker("Dst Host", &dst_side));

        let layer = if !routing {
            2
        } else if src_side.net.vrf == dst_side.net.vrf {
            3
        } else {
            4
        };
        let (links, distance) = summarize(&tree);
        tree.set("Layer", layer).set("Links", links).set("Distance", distance);
        Ok(tree)
    }

    /// Routed segment between two networks: a routed path inside one VRF, or
    /// the security path between VRFs with routed legs from each endpoint to
    /// the first and last firewall gateways.
    fn full_routed_path(&self, src: &Side, dst: &Side, opts: &QueryOptions) -> Result<Vec<ResultTree>> {
        if src.net.vrf == dst.net.vrf {
            let routed = self.trace_routed(src.net.cidr, dst.net.cidr, &src.net.vrf, opts)?;
            return Ok(routed.into_iter().collect());
        }

        let security = self.security_path(&src.label, &dst.label, opts)?;
        let gateways: Vec<Ipv4Addr> = security
            .children_of(TreeKind::SecurityGateway)
            .filter_map(|gw| gw.get("Gateway").and_then(Scalar::as_str)?.parse().ok())
            .collect();

        let mut segments = Vec::new();
        if let Some(&first) = gateways.first() {
            let leg = self.trace_routed(src.net.cidr, self.find_cidr(first), &src.net.vrf, opts);
            segments.extend(optional_leg(leg)?);
        }
        segments.push(security);
        if let Some(&last) = gateways.last() {
            let leg = self.trace_routed(self.find_cidr(last), dst.net.cidr, &dst.net.vrf, opts);
            segments.extend(optional_leg(leg)?);
        }
        Ok(segments)
    }

    fn endpoint_side(&self, input: &str) -> Result<Side> {
        let ip = self.resolve_ip(input)?;
        let cidr = match ip {
            Some(ip) => self.find_cidr(ip),
            None => self.resolve_cidr(input)?,
        };
        let net = self
            .networks_with(cidr, None)
            .into_iter()
            .next()
            .ok_or_else(|| TopologyError::not_found("network", input))?;
        let location = match (self.locator, ip) {
            (Some(locator), Some(ip)) => locator.locate(ip),
            _ => None,
        };

        Ok(Side {
            label: ip.map_or_else(|| cidr.to_string(), |ip| ip.to_string()),
            ip,
            net,
            location,
        })
    }

    fn host_switch(&self, side: &Side) -> Option<NodeId> {
        let location = side.location.as_ref()?;
        let idx = self.graph.get_index(NodeKind::Switch, &location.switch);
        if idx.is_none() {
            debug!("Host switch {} not in topology", location.switch);
        }
        idx
    }

    fn l2_segment(&self, from: NodeId, to: NodeId, vlan: Option<u16>, opts: &QueryOptions) -> Option<ResultTree> {
        let trace = self.trace_switched(&[from], &[to], vlan, opts.depth, opts.onepath);
        if trace.hops.is_empty() {
            return None;
        }
        let name = format!("{} -> {}", self.name_of(from), self.name_of(to));
        let mut tree = ResultTree::new(name, TreeKind::SwitchedPath);
        tree.set_opt("VLAN", vlan);
        fill_switched(&mut tree, &trace.hops, opts.onepath);
        Some(tree)
    }

    fn gateway_marker(&self, name: &str, side: &Side) -> ResultTree {
        let router = self.router_of(side.net.idx).map(|idx| self.name_of(idx));
        let mut tree = ResultTree::new(name, TreeKind::Gateway);
        tree.set_opt("Gateway", side.net.gateway.map(|g| g.to_string()))
            .set_opt("Router", router)
            .set("CIDR", side.net.cidr.to_string())
            .set("VRF", side.net.vrf.as_str());
        tree
    }
}

fn host_marker(name: &str, side: &Side) -> ResultTree {
    let mut tree = ResultTree::new(name, TreeKind::Host);
    tree.set_opt("IP", side.ip.map(|ip| ip.to_string()))
        .set("CIDR", side.net.cidr.to_string())
        .set("VRF", side.net.vrf.as_str());
    if let Some(location) = &side.location {
        tree.set("Switch", location.switch.as_str())
            .set("Port", location.port.as_str())
            .set("VLAN", location.vlan)
            .set_opt("MAC", location.mac.as_ref());
    }
    tree
}

/// A routed leg next to a firewall may be missing or unnecessary.
fn optional_leg(leg: Result<Option<ResultTree>>) -> Result<Option<ResultTree>> {
    match leg {
        Err(err) if err.is_result_error() => {
            debug!("Skipping routed leg: {}", err);
            Ok(None)
        }
        other => other,
    }
}

/// Totals links and distance over every segment of a full path.
fn summarize(tree: &ResultTree) -> (i64, i64) {
    let value = |t: &ResultTree, key: &str| t.get(key).and_then(Scalar::as_int).unwrap_or(0);
    let mut links = 0;
    let mut distance = 0;
    for child in &tree.children {
        match child.kind {
            TreeKind::SwitchedPath => {
                links += value(child, "Links");
                distance += value(child, "Distance");
            }
            TreeKind::RoutedPath => {
                links += value(child, "Hops");
                distance += value(child, "Max Hops");
            }
            TreeKind::SecurityPath => {
                links += value(child, "Firewalls");
                distance += value(child, "Firewalls");
            }
            _ => {}
        }
    }
    (links, distance)
}
