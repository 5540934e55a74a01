//! Typed upserts for importers.
//!
//! Importers hand over one record per observed object. The builder resolves
//! records against natural keys so that re-importing the same feed refreshes
//! timestamps instead of duplicating nodes or edges.

use crate::edge::{Edge, EdgeDetail, EdgeKind, FirewallLink, RouteInfo, SwitchedInfo};
use crate::graph::{EdgeId, NodeId, TopologyGraph};
use chrono::Utc;
use ipnet::Ipv4Net;
use netweave_core::{
    most_specific, vlan_name, vrfcidr, EngineConfig, FirewallInfo, Network, NodeKind, Result,
    RouterRole, Supernet, Switch, TopologyError, TopologyNode, Vlan, Vrf,
};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use tracing::{debug, info};

/// Management group assigned to routers that report none.
pub const UNKNOWN_GROUP: &str = "Unknown";

/// One device from the device list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwitchRecord {
    pub name: String,
    pub mgmt: Option<String>,
    pub model: Option<String>,
    pub version: Option<String>,
    pub location: Option<String>,
    /// Present when the device routes.
    pub router: Option<RouterRole>,
}

impl SwitchRecord {
    pub fn new(name: impl Into<String>, mgmt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mgmt: Some(mgmt.into()),
            ..Default::default()
        }
    }

    pub fn router(mut self) -> Self {
        self.router = Some(RouterRole { standby: false });
        self
    }
}

/// One routed subnet as seen on one router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub cidr: Ipv4Net,
    pub vrf: String,
    pub vlan: Option<u16>,
    pub gateway: Option<Ipv4Addr>,
    pub description: Option<String>,
    pub router: String,
    pub standby: bool,
    pub p2p: bool,
}

impl NetworkRecord {
    pub fn new(vrf: impl Into<String>, cidr: Ipv4Net, router: impl Into<String>) -> Self {
        Self {
            cidr,
            vrf: vrf.into(),
            vlan: None,
            gateway: None,
            description: None,
            router: router.into(),
            standby: false,
            p2p: false,
        }
    }

    fn router_edge_kind(&self) -> EdgeKind {
        if self.p2p {
            EdgeKind::Routed
        } else if self.standby {
            EdgeKind::RoutedStandby
        } else {
            EdgeKind::RoutedBy
        }
    }
}

/// A VLAN observed on one switch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VlanRecord {
    pub mgmt: String,
    pub vid: u16,
    pub switch: String,
    pub description: Option<String>,
    /// Local spanning-tree priority; 0 when not reported.
    pub priority: u32,
    pub port_count: u32,
    pub mac_count: u32,
}

/// A layer-3 interface on a firewall.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirewallInterfaceRecord {
    pub name: String,
    pub hostname: String,
    pub log_index: String,
    pub vlan: u16,
    pub description: Option<String>,
    pub security_level: Option<u32>,
}

/// An address block tagging the networks inside it with a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupernetRecord {
    pub cidr: Ipv4Net,
    pub role: String,
    pub description: Option<String>,
    pub secure: bool,
}

/// Applies import records to a topology graph.
pub struct TopologyBuilder<'a> {
    graph: &'a mut TopologyGraph,
    config: &'a EngineConfig,
}

impl<'a> TopologyBuilder<'a> {
    pub fn new(graph: &'a mut TopologyGraph, config: &'a EngineConfig) -> Self {
        Self { graph, config }
    }

    /// Inserts or refreshes a switch.
    ///
    /// Switches without a management group are skipped; routers fall back to
    /// the `Unknown` group. Returns `None` when the record was skipped.
    pub fn upsert_switch(&mut self, record: &SwitchRecord) -> Option<NodeId> {
        let mgmt = match (&record.mgmt, record.router) {
            (Some(m), _) if !m.is_empty() => m.clone(),
            (_, Some(_)) => UNKNOWN_GROUP.to_string(),
            _ => {
                debug!("Skipping: No Management Group for Switch: {}", record.name);
                return None;
            }
        };

        let seed = self.config.is_seed(&record.name);
        let now = Utc::now();

        if let Some(existing) = self.graph.switch_mut(&record.name) {
            debug!("Switch exists {}, updating", record.name);
            existing.mgmt = Some(mgmt);
            existing.seed = seed;
            if seed {
                existing.distance = 0;
            }
            existing.model = record.model.clone().or(existing.model.take());
            existing.version = record.version.clone().or(existing.version.take());
            existing.location = record.location.clone().or(existing.location.take());
            if record.router.is_some() {
                existing.router = record.router;
            }
            existing.last_seen = now;
            return self.graph.get_index(NodeKind::Switch, &record.name);
        }

        let distance = if seed { 0 } else { self.config.max_distance };
        info!(
            "New: Inserting {} INTO switch, s:{} d:{}",
            record.name, seed, distance
        );

        let mut switch = Switch::new(&record.name, distance);
        switch.seed = seed;
        switch.mgmt = Some(mgmt);
        switch.model = record.model.clone();
        switch.version = record.version.clone();
        switch.location = record.location.clone();
        switch.router = record.router;
        switch.last_seen = now;
        Some(self.graph.upsert_node(TopologyNode::Switch(switch)).0)
    }

    /// Inserts or refreshes a VRF.
    pub fn upsert_vrf(&mut self, name: &str, seczone: u32, description: Option<&str>) -> NodeId {
        let created = self.graph.vrf(name).is_none();
        if created {
            info!("New: Inserting VRF {} (seczone {})", name, seczone);
        } else {
            debug!("Updating VRF {}", name);
        }
        let vrf = Vrf {
            name: name.to_string(),
            seczone,
            description: description.map(str::to_string),
            last_seen: Utc::now(),
        };
        self.graph.upsert_node(TopologyNode::Vrf(vrf)).0
    }

    fn ensure_vrf(&mut self, name: &str) -> NodeId {
        match self.graph.get_index(NodeKind::Vrf, name) {
            Some(idx) => idx,
            None => self.upsert_vrf(name, 0, None),
        }
    }

    /// Inserts or refreshes a network, its VRF membership and its router link.
    pub fn upsert_network(&mut self, record: &NetworkRecord) -> Result<NodeId> {
        let router_idx = self
            .graph
            .get_index(NodeKind::Switch, &record.router)
            .filter(|&idx| {
                self.graph
                    .node(idx)
                    .and_then(TopologyNode::as_switch)
                    .map_or(false, Switch::is_router)
            })
            .ok_or_else(|| TopologyError::not_found("router", &record.router))?;

        let cidr = record.cidr.trunc();
        let key = vrfcidr(&record.vrf, &cidr);
        let now = Utc::now();

        let net_idx = match self.graph.get_index(NodeKind::Network, &key) {
            Some(idx) => {
                debug!("Updating CIDR {}", key);
                if let Some(net) = self.graph.node_mut(idx).and_then(TopologyNode::as_network_mut) {
                    if record.description.is_some() {
                        net.description = record.description.clone();
                    }
                    if record.vlan.is_some() {
                        net.vlan = record.vlan;
                    }
                    if !record.standby || net.gateway.is_none() {
                        net.gateway = record.gateway.or(net.gateway);
                    }
                    net.p2p = record.p2p;
                    net.last_seen = now;
                }
                idx
            }
            None => {
                info!("New: Inserting CIDR {}", key);
                let mut net = Network::new(&record.vrf, cidr);
                net.vlan = record.vlan;
                net.gateway = record.gateway;
                net.description = record.description.clone();
                net.p2p = record.p2p;
                net.location = self
                    .graph
                    .node(router_idx)
                    .and_then(TopologyNode::as_switch)
                    .and_then(|r| r.location.clone());
                net.last_seen = now;
                self.graph.upsert_node(TopologyNode::Network(net)).0
            }
        };

        let vrf_idx = self.ensure_vrf(&record.vrf);
        let (_, created) = self
            .graph
            .upsert_edge(net_idx, vrf_idx, Edge::new(EdgeKind::VrfIn), |_| true);
        if created {
            info!("New: Creating VRF_IN Relationship {} -> {}", key, record.vrf);
        }

        let kind = record.router_edge_kind();
        let route = Edge::with_detail(
            kind,
            EdgeDetail::Route(RouteInfo {
                vrf: record.vrf.clone(),
                gateway: record.gateway,
            }),
        );
        let vrf = record.vrf.clone();
        let (_, created) = self
            .graph
            .upsert_edge(net_idx, router_idx, route, |e| e.vrf() == Some(vrf.as_str()));
        if created {
            info!(
                "New: Creating {} Relationship {} -> {} ({})",
                kind, cidr, record.router, record.vrf
            );
        } else {
            debug!(
                "Updating Existing {} Relationship: {} -> {}",
                kind, cidr, record.router
            );
        }

        if let Some(vid) = record.vlan {
            self.link_l3_to_l2(net_idx, router_idx, vid);
        }

        Ok(net_idx)
    }

    /// Links a network to the VLAN carrying it on its router, when known.
    fn link_l3_to_l2(&mut self, net_idx: NodeId, router_idx: NodeId, vid: u16) {
        let Some(mgmt) = self
            .graph
            .node(router_idx)
            .and_then(TopologyNode::as_switch)
            .and_then(|r| r.mgmt.clone())
        else {
            return;
        };
        let vname = vlan_name(&mgmt, vid);
        let Some(vlan_idx) = self.graph.get_index(NodeKind::Vlan, &vname) else {
            return;
        };
        if self
            .graph
            .find_edge(vlan_idx, router_idx, EdgeKind::Switched, |_| true)
            .is_none()
        {
            return;
        }

        let (_, created) = self
            .graph
            .upsert_edge(net_idx, vlan_idx, Edge::new(EdgeKind::L3ToL2), |_| true);
        if created {
            info!("New: Creating L3toL2 Relationship vid:{} -> {}", vid, vname);
        }
    }

    /// Inserts or refreshes a VLAN and its membership on one switch.
    pub fn upsert_vlan_membership(&mut self, record: &VlanRecord) -> Result<NodeId> {
        let switch_idx = self
            .graph
            .get_index(NodeKind::Switch, &record.switch)
            .ok_or_else(|| TopologyError::not_found("switch", &record.switch))?;

        let vname = vlan_name(&record.mgmt, record.vid);
        let vlan_idx = match self.graph.get_index(NodeKind::Vlan, &vname) {
            Some(idx) => {
                if let Some(vlan) = self.graph.node_mut(idx) {
                    vlan.touch(Utc::now());
                }
                idx
            }
            None => {
                info!("New: Inserting VLAN {}", vname);
                self.graph
                    .upsert_node(TopologyNode::Vlan(Vlan::new(&record.mgmt, record.vid)))
                    .0
            }
        };

        let switched = Edge::with_detail(
            EdgeKind::Switched,
            EdgeDetail::Switched(SwitchedInfo {
                description: record.description.clone(),
                priority: record.priority,
                port_count: record.port_count,
                mac_count: record.mac_count,
            }),
        );
        let (_, created) = self
            .graph
            .upsert_edge(vlan_idx, switch_idx, switched, |_| true);
        if created {
            info!("New: Linking VLAN {} to {}", vname, record.switch);
        }

        Ok(vlan_idx)
    }

    /// Inserts or refreshes a firewall and links every network on the
    /// interface's VLAN to it. Returns how many networks were linked.
    pub fn upsert_firewall_interface(&mut self, record: &FirewallInterfaceRecord) -> usize {
        let firewall = FirewallInfo {
            hostname: record.hostname.clone(),
            log_index: record.log_index.clone(),
        };

        let fw_idx = match self.graph.switch_mut(&record.name) {
            Some(existing) => {
                debug!("Updating Firewall: {}", record.name);
                existing.firewall = Some(firewall);
                existing.router.get_or_insert(RouterRole { standby: false });
                existing.last_seen = Utc::now();
                self.graph.get_index(NodeKind::Switch, &record.name)
            }
            None => {
                info!("Creating New Firewall: {}", record.name);
                let seed = self.config.is_seed(&record.name);
                let distance = if seed { 0 } else { self.config.max_distance };
                let mut switch = Switch::new(&record.name, distance);
                switch.seed = seed;
                switch.router = Some(RouterRole { standby: false });
                switch.firewall = Some(firewall);
                Some(self.graph.upsert_node(TopologyNode::Switch(switch)).0)
            }
        };
        let Some(fw_idx) = fw_idx else {
            return 0;
        };

        let networks: Vec<NodeId> = self
            .graph
            .networks()
            .filter(|(_, n)| n.vlan == Some(record.vlan))
            .map(|(idx, _)| idx)
            .collect();

        for &net_idx in &networks {
            let edge = Edge::with_detail(
                EdgeKind::RoutedFw,
                EdgeDetail::Firewall(FirewallLink {
                    description: record.description.clone(),
                    security_level: record.security_level,
                }),
            );
            let (_, created) = self.graph.upsert_edge(net_idx, fw_idx, edge, |_| true);
            if created {
                info!(
                    "New: Creating ROUTED_FW Link: {} --> {}",
                    record.vlan, record.name
                );
            }
        }

        networks.len()
    }

    /// Links a network to a transparent firewall it is switched through.
    pub fn upsert_switched_firewall(&mut self, network: &str, firewall: &str) -> Result<EdgeId> {
        let net_idx = self
            .graph
            .get_index(NodeKind::Network, network)
            .ok_or_else(|| TopologyError::not_found("network", network))?;
        let fw_idx = self
            .graph
            .get_index(NodeKind::Switch, firewall)
            .filter(|&idx| {
                self.graph
                    .node(idx)
                    .and_then(TopologyNode::as_switch)
                    .map_or(false, Switch::is_firewall)
            })
            .ok_or_else(|| TopologyError::not_found("firewall", firewall))?;

        let (id, created) =
            self.graph
                .upsert_edge(net_idx, fw_idx, Edge::new(EdgeKind::SwitchedFw), |_| true);
        if created {
            info!("New: Creating SWITCHED_FW Link: {} --> {}", network, firewall);
        }
        Ok(id)
    }

    /// Inserts or refreshes a supernet.
    pub fn upsert_supernet(&mut self, record: &SupernetRecord) -> NodeId {
        let cidr = record.cidr.trunc();
        if self
            .graph
            .get_index(NodeKind::Supernet, &cidr.to_string())
            .is_none()
        {
            info!("New: Inserting Supernet {} ({})", cidr, record.role);
        }
        let supernet = Supernet {
            cidr,
            role: record.role.clone(),
            description: record.description.clone(),
            secure: record.secure,
            last_seen: Utc::now(),
        };
        self.graph.upsert_node(TopologyNode::Supernet(supernet)).0
    }

    /// Links every network to each supernet holding its address and copies
    /// the role of the most specific one. Returns how many SUPER edges were
    /// created.
    pub fn update_supernet_links(&mut self) -> usize {
        let supernets: Vec<(NodeId, Ipv4Net, String)> = self
            .graph
            .nodes_of(NodeKind::Supernet)
            .into_iter()
            .filter_map(|idx| {
                let s = self.graph.node(idx)?.as_supernet()?;
                Some((idx, s.cidr, s.role.clone()))
            })
            .collect();
        let networks: Vec<(NodeId, Ipv4Net)> =
            self.graph.networks().map(|(idx, n)| (idx, n.cidr)).collect();
        let mut created = 0;

        for (net_idx, cidr) in networks {
            let mut best: Option<(Ipv4Net, &str)> = None;
            for (super_idx, super_cidr, role) in &supernets {
                if !super_cidr.contains(&cidr.network()) {
                    continue;
                }
                debug!("{} in Supernet {}", cidr, super_cidr);
                let (_, new) =
                    self.graph
                        .upsert_edge(net_idx, *super_idx, Edge::new(EdgeKind::Super), |_| true);
                if new {
                    info!("New: Creating {} -[SUPER]-> {} Link", cidr, super_cidr);
                    created += 1;
                }
                best = match best {
                    Some((b, r)) if most_specific(b, *super_cidr) == b => Some((b, r)),
                    _ => Some((*super_cidr, role.as_str())),
                };
            }

            if let Some((_, role)) = best {
                if let Some(net) = self.graph.node_mut(net_idx).and_then(TopologyNode::as_network_mut) {
                    net.role = Some(role.to_string());
                }
            }
        }

        created
    }
}
