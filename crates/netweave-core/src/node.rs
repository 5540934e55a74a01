//! Topology node types.
//!
//! Every node carries a natural key (switch name, vrfcidr, VLAN name, ...)
//! so that repeated imports update the same node instead of duplicating it.

use chrono::{DateTime, Utc};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// The kind of entity a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Any layer-2/3 device; routers and firewalls are switches with extra roles.
    Switch,
    /// An IP subnet inside one VRF.
    Network,
    /// A routing domain.
    Vrf,
    /// A VLAN inside one management group.
    Vlan,
    /// An address block used to tag networks with a role.
    Supernet,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Switch => "switch",
            NodeKind::Network => "network",
            NodeKind::Vrf => "vrf",
            NodeKind::Vlan => "vlan",
            NodeKind::Supernet => "supernet",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Builds the `(VRF, CIDR)` natural key of a network.
pub fn vrfcidr(vrf: &str, cidr: &Ipv4Net) -> String {
    format!("{}-{}", vrf, cidr)
}

/// Builds the `(management group, VLAN id)` natural key of a VLAN.
pub fn vlan_name(mgmt: &str, vid: u16) -> String {
    format!("{}-{}", mgmt, vid)
}

/// Router capability of a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterRole {
    /// Standby member of a first-hop redundancy pair.
    pub standby: bool,
}

/// Firewall capability of a switch. Forwarded to log correlation untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallInfo {
    pub hostname: String,
    pub log_index: String,
}

/// A switch, router or firewall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Switch {
    pub name: String,
    /// Hops from the nearest seed; the configured max means "unreached".
    pub distance: u32,
    pub seed: bool,
    pub mgmt: Option<String>,
    pub model: Option<String>,
    pub version: Option<String>,
    pub location: Option<String>,
    pub router: Option<RouterRole>,
    pub firewall: Option<FirewallInfo>,
    pub last_seen: DateTime<Utc>,
}

impl Switch {
    pub fn new(name: impl Into<String>, distance: u32) -> Self {
        Self {
            name: name.into(),
            distance,
            seed: false,
            mgmt: None,
            model: None,
            version: None,
            location: None,
            router: None,
            firewall: None,
            last_seen: Utc::now(),
        }
    }

    pub fn is_router(&self) -> bool {
        self.router.is_some()
    }

    pub fn is_firewall(&self) -> bool {
        self.firewall.is_some()
    }
}

/// An IP subnet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub cidr: Ipv4Net,
    pub vrf: String,
    pub vlan: Option<u16>,
    pub gateway: Option<Ipv4Addr>,
    pub description: Option<String>,
    /// Role inherited from the most specific containing supernet.
    pub role: Option<String>,
    /// Point-to-point transit network between routers.
    pub p2p: bool,
    pub location: Option<String>,
    pub last_seen: DateTime<Utc>,
}

impl Network {
    pub fn new(vrf: impl Into<String>, cidr: Ipv4Net) -> Self {
        Self {
            cidr,
            vrf: vrf.into(),
            vlan: None,
            gateway: None,
            description: None,
            role: None,
            p2p: false,
            location: None,
            last_seen: Utc::now(),
        }
    }

    pub fn vrfcidr(&self) -> String {
        vrfcidr(&self.vrf, &self.cidr)
    }
}

/// A routing domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vrf {
    pub name: String,
    pub seczone: u32,
    pub description: Option<String>,
    pub last_seen: DateTime<Utc>,
}

/// A VLAN within one management group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vlan {
    pub mgmt: String,
    pub vid: u16,
    pub description: String,
    /// Lowest-priority switch inside this management group.
    pub local_root: Option<String>,
    /// `None` when no switch reported a usable priority.
    pub local_priority: Option<u32>,
    pub last_seen: DateTime<Utc>,
}

impl Vlan {
    pub fn new(mgmt: impl Into<String>, vid: u16) -> Self {
        Self {
            mgmt: mgmt.into(),
            vid,
            description: "Unknown".to_string(),
            local_root: None,
            local_priority: None,
            last_seen: Utc::now(),
        }
    }

    pub fn name(&self) -> String {
        vlan_name(&self.mgmt, self.vid)
    }
}

/// An address block carrying a role for the networks inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supernet {
    pub cidr: Ipv4Net,
    pub role: String,
    pub description: Option<String>,
    pub secure: bool,
    pub last_seen: DateTime<Utc>,
}

/// A node in the topology graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TopologyNode {
    Switch(Switch),
    Network(Network),
    Vrf(Vrf),
    Vlan(Vlan),
    Supernet(Supernet),
}

impl TopologyNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            TopologyNode::Switch(_) => NodeKind::Switch,
            TopologyNode::Network(_) => NodeKind::Network,
            TopologyNode::Vrf(_) => NodeKind::Vrf,
            TopologyNode::Vlan(_) => NodeKind::Vlan,
            TopologyNode::Supernet(_) => NodeKind::Supernet,
        }
    }

    /// The natural key this node is indexed by.
    pub fn key(&self) -> String {
        match self {
            TopologyNode::Switch(s) => s.name.clone(),
            TopologyNode::Network(n) => n.vrfcidr(),
            TopologyNode::Vrf(v) => v.name.clone(),
            TopologyNode::Vlan(v) => v.name(),
            TopologyNode::Supernet(s) => s.cidr.to_string(),
        }
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        match self {
            TopologyNode::Switch(s) => s.last_seen,
            TopologyNode::Network(n) => n.last_seen,
            TopologyNode::Vrf(v) => v.last_seen,
            TopologyNode::Vlan(v) => v.last_seen,
            TopologyNode::Supernet(s) => s.last_seen,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        match self {
            TopologyNode::Switch(s) => s.last_seen = now,
            TopologyNode::Network(n) => n.last_seen = now,
            TopologyNode::Vrf(v) => v.last_seen = now,
            TopologyNode::Vlan(v) => v.last_seen = now,
            TopologyNode::Supernet(s) => s.last_seen = now,
        }
    }

    pub fn as_switch(&self) -> Option<&Switch> {
        match self {
            TopologyNode::Switch(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_switch_mut(&mut self) -> Option<&mut Switch> {
        match self {
            TopologyNode::Switch(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_network(&self) -> Option<&Network> {
        match self {
            TopologyNode::Network(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_network_mut(&mut self) -> Option<&mut Network> {
        match self {
            TopologyNode::Network(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_vrf(&self) -> Option<&Vrf> {
        match self {
            TopologyNode::Vrf(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vlan(&self) -> Option<&Vlan> {
        match self {
            TopologyNode::Vlan(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vlan_mut(&mut self) -> Option<&mut Vlan> {
        match self {
            TopologyNode::Vlan(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_supernet(&self) -> Option<&Supernet> {
        match self {
            TopologyNode::Supernet(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_keys() {
        let net = Network::new("corp", "10.1.2.0/24".parse().unwrap());
        assert_eq!(net.vrfcidr(), "corp-10.1.2.0/24");

        let vlan = Vlan::new("campus", 120);
        assert_eq!(vlan.name(), "campus-120");
        assert_eq!(TopologyNode::Vlan(vlan).key(), "campus-120");
    }

    #[test]
    fn test_switch_roles() {
        let mut sw = Switch::new("fw1", 1000);
        assert!(!sw.is_router());
        sw.router = Some(RouterRole { standby: false });
        sw.firewall = Some(FirewallInfo {
            hostname: "fw1.example.net".into(),
            log_index: "fwlogs".into(),
        });
        let node = TopologyNode::Switch(sw);
        assert_eq!(node.kind(), NodeKind::Switch);
        assert!(node.as_switch().unwrap().is_firewall());
        assert!(node.as_network().is_none());
    }
}
