//! Edge types for the topology graph.
//!
//! Every edge carries a kind, a last-seen timestamp and a kind-specific
//! payload. Edge kinds mirror the relationships importers can observe:
//! switch adjacency, routing, VRF membership, VLAN membership and the
//! bridge/root structure produced by election.

use chrono::{DateTime, Utc};
use netweave_core::VlanSet;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// The type of relationship between two topology nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Switch adjacency from the lower-distance parent to its child.
    Nei,

    /// Switch adjacency between equal-distance switches. One per pair.
    NeiEq,

    /// Network to its primary first-hop router.
    RoutedBy,

    /// Network to its standby first-hop router.
    RoutedStandby,

    /// Point-to-point transit network to a router, tagged by VRF.
    Routed,

    /// Network to a firewall interface that routes it.
    RoutedFw,

    /// Network to a transparent firewall it is switched through.
    SwitchedFw,

    /// Network membership in a VRF.
    VrfIn,

    /// VLAN present on a switch.
    Switched,

    /// VLAN to VLAN across management groups.
    Bridge,

    /// VLAN to the globally elected root switch of its bridge domain.
    Root,

    /// Network contained in a supernet.
    Super,

    /// Network to the layer-2 VLAN that carries it on its router.
    L3ToL2,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nei => "NEI",
            Self::NeiEq => "NEI_EQ",
            Self::RoutedBy => "ROUTED_BY",
            Self::RoutedStandby => "ROUTED_STANDBY",
            Self::Routed => "ROUTED",
            Self::RoutedFw => "ROUTED_FW",
            Self::SwitchedFw => "SWITCHED_FW",
            Self::VrfIn => "VRF_IN",
            Self::Switched => "Switched",
            Self::Bridge => "BRIDGE",
            Self::Root => "ROOT",
            Self::Super => "SUPER",
            Self::L3ToL2 => "L3toL2",
        }
    }

    /// Switch adjacency kinds used by distance propagation and switched paths.
    pub const NEIGHBOR: [EdgeKind; 2] = [EdgeKind::Nei, EdgeKind::NeiEq];

    /// Kinds traversed by routed paths.
    pub const ROUTING: [EdgeKind; 3] = [EdgeKind::Routed, EdgeKind::RoutedBy, EdgeKind::RoutedStandby];

    /// Kinds traversed by security paths.
    pub const SECURITY: [EdgeKind; 3] = [EdgeKind::VrfIn, EdgeKind::RoutedFw, EdgeKind::SwitchedFw];
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Adjacency metadata for NEI and NEI_EQ edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub parent_switch: String,
    pub parent_port: String,
    pub child_switch: String,
    pub child_port: String,
    pub parent_channel: Option<String>,
    pub child_channel: Option<String>,
    /// VLANs allowed on both trunk ends, compacted.
    pub trunk_vlans: Option<String>,
    /// VLANs allowed on the trunk and present on both switches.
    pub traversing: VlanSet,
    pub native_vlan: Option<u16>,
    pub description: Option<String>,
}

impl LinkInfo {
    pub fn new(
        parent_switch: impl Into<String>,
        parent_port: impl Into<String>,
        child_switch: impl Into<String>,
        child_port: impl Into<String>,
    ) -> Self {
        Self {
            parent_switch: parent_switch.into(),
            parent_port: parent_port.into(),
            child_switch: child_switch.into(),
            child_port: child_port.into(),
            ..Default::default()
        }
    }

    /// True when this link joins the given switch/port pairs, in either orientation.
    pub fn joins(&self, a: &str, a_port: &str, b: &str, b_port: &str) -> bool {
        (self.parent_switch == a
            && self.parent_port == a_port
            && self.child_switch == b
            && self.child_port == b_port)
            || (self.parent_switch == b
                && self.parent_port == b_port
                && self.child_switch == a
                && self.child_port == a_port)
    }
}

/// Routing metadata for ROUTED, ROUTED_BY and ROUTED_STANDBY edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub vrf: String,
    pub gateway: Option<Ipv4Addr>,
}

/// Per-switch VLAN metadata carried on Switched edges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchedInfo {
    pub description: Option<String>,
    /// Local spanning-tree priority; 0 means not reported.
    pub priority: u32,
    pub port_count: u32,
    pub mac_count: u32,
}

/// The switch pair that bridges two VLANs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeInfo {
    pub parent_switch: String,
    pub child_switch: String,
}

/// Firewall interface metadata for ROUTED_FW edges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallLink {
    pub description: Option<String>,
    pub security_level: Option<u32>,
}

/// Kind-specific edge payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EdgeDetail {
    None,
    Link(LinkInfo),
    Route(RouteInfo),
    Switched(SwitchedInfo),
    Bridge(BridgeInfo),
    Root { priority: u32 },
    Firewall(FirewallLink),
}

/// An edge in the topology graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// The kind of relationship.
    pub kind: EdgeKind,

    /// When an importer last observed this relationship.
    pub last_seen: DateTime<Utc>,

    /// Kind-specific attributes.
    pub detail: EdgeDetail,
}

impl Edge {
    /// Creates an edge with no payload.
    pub fn new(kind: EdgeKind) -> Self {
        Self {
            kind,
            last_seen: Utc::now(),
            detail: EdgeDetail::None,
        }
    }

    /// Creates an edge with a payload.
    pub fn with_detail(kind: EdgeKind, detail: EdgeDetail) -> Self {
        Self {
            kind,
            last_seen: Utc::now(),
            detail,
        }
    }

    pub fn link(&self) -> Option<&LinkInfo> {
        match &self.detail {
            EdgeDetail::Link(link) => Some(link),
            _ => None,
        }
    }

    pub fn link_mut(&mut self) -> Option<&mut LinkInfo> {
        match &mut self.detail {
            EdgeDetail::Link(link) => Some(link),
            _ => None,
        }
    }

    pub fn route(&self) -> Option<&RouteInfo> {
        match &self.detail {
            EdgeDetail::Route(route) => Some(route),
            _ => None,
        }
    }

    pub fn switched(&self) -> Option<&SwitchedInfo> {
        match &self.detail {
            EdgeDetail::Switched(info) => Some(info),
            _ => None,
        }
    }

    pub fn bridge(&self) -> Option<&BridgeInfo> {
        match &self.detail {
            EdgeDetail::Bridge(info) => Some(info),
            _ => None,
        }
    }

    /// VRF tag of a routing edge.
    pub fn vrf(&self) -> Option<&str> {
        self.route().map(|r| r.vrf.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_joins_either_way() {
        let link = LinkInfo::new("core1", "Te1/1", "dist1", "Te0/1");
        assert!(link.joins("core1", "Te1/1", "dist1", "Te0/1"));
        assert!(link.joins("dist1", "Te0/1", "core1", "Te1/1"));
        assert!(!link.joins("core1", "Te1/2", "dist1", "Te0/1"));
    }

    #[test]
    fn test_detail_accessors() {
        let edge = Edge::with_detail(
            EdgeKind::Routed,
            EdgeDetail::Route(RouteInfo {
                vrf: "corp".into(),
                gateway: Some(Ipv4Addr::new(10, 0, 0, 1)),
            }),
        );
        assert_eq!(edge.vrf(), Some("corp"));
        assert!(edge.link().is_none());
        assert_eq!(EdgeKind::NeiEq.to_string(), "NEI_EQ");
    }
}
