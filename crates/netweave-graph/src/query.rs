//! Inventory queries: networks, devices, bridge domains and the filtered
//! network and VLAN listings.

use crate::edge::{Edge, EdgeKind};
use crate::graph::{Adjacent, EdgeDirection, NodeId, TopologyGraph};
use netweave_core::cidr::usable_hosts;
use netweave_core::{
    expand_range, longest_match, parse_cidr, EngineConfig, Endpoint, Network, NodeKind, Result,
    ResultFormat, ResultTree, TopologyError, TopologyNode, TreeKind,
};
use std::collections::{BTreeSet, HashSet};
use tracing::info;

/// Read-only lookups that describe one object and its surroundings.
pub struct TopologyQuery<'a> {
    graph: &'a TopologyGraph,
    config: &'a EngineConfig,
}

impl<'a> TopologyQuery<'a> {
    pub fn new(graph: &'a TopologyGraph, config: &'a EngineConfig) -> Self {
        Self { graph, config }
    }

    /// Every network matching an IP (most specific prefix) or a CIDR, one
    /// child per VRF.
    pub fn network_info(&self, input: &str, format: ResultFormat) -> Result<ResultTree> {
        format.ensure_in(&ResultFormat::NESTED)?;
        info!("Query: Network info for {}", input);

        let (ip, cidr) = match Endpoint::parse(input) {
            Endpoint::Ip(ip) => (
                Some(ip),
                longest_match(ip, self.graph.networks().map(|(_, n)| n.cidr)),
            ),
            Endpoint::Cidr(net) => (None, net),
            Endpoint::Host(_) => return Err(TopologyError::InvalidAddress(input.to_string())),
        };

        let mut matches: Vec<(NodeId, &Network)> = self
            .graph
            .networks()
            .filter(|(_, n)| n.cidr == cidr)
            .collect();
        if matches.is_empty() {
            return Err(TopologyError::not_found("network", input));
        }
        matches.sort_by_key(|(_, n)| n.vrfcidr());

        let mut tree = ResultTree::new("IP Object", TreeKind::Networks);
        tree.set_opt("IP", ip.map(|ip| ip.to_string()))
            .set("CIDR", cidr.to_string());
        for (idx, net) in matches {
            tree.add_child(self.network_tree(idx, net));
        }
        Ok(tree)
    }

    fn network_tree(&self, idx: NodeId, net: &Network) -> ResultTree {
        let seczone = self
            .first_neighbor(idx, EdgeKind::VrfIn)
            .and_then(|vrf| self.graph.node(vrf))
            .and_then(TopologyNode::as_vrf)
            .map(|vrf| vrf.seczone);
        let router = self.first_neighbor(idx, EdgeKind::RoutedBy);
        let standby = self.first_neighbor(idx, EdgeKind::RoutedStandby);

        let mut tree = ResultTree::new(net.vrfcidr(), TreeKind::Network);
        tree.set("CIDR", net.cidr.to_string())
            .set("VRF", net.vrf.as_str())
            .set_opt("Gateway", net.gateway.map(|g| g.to_string()))
            .set("Netmask", net.cidr.netmask().to_string())
            .set("Broadcast", net.cidr.broadcast().to_string())
            .set("Size", usable_hosts(&net.cidr))
            .set_opt("Description", net.description.as_ref())
            .set_opt("Role", net.role.as_ref())
            .set_opt("Security Level", seczone)
            .set_opt("Router", router.and_then(|r| self.graph.key_of(r)))
            .set_opt("Standby Router", standby.and_then(|r| self.graph.key_of(r)))
            .set_opt("Location", net.location.as_ref())
            .set_opt("VLAN", net.vlan)
            .set("P2P", net.p2p);
        tree
    }

    /// A switch with its neighbors, routed networks and VLANs.
    pub fn device_info(&self, name: &str, format: ResultFormat) -> Result<ResultTree> {
        format.ensure_in(&ResultFormat::NESTED)?;
        info!("Query: Device info for {}", name);

        let idx = self
            .graph
            .get_index(NodeKind::Switch, name)
            .ok_or_else(|| TopologyError::not_found("switch", name))?;
        let switch = self
            .graph
            .node(idx)
            .and_then(TopologyNode::as_switch)
            .ok_or_else(|| TopologyError::not_found("switch", name))?;
        if switch.distance >= self.config.max_distance {
            return Err(TopologyError::NotInTopology {
                switch: name.to_string(),
            });
        }

        let networks = self.routed_networks(idx);
        let vrfs: BTreeSet<String> = networks
            .children
            .iter()
            .filter_map(|n| n.get("VRF")?.as_str().map(String::from))
            .collect();

        let mut tree = ResultTree::new(switch.name.as_str(), TreeKind::Device);
        tree.set("Name", switch.name.as_str())
            .set("Distance", switch.distance)
            .set("Seed", switch.seed)
            .set_opt("MGMT", switch.mgmt.as_ref())
            .set_opt("Model", switch.model.as_ref())
            .set_opt("Version", switch.version.as_ref())
            .set_opt("Location", switch.location.as_ref())
            .set("Router", switch.is_router())
            .set("Firewall", switch.is_firewall());
        if !vrfs.is_empty() {
            tree.set("VRFs", vrfs.into_iter().collect::<Vec<_>>().join(","));
        }
        tree.add_child(self.neighbor_groups(idx, name));
        if networks.child_count() > 0 {
            tree.add_child(networks);
        }
        let vlans = self.switched_vlans(idx);
        if vlans.child_count() > 0 {
            tree.add_child(vlans);
        }
        Ok(tree)
    }

    /// Neighbors split into Parents (closer to a seed), Equals and Children.
    fn neighbor_groups(&self, idx: NodeId, name: &str) -> ResultTree {
        let groups = [
            ("Parents", EdgeKind::Nei, EdgeDirection::Incoming, TreeKind::Parent),
            ("Equals", EdgeKind::NeiEq, EdgeDirection::Both, TreeKind::Neighbor),
            ("Children", EdgeKind::Nei, EdgeDirection::Outgoing, TreeKind::Neighbor),
        ];

        let mut tree = ResultTree::new("Neighbors", TreeKind::Neighbors);
        for (label, kind, direction, entry_kind) in groups {
            let mut group = ResultTree::new(label, TreeKind::Neighbors);
            for adj in self.graph.neighbors(idx, &[kind], direction) {
                if let Some(entry) = self.neighbor_entry(&adj, name, entry_kind) {
                    group.add_child(entry);
                }
            }
            tree.set(label, group.child_count());
            if group.child_count() > 0 {
                tree.add_child(group);
            }
        }
        tree
    }

    fn neighbor_entry(&self, adj: &Adjacent, name: &str, kind: TreeKind) -> Option<ResultTree> {
        let link = self.graph.edge(adj.edge)?.link()?;
        let remote = self.graph.node(adj.node)?.as_switch()?;
        let (local_port, remote_port, channel) = if link.parent_switch == name {
            (&link.parent_port, &link.child_port, &link.parent_channel)
        } else {
            (&link.child_port, &link.parent_port, &link.child_channel)
        };

        let mut entry = ResultTree::new(remote.name.as_str(), kind);
        entry
            .set("Switch", remote.name.as_str())
            .set("Local Port", local_port)
            .set("Remote Port", remote_port)
            .set_opt("Channel", channel.as_ref())
            .set("Distance", remote.distance)
            .set_opt("MGMT", remote.mgmt.as_ref())
            .set_opt("Link VLANs", link.trunk_vlans.as_ref());
        Some(entry)
    }

    fn routed_networks(&self, idx: NodeId) -> ResultTree {
        let mut tree = ResultTree::new("Networks", TreeKind::Networks);
        for adj in self.graph.neighbors(idx, &EdgeKind::ROUTING, EdgeDirection::Incoming) {
            let (Some(edge), Some(net)) = (
                self.graph.edge(adj.edge),
                self.graph.node(adj.node).and_then(TopologyNode::as_network),
            ) else {
                continue;
            };
            let gateway = edge.route().and_then(|r| r.gateway).or(net.gateway);
            let mut child = ResultTree::new(net.vrfcidr(), TreeKind::Network);
            child
                .set("CIDR", net.cidr.to_string())
                .set("VRF", net.vrf.as_str())
                .set_opt("Gateway", gateway.map(|g| g.to_string()))
                .set("Link", edge.kind.as_str())
                .set_opt("VLAN", net.vlan)
                .set_opt("Description", net.description.as_ref());
            tree.add_child(child);
        }
        tree
    }

    fn switched_vlans(&self, idx: NodeId) -> ResultTree {
        let mut tree = ResultTree::new("VLANs", TreeKind::Vlans);
        for adj in self.graph.neighbors(idx, &[EdgeKind::Switched], EdgeDirection::Incoming) {
            let Some(vlan) = self.graph.node(adj.node).and_then(TopologyNode::as_vlan) else {
                continue;
            };
            let priority = self
                .graph
                .edge(adj.edge)
                .and_then(Edge::switched)
                .map(|s| s.priority);
            let mut child = ResultTree::new(vlan.name(), TreeKind::Vlan);
            child
                .set("VID", vlan.vid)
                .set("Description", vlan.description.as_str())
                .set_opt("Priority", priority)
                .set_opt("Local Root", vlan.local_root.as_ref());
            tree.add_child(child);
        }
        tree
    }

    /// The VLANs bridged with `vname`, the elected root and every BRIDGE link.
    pub fn bridge_domain_info(&self, vname: &str, format: ResultFormat) -> Result<ResultTree> {
        format.ensure_in(&ResultFormat::NESTED)?;
        info!("Query: Bridge domain for {}", vname);

        let idx = self
            .graph
            .get_index(NodeKind::Vlan, vname)
            .ok_or_else(|| TopologyError::not_found("vlan", vname))?;
        let members = self.graph.bridge_domain(idx);

        let mut tree = ResultTree::new(format!("Bridge Domain {}", vname), TreeKind::Election);
        tree.set("VLANs", members.len());
        if let Some((root_vlan, (root, priority))) = self.domain_root(&members) {
            tree.set_opt("Root VLAN", self.graph.key_of(root_vlan))
                .set_opt("Root Switch", self.graph.key_of(root))
                .set("Root Priority", priority);
        }

        let mut bridges = 0;
        for &member in &members {
            let Some(vlan) = self.graph.node(member).and_then(TopologyNode::as_vlan) else {
                continue;
            };
            let mut child = ResultTree::new(vlan.name(), TreeKind::Vlan);
            child
                .set("MGMT", vlan.mgmt.as_str())
                .set("VID", vlan.vid)
                .set("Description", vlan.description.as_str())
                .set_opt("Local Root", vlan.local_root.as_ref())
                .set_opt("Local Priority", vlan.local_priority);
            tree.add_child(child);

            for adj in self.graph.neighbors(member, &[EdgeKind::Bridge], EdgeDirection::Outgoing) {
                let Some(bridge) = self.graph.edge(adj.edge).and_then(Edge::bridge) else {
                    continue;
                };
                let to = self.graph.key_of(adj.node).unwrap_or_default();
                let mut link = ResultTree::new(format!("{} -> {}", vlan.name(), to), TreeKind::Bridge);
                link.set("From VLAN", vlan.name())
                    .set("To VLAN", to)
                    .set("Parent Switch", bridge.parent_switch.as_str())
                    .set("Child Switch", bridge.child_switch.as_str());
                tree.add_child(link);
                bridges += 1;
            }
        }
        tree.set("Bridges", bridges);
        Ok(tree)
    }

    /// Networks accepted by a named group filter from the configuration.
    pub fn networks_on_group(&self, group: &str, format: ResultFormat) -> Result<ResultTree> {
        format.ensure_in(&ResultFormat::ALL)?;
        info!("Query: Network list for group {}", group);
        let filter = self.config.net_filter(group)?;

        let mut tree = ResultTree::new("Networks", TreeKind::Networks);
        tree.set("Group", group).set("Filter", filter);
        for (idx, net) in self.sorted_networks() {
            if net_filter_matches(filter, &net.vrf, net.role.as_deref()) {
                tree.add_child(self.network_tree(idx, net));
            }
        }
        tree.set("Count", tree.child_count());
        Ok(tree)
    }

    /// Networks whose gateway address falls inside `cidr`.
    pub fn networks_on_cidr(&self, cidr: &str, format: ResultFormat) -> Result<ResultTree> {
        format.ensure_in(&ResultFormat::ALL)?;
        info!("Query: Networks in {}", cidr);
        let range = parse_cidr(cidr)?;

        let mut tree = ResultTree::new("IN CIDR", TreeKind::Networks);
        tree.set("CIDR", range.to_string());
        for (idx, net) in self.sorted_networks() {
            if net.gateway.map_or(false, |gw| range.contains(&gw)) {
                tree.add_child(self.network_tree(idx, net));
            }
        }
        tree.set("Count", tree.child_count());
        Ok(tree)
    }

    fn sorted_networks(&self) -> Vec<(NodeId, &Network)> {
        let mut nets: Vec<(NodeId, &Network)> = self.graph.networks().collect();
        nets.sort_by_key(|(_, n)| (n.cidr, n.vrf.clone()));
        nets
    }

    /// Every bridge domain that carries VLAN `vid`, one child per domain.
    pub fn vlan_search(&self, vid: u16, format: ResultFormat) -> Result<ResultTree> {
        format.ensure_in(&ResultFormat::NESTED)?;
        info!("Query: Bridge domains for VID {}", vid);

        let mut tree = ResultTree::new(vid.to_string(), TreeKind::Vlans);
        let mut seen: HashSet<NodeId> = HashSet::new();
        for idx in self.graph.nodes_of(NodeKind::Vlan) {
            let Some(vlan) = self.graph.node(idx).and_then(TopologyNode::as_vlan) else {
                continue;
            };
            if vlan.vid != vid || seen.contains(&idx) {
                continue;
            }
            seen.extend(self.graph.bridge_domain(idx));
            tree.add_child(self.bridge_domain_info(&vlan.name(), format)?);
        }
        if tree.child_count() == 0 {
            return Err(TopologyError::not_found("vlan", vid.to_string()));
        }
        tree.set("Domains", tree.child_count());
        Ok(tree)
    }

    /// VLANs of management group `group` inside `vrange` (`"1-100,200"`),
    /// each with its effective root and member switches.
    pub fn vlans_on_group(&self, group: &str, vrange: &str, format: ResultFormat) -> Result<ResultTree> {
        format.ensure_in(&ResultFormat::ALL)?;
        info!("Query: VLANs {} on group {}", vrange, group);
        let wanted = expand_range(vrange)?;

        let mut vlans: Vec<(NodeId, u16)> = self
            .graph
            .nodes_of(NodeKind::Vlan)
            .into_iter()
            .filter_map(|idx| {
                let vlan = self.graph.node(idx)?.as_vlan()?;
                (vlan.mgmt == group && wanted.contains(&vlan.vid)).then_some((idx, vlan.vid))
            })
            .collect();
        vlans.sort_by_key(|&(_, vid)| vid);

        let mut tree = ResultTree::new(format!("{} VLANs {}", group, vrange), TreeKind::Vlans);
        tree.set("Group", group).set("Range", vrange);
        for (idx, _) in vlans {
            if let Some(child) = self.group_vlan_tree(idx) {
                tree.add_child(child);
            }
        }
        tree.set("Count", tree.child_count());
        Ok(tree)
    }

    fn group_vlan_tree(&self, idx: NodeId) -> Option<ResultTree> {
        let vlan = self.graph.node(idx)?.as_vlan()?;
        // The domain root wins over the local one once bridges are elected
        let root = self
            .domain_root(&self.graph.bridge_domain(idx))
            .and_then(|(_, (switch, _))| self.graph.key_of(switch))
            .or_else(|| vlan.local_root.clone());
        let switches: Vec<String> = self
            .graph
            .neighbors(idx, &[EdgeKind::Switched], EdgeDirection::Outgoing)
            .into_iter()
            .filter_map(|adj| self.graph.key_of(adj.node))
            .collect();

        let mut child = ResultTree::new(vlan.name(), TreeKind::Vlan);
        child
            .set("MGMT", vlan.mgmt.as_str())
            .set("VID", vlan.vid)
            .set("Description", vlan.description.as_str())
            .set_opt("Root", root)
            .set("Switch Count", switches.len())
            .set("Switches", switches.join(","));
        Some(child)
    }

    /// The member of a bridge domain that holds the ROOT edge.
    fn domain_root(&self, members: &[NodeId]) -> Option<(NodeId, (NodeId, u32))> {
        members
            .iter()
            .find_map(|&m| self.graph.root_of(m).map(|r| (m, r)))
    }

    fn first_neighbor(&self, idx: NodeId, kind: EdgeKind) -> Option<NodeId> {
        self.graph
            .neighbors(idx, &[kind], EdgeDirection::Outgoing)
            .first()
            .map(|adj| adj.node)
    }
}

/// Whether a network in `vrf` with supernet role `role` passes a group
/// filter. Clauses are `vrf:role|role` separated by whitespace; a bare
/// clause accepts every role of that VRF.
fn net_filter_matches(filter: &str, vrf: &str, role: Option<&str>) -> bool {
    filter.split_whitespace().any(|clause| {
        let (fvrf, roles) = clause.split_once(':').unwrap_or((clause, "all"));
        if fvrf != vrf && fvrf != "all" {
            return false;
        }
        roles.split('|').any(|r| match r {
            "all" => true,
            "none" => role.is_none(),
            r => role == Some(r),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{NetworkRecord, SupernetRecord, SwitchRecord, TopologyBuilder, VlanRecord};
    use crate::distance::{DistanceEngine, NeighborRecord};
    use crate::vlan_topology::{TrunkRecord, VlanTopology};

    fn config() -> EngineConfig {
        EngineConfig::default().with_seeds(["core1"])
    }

    /// core1 (east router, seed) -- dist1 (east) -- edge1 (west), plus an
    /// unreached lost1.
    fn campus(config: &EngineConfig) -> TopologyGraph {
        let mut graph = TopologyGraph::new();
        let mut builder = TopologyBuilder::new(&mut graph, config);
        let mut core = SwitchRecord::new("core1", "east").router();
        core.location = Some("bldg-a".into());
        builder.upsert_switch(&core);
        builder.upsert_switch(&SwitchRecord::new("core2", "east").router());
        builder.upsert_switch(&SwitchRecord::new("dist1", "east"));
        builder.upsert_switch(&SwitchRecord::new("edge1", "west"));
        builder.upsert_switch(&SwitchRecord::new("lost1", "west"));
        builder.upsert_vrf("corp", 20, None);

        for (mgmt, vid, switch, priority) in [
            ("east", 10, "core1", 4096),
            ("east", 10, "dist1", 8192),
            ("west", 10, "edge1", 32768),
        ] {
            builder
                .upsert_vlan_membership(&VlanRecord {
                    mgmt: mgmt.into(),
                    vid,
                    switch: switch.into(),
                    description: Some("users".into()),
                    priority,
                    ..Default::default()
                })
                .unwrap();
        }

        let mut users = NetworkRecord::new("corp", "10.1.1.0/24".parse().unwrap(), "core1");
        users.gateway = Some("10.1.1.1".parse().unwrap());
        users.vlan = Some(10);
        users.description = Some("user lan".into());
        builder.upsert_network(&users).unwrap();
        let mut standby = NetworkRecord::new("corp", "10.1.1.0/24".parse().unwrap(), "core2");
        standby.standby = true;
        builder.upsert_network(&standby).unwrap();
        builder
            .upsert_network(&NetworkRecord::new("lab", "10.1.1.0/24".parse().unwrap(), "core1"))
            .unwrap();
        builder.upsert_supernet(&SupernetRecord {
            cidr: "10.0.0.0/8".parse().unwrap(),
            role: "campus".into(),
            description: None,
            secure: false,
        });
        builder.update_supernet_links();

        DistanceEngine::new(&mut graph, config)
            .unwrap()
            .import_neighbors(&[
                NeighborRecord::new("core1", "Te1/1", "dist1", "Te1/1"),
                NeighborRecord::new("dist1", "Gi1/48", "edge1", "Gi1/1"),
            ]);

        let trunk = |switch: &str, port: &str| TrunkRecord {
            switch: switch.into(),
            port: port.into(),
            vlans: "10".into(),
            ..Default::default()
        };
        let mut topology = VlanTopology::new(&mut graph).with_config(config);
        topology.update_link_vlans(&[
            trunk("core1", "Te1/1"),
            trunk("dist1", "Te1/1"),
            trunk("dist1", "Gi1/48"),
            trunk("edge1", "Gi1/1"),
        ]);
        topology.update_all();
        graph
    }

    #[test]
    fn test_network_info() {
        let config = config();
        let graph = campus(&config);
        let query = TopologyQuery::new(&graph, &config);

        let tree = query.network_info("10.1.1.77", ResultFormat::Tree).unwrap();
        assert_eq!(tree.name, "IP Object");
        assert_eq!(tree.child_count(), 2);
        let corp = &tree.children[0];
        assert_eq!(corp.name, "corp-10.1.1.0/24");
        assert_eq!(corp.get("Netmask").unwrap().as_str(), Some("255.255.255.0"));
        assert_eq!(corp.get("Broadcast").unwrap().as_str(), Some("10.1.1.255"));
        assert_eq!(corp.get("Size").unwrap().as_int(), Some(254));
        assert_eq!(corp.get("Security Level").unwrap().as_int(), Some(20));
        assert_eq!(corp.get("Router").unwrap().as_str(), Some("core1"));
        assert_eq!(corp.get("Standby Router").unwrap().as_str(), Some("core2"));
        assert_eq!(corp.get("Location").unwrap().as_str(), Some("bldg-a"));
        assert_eq!(corp.get("Role").unwrap().as_str(), Some("campus"));

        assert!(matches!(
            query.network_info("192.168.1.1", ResultFormat::Tree),
            Err(TopologyError::NotFound { .. })
        ));
        assert!(matches!(
            query.network_info("10.1.1.77", ResultFormat::Csv),
            Err(TopologyError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_device_info() {
        let config = config();
        let graph = campus(&config);
        let query = TopologyQuery::new(&graph, &config);

        let tree = query.device_info("dist1", ResultFormat::Json).unwrap();
        assert_eq!(tree.get("Distance").unwrap().as_int(), Some(1));
        let neighbors = tree.find(TreeKind::Neighbors).unwrap();
        assert_eq!(neighbors.get("Parents").unwrap().as_int(), Some(1));
        assert_eq!(neighbors.get("Children").unwrap().as_int(), Some(1));
        assert_eq!(neighbors.get("Equals").unwrap().as_int(), Some(0));
        let parent = neighbors.children[0].find(TreeKind::Parent).unwrap();
        assert_eq!(parent.get("Switch").unwrap().as_str(), Some("core1"));
        assert_eq!(parent.get("Local Port").unwrap().as_str(), Some("Te1/1"));
        assert!(tree.find(TreeKind::Vlans).is_some());

        let core = query.device_info("core1", ResultFormat::Tree).unwrap();
        assert_eq!(core.get("VRFs").unwrap().as_str(), Some("corp,lab"));
        assert_eq!(core.find(TreeKind::Networks).unwrap().child_count(), 2);

        assert!(matches!(
            query.device_info("lost1", ResultFormat::Tree),
            Err(TopologyError::NotInTopology { .. })
        ));
        assert!(matches!(
            query.device_info("nope", ResultFormat::Tree),
            Err(TopologyError::NotFound { .. })
        ));
    }

    #[test]
    fn test_bridge_domain_info() {
        let config = config();
        let graph = campus(&config);
        let query = TopologyQuery::new(&graph, &config);

        let tree = query.bridge_domain_info("west-10", ResultFormat::NgTree).unwrap();
        assert_eq!(tree.get("VLANs").unwrap().as_int(), Some(2));
        assert_eq!(tree.get("Bridges").unwrap().as_int(), Some(1));
        assert_eq!(tree.get("Root Switch").unwrap().as_str(), Some("core1"));
        assert_eq!(tree.get("Root VLAN").unwrap().as_str(), Some("east-10"));
        let bridge = tree.find(TreeKind::Bridge).unwrap();
        assert_eq!(bridge.get("From VLAN").unwrap().as_str(), Some("east-10"));
        assert_eq!(bridge.get("Child Switch").unwrap().as_str(), Some("edge1"));
    }

    #[test]
    fn test_net_filter_clauses() {
        assert!(net_filter_matches("corp:campus|wan", "corp", Some("wan")));
        assert!(!net_filter_matches("corp:campus|wan", "lab", Some("wan")));
        assert!(net_filter_matches("default:none pci:all", "default", None));
        assert!(!net_filter_matches("default:none", "default", Some("campus")));
        assert!(net_filter_matches("pci:all", "pci", Some("vendor")));
        assert!(net_filter_matches("all:printer", "guest", Some("printer")));
        assert!(net_filter_matches("lab", "lab", None));
    }

    #[test]
    fn test_networks_on_group() {
        let config = config()
            .with_net_group("ops", "corp:campus")
            .with_net_group("labs", "lab")
            .with_net_group("unassigned", "all:none");
        let graph = campus(&config);
        let query = TopologyQuery::new(&graph, &config);

        let ops = query.networks_on_group("ops", ResultFormat::Csv).unwrap();
        assert_eq!(ops.get("Group").unwrap().as_str(), Some("ops"));
        assert_eq!(ops.get("Count").unwrap().as_int(), Some(1));
        assert_eq!(ops.children[0].name, "corp-10.1.1.0/24");
        assert_eq!(ops.children[0].get("Router").unwrap().as_str(), Some("core1"));

        let labs = query.networks_on_group("labs", ResultFormat::Json).unwrap();
        assert_eq!(labs.child_count(), 1);
        assert_eq!(labs.children[0].get("VRF").unwrap().as_str(), Some("lab"));

        let none = query.networks_on_group("unassigned", ResultFormat::Tree).unwrap();
        assert_eq!(none.child_count(), 0);

        assert!(matches!(
            query.networks_on_group("finance", ResultFormat::Tree),
            Err(TopologyError::Config(_))
        ));
    }

    #[test]
    fn test_networks_on_cidr() {
        let config = config();
        let graph = campus(&config);
        let query = TopologyQuery::new(&graph, &config);

        // lab has no gateway, so only corp qualifies
        let tree = query.networks_on_cidr("10.1.1.0/25", ResultFormat::Tree).unwrap();
        assert_eq!(tree.name, "IN CIDR");
        assert_eq!(tree.get("CIDR").unwrap().as_str(), Some("10.1.1.0/25"));
        assert_eq!(tree.child_count(), 1);
        assert_eq!(tree.children[0].get("Gateway").unwrap().as_str(), Some("10.1.1.1"));

        let empty = query.networks_on_cidr("192.168.0.0/16", ResultFormat::Tree).unwrap();
        assert_eq!(empty.get("Count").unwrap().as_int(), Some(0));
        assert!(query.networks_on_cidr("10.1.1", ResultFormat::Tree).is_err());
    }

    #[test]
    fn test_vlan_search() {
        let config = config();
        let graph = campus(&config);
        let query = TopologyQuery::new(&graph, &config);

        // east-10 and west-10 are bridged into one domain
        let tree = query.vlan_search(10, ResultFormat::Tree).unwrap();
        assert_eq!(tree.name, "10");
        assert_eq!(tree.get("Domains").unwrap().as_int(), Some(1));
        let domain = &tree.children[0];
        assert_eq!(domain.kind, TreeKind::Election);
        assert_eq!(domain.get("VLANs").unwrap().as_int(), Some(2));
        assert_eq!(domain.get("Root Switch").unwrap().as_str(), Some("core1"));

        assert!(matches!(
            query.vlan_search(99, ResultFormat::Tree),
            Err(TopologyError::NotFound { .. })
        ));
    }

    #[test]
    fn test_vlans_on_group() {
        let config = config();
        let graph = campus(&config);
        let query = TopologyQuery::new(&graph, &config);

        let west = query.vlans_on_group("west", "1-100", ResultFormat::Csv).unwrap();
        assert_eq!(west.child_count(), 1);
        let vlan = &west.children[0];
        assert_eq!(vlan.name, "west-10");
        assert_eq!(vlan.get("Description").unwrap().as_str(), Some("users"));
        // elected across the bridge, not inside west
        assert_eq!(vlan.get("Root").unwrap().as_str(), Some("core1"));
        assert_eq!(vlan.get("Switches").unwrap().as_str(), Some("edge1"));

        let east = query.vlans_on_group("east", "10", ResultFormat::Tree).unwrap();
        assert_eq!(east.children[0].get("Switch Count").unwrap().as_int(), Some(2));
        assert_eq!(east.children[0].get("Switches").unwrap().as_str(), Some("core1,dist1"));

        let outside = query.vlans_on_group("east", "20-30", ResultFormat::Tree).unwrap();
        assert_eq!(outside.get("Count").unwrap().as_int(), Some(0));
        assert!(query.vlans_on_group("east", "x-y", ResultFormat::Tree).is_err());
    }
}
