//! Layer-4 paths: which firewalls sit between two VRFs.

use super::{PathFinder, QueryOptions};
use crate::edge::EdgeKind;
use crate::graph::{EdgeDirection, NodeId};
use crate::search::PathQuery;
use netweave_core::{Result, ResultFormat, ResultTree, TopologyError, TopologyNode, TreeKind};
use tracing::{debug, info};

impl<'a> PathFinder<'a> {
    /// The firewall path between the VRFs holding `src` and `dst`.
    ///
    /// Hops are VRFs (`L4-VRF`), firewalls (`L4-FW`) and the firewall
    /// interface networks between them (`L4-GW`), in path order. Network
    /// hops carry the gateway routed paths stitch onto; firewall hops carry
    /// the hostname and log index for log correlation.
    pub fn security_path(&self, src: &str, dst: &str, opts: &QueryOptions) -> Result<ResultTree> {
        opts.format.ensure_in(&ResultFormat::ALL)?;
        info!("Query: Tracing {} --> {}", src, dst);

        let src_net = self.network_for(src, None)?;
        let dst_net = self.network_for(dst, None)?;
        let src_vrf = self
            .vrf_of(src_net.idx)
            .ok_or_else(|| TopologyError::not_found("vrf", &src_net.vrf))?;
        let dst_vrf = self
            .vrf_of(dst_net.idx)
            .ok_or_else(|| TopologyError::not_found("vrf", &dst_net.vrf))?;

        let query = PathQuery::undirected(&EdgeKind::SECURITY, opts.double_depth());
        let path = self
            .graph
            .shortest_paths(&[src_vrf], &[dst_vrf], &query)
            .into_iter()
            .next()
            .ok_or_else(|| TopologyError::no_path("security", src, dst))?;

        let mut tree = ResultTree::new(format!("{} -> {}", src, dst), TreeKind::SecurityPath);
        let mut summary = vec![src_net.cidr.to_string()];
        let mut firewalls: usize = 0;

        for &idx in &path.nodes {
            let Some(node) = self.graph.node(idx) else {
                continue;
            };
            match node {
                TopologyNode::Vrf(vrf) => {
                    summary.push(format!("VRF:{}", vrf.name));
                    let mut hop = ResultTree::new(format!("VRF:{}", vrf.name), TreeKind::SecurityVrf);
                    hop.set("VRF", vrf.name.as_str())
                        .set("Security Zone", vrf.seczone)
                        .set_opt("Description", vrf.description.as_ref());
                    tree.add_child(hop);
                }
                TopologyNode::Switch(sw) => {
                    let Some(fw) = &sw.firewall else {
                        continue;
                    };
                    summary.push(sw.name.clone());
                    firewalls += 1;
                    let mut hop = ResultTree::new(sw.name.as_str(), TreeKind::SecurityFirewall);
                    hop.set("Name", sw.name.as_str())
                        .set("Hostname", fw.hostname.as_str())
                        .set("LogIndex", fw.log_index.as_str())
                        .set_opt("URL", self.log_url(&fw.hostname, &fw.log_index, src, dst));
                    tree.add_child(hop);
                }
                TopologyNode::Network(net) => {
                    let mut hop = ResultTree::new(net.vrfcidr(), TreeKind::SecurityGateway);
                    hop.set("CIDR", net.cidr.to_string())
                        .set("VRF", net.vrf.as_str())
                        .set_opt("Gateway", net.gateway.map(|g| g.to_string()))
                        .set_opt("Description", net.description.as_ref());
                    tree.add_child(hop);
                }
                _ => {}
            }
        }

        summary.push(dst_net.cidr.to_string());
        let summary = summary.join(" --> ");
        debug!("Security Path: {}", summary);
        tree.set("Path", summary).set("Firewalls", firewalls);
        Ok(tree)
    }

    /// The VRF a network belongs to.
    fn vrf_of(&self, network: NodeId) -> Option<NodeId> {
        self.graph
            .neighbors(network, &[EdgeKind::VrfIn], EdgeDirection::Outgoing)
            .first()
            .map(|adj| adj.node)
    }

    /// Log search link for traffic between `src` and `dst` through one firewall.
    fn log_url(&self, hostname: &str, log_index: &str, src: &str, dst: &str) -> Option<String> {
        let base = self.config.log_url.as_deref()?;
        let query = format!("index={} host::{} {} {}", log_index, hostname, src, dst);
        Some(format!("{}{}", base, query.replace(' ', "%20")))
    }
}
