//! Seed-based distance propagation.
//!
//! Every switch carries its hop distance from the nearest seed. Neighbor
//! records are turned into directed NEI edges (parent to child) or a single
//! NEI_EQ edge between equal-distance switches, and each import nudges the
//! endpoints' distance by one-hop local relaxation. Repeating the import
//! until nothing changes converges to true shortest distances.

use crate::edge::{Edge, EdgeDetail, EdgeKind, LinkInfo};
use crate::graph::{EdgeDirection, NodeId, TopologyGraph};
use chrono::Utc;
use netweave_core::{EngineConfig, NodeKind, Result, Switch, TopologyError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One CDP/LLDP style adjacency as reported by the local switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborRecord {
    pub local: String,
    pub local_port: String,
    pub remote: String,
    pub remote_port: String,
}

impl NeighborRecord {
    pub fn new(
        local: impl Into<String>,
        local_port: impl Into<String>,
        remote: impl Into<String>,
        remote_port: impl Into<String>,
    ) -> Self {
        Self {
            local: local.into(),
            local_port: local_port.into(),
            remote: remote.into(),
            remote_port: remote_port.into(),
        }
    }
}

/// What `import_neighbor` did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborLink {
    /// NEI edge local -> remote.
    Parent { created: bool },
    /// NEI_EQ edge between the pair.
    Equal { created: bool },
    /// Remote is closer to a seed (the reverse record links it) or the
    /// local switch is unreached.
    Ignored,
}

/// Counters from one neighbor import batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub processed: usize,
    pub skipped: usize,
    pub parent_links: usize,
    pub equal_links: usize,
    pub distance_changes: usize,
    pub passes: usize,
}

impl ImportSummary {
    fn absorb(&mut self, other: &ImportSummary) {
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.parent_links += other.parent_links;
        self.equal_links += other.equal_links;
        self.distance_changes += other.distance_changes;
        self.passes += other.passes;
    }
}

/// Maintains switch distances and neighbor edges.
pub struct DistanceEngine<'a> {
    graph: &'a mut TopologyGraph,
    config: &'a EngineConfig,
    exclude: Option<Regex>,
    port_exclude: Option<Regex>,
}

impl<'a> DistanceEngine<'a> {
    pub fn new(graph: &'a mut TopologyGraph, config: &'a EngineConfig) -> Result<Self> {
        Ok(Self {
            graph,
            config,
            exclude: config.dist_exclude_regex()?,
            port_exclude: config.port_exclude_regex()?,
        })
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.exclude.as_ref().map_or(false, |re| re.is_match(name))
    }

    fn is_seed(&self, switch: &Switch) -> bool {
        switch.seed || self.config.is_seed(&switch.name)
    }

    fn switch_index(&self, name: &str) -> Result<NodeId> {
        self.graph
            .get_index(NodeKind::Switch, name)
            .ok_or_else(|| TopologyError::not_found("switch", name))
    }

    fn distance_of(&self, idx: NodeId) -> Option<u32> {
        self.graph.node(idx)?.as_switch().map(|s| s.distance)
    }

    /// Resets every non-excluded switch to the unreached sentinel, pins seeds
    /// to 0 and deletes all neighbor edges. Returns how many edges were removed.
    pub fn reseed(&mut self) -> usize {
        info!("Reseeding all Switches and Deleting all Neighbors");
        let max = self.config.max_distance;

        for idx in self.graph.nodes_of(NodeKind::Switch) {
            let (seed, excluded) = match self.graph.node(idx).and_then(|n| n.as_switch()) {
                Some(sw) => (self.is_seed(sw), self.is_excluded(&sw.name)),
                None => continue,
            };
            if let Some(sw) = self.graph.node_mut(idx).and_then(|n| n.as_switch_mut()) {
                if seed {
                    sw.seed = true;
                    sw.distance = 0;
                } else if !excluded {
                    sw.distance = max;
                }
            }
        }

        self.graph.remove_edges_of(&EdgeKind::NEIGHBOR)
    }

    /// One-hop local relaxation of a switch's distance against its NEI neighbors.
    ///
    /// Returns the new distance when it changed.
    pub fn update_distance(&mut self, name: &str) -> Result<Option<u32>> {
        let idx = self.switch_index(name)?;
        if self.is_excluded(name) {
            return Ok(None);
        }

        let neighbors = self
            .graph
            .neighbors(idx, &[EdgeKind::Nei], EdgeDirection::Both);
        if neighbors.is_empty() {
            return Ok(None);
        }

        let (current, seed) = match self.graph.node(idx).and_then(|n| n.as_switch()) {
            Some(sw) => (sw.distance, self.is_seed(sw)),
            None => return Ok(None),
        };
        if seed {
            return Ok(None);
        }

        let max = self.config.max_distance;
        let low = neighbors
            .iter()
            .filter_map(|adj| self.distance_of(adj.node))
            .min()
            .unwrap_or(max);

        let mut next = current;
        if current > low.saturating_add(1) || current <= low {
            next = low.saturating_add(1);
        }

        if next != current && next < max {
            info!("New: Switch Distance: {} ({}-->{})", name, current, next);
            if let Some(sw) = self.graph.node_mut(idx).and_then(|n| n.as_switch_mut()) {
                sw.distance = next;
            }
            return Ok(Some(next));
        }
        Ok(None)
    }

    /// Links two adjacent switches according to their current distances.
    pub fn import_neighbor(&mut self, record: &NeighborRecord) -> Result<NeighborLink> {
        let local = self.switch_index(&record.local)?;
        let remote = self.switch_index(&record.remote)?;
        let (local_d, remote_d) = match (self.distance_of(local), self.distance_of(remote)) {
            (Some(l), Some(r)) => (l, r),
            _ => return Ok(NeighborLink::Ignored),
        };
        let max = self.config.max_distance;

        if remote_d > local_d && local_d < max {
            debug!(
                "Found Neighbor with Higher Distance {} --> {}",
                record.local, record.remote
            );
            let created = self.link(local, remote, EdgeKind::Nei, record, false);
            return Ok(NeighborLink::Parent { created });
        }

        if remote_d == local_d && local_d < max {
            debug!(
                "Found Neighbor with Equal Distance {} --> {}",
                record.local, record.remote
            );
            // Equal neighbors report each other; refresh whichever orientation exists
            let reverse = self.graph.find_edge(remote, local, EdgeKind::NeiEq, |e| {
                e.link().map_or(false, |l| {
                    l.parent_port == record.remote_port && l.child_port == record.local_port
                })
            });
            let created = match reverse {
                Some(id) => {
                    if let Some(edge) = self.graph.edge_mut(id) {
                        edge.last_seen = Utc::now();
                    }
                    false
                }
                None => self.link(local, remote, EdgeKind::NeiEq, record, true),
            };
            return Ok(NeighborLink::Equal { created });
        }

        Ok(NeighborLink::Ignored)
    }

    /// Creates or refreshes a directed adjacency keyed by (parent, child, ports).
    fn link(&mut self, parent: NodeId, child: NodeId, kind: EdgeKind, record: &NeighborRecord, equal: bool) -> bool {
        let existing = self.graph.find_edge(parent, child, kind, |e| {
            e.link().map_or(false, |l| {
                l.parent_port == record.local_port && l.child_port == record.remote_port
            })
        });

        match existing {
            Some(id) => {
                debug!(
                    "Updated {} {}:{} --> {}:{}",
                    kind, record.local, record.local_port, record.remote, record.remote_port
                );
                if let Some(edge) = self.graph.edge_mut(id) {
                    edge.last_seen = Utc::now();
                }
                false
            }
            None => {
                info!(
                    "New: Creating {} Relationship {} --> {}{}",
                    kind,
                    record.local,
                    record.remote,
                    if equal { " (equal distance)" } else { "" }
                );
                let link = LinkInfo::new(
                    &record.local,
                    &record.local_port,
                    &record.remote,
                    &record.remote_port,
                );
                self.graph
                    .add_edge(parent, child, Edge::with_detail(kind, EdgeDetail::Link(link)));
                true
            }
        }
    }

    /// Imports a batch of neighbor records, relaxing both endpoints of each.
    ///
    /// Records on excluded ports or naming unknown switches are logged and
    /// skipped without aborting the batch.
    pub fn import_neighbors(&mut self, records: &[NeighborRecord]) -> ImportSummary {
        let mut summary = ImportSummary {
            passes: 1,
            ..Default::default()
        };

        for record in records {
            if let Some(re) = &self.port_exclude {
                if re.is_match(&record.local_port) || re.is_match(&record.remote_port) {
                    warn!("Skipping NEI: {} ({})", record.remote, record.remote_port);
                    summary.skipped += 1;
                    continue;
                }
            }

            match self.import_neighbor(record) {
                Ok(NeighborLink::Parent { .. }) => summary.parent_links += 1,
                Ok(NeighborLink::Equal { .. }) => summary.equal_links += 1,
                Ok(NeighborLink::Ignored) => {}
                Err(err) => {
                    warn!("Skipping NEI {} -> {}: {}", record.local, record.remote, err);
                    summary.skipped += 1;
                    continue;
                }
            }
            summary.processed += 1;

            for name in [&record.local, &record.remote] {
                match self.update_distance(name) {
                    Ok(Some(_)) => summary.distance_changes += 1,
                    Ok(None) => {}
                    Err(err) => {
                        warn!("Skipping distance update for {}: {}", name, err);
                        summary.skipped += 1;
                    }
                }
            }
        }

        summary
    }

    /// Repeats `import_neighbors` until a pass changes no distance, at most
    /// `max_passes` times.
    pub fn converge(&mut self, records: &[NeighborRecord], max_passes: usize) -> ImportSummary {
        let mut total = ImportSummary::default();
        for _ in 0..max_passes {
            let pass = self.import_neighbors(records);
            total.absorb(&pass);
            if pass.distance_changes == 0 {
                break;
            }
        }
        debug!(
            "Neighbor import settled after {} passes ({} distance changes)",
            total.passes, total.distance_changes
        );
        total
    }
}
