//! Snapshot persistence for the topology graph.

use crate::graph::TopologyGraph;
use chrono::{DateTime, Utc};
use netweave_core::TopologyError;
use sled::Db;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

const GRAPH_KEY: &str = "topology";
const SAVED_AT_KEY: &str = "topology_saved_at";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sled(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),
}

impl From<StoreError> for TopologyError {
    fn from(err: StoreError) -> Self {
        TopologyError::Store(err.to_string())
    }
}

/// A sled database holding the latest graph snapshot.
pub struct TopologyStore {
    db: Db,
}

impl TopologyStore {
    /// Opens or creates a store at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Replaces the stored snapshot with `graph`.
    pub fn save_graph(&self, graph: &TopologyGraph) -> Result<(), StoreError> {
        let bytes = bincode::serialize(graph)?;
        let stamp = bincode::serialize(&Utc::now())?;
        self.db.insert(GRAPH_KEY, bytes)?;
        self.db.insert(SAVED_AT_KEY, stamp)?;
        self.db.flush()?;
        info!(
            "Saved topology snapshot ({} nodes, {} edges)",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(())
    }

    /// Loads the stored snapshot, rebuilding its key index.
    pub fn load_graph(&self) -> Result<Option<TopologyGraph>, StoreError> {
        let Some(bytes) = self.db.get(GRAPH_KEY)? else {
            debug!("No topology snapshot stored");
            return Ok(None);
        };
        let mut graph: TopologyGraph = bincode::deserialize(&bytes)?;
        graph.rebuild_index();
        Ok(Some(graph))
    }

    /// When the stored snapshot was written.
    pub fn saved_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        match self.db.get(SAVED_AT_KEY)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Clears the stored snapshot.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.db.remove(GRAPH_KEY)?;
        self.db.remove(SAVED_AT_KEY)?;
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{NetworkRecord, SwitchRecord, TopologyBuilder};
    use netweave_core::{EngineConfig, NodeKind};
    use tempfile::tempdir;

    #[test]
    fn test_save_load_graph() {
        let dir = tempdir().unwrap();
        let store = TopologyStore::open(dir.path()).unwrap();
        assert!(store.load_graph().unwrap().is_none());

        let config = EngineConfig::default().with_seeds(["core1"]);
        let mut graph = TopologyGraph::new();
        let mut builder = TopologyBuilder::new(&mut graph, &config);
        builder.upsert_switch(&SwitchRecord::new("core1", "campus").router());
        builder
            .upsert_network(&NetworkRecord::new("corp", "10.1.1.0/24".parse().unwrap(), "core1"))
            .unwrap();

        store.save_graph(&graph).unwrap();
        assert!(store.saved_at().unwrap().is_some());

        let loaded = store.load_graph().unwrap().unwrap();
        assert_eq!(loaded.node_count(), graph.node_count());
        assert_eq!(loaded.edge_count(), graph.edge_count());
        assert!(loaded.get_index(NodeKind::Network, "corp-10.1.1.0/24").is_some());
        assert_eq!(loaded.switch("core1").unwrap().distance, 0);

        store.clear().unwrap();
        assert!(store.load_graph().unwrap().is_none());
    }

    #[test]
    fn test_store_error_converts() {
        let err: TopologyError = StoreError::Bincode(Box::new(bincode::ErrorKind::SizeLimit)).into();
        assert!(matches!(err, TopologyError::Store(_)));
    }
}
