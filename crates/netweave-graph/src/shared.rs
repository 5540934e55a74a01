//! A graph handle shared between query tasks and import jobs.
//!
//! Queries take read guards and may run side by side. Imports, distance
//! updates and root election take the write guard, so they never interleave.

use crate::graph::{GraphStats, TopologyGraph};
use crate::store::{StoreError, TopologyStore};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

pub type SharedGraph = Arc<RwLock<TopologyGraph>>;

#[derive(Debug, Clone, Default)]
pub struct SharedTopology {
    graph: SharedGraph,
}

impl SharedTopology {
    pub fn new(graph: TopologyGraph) -> Self {
        Self {
            graph: Arc::new(RwLock::new(graph)),
        }
    }

    /// Returns a handle to the underlying lock.
    pub fn handle(&self) -> SharedGraph {
        self.graph.clone()
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, TopologyGraph> {
        self.graph.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, TopologyGraph> {
        self.graph.write().await
    }

    /// Runs one mutation under the write lock.
    pub async fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut TopologyGraph) -> R,
    {
        let mut guard = self.graph.write().await;
        f(&mut *guard)
    }

    pub async fn stats(&self) -> GraphStats {
        self.graph.read().await.stats()
    }

    /// Swaps in a freshly loaded graph.
    pub async fn replace(&self, graph: TopologyGraph) {
        debug!("Replacing shared topology ({} nodes)", graph.node_count());
        *self.graph.write().await = graph;
    }

    /// Writes a snapshot while holding a read guard.
    pub async fn save(&self, store: &TopologyStore) -> Result<(), StoreError> {
        let guard = self.graph.read().await;
        store.save_graph(&guard)
    }
}
