//! Netweave Graph - Topology store and algorithms
//!
//! This crate keeps the network topology graph and everything that reasons
//! over it: seed-based distance propagation, per-VLAN root election across
//! bridged management domains, and path discovery at the switched, routed
//! and firewall layers.
//!
//! # Architecture
//!
//! The graph uses petgraph's `StableDiGraph` internally with a natural-key
//! index (switch name, vrfcidr, VLAN name) so importers can upsert without
//! knowing node indexes. Writers (`TopologyBuilder`, `DistanceEngine`,
//! `VlanTopology`) take `&mut TopologyGraph`; readers (`PathFinder`,
//! `TopologyQuery`) borrow it immutably. `SharedTopology` puts the graph
//! behind an async `RwLock` for services that do both.
//!
//! # Example
//!
//! ```no_run
//! use netweave_core::EngineConfig;
//! use netweave_graph::{
//!     DistanceEngine, NeighborRecord, PathFinder, QueryOptions, SwitchRecord, TopologyBuilder,
//!     TopologyGraph,
//! };
//!
//! let config = EngineConfig::default().with_seeds(["core1"]);
//! let mut graph = TopologyGraph::new();
//!
//! let mut builder = TopologyBuilder::new(&mut graph, &config);
//! builder.upsert_switch(&SwitchRecord::new("core1", "campus"));
//! builder.upsert_switch(&SwitchRecord::new("access1", "campus"));
//!
//! let mut engine = DistanceEngine::new(&mut graph, &config)?;
//! engine.import_neighbors(&[NeighborRecord::new("core1", "Gi1/1", "access1", "Gi0/1")]);
//!
//! let finder = PathFinder::new(&graph, &config);
//! let path = finder.switched_path("core1", "access1", &QueryOptions::default())?;
//! println!("{}", path.to_json()?);
//! # Ok::<(), netweave_core::TopologyError>(())
//! ```

mod builder;
mod distance;
mod edge;
mod election;
mod graph;
mod locate;
mod path;
mod query;
mod search;
mod shared;
mod store;
mod vlan_topology;

pub use builder::{
    FirewallInterfaceRecord, NetworkRecord, SupernetRecord, SwitchRecord, TopologyBuilder,
    VlanRecord, UNKNOWN_GROUP,
};
pub use distance::{DistanceEngine, ImportSummary, NeighborLink, NeighborRecord};
pub use edge::{BridgeInfo, Edge, EdgeDetail, EdgeKind, FirewallLink, LinkInfo, RouteInfo, SwitchedInfo};
pub use election::{ElectionSummary, RootElection, DEFAULT_BRIDGE_PRIORITY};
pub use graph::{Adjacent, EdgeDirection, EdgeId, GraphStats, NodeId, TopologyGraph};
pub use locate::{HostLocation, HostLocator, NameResolver, StaticDirectory, SystemResolver};
pub use path::{routed_hop, Orientation, PathFinder, QueryOptions, SwitchedHop};
pub use query::TopologyQuery;
pub use search::{PathQuery, PathRecord};
pub use shared::{SharedGraph, SharedTopology};
pub use store::{StoreError, TopologyStore};
pub use vlan_topology::{TrunkRecord, VlanTopology, VlanTopologySummary};
