//! Netweave Core - Topology data model
//!
//! This crate holds everything the graph engine shares with its callers:
//! typed topology nodes, the result tree every query returns, the error
//! taxonomy, configuration, and the small address and VLAN-range helpers
//! used during import and path queries.
//!
//! # Example
//!
//! ```
//! use netweave_core::{compact_range, expand_range};
//!
//! let vlans = expand_range("1,2,3,5,7,8,9").unwrap();
//! assert_eq!(compact_range(&vlans), "1-3,5,7-9");
//! ```

pub mod cidr;
pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod tree;
pub mod vlan_range;

pub use cidr::{default_route, longest_match, most_specific, parse_cidr, parse_ip, Endpoint};
pub use config::{EngineConfig, DEFAULT_DEPTH, DEFAULT_MAX_DISTANCE};
pub use error::{Result, TopologyError};
pub use logging::init_logging;
pub use node::{
    vlan_name, vrfcidr, FirewallInfo, Network, NodeKind, RouterRole, Supernet, Switch,
    TopologyNode, Vlan, Vrf,
};
pub use tree::{ResultFormat, ResultTree, Scalar, TreeKind};
pub use vlan_range::{
    compact_range, expand_range, intersect_ranges, traversing_vlans, VlanSet, MAX_VLAN_ID,
};
