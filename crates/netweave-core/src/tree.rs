//! Generic result trees.
//!
//! Every query returns a `ResultTree`: a named, typed node with scalar
//! properties and an ordered list of children. Presentation layers render
//! it however they like; the engine only guarantees order and types.

use crate::error::{Result, TopologyError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Scalar::Float(f) => Some(*f),
            Scalar::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl From<&String> for Scalar {
    fn from(s: &String) -> Self {
        Scalar::Str(s.clone())
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Scalar::Float(x)
    }
}

macro_rules! scalar_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Scalar {
            fn from(i: $t) -> Self {
                Scalar::Int(i as i64)
            }
        })*
    };
}

scalar_from_int!(i32, i64, u16, u32, u64, usize);

/// Type tag of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreeKind {
    #[serde(rename = "PATHS")]
    FullPath,
    #[serde(rename = "L1-HOST")]
    Host,
    #[serde(rename = "L3-GW")]
    Gateway,
    #[serde(rename = "L2-PATH")]
    SwitchedPath,
    #[serde(rename = "L2-HOP")]
    SwitchedHop,
    #[serde(rename = "L3-PATH")]
    RoutedPath,
    #[serde(rename = "L3-HOP")]
    RoutedHop,
    #[serde(rename = "L4-PATH")]
    SecurityPath,
    #[serde(rename = "L4-VRF")]
    SecurityVrf,
    #[serde(rename = "L4-FW")]
    SecurityFirewall,
    #[serde(rename = "L4-GW")]
    SecurityGateway,
    #[serde(rename = "Election")]
    Election,
    #[serde(rename = "VLAN")]
    Vlan,
    #[serde(rename = "BRIDGE")]
    Bridge,
    #[serde(rename = "CIDR")]
    Network,
    #[serde(rename = "Device")]
    Device,
    #[serde(rename = "Neighbors")]
    Neighbors,
    #[serde(rename = "Neighbor")]
    Neighbor,
    #[serde(rename = "Parent")]
    Parent,
    #[serde(rename = "Networks")]
    Networks,
    #[serde(rename = "VLANs")]
    Vlans,
}

impl TreeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TreeKind::FullPath => "PATHS",
            TreeKind::Host => "L1-HOST",
            TreeKind::Gateway => "L3-GW",
            TreeKind::SwitchedPath => "L2-PATH",
            TreeKind::SwitchedHop => "L2-HOP",
            TreeKind::RoutedPath => "L3-PATH",
            TreeKind::RoutedHop => "L3-HOP",
            TreeKind::SecurityPath => "L4-PATH",
            TreeKind::SecurityVrf => "L4-VRF",
            TreeKind::SecurityFirewall => "L4-FW",
            TreeKind::SecurityGateway => "L4-GW",
            TreeKind::Election => "Election",
            TreeKind::Vlan => "VLAN",
            TreeKind::Bridge => "BRIDGE",
            TreeKind::Network => "CIDR",
            TreeKind::Device => "Device",
            TreeKind::Neighbors => "Neighbors",
            TreeKind::Neighbor => "Neighbor",
            TreeKind::Parent => "Parent",
            TreeKind::Networks => "Networks",
            TreeKind::Vlans => "VLANs",
        }
    }
}

impl std::fmt::Display for TreeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A node of a query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTree {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TreeKind,
    /// Properties in the order they were first set.
    pub properties: IndexMap<String, Scalar>,
    pub children: Vec<ResultTree>,
}

impl ResultTree {
    pub fn new(name: impl Into<String>, kind: TreeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            properties: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Sets a property in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Scalar>) -> &mut Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Sets a property only when a value is present.
    pub fn set_opt<V: Into<Scalar>>(&mut self, key: impl Into<String>, value: Option<V>) -> &mut Self {
        if let Some(v) = value {
            self.properties.insert(key.into(), v.into());
        }
        self
    }

    /// Builder-style property setter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.properties.get(key)
    }

    pub fn add_child(&mut self, child: ResultTree) {
        self.children.push(child);
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Direct children with the given tag, in order.
    pub fn children_of(&self, kind: TreeKind) -> impl Iterator<Item = &ResultTree> {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    /// Depth-first search for the first descendant (or self) with the given tag.
    pub fn find(&self, kind: TreeKind) -> Option<&ResultTree> {
        if self.kind == kind {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(kind))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Representations a caller may ask for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    /// The tree itself, no rendering.
    #[default]
    NgTree,
    Tree,
    Json,
    Yaml,
    Csv,
}

impl ResultFormat {
    pub const ALL: [ResultFormat; 5] = [
        ResultFormat::NgTree,
        ResultFormat::Tree,
        ResultFormat::Json,
        ResultFormat::Yaml,
        ResultFormat::Csv,
    ];

    /// Everything but CSV; for queries whose output is not a flat list.
    pub const NESTED: [ResultFormat; 4] = [
        ResultFormat::NgTree,
        ResultFormat::Tree,
        ResultFormat::Json,
        ResultFormat::Yaml,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultFormat::NgTree => "ngtree",
            ResultFormat::Tree => "tree",
            ResultFormat::Json => "json",
            ResultFormat::Yaml => "yaml",
            ResultFormat::Csv => "csv",
        }
    }

    /// Fails unless `self` is one of `supported`.
    pub fn ensure_in(self, supported: &[ResultFormat]) -> Result<Self> {
        if supported.contains(&self) {
            Ok(self)
        } else {
            Err(unsupported(self.as_str(), supported))
        }
    }
}

impl FromStr for ResultFormat {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self> {
        ResultFormat::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| unsupported(s, &ResultFormat::ALL))
    }
}

fn unsupported(requested: &str, supported: &[ResultFormat]) -> TopologyError {
    TopologyError::UnsupportedFormat {
        requested: requested.to_string(),
        supported: supported
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_query() {
        let mut root = ResultTree::new("Switched Path", TreeKind::SwitchedPath);
        root.set("Links", 2u32).set("Distance", 2u32);
        root.add_child(ResultTree::new("Link", TreeKind::SwitchedHop).with("From Switch", "a"));
        root.add_child(ResultTree::new("Link", TreeKind::SwitchedHop).with("From Switch", "b"));

        assert_eq!(root.child_count(), 2);
        assert_eq!(root.get("Links").and_then(Scalar::as_int), Some(2));
        assert_eq!(root.children_of(TreeKind::SwitchedHop).count(), 2);
        assert_eq!(
            root.find(TreeKind::SwitchedHop).unwrap().get("From Switch"),
            Some(&Scalar::from("a"))
        );
    }

    #[test]
    fn test_json_shape() {
        let tree = ResultTree::new("Hop", TreeKind::RoutedHop).with("distance", 3u32);
        let json: serde_json::Value = serde_json::from_str(&tree.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "L3-HOP");
        assert_eq!(json["properties"]["distance"], 3);
        assert!(json["children"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_properties_keep_set_order() {
        let mut hop = ResultTree::new("Hop", TreeKind::SwitchedHop);
        hop.set("To Switch", "b").set("From Switch", "a").set("Link", "NEI");
        hop.set("To Switch", "c");
        let keys: Vec<&str> = hop.properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["To Switch", "From Switch", "Link"]);
        assert_eq!(hop.get("To Switch").and_then(Scalar::as_str), Some("c"));

        let json = hop.to_json().unwrap();
        assert!(json.find("To Switch").unwrap() < json.find("From Switch").unwrap());
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("JSON".parse::<ResultFormat>().unwrap(), ResultFormat::Json);
        let err = "xml".parse::<ResultFormat>().unwrap_err();
        assert!(matches!(err, TopologyError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_format_gate() {
        assert!(ResultFormat::Csv.ensure_in(&ResultFormat::NESTED).is_err());
        assert!(ResultFormat::Yaml.ensure_in(&ResultFormat::NESTED).is_ok());
    }
}
