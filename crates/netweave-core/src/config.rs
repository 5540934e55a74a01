//! Engine configuration.
//!
//! Every tunable the engine reads lives in one struct that is passed
//! explicitly to the graph, the distance engine and the path finder.

use crate::error::{Result, TopologyError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Distance value for switches that no seed has reached yet.
pub const DEFAULT_MAX_DISTANCE: u32 = 1000;

/// Traversal bound used when a query does not set one.
pub const DEFAULT_DEPTH: usize = 20;

/// Runtime configuration for the topology engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Distance sentinel for unreached switches.
    pub max_distance: u32,

    /// Names of seed switches (distance pinned to 0).
    pub seeds: Vec<String>,

    /// Switches matching this pattern are never relaxed.
    pub dist_exclude: Option<String>,

    /// Neighbor records on matching ports are skipped during import.
    pub neighbor_port_exclude: Option<String>,

    /// Default traversal depth for path queries.
    pub default_depth: usize,

    /// VRF used by routed queries when the caller names none.
    pub default_vrf: String,

    /// One of info, debug, warning, critical.
    pub log_level: String,

    /// Base URL for firewall log-correlation links.
    pub log_url: Option<String>,

    /// Named network filters, `vrf:role|role` clauses separated by spaces.
    /// `all` matches any VRF or role, `none` a network without a role.
    pub net_groups: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_distance: DEFAULT_MAX_DISTANCE,
            seeds: Vec::new(),
            dist_exclude: None,
            neighbor_port_exclude: Some("(mgmt|FastEthernet)".to_string()),
            default_depth: DEFAULT_DEPTH,
            default_vrf: "default".to_string(),
            log_level: "info".to_string(),
            log_url: None,
            net_groups: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Loads a JSON configuration file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| TopologyError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json(&text)?;
        debug!(
            "Loaded config from {}: {} seeds, {} network groups",
            path.display(),
            config.seeds.len(),
            config.net_groups.len()
        );
        Ok(config)
    }

    /// Parses a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(text).map_err(|e| TopologyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that patterns compile and the sentinel is usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_distance < 2 {
            return Err(TopologyError::Config(format!(
                "max_distance must be at least 2, got {}",
                self.max_distance
            )));
        }
        if self.default_depth == 0 {
            return Err(TopologyError::Config("default_depth must be positive".into()));
        }
        self.dist_exclude_regex()?;
        self.port_exclude_regex()?;
        Ok(())
    }

    pub fn with_seeds<I, S>(mut self, seeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seeds = seeds.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_distance(mut self, max_distance: u32) -> Self {
        self.max_distance = max_distance;
        self
    }

    pub fn with_dist_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.dist_exclude = Some(pattern.into());
        self
    }

    pub fn with_log_url(mut self, url: impl Into<String>) -> Self {
        self.log_url = Some(url.into());
        self
    }

    pub fn with_net_group(mut self, group: impl Into<String>, filter: impl Into<String>) -> Self {
        self.net_groups.insert(group.into(), filter.into());
        self
    }

    /// Filter string of a named network group.
    pub fn net_filter(&self, group: &str) -> Result<&str> {
        self.net_groups
            .get(group)
            .map(String::as_str)
            .ok_or_else(|| TopologyError::Config(format!("no network group filter named {}", group)))
    }

    /// True when `name` is one of the configured seeds.
    pub fn is_seed(&self, name: &str) -> bool {
        self.seeds.iter().any(|s| s == name)
    }

    /// Compiled distance-exclusion pattern, if configured.
    pub fn dist_exclude_regex(&self) -> Result<Option<Regex>> {
        compile_optional(self.dist_exclude.as_deref())
    }

    /// Compiled neighbor-port exclusion pattern, if configured.
    pub fn port_exclude_regex(&self) -> Result<Option<Regex>> {
        compile_optional(self.neighbor_port_exclude.as_deref())
    }
}

fn compile_optional(pattern: Option<&str>) -> Result<Option<Regex>> {
    match pattern {
        Some(p) if !p.is_empty() => Ok(Some(Regex::new(p)?)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_distance, 1000);
        assert_eq!(config.default_depth, 20);
        assert_eq!(config.default_vrf, "default");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config =
            EngineConfig::from_json(r#"{"seeds": ["core1", "core2"], "max_distance": 50}"#)
                .unwrap();
        assert!(config.is_seed("core2"));
        assert!(!config.is_seed("edge1"));
        assert_eq!(config.max_distance, 50);
        assert_eq!(config.default_depth, 20);
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let err = EngineConfig::from_json(r#"{"dist_exclude": "("}"#).unwrap_err();
        assert!(matches!(err, TopologyError::InvalidPattern(_)));
    }

    #[test]
    fn test_net_groups() {
        let config = EngineConfig::from_json(
            r#"{"net_groups": {"ops": "default:none|access all:printer"}}"#,
        )
        .unwrap();
        assert_eq!(config.net_filter("ops").unwrap(), "default:none|access all:printer");
        assert!(matches!(config.net_filter("finance"), Err(TopologyError::Config(_))));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netweave.json");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, r#"{{"seeds": ["core1"], "log_level": "debug"}}"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert!(config.net_groups.is_empty());
        assert!(config.is_seed("core1"));

        let missing = EngineConfig::load(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(TopologyError::Config(_))));
    }
}
