//! Error types for topology queries and updates.
//!
//! Errors fall into a few families that callers handle differently:
//! result errors (nothing found, no path), output errors (unsupported
//! representation), lookup failures (name resolution) and topology gaps
//! (a switch that no seed reaches).

use thiserror::Error;

/// Errors surfaced by the topology engine.
#[derive(Error, Debug)]
pub enum TopologyError {
    /// A query endpoint does not exist in the graph.
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// Both endpoints resolved but nothing connects them.
    #[error("no {layer} path between {from} and {to}")]
    NoPath {
        from: String,
        to: String,
        layer: &'static str,
    },

    /// The caller asked for a result representation this query cannot produce.
    #[error("unsupported result format '{requested}', try one of: {supported}")]
    UnsupportedFormat { requested: String, supported: String },

    /// A hostname could not be resolved to an address.
    #[error("could not resolve {host}: {reason}")]
    Lookup { host: String, reason: String },

    /// The switch exists but no seed reaches it.
    #[error("switch {switch} is not part of the topology (no distance from any seed)")]
    NotInTopology { switch: String },

    /// Malformed IP address or CIDR.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Malformed VLAN range string.
    #[error("invalid VLAN range: {0}")]
    InvalidVlanRange(String),

    /// A name pattern failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// Snapshot persistence failed.
    #[error("store error: {0}")]
    Store(String),

    /// A result tree could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl TopologyError {
    /// Shorthand for a missing node of the given kind.
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        TopologyError::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Shorthand for a missing path on the given layer.
    pub fn no_path(layer: &'static str, from: impl Into<String>, to: impl Into<String>) -> Self {
        TopologyError::NoPath {
            from: from.into(),
            to: to.into(),
            layer,
        }
    }

    /// True for "nothing found" style errors, as opposed to bad input.
    pub fn is_result_error(&self) -> bool {
        matches!(
            self,
            TopologyError::NotFound { .. } | TopologyError::NoPath { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TopologyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_error_family() {
        assert!(TopologyError::not_found("switch", "core1").is_result_error());
        assert!(TopologyError::no_path("switched", "a", "b").is_result_error());
        assert!(!TopologyError::Lookup {
            host: "nohost".into(),
            reason: "nxdomain".into()
        }
        .is_result_error());
    }

    #[test]
    fn test_messages() {
        let err = TopologyError::no_path("routed", "10.0.0.0/24", "10.1.0.0/24");
        assert_eq!(
            err.to_string(),
            "no routed path between 10.0.0.0/24 and 10.1.0.0/24"
        );

        let err = TopologyError::NotInTopology {
            switch: "edge9".into(),
        };
        assert!(err.to_string().contains("not part of the topology"));
    }
}
