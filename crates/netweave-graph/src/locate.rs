//! Host location and name resolution seams.
//!
//! Full paths need two facts the graph does not hold: where an end host is
//! plugged in, and what address a hostname resolves to. Both come from
//! outside (an address-tracking database, DNS), so they sit behind traits.

use netweave_core::{Result, TopologyError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};
use tracing::debug;

/// The access port an end host was last seen on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostLocation {
    pub switch: String,
    pub port: String,
    pub vlan: u16,
    pub mac: Option<String>,
}

/// Finds the access port behind an address.
pub trait HostLocator {
    fn locate(&self, ip: Ipv4Addr) -> Option<HostLocation>;
}

/// Resolves hostnames to IPv4 addresses.
pub trait NameResolver {
    fn resolve(&self, host: &str) -> Result<Ipv4Addr>;
}

/// Resolver backed by the system's name service.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl NameResolver for SystemResolver {
    fn resolve(&self, host: &str) -> Result<Ipv4Addr> {
        let lookup_err = |reason: String| TopologyError::Lookup {
            host: host.to_string(),
            reason,
        };

        let addrs = (host, 0)
            .to_socket_addrs()
            .map_err(|e| lookup_err(e.to_string()))?;
        for addr in addrs {
            if let SocketAddr::V4(v4) = addr {
                debug!("Resolved {} to {}", host, v4.ip());
                return Ok(*v4.ip());
            }
        }
        Err(lookup_err("no IPv4 address".to_string()))
    }
}

/// Fixed tables for hosts and names, loaded from an import or built in tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticDirectory {
    pub hosts: HashMap<Ipv4Addr, HostLocation>,
    pub names: HashMap<String, Ipv4Addr>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, ip: Ipv4Addr, location: HostLocation) -> Self {
        self.hosts.insert(ip, location);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>, ip: Ipv4Addr) -> Self {
        self.names.insert(name.into().to_lowercase(), ip);
        self
    }
}

impl HostLocator for StaticDirectory {
    fn locate(&self, ip: Ipv4Addr) -> Option<HostLocation> {
        self.hosts.get(&ip).cloned()
    }
}

impl NameResolver for StaticDirectory {
    fn resolve(&self, host: &str) -> Result<Ipv4Addr> {
        self.names
            .get(&host.to_lowercase())
            .copied()
            .ok_or_else(|| TopologyError::Lookup {
                host: host.to_string(),
                reason: "unknown host".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_resolver_literal() {
        let ip = SystemResolver.resolve("127.0.0.1").unwrap();
        assert_eq!(ip, Ipv4Addr::LOCALHOST);
    }

    #[test]
    fn test_static_directory() {
        let ip = Ipv4Addr::new(10, 1, 1, 20);
        let dir = StaticDirectory::new()
            .with_name("Printer1", ip)
            .with_host(
                ip,
                HostLocation {
                    switch: "edge1".into(),
                    port: "Gi1/0/7".into(),
                    vlan: 110,
                    mac: Some("0011.2233.4455".into()),
                },
            );

        assert_eq!(dir.resolve("printer1").unwrap(), ip);
        assert!(matches!(
            dir.resolve("nohost"),
            Err(TopologyError::Lookup { .. })
        ));
        assert_eq!(dir.locate(ip).unwrap().switch, "edge1");
        assert!(dir.locate(Ipv4Addr::new(10, 9, 9, 9)).is_none());
    }
}
