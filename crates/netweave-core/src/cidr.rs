//! IPv4 address and prefix helpers.

use crate::error::{Result, TopologyError};
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// The prefix every address falls back to when nothing more specific exists.
pub const DEFAULT_ROUTE: Ipv4Net = Ipv4Net::new_assert(Ipv4Addr::UNSPECIFIED, 0);

pub fn default_route() -> Ipv4Net {
    DEFAULT_ROUTE
}

/// Parses an IPv4 address.
pub fn parse_ip(s: &str) -> Result<Ipv4Addr> {
    s.trim()
        .parse()
        .map_err(|_| TopologyError::InvalidAddress(s.to_string()))
}

/// Parses a CIDR, clearing any host bits (`10.1.1.7/24` -> `10.1.1.0/24`).
pub fn parse_cidr(s: &str) -> Result<Ipv4Net> {
    let net: Ipv4Net = s
        .trim()
        .parse()
        .map_err(|_| TopologyError::InvalidAddress(s.to_string()))?;
    Ok(net.trunc())
}

/// Returns whichever prefix has the longer mask. Ties keep `second`.
pub fn most_specific(first: Ipv4Net, second: Ipv4Net) -> Ipv4Net {
    if first.prefix_len() > second.prefix_len() {
        first
    } else {
        second
    }
}

/// Longest-prefix match of `ip` against `candidates`, falling back to `0.0.0.0/0`.
pub fn longest_match<I>(ip: Ipv4Addr, candidates: I) -> Ipv4Net
where
    I: IntoIterator<Item = Ipv4Net>,
{
    candidates
        .into_iter()
        .filter(|net| net.contains(&ip))
        .fold(default_route(), most_specific)
}

/// Number of assignable host addresses in a prefix.
pub fn usable_hosts(net: &Ipv4Net) -> u64 {
    match net.prefix_len() {
        32 => 1,
        31 => 2,
        len => (1u64 << (32 - len)) - 2,
    }
}

/// How a caller named one end of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Ip(Ipv4Addr),
    Cidr(Ipv4Net),
    /// Anything else, resolved through DNS by the caller.
    Host(String),
}

impl Endpoint {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if let Ok(ip) = s.parse::<Ipv4Addr>() {
            Endpoint::Ip(ip)
        } else if let Ok(net) = s.parse::<Ipv4Net>() {
            Endpoint::Cidr(net.trunc())
        } else {
            Endpoint::Host(s.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(s: &str) -> Ipv4Net {
        s.parse().unwrap()
    }

    #[test]
    fn test_longest_match() {
        let ip: Ipv4Addr = "10.1.1.20".parse().unwrap();
        let nets = vec![net("10.0.0.0/8"), net("10.1.1.0/24"), net("10.1.0.0/16")];
        assert_eq!(longest_match(ip, nets), net("10.1.1.0/24"));
    }

    #[test]
    fn test_no_match_defaults() {
        let ip: Ipv4Addr = "192.168.5.5".parse().unwrap();
        assert_eq!(longest_match(ip, vec![net("10.0.0.0/8")]), default_route());
    }

    #[test]
    fn test_mask_compared_numerically() {
        // "8" sorts after "24" as text; the numeric mask must win
        assert_eq!(most_specific(net("10.0.0.0/8"), net("10.1.1.0/24")), net("10.1.1.0/24"));
        assert_eq!(most_specific(net("10.1.1.0/24"), net("10.0.0.0/8")), net("10.1.1.0/24"));
    }

    #[test]
    fn test_parse_cidr_truncates() {
        assert_eq!(parse_cidr("10.1.1.7/24").unwrap(), net("10.1.1.0/24"));
        assert!(parse_cidr("10.1.1/24").is_err());
    }

    #[test]
    fn test_usable_hosts() {
        assert_eq!(usable_hosts(&net("10.0.0.0/24")), 254);
        assert_eq!(usable_hosts(&net("10.0.0.0/30")), 2);
        assert_eq!(usable_hosts(&net("10.0.0.0/31")), 2);
        assert_eq!(usable_hosts(&net("10.0.0.1/32")), 1);
    }

    #[test]
    fn test_endpoint_parse() {
        assert_eq!(Endpoint::parse("10.0.0.1"), Endpoint::Ip("10.0.0.1".parse().unwrap()));
        assert_eq!(Endpoint::parse("10.0.0.9/24"), Endpoint::Cidr(net("10.0.0.0/24")));
        assert_eq!(Endpoint::parse("db01.example.net"), Endpoint::Host("db01.example.net".into()));
    }
}
