//! VLAN range strings.
//!
//! Trunk configurations list allowed VLANs as `1,2,10-20`. These helpers turn
//! such strings into sets and back, and compute which VLANs actually cross a
//! trunk link.

use crate::error::{Result, TopologyError};
use std::collections::BTreeSet;

/// A set of VLAN ids, always iterated in ascending order.
pub type VlanSet = BTreeSet<u16>;

/// Highest assignable VLAN id.
pub const MAX_VLAN_ID: u16 = 4095;

/// Parses `"1,3-5,9"` into `{1, 3, 4, 5, 9}`. Empty entries are ignored.
pub fn expand_range(s: &str) -> Result<VlanSet> {
    let mut set = VlanSet::new();

    for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match entry.split_once('-') {
            Some((low, high)) => {
                let low = parse_vid(low, s)?;
                let high = parse_vid(high, s)?;
                if low > high {
                    return Err(TopologyError::InvalidVlanRange(format!(
                        "{} (descending range {}-{})",
                        s, low, high
                    )));
                }
                set.extend(low..=high);
            }
            None => {
                set.insert(parse_vid(entry, s)?);
            }
        }
    }

    Ok(set)
}

fn parse_vid(text: &str, whole: &str) -> Result<u16> {
    let vid: u16 = text
        .trim()
        .parse()
        .map_err(|_| TopologyError::InvalidVlanRange(whole.to_string()))?;
    if vid > MAX_VLAN_ID {
        return Err(TopologyError::InvalidVlanRange(format!(
            "{} ({} out of range)",
            whole, vid
        )));
    }
    Ok(vid)
}

/// Renders a set in its shortest range form: `{1,2,3,5,7,8,9}` -> `"1-3,5,7-9"`.
pub fn compact_range(set: &VlanSet) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut iter = set.iter().copied().peekable();

    while let Some(start) = iter.next() {
        let mut end = start;
        while let Some(&next) = iter.peek() {
            if next == end + 1 {
                end = next;
                iter.next();
            } else {
                break;
            }
        }

        if start == end {
            parts.push(start.to_string());
        } else {
            parts.push(format!("{}-{}", start, end));
        }
    }

    parts.join(",")
}

/// VLANs allowed on both ends of a trunk.
pub fn intersect_ranges(a: &str, b: &str) -> Result<VlanSet> {
    let a = expand_range(a)?;
    let b = expand_range(b)?;
    Ok(a.intersection(&b).copied().collect())
}

/// VLANs that really cross a link: allowed by the trunk and present on both switches.
pub fn traversing_vlans(allowed: &VlanSet, local_a: &VlanSet, local_b: &VlanSet) -> VlanSet {
    allowed
        .iter()
        .filter(|vid| local_a.contains(vid) && local_b.contains(vid))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[u16]) -> VlanSet {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_expand_mixed() {
        assert_eq!(expand_range("1,2,3,5,7,8,9").unwrap(), set(&[1, 2, 3, 5, 7, 8, 9]));
        assert_eq!(expand_range("10-12,4").unwrap(), set(&[4, 10, 11, 12]));
        assert_eq!(expand_range("").unwrap(), VlanSet::new());
        assert_eq!(expand_range("5,,6").unwrap(), set(&[5, 6]));
    }

    #[test]
    fn test_expand_rejects_garbage() {
        assert!(expand_range("1,abc").is_err());
        assert!(expand_range("20-10").is_err());
        assert!(expand_range("4096").is_err());
    }

    #[test]
    fn test_compact() {
        assert_eq!(compact_range(&set(&[1, 2, 3, 5, 7, 8, 9])), "1-3,5,7-9");
        assert_eq!(compact_range(&set(&[5, 6])), "5-6");
        assert_eq!(compact_range(&set(&[42])), "42");
        assert_eq!(compact_range(&VlanSet::new()), "");
    }

    #[test]
    fn test_canonical_form() {
        // Unsorted and overlapping input collapses to the canonical string
        let canonical = compact_range(&expand_range("9,1-3,2,5,8,7").unwrap());
        assert_eq!(canonical, "1-3,5,7-9");
        assert_eq!(compact_range(&expand_range(&canonical).unwrap()), canonical);
    }

    #[test]
    fn test_traversing() {
        let allowed = intersect_ranges("1-100", "10,20,30,200").unwrap();
        assert_eq!(allowed, set(&[10, 20, 30]));

        let on_a = set(&[10, 20, 99]);
        let on_b = set(&[20, 30, 10]);
        assert_eq!(traversing_vlans(&allowed, &on_a, &on_b), set(&[10, 20]));
    }
}
