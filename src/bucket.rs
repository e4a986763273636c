//! Hash-bucketed lookup table construction.
//!
//! One hash table per configured prefix level, each `hash_base` buckets
//! wide. The positional hash is the raw network base (not a cryptographic
//! hash), which keeps the generated lookup code tiny at the cost of uneven
//! bucket fill for adversarial input; `hash_base` trades table size against
//! average bucket length.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::range::NetworkRange;

/// One per-prefix-length hash table of `hash_base` buckets.
#[derive(Debug, Clone)]
pub struct HashLevel {
    pub prefix: u8,
    pub buckets: Vec<Vec<NetworkRange>>,
}

/// The complete multi-level lookup table, built once per generation run and
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct LookupTable {
    pub hash_base: u32,
    pub levels: Vec<HashLevel>,
}

/// Positional hash of an address at the given prefix length.
///
/// The positional value is the address with all bits below the prefix
/// boundary zeroed, computed with exact unsigned 32-bit semantics so that
/// bucket assignment reproduces bit-for-bit in the generated artifact.
pub fn bucket_index(addr: u32, prefix: u8, hash_base: u32) -> u32 {
    let offset = 32 - u32::from(prefix);
    let positional = if offset == 32 {
        0
    } else {
        (addr >> offset) << offset
    };
    positional % hash_base
}

impl HashLevel {
    fn build(prefix: u8, fragments: &[NetworkRange], hash_base: u32) -> Self {
        let mut buckets = vec![Vec::new(); hash_base as usize];
        for fragment in fragments {
            let k = bucket_index(fragment.base(), prefix, hash_base) as usize;
            buckets[k].push(*fragment);
        }
        Self { prefix, buckets }
    }

    /// Number of buckets holding at least one fragment.
    pub fn occupied(&self) -> usize {
        self.buckets.iter().filter(|b| !b.is_empty()).count()
    }

    pub fn fragment_count(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }
}

impl LookupTable {
    /// Build the per-level hash tables from the fragmenter output.
    ///
    /// Levels are independent, so they are constructed in parallel; each
    /// level owns its bucket vector exclusively during construction.
    pub fn build(fragments: &BTreeMap<u8, Vec<NetworkRange>>, hash_base: u32) -> Self {
        let levels: Vec<HashLevel> = fragments
            .par_iter()
            .map(|(&prefix, frags)| HashLevel::build(prefix, frags, hash_base))
            .collect();
        Self { hash_base, levels }
    }

    /// Membership test implementing the evaluation-time lookup contract:
    /// every configured level is probed in ascending prefix order and the
    /// first verified fragment match wins. A match at a coarse level and a
    /// match at a fine level are equally valid.
    pub fn contains(&self, addr: u32) -> bool {
        for level in &self.levels {
            let k = bucket_index(addr, level.prefix, self.hash_base) as usize;
            if level.buckets[k].iter().any(|f| f.contains(addr)) {
                return true;
            }
        }
        false
    }

    pub fn fragment_count(&self) -> usize {
        self.levels.iter().map(HashLevel::fragment_count).sum()
    }

    /// Buckets holding at least one fragment, across all levels.
    pub fn occupied_buckets(&self) -> usize {
        self.levels.iter().map(HashLevel::occupied).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr::parse_addr;
    use crate::fragment;
    use crate::range::merge;

    fn range(s: &str) -> NetworkRange {
        s.parse().unwrap()
    }

    fn build_table(inputs: &[NetworkRange], min: u8, max: u8, step: u8, hash_base: u32) -> LookupTable {
        let merged = merge(inputs);
        let levels = fragment::levels(min, max, step);
        LookupTable::build(&fragment::fragment_all(&merged, &levels), hash_base)
    }

    #[test]
    fn test_bucket_index_is_positional() {
        // Base is already network-aligned at its own prefix, so the
        // positional value equals the base itself
        let base = parse_addr("10.64.0.0").unwrap();
        assert_eq!(bucket_index(base, 10, 3011), base % 3011);

        // An arbitrary host address hashes through its network address
        let host = parse_addr("10.64.3.7").unwrap();
        assert_eq!(bucket_index(host, 10, 3011), base % 3011);
    }

    #[test]
    fn test_bucket_index_zero_prefix() {
        assert_eq!(bucket_index(u32::MAX, 0, 7), 0);
    }

    #[test]
    fn test_levels_preserve_fragment_counts() {
        let table = build_table(&[range("10.0.0.0/8")], 10, 24, 2, 7);
        assert_eq!(table.levels.len(), 8);
        assert_eq!(table.fragment_count(), 4);
        // All fragments landed on the level-10 table
        assert_eq!(table.levels[0].prefix, 10);
        assert_eq!(table.levels[0].fragment_count(), 4);
    }

    #[test]
    fn test_lookup_matches_inside() {
        let table = build_table(&[range("10.0.0.0/8")], 10, 24, 2, 7);
        assert!(table.contains(parse_addr("10.1.2.3").unwrap()));
        assert!(table.contains(parse_addr("10.0.0.0").unwrap()));
        assert!(table.contains(parse_addr("10.255.255.255").unwrap()));
    }

    #[test]
    fn test_lookup_rejects_outside() {
        let table = build_table(&[range("10.0.0.0/8")], 10, 24, 2, 7);
        assert!(!table.contains(parse_addr("192.168.1.1").unwrap()));
        assert!(!table.contains(parse_addr("9.255.255.255").unwrap()));
        assert!(!table.contains(parse_addr("11.0.0.0").unwrap()));
    }

    #[test]
    fn test_lookup_across_levels() {
        let table = build_table(
            &[range("10.0.0.0/8"), range("203.0.113.0/24")],
            10,
            24,
            2,
            3011,
        );
        assert!(table.contains(parse_addr("10.200.0.1").unwrap()));
        assert!(table.contains(parse_addr("203.0.113.77").unwrap()));
        assert!(!table.contains(parse_addr("203.0.114.1").unwrap()));
    }

    #[test]
    fn test_small_hash_base_collides_but_stays_correct() {
        // hash_base 1 forces every fragment into one bucket per level
        let table = build_table(
            &[range("10.0.0.0/8"), range("203.0.113.0/24")],
            10,
            24,
            2,
            1,
        );
        assert!(table.contains(parse_addr("10.1.2.3").unwrap()));
        assert!(table.contains(parse_addr("203.0.113.1").unwrap()));
        assert!(!table.contains(parse_addr("8.8.8.8").unwrap()));
    }

    #[test]
    fn test_build_deterministic() {
        let inputs = [range("10.0.0.0/8"), range("1.0.0.0/24"), range("203.0.113.0/24")];
        let a = build_table(&inputs, 10, 24, 2, 101);
        let b = build_table(&inputs, 10, 24, 2, 101);
        for (la, lb) in a.levels.iter().zip(&b.levels) {
            assert_eq!(la.prefix, lb.prefix);
            assert_eq!(la.buckets, lb.buckets);
        }
    }
}
