//! Fragmentation of merged ranges onto configured prefix levels.
//!
//! Every fragment's prefix length lands on one of the configured levels
//! `{min, min+step, ...}`, so each hash level only ever holds fixed-width
//! entries. Coarse ranges split downward; ranges finer than the deepest
//! level widen to their containing deepest-level network.

use std::collections::BTreeMap;

use crate::range::NetworkRange;

/// The ascending list of configured prefix levels, from `min_prefix` in
/// `mask_step` increments up to and including the deepest level not
/// exceeding `max_prefix`.
pub fn levels(min_prefix: u8, max_prefix: u8, mask_step: u8) -> Vec<u8> {
    let mut out = Vec::new();
    let mut level = min_prefix;
    while level <= max_prefix {
        out.push(level);
        match level.checked_add(mask_step) {
            Some(next) => level = next,
            None => break,
        }
    }
    out
}

/// Split `range` into the `2^(level - prefix)` fragments covering it at the
/// target level. `level` must be >= the range's own prefix.
fn split_to_level(range: NetworkRange, level: u8, out: &mut Vec<NetworkRange>) {
    let extra = u32::from(level - range.prefix());
    let width = 32 - u32::from(level);
    for i in 0..(1u64 << extra) {
        out.push(NetworkRange::aligned(
            range.base() + ((i as u32) << width),
            level,
        ));
    }
}

/// Fragment every merged range onto the configured levels.
///
/// Returns the mapping from each configured prefix length to its fragment
/// list, sorted ascending; every configured level is present even when
/// empty. A range finer than the deepest level is widened to the containing
/// deepest-level network, which can over-match by exactly the padding bits;
/// duplicates produced by widening are removed.
pub fn fragment_all(
    ranges: &[NetworkRange],
    levels: &[u8],
) -> BTreeMap<u8, Vec<NetworkRange>> {
    let mut by_level: BTreeMap<u8, Vec<NetworkRange>> =
        levels.iter().map(|&l| (l, Vec::new())).collect();
    let Some(&deepest) = levels.last() else {
        return by_level;
    };

    for range in ranges {
        match levels.iter().copied().find(|&l| l >= range.prefix()) {
            Some(target) => {
                // Aligned ranges pass through as a single fragment;
                // coarser ones expand into 2^(target - prefix) children.
                if let Some(list) = by_level.get_mut(&target) {
                    split_to_level(*range, target, list);
                }
            }
            None => {
                if let Some(list) = by_level.get_mut(&deepest) {
                    list.push(NetworkRange::aligned(range.base(), deepest));
                }
            }
        }
    }

    for list in by_level.values_mut() {
        list.sort();
        list.dedup();
    }
    by_level
}
