//! Small shared helpers used across the crate, mirroring `gfx-auxil`'s role
//! in the teacher workspace: a spot for the bits every module wants without
//! pulling in a new dependency per module.

use fxhash::FxBuildHasher;
use std::collections::{HashMap, HashSet};

/// A `HashMap` using `fxhash`, matching `gfx-auxil::FastHashMap`.
pub type FastHashMap<K, V> = HashMap<K, V, FxBuildHasher>;
/// A `HashSet` using `fxhash`, matching `gfx-auxil::FastHashSet`.
pub type FastHashSet<K> = HashSet<K, FxBuildHasher>;

/// Merge a set of half-open `[start, end)` byte ranges, collapsing any that
/// touch or overlap. Used by the client-vertex-array compat pass (spec
/// §4.5.1) to coalesce per-attribute memory ranges into the minimal set of
/// buffer uploads.
pub fn merge_ranges(mut ranges: Vec<(u64, u64)>) -> Vec<(u64, u64)> {
    if ranges.is_empty() {
        return ranges;
    }
    ranges.sort_unstable_by_key(|r| r.0);
    let mut merged = Vec::with_capacity(ranges.len());
    let mut cur = ranges[0];
    for &(start, end) in &ranges[1..] {
        if start <= cur.1 {
            cur.1 = cur.1.max(end);
        } else {
            merged.push(cur);
            cur = (start, end);
        }
    }
    merged.push(cur);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_disjoint() {
        let r = merge_ranges(vec![(0, 4), (10, 14)]);
        assert_eq!(r, vec![(0, 4), (10, 14)]);
    }

    #[test]
    fn merge_overlapping_and_touching() {
        let r = merge_ranges(vec![(10, 14), (0, 4), (4, 8), (20, 22)]);
        assert_eq!(r, vec![(0, 8), (10, 14), (20, 22)]);
    }
}
