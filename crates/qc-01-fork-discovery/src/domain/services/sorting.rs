//! Record sorting and selection.

use super::distance::xor_distance;
use crate::domain::{NodeId, NodeRecord};

/// Sort records by XOR distance from a target node (closest first).
pub fn sort_by_distance(records: &mut [NodeRecord], target: &NodeId) {
    records.sort_by_cached_key(|r| xor_distance(&r.node_id(), target));
}

/// Find the k closest records to a target from a list
///
/// # Returns
/// Up to k records sorted by distance (closest first)
pub fn find_k_closest(records: &[NodeRecord], target: &NodeId, k: usize) -> Vec<NodeRecord> {
    let mut sorted = records.to_vec();
    sort_by_distance(&mut sorted, target);
    sorted.truncate(k);
    sorted
}
