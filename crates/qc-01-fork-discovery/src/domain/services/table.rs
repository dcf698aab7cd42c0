//! Bounded table of known node records.

use std::collections::HashMap;

use super::distance::xor_distance;
use super::sorting::find_k_closest;
use crate::domain::{NodeId, NodeRecord};

/// Default capacity of a record table.
pub const MAX_TABLE_SIZE: usize = 256;

/// Records known to one discovery endpoint, capped at `capacity`.
///
/// When full, a new record only gets in by displacing the entry farthest
/// from the local node, and only if it is closer than that entry. Floods of
/// freshly generated identities therefore cannot push out the neighbourhood.
#[derive(Debug, Clone)]
pub struct RecordTable {
    local_id: NodeId,
    capacity: usize,
    records: HashMap<NodeId, NodeRecord>,
}

impl RecordTable {
    /// Empty table for the node `local_id`.
    pub fn new(local_id: NodeId, capacity: usize) -> Self {
        Self {
            local_id,
            capacity,
            records: HashMap::new(),
        }
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no record is held.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Maximum number of records.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert or refresh `record`. Returns true if the table changed.
    ///
    /// Our own record is ignored. A known node is only replaced by a record
    /// with an equal or higher sequence number.
    pub fn insert(&mut self, record: NodeRecord) -> bool {
        let id = record.node_id();
        if id == self.local_id {
            return false;
        }

        if let Some(existing) = self.records.get_mut(&id) {
            if record.seq < existing.seq {
                return false;
            }
            *existing = record;
            return true;
        }

        if self.records.len() >= self.capacity {
            let local_id = self.local_id;
            let Some(farthest) = self
                .records
                .keys()
                .copied()
                .max_by_key(|k| xor_distance(k, &local_id))
            else {
                return false;
            };
            if xor_distance(&id, &local_id) >= xor_distance(&farthest, &local_id) {
                return false;
            }
            self.records.remove(&farthest);
        }

        self.records.insert(id, record);
        true
    }

    /// Forget a node.
    pub fn remove(&mut self, id: &NodeId) -> Option<NodeRecord> {
        self.records.remove(id)
    }

    /// True if `id` is held.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.records.contains_key(id)
    }

    /// All records, in no particular order.
    pub fn records(&self) -> Vec<NodeRecord> {
        self.records.values().cloned().collect()
    }

    /// Up to `k` records closest to `target`.
    pub fn closest(&self, target: &NodeId, k: usize) -> Vec<NodeRecord> {
        find_k_closest(&self.records(), target, k)
    }
}
