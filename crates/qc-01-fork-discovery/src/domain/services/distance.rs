//! Kademlia distance calculations.

use crate::domain::NodeId;

/// Full XOR distance between two NodeIds.
///
/// Byte arrays compare lexicographically, so the result orders peers by
/// closeness directly: smaller is closer.
pub fn xor_distance(a: &NodeId, b: &NodeId) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = a.as_bytes()[i] ^ b.as_bytes()[i];
    }
    out
}
