//! Core Domain Entities for Fork-Aware Discovery

use std::fmt;
use std::hash::Hash;

/// 256-bit node identifier derived from a node record's public key.
///
/// Computed as Keccak-256 over the uncompressed secp256k1 point (x ‖ y),
/// so identity is bound to key ownership.
///
/// # Security
///
/// This type implements constant-time comparison. Standard `PartialEq` for
/// byte arrays short-circuits on the first difference, which leaks where
/// two ids diverge through timing.
// SAFETY: derived_hash_with_manual_eq is intentionally allowed here.
// Equal NodeIds (same bytes) hash identically.
#[allow(clippy::derived_hash_with_manual_eq)]
#[derive(Debug, Clone, Copy, Hash)]
pub struct NodeId(pub [u8; 32]);

impl PartialEq for NodeId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        let mut result = 0u8;
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            result |= a ^ b;
        }
        result == 0
    }
}

impl Eq for NodeId {}

impl NodeId {
    /// Create a NodeId from raw 32-byte array.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes for XOR distance calculation.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Random identifier, used as a lookup target to spread searches
    /// across the keyspace.
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl AsRef<[u8]> for NodeId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for NodeId {
    /// Abbreviated hex form (first 8 bytes), enough to tell peers apart in logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// Unix timestamp in seconds
///
/// # Security
///
/// Timestamps are clamped to a reasonable maximum so slot arithmetic can
/// never be driven into overflow by a bogus clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Maximum reasonable timestamp (year 9999).
    pub const MAX_REASONABLE: u64 = 253_402_300_799;

    /// Create a new timestamp, clamping to MAX_REASONABLE.
    pub fn new(secs: u64) -> Self {
        Self(secs.min(Self::MAX_REASONABLE))
    }

    /// Get the underlying seconds value.
    pub fn as_secs(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_equality() {
        let id1 = NodeId::new([1u8; 32]);
        let id2 = NodeId::new([1u8; 32]);
        let id3 = NodeId::new([2u8; 32]);

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_node_id_display_is_abbreviated_hex() {
        let id = NodeId::new([0xab; 32]);
        assert_eq!(id.to_string(), "abababababababab");
    }

    #[test]
    fn test_timestamp_clamped() {
        let ts = Timestamp::new(u64::MAX);
        assert_eq!(ts.as_secs(), Timestamp::MAX_REASONABLE);
    }
}
