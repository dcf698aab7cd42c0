//! SSZ codec for the fork entry and its placement in a node record.

use ssz::{Decode, Encode};
use ssz_derive::{Decode, Encode};

use super::ForkEntry;
use crate::domain::{ForkDigest, ForkDiscoveryError, ForkVersion, NodeRecord};

/// Reserved record key under which the fork entry is stored.
pub const FORK_ENTRY_KEY: &str = "eth2";

/// Encoded length of a fork entry.
pub const FORK_ENTRY_LEN: usize = 16;

#[derive(Encode, Decode)]
struct EnrForkId {
    fork_digest: [u8; 4],
    next_fork_version: [u8; 4],
    next_fork_epoch: u64,
}

/// Serialize `entry` into its 16-byte SSZ form.
pub fn encode(entry: &ForkEntry) -> Vec<u8> {
    EnrForkId {
        fork_digest: entry.current_fork_digest.0,
        next_fork_version: entry.next_fork_version.0,
        next_fork_epoch: entry.next_fork_epoch,
    }
    .as_ssz_bytes()
}

/// Parse a fork entry. Fails with `MalformedEntry` unless `bytes` is a
/// well-formed 16-byte container.
pub fn decode(bytes: &[u8]) -> Result<ForkEntry, ForkDiscoveryError> {
    if bytes.len() != FORK_ENTRY_LEN {
        return Err(ForkDiscoveryError::MalformedEntry(format!(
            "expected {FORK_ENTRY_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    let id = EnrForkId::from_ssz_bytes(bytes)
        .map_err(|e| ForkDiscoveryError::MalformedEntry(format!("{e:?}")))?;
    Ok(ForkEntry {
        current_fork_digest: ForkDigest::new(id.fork_digest),
        next_fork_version: ForkVersion::new(id.next_fork_version),
        next_fork_epoch: id.next_fork_epoch,
    })
}

/// Store `entry` in `record` under [`FORK_ENTRY_KEY`].
///
/// Bumps the record's sequence number; the record must be re-signed.
///
/// # Errors
///
/// `InvalidRecord` if the record has no room left for the entry.
pub fn attach(record: &mut NodeRecord, entry: &ForkEntry) -> Result<(), ForkDiscoveryError> {
    record.set(FORK_ENTRY_KEY, encode(entry))
}

/// Read the fork entry from `record`.
pub fn retrieve(record: &NodeRecord) -> Result<ForkEntry, ForkDiscoveryError> {
    let bytes = record
        .get(FORK_ENTRY_KEY)
        .ok_or(ForkDiscoveryError::MissingEntry {
            key: FORK_ENTRY_KEY,
        })?;
    decode(bytes)
}
