//! # Fork Entry
//!
//! The fork metadata a node advertises in its record under [`FORK_ENTRY_KEY`]:
//! the digest of the fork it runs now, plus the version and epoch of the next
//! fork it has scheduled.
//!
//! ## Wire Format
//!
//! SSZ container, exactly 16 bytes:
//!
//! ```text
//! fork_digest (4) ‖ next_fork_version (4) ‖ next_fork_epoch (u64 LE, 8)
//! ```

mod codec;

pub use codec::{attach, decode, encode, retrieve, FORK_ENTRY_KEY, FORK_ENTRY_LEN};

use crate::domain::{Epoch, ForkDigest, ForkVersion};

/// Fork metadata advertised in a node record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForkEntry {
    /// Digest of the fork the node runs now.
    pub current_fork_digest: ForkDigest,
    /// Version of the next scheduled fork, or the current version if none.
    pub next_fork_version: ForkVersion,
    /// Activation epoch of the next fork, or `FAR_FUTURE_EPOCH` if none.
    pub next_fork_epoch: Epoch,
}

impl ForkEntry {
    /// True when both entries announce the same next fork.
    pub fn same_next_fork(&self, other: &ForkEntry) -> bool {
        self.next_fork_version == other.next_fork_version
            && self.next_fork_epoch == other.next_fork_epoch
    }
}
