//! # Peer Compatibility Filter
//!
//! Turns a raw discovery result set into a vetted dial list.
//!
//! ## Policy
//!
//! For each candidate, in input order:
//!
//! 1. No readable fork entry: drop.
//! 2. Current fork digest differs from ours: drop.
//! 3. Digest matches but the announced next fork differs: keep, and report
//!    one [`NextForkDivergence`].
//! 4. Kept candidates without a dialable address are dropped.
//!
//! The filter is stateless. It never fails as a whole because one candidate
//! is bad, never reorders, and never de-duplicates.

mod address;

pub use address::{dialable_address, peer_id};

use multiaddr::Multiaddr;
use tracing::{debug, trace};

use crate::domain::{retrieve, Epoch, ForkDigest, ForkDiscoveryError, ForkEntry, ForkVersion, NodeId, NodeRecord};
use crate::ports::ForkEventReporter;

/// A kept candidate announces a different next fork than we do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextForkDivergence {
    /// Candidate node.
    pub node_id: NodeId,
    /// Our next fork version.
    pub local_next_fork_version: ForkVersion,
    /// Candidate's next fork version.
    pub remote_next_fork_version: ForkVersion,
    /// Our next fork epoch.
    pub local_next_fork_epoch: Epoch,
    /// Candidate's next fork epoch.
    pub remote_next_fork_epoch: Epoch,
}

impl NextForkDivergence {
    /// True if the epochs differ.
    pub fn epoch_differs(&self) -> bool {
        self.local_next_fork_epoch != self.remote_next_fork_epoch
    }

    /// True if the versions differ.
    pub fn version_differs(&self) -> bool {
        self.local_next_fork_version != self.remote_next_fork_version
    }
}

/// Why a candidate was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The fork entry is missing or malformed.
    UnreadableEntry(ForkDiscoveryError),
    /// The candidate is on another fork.
    DigestMismatch {
        /// Digest the candidate advertises.
        remote: ForkDigest,
    },
}

/// Fork-compatibility decision for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerVerdict {
    /// Same fork, same next fork.
    Compatible,
    /// Same fork, different next fork. Still connected to.
    CompatibleWithDivergence(NextForkDivergence),
    /// Not to be connected to.
    Drop(DropReason),
}

impl PeerVerdict {
    /// True if the candidate should be dialed.
    pub fn is_kept(&self) -> bool {
        !matches!(self, PeerVerdict::Drop(_))
    }
}

/// Decide fork compatibility of a single `record`.
pub fn evaluate(record: &NodeRecord, local_digest: ForkDigest, local_entry: &ForkEntry) -> PeerVerdict {
    let remote = match retrieve(record) {
        Ok(entry) => entry,
        Err(e) => return PeerVerdict::Drop(DropReason::UnreadableEntry(e)),
    };

    if remote.current_fork_digest != local_digest {
        return PeerVerdict::Drop(DropReason::DigestMismatch {
            remote: remote.current_fork_digest,
        });
    }

    if remote.same_next_fork(local_entry) {
        return PeerVerdict::Compatible;
    }

    PeerVerdict::CompatibleWithDivergence(NextForkDivergence {
        node_id: record.node_id(),
        local_next_fork_version: local_entry.next_fork_version,
        remote_next_fork_version: remote.next_fork_version,
        local_next_fork_epoch: local_entry.next_fork_epoch,
        remote_next_fork_epoch: remote.next_fork_epoch,
    })
}

/// Filter `candidates` down to dialable addresses of fork-compatible peers.
///
/// Reports exactly one divergence per kept candidate whose next fork differs.
pub fn filter_peers(
    candidates: &[NodeRecord],
    local_digest: ForkDigest,
    local_entry: &ForkEntry,
    reporter: &dyn ForkEventReporter,
) -> Vec<Multiaddr> {
    let mut addresses = Vec::with_capacity(candidates.len());

    for record in candidates {
        match evaluate(record, local_digest, local_entry) {
            PeerVerdict::Drop(DropReason::UnreadableEntry(e)) => {
                debug!(node_id = %record.node_id(), error = %e, "Dropping peer without usable fork entry");
                continue;
            }
            PeerVerdict::Drop(DropReason::DigestMismatch { remote }) => {
                trace!(node_id = %record.node_id(), %remote, local = %local_digest, "Dropping peer on another fork");
                continue;
            }
            PeerVerdict::CompatibleWithDivergence(divergence) => {
                reporter.next_fork_divergence(&divergence);
            }
            PeerVerdict::Compatible => {}
        }

        match dialable_address(record) {
            Some(addr) => addresses.push(addr),
            None => {
                debug!(node_id = %record.node_id(), ip = %record.ip, tcp_port = record.tcp_port, "Dropping compatible peer without dialable address");
            }
        }
    }

    addresses
}
