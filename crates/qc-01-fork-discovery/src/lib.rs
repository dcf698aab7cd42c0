//! # Fork-Aware Peer Discovery
//!
//! **Subsystem ID:** 1
//!
//! This crate decides, among all nodes a discovery protocol surfaces, which
//! ones run a compatible version of the network protocol before any
//! connection is attempted. Nodes on different forks are never treated as
//! peers, even when mutually reachable.
//!
//! ## Core
//!
//! - **Fork digest:** 4-byte fingerprint of (fork version, genesis validators root)
//! - **Fork entry:** digest plus next scheduled fork, stored under `eth2` in
//!   the signed node record
//! - **Compatibility filter:** drops peers on other forks, keeps peers whose
//!   next fork differs but reports them
//!
//! ## Features
//!
//! - `network` - UDP discovery substrate (tokio sockets)
//! - `test-utils` - `FixedTimeSource` and record helpers
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** Fork digest, schedule, entry codec, records, filter
//! - **Ports Layer:** Trait definitions for external dependencies
//! - **Service Layer:** Wires domain to ports
//! - **Adapters Layer:** Concrete implementations
//!
//! ## Example
//!
//! ```rust
//! use qc_01_fork_discovery::{
//!     compute_fork_digest, filter_peers, ForkSchedule, ForkVersion, InMemoryReporter, Root,
//! };
//!
//! let schedule = ForkSchedule::new(ForkVersion::new([0, 0, 0, 0]))
//!     .with_fork(74_240, ForkVersion::new([1, 0, 0, 0]));
//! let entry = schedule.fork_entry(0, Root::default());
//! assert_eq!(
//!     entry.current_fork_digest,
//!     compute_fork_digest(ForkVersion::new([0, 0, 0, 0]), Root::default())
//! );
//!
//! let reporter = InMemoryReporter::new();
//! let dial = filter_peers(&[], entry.current_fork_digest, &entry, &reporter);
//! assert!(dial.is_empty());
//! ```

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Test utilities (FixedTimeSource, record helpers)
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// =============================================================================
// CORE RE-EXPORTS
// =============================================================================

// Domain types
pub use domain::{
    ChainTiming, Epoch, ForkDigest, ForkDiscoveryError, ForkEntry, ForkSchedule, ForkVersion,
    GenesisInfo, NodeId, Root, Timestamp, FAR_FUTURE_EPOCH,
};

// Fork digest and entry codec
pub use domain::{
    attach, compute_fork_data_root, compute_fork_digest, decode, encode, retrieve,
    FORK_ENTRY_KEY, FORK_ENTRY_LEN,
};

// Records and filter
pub use domain::{
    dialable_address, evaluate, filter_peers, DropReason, NextForkDivergence, NodeRecord,
    NodeRecordConfig, PeerVerdict, PublicKey, Signature,
};

// Port traits
pub use ports::{DiscoveryBackend, DiscoveryTransport, ForkDiscoveryApi, ForkEventReporter, TimeSource};

// Service
pub use service::{parse_bootstrap_nodes, ForkDiscoveryService};

// =============================================================================
// ADAPTER RE-EXPORTS
// =============================================================================

pub use adapters::{
    BootstrapReport, DiscoveryConfig, DiscoveryListener, FileKeyStore, InMemoryNetwork,
    InMemoryReporter, NodeConfig, SystemTimeSource, TracingReporter,
};

#[cfg(feature = "network")]
pub use adapters::UdpDiscovery;

// Address types handed to the connection layer
pub use multiaddr::Multiaddr;
