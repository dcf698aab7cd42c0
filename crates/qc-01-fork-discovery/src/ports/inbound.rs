//! # Driving Ports (Inbound API)
//!
//! These are the public APIs this subsystem exposes to the application node.

use async_trait::async_trait;
use multiaddr::Multiaddr;

use crate::domain::{ForkDigest, ForkDiscoveryError, ForkEntry, NodeId, NodeRecord};

/// Primary API for fork-aware peer discovery.
///
/// # Example
///
/// ```rust,ignore
/// use qc_01_fork_discovery::ports::ForkDiscoveryApi;
///
/// async fn dial_list<T: ForkDiscoveryApi>(api: &T) -> usize {
///     let peers = api.discover_peers(NodeId::random()).await.unwrap_or_default();
///     peers.len()
/// }
/// ```
#[async_trait]
pub trait ForkDiscoveryApi: Send + Sync {
    /// Digest of the fork active now.
    ///
    /// # Errors
    ///
    /// `DigestComputation` if genesis is not known.
    fn local_fork_digest(&self) -> Result<ForkDigest, ForkDiscoveryError>;

    /// Fork entry this node advertises now.
    fn local_fork_entry(&self) -> Result<ForkEntry, ForkDiscoveryError>;

    /// Filter raw discovery results down to dialable, fork-compatible peers.
    fn process_peers(&self, records: &[NodeRecord]) -> Result<Vec<Multiaddr>, ForkDiscoveryError>;

    /// Look up nodes near `target` and filter them.
    ///
    /// # Errors
    ///
    /// `ListenerClosed` if discovery is not running.
    async fn discover_peers(&self, target: NodeId) -> Result<Vec<Multiaddr>, ForkDiscoveryError>;
}
