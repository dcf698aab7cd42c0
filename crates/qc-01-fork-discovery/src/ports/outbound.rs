//! # Driven Ports (Outbound SPI)
//!
//! These are the interfaces this subsystem **requires** the host application to implement.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{ForkDiscoveryError, NextForkDivergence, NodeId, NodeRecord, Timestamp};

/// Factory for discovery transports.
///
/// Binding is the only fatal step of listener startup.
///
/// # Example Implementation
///
/// ```rust,ignore
/// struct UdpDiscovery;
///
/// #[async_trait]
/// impl DiscoveryBackend for UdpDiscovery {
///     async fn bind(&self, addr: SocketAddr, local: NodeRecord)
///         -> Result<Arc<dyn DiscoveryTransport>, ForkDiscoveryError>
///     {
///         let socket = tokio::net::UdpSocket::bind(addr).await?;
///         // spawn receive loop, return handle
///     }
/// }
/// ```
#[async_trait]
pub trait DiscoveryBackend: Send + Sync {
    /// Bind a discovery endpoint at `bind_addr` advertising `local`.
    ///
    /// # Errors
    ///
    /// `BindError` if the address cannot be bound.
    async fn bind(
        &self,
        bind_addr: SocketAddr,
        local: NodeRecord,
    ) -> Result<Arc<dyn DiscoveryTransport>, ForkDiscoveryError>;
}

/// A bound discovery endpoint: routing table plus lookups.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to support concurrent lookups
/// from multiple async tasks.
#[async_trait]
pub trait DiscoveryTransport: Send + Sync {
    /// The record this endpoint advertises.
    fn local_record(&self) -> NodeRecord;

    /// Liveness check. On success both sides know each other and the
    /// remote's current record is returned.
    async fn ping(&self, remote: &NodeRecord) -> Result<NodeRecord, ForkDiscoveryError>;

    /// Replace the advertised record. The node id must not change.
    ///
    /// # Errors
    ///
    /// `InvalidRecord` if `record` belongs to another node or cannot be
    /// encoded; `ListenerClosed` after shutdown.
    fn update_local_record(&self, record: NodeRecord) -> Result<(), ForkDiscoveryError>;

    /// Iterative search for records close to `target`, excluding our own.
    ///
    /// Stops issuing queries once `timeout` has elapsed and returns the
    /// records gathered so far.
    async fn find_node(
        &self,
        target: NodeId,
        timeout: Duration,
    ) -> Result<Vec<NodeRecord>, ForkDiscoveryError>;

    /// Release the endpoint. Idempotent.
    async fn shutdown(&self);
}

/// Sink for fork-compatibility events worth surfacing to operators.
pub trait ForkEventReporter: Send + Sync {
    /// A kept peer announces a different next fork than ours.
    fn next_fork_divergence(&self, event: &NextForkDivergence);
}

/// Abstract interface for time-related operations.
///
/// Enables deterministic testing by injecting controllable time sources.
/// Production implementations use system time; tests use fixed timestamps.
pub trait TimeSource: Send + Sync {
    /// Get the current timestamp.
    fn now(&self) -> Timestamp;
}
