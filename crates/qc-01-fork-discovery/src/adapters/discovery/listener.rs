//! # Discovery Listener
//!
//! Lifecycle of one discovery endpoint: bind, bootstrap, lookups, close.
//! The listener knows nothing about forks; it hands raw, signature-checked
//! records to the caller.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::domain::{ForkDiscoveryError, NodeId, NodeRecord};
use crate::ports::{DiscoveryBackend, DiscoveryTransport};

/// Slack given to a transport past the lookup deadline before the
/// listener abandons the lookup.
pub const LOOKUP_GRACE: Duration = Duration::from_millis(250);

/// Outcome of contacting the bootstrap nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BootstrapReport {
    /// Bootstrap records contacted.
    pub attempted: usize,
    /// Bootstrap records that answered.
    pub reachable: usize,
    /// `BootstrapError` when records were given but none answered.
    pub error: Option<ForkDiscoveryError>,
}

impl BootstrapReport {
    /// True if bootstrap found at least one node, or had none to try.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// A running discovery listener.
///
/// Shared through `Arc`; lookups may run concurrently and `close` is safe
/// while they are in flight.
pub struct DiscoveryListener {
    transport: Arc<dyn DiscoveryTransport>,
    closed: AtomicBool,
}

impl std::fmt::Debug for DiscoveryListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryListener")
            .field("node_id", &self.transport.local_record().node_id())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl DiscoveryListener {
    /// Bind a listener advertising `local` and contact `bootstrap`.
    ///
    /// # Errors
    ///
    /// `BindError` if the endpoint cannot be bound. Unreachable bootstrap
    /// nodes are reported in the returned [`BootstrapReport`] instead.
    pub async fn start(
        backend: &dyn DiscoveryBackend,
        bind_addr: SocketAddr,
        local: NodeRecord,
        bootstrap: &[NodeRecord],
        timeout: Duration,
    ) -> Result<(Self, BootstrapReport), ForkDiscoveryError> {
        let transport = backend.bind(bind_addr, local).await?;
        info!(
            %bind_addr,
            node_id = %transport.local_record().node_id(),
            bootstrap_nodes = bootstrap.len(),
            "Discovery listener started"
        );

        let report = Self::bootstrap(&transport, bootstrap, timeout).await;
        let listener = Self {
            transport,
            closed: AtomicBool::new(false),
        };
        Ok((listener, report))
    }

    async fn bootstrap(
        transport: &Arc<dyn DiscoveryTransport>,
        bootstrap: &[NodeRecord],
        timeout: Duration,
    ) -> BootstrapReport {
        let attempted = bootstrap.len();
        if attempted == 0 {
            return BootstrapReport::default();
        }

        let mut pings = JoinSet::new();
        for record in bootstrap {
            let transport = Arc::clone(transport);
            let record = record.clone();
            pings.spawn(async move {
                let result = tokio::time::timeout(timeout, transport.ping(&record)).await;
                (record.node_id(), result)
            });
        }

        let mut reachable = 0;
        while let Some(joined) = pings.join_next().await {
            match joined {
                Ok((_, Ok(Ok(_)))) => reachable += 1,
                Ok((node_id, Ok(Err(e)))) => {
                    debug!(%node_id, error = %e, "Bootstrap node did not answer")
                }
                Ok((node_id, Err(_))) => debug!(%node_id, "Bootstrap ping timed out"),
                Err(e) => debug!(error = %e, "Bootstrap ping task failed"),
            }
        }

        if reachable == 0 {
            let error = ForkDiscoveryError::BootstrapError { attempted };
            warn!(attempted, "Could not reach any bootstrap node, listener keeps running");
            return BootstrapReport {
                attempted,
                reachable,
                error: Some(error),
            };
        }

        // Populate the table around our own id.
        let self_id = transport.local_record().node_id();
        match tokio::time::timeout(timeout + LOOKUP_GRACE, transport.find_node(self_id, timeout))
            .await
        {
            Ok(Ok(found)) => debug!(found = found.len(), "Bootstrap self-lookup complete"),
            Ok(Err(e)) => debug!(error = %e, "Bootstrap self-lookup failed"),
            Err(_) => debug!("Bootstrap self-lookup timed out"),
        }

        info!(attempted, reachable, "Bootstrap complete");
        BootstrapReport {
            attempted,
            reachable,
            error: None,
        }
    }

    /// Record advertised by this listener.
    pub fn local_record(&self) -> NodeRecord {
        self.transport.local_record()
    }

    /// Replace the advertised record, e.g. after a fork changed the
    /// `eth2` entry.
    ///
    /// # Errors
    ///
    /// `ListenerClosed` after [`close`](Self::close); `InvalidRecord` if the
    /// record belongs to another node.
    pub fn update_local_record(&self, record: NodeRecord) -> Result<(), ForkDiscoveryError> {
        if self.is_closed() {
            return Err(ForkDiscoveryError::ListenerClosed);
        }
        self.transport.update_local_record(record)
    }

    /// True after [`close`](Self::close).
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Search for records near `target`.
    ///
    /// The transport stops querying once `timeout` has elapsed and the
    /// records gathered so far are returned. A transport that overruns the
    /// deadline by more than [`LOOKUP_GRACE`] yields an empty result.
    /// Records whose signature does not verify are discarded.
    ///
    /// # Errors
    ///
    /// `ListenerClosed` after [`close`](Self::close); `Transport` if the
    /// substrate fails outright.
    pub async fn lookup(
        &self,
        target: NodeId,
        timeout: Duration,
    ) -> Result<Vec<NodeRecord>, ForkDiscoveryError> {
        if self.is_closed() {
            return Err(ForkDiscoveryError::ListenerClosed);
        }

        let lookup = self.transport.find_node(target, timeout);
        let records = match tokio::time::timeout(timeout + LOOKUP_GRACE, lookup).await {
            Ok(Ok(records)) => records,
            Ok(Err(_)) if self.is_closed() => return Err(ForkDiscoveryError::ListenerClosed),
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                debug!(%target, ?timeout, "Lookup overran its deadline");
                return Ok(Vec::new());
            }
        };

        let total = records.len();
        let verified: Vec<NodeRecord> = records
            .into_iter()
            .filter(NodeRecord::verify_signature)
            .collect();
        if verified.len() < total {
            debug!(discarded = total - verified.len(), "Discarded records with invalid signatures");
        }
        Ok(verified)
    }

    /// Release the endpoint and its background task. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.transport.shutdown().await;
        info!(node_id = %self.transport.local_record().node_id(), "Discovery listener closed");
    }
}
