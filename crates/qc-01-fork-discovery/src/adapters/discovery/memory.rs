//! # In-Memory Discovery Substrate
//!
//! A simulated network of discovery endpoints living in one process.
//! Endpoints register by UDP port, so one `InMemoryNetwork` behaves like a
//! single host: binding a taken port fails the same way a socket would.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use crate::domain::{
    find_k_closest, ForkDiscoveryError, NodeId, NodeRecord, RecordTable, MAX_TABLE_SIZE,
};
use crate::ports::{DiscoveryBackend, DiscoveryTransport};

/// Records returned per lookup and per node query.
pub const BUCKET_SIZE: usize = 16;

/// Nodes queried per lookup round.
pub const ALPHA: usize = 3;

/// Shared registry of simulated endpoints.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNetwork {
    nodes: Arc<RwLock<HashMap<u16, Arc<MemoryNode>>>>,
}

impl InMemoryNetwork {
    /// Create an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bound endpoints.
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// True if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    fn node(&self, udp_port: u16) -> Option<Arc<MemoryNode>> {
        self.nodes.read().get(&udp_port).cloned()
    }
}

#[async_trait]
impl DiscoveryBackend for InMemoryNetwork {
    async fn bind(
        &self,
        bind_addr: SocketAddr,
        local: NodeRecord,
    ) -> Result<Arc<dyn DiscoveryTransport>, ForkDiscoveryError> {
        let port = bind_addr.port();
        let mut nodes = self.nodes.write();
        if nodes.contains_key(&port) {
            return Err(ForkDiscoveryError::BindError {
                addr: bind_addr,
                reason: "address already in use".to_string(),
            });
        }

        let node = Arc::new(MemoryNode {
            port,
            table: RwLock::new(RecordTable::new(local.node_id(), MAX_TABLE_SIZE)),
            local: RwLock::new(local),
            network: self.clone(),
            closed: AtomicBool::new(false),
        });
        nodes.insert(port, Arc::clone(&node));
        Ok(node)
    }
}

/// One simulated endpoint.
pub struct MemoryNode {
    port: u16,
    local: RwLock<NodeRecord>,
    table: RwLock<RecordTable>,
    network: InMemoryNetwork,
    closed: AtomicBool,
}

impl std::fmt::Debug for MemoryNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNode")
            .field("port", &self.port)
            .field("node_id", &self.local.read().node_id())
            .field("known", &self.table.read().len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl MemoryNode {
    fn learn(&self, record: &NodeRecord) {
        self.table.write().insert(record.clone());
    }

    /// Answer a FIND_NODE from `requester`.
    fn closest(&self, requester: &NodeRecord, target: &NodeId) -> Vec<NodeRecord> {
        self.learn(requester);
        self.table.read().closest(target, BUCKET_SIZE)
    }

    /// Records currently in the table.
    pub fn known(&self) -> Vec<NodeRecord> {
        self.table.read().records()
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn reachable(&self, record: &NodeRecord) -> Option<Arc<MemoryNode>> {
        self.network
            .node(record.udp_port)
            .filter(|node| !node.is_closed())
    }
}

#[async_trait]
impl DiscoveryTransport for MemoryNode {
    fn local_record(&self) -> NodeRecord {
        self.local.read().clone()
    }

    fn update_local_record(&self, record: NodeRecord) -> Result<(), ForkDiscoveryError> {
        if self.is_closed() {
            return Err(ForkDiscoveryError::ListenerClosed);
        }
        let mut local = self.local.write();
        if record.node_id() != local.node_id() {
            return Err(ForkDiscoveryError::InvalidRecord(
                "replacement record has a different node id".to_string(),
            ));
        }
        *local = record;
        Ok(())
    }

    async fn ping(&self, remote: &NodeRecord) -> Result<NodeRecord, ForkDiscoveryError> {
        if self.is_closed() {
            return Err(ForkDiscoveryError::ListenerClosed);
        }
        let node = self.reachable(remote).ok_or_else(|| {
            ForkDiscoveryError::Transport(format!("{} unreachable", remote.udp_socket_addr()))
        })?;

        let remote = node.local_record();
        node.learn(&self.local_record());
        self.learn(&remote);
        Ok(remote)
    }

    async fn find_node(
        &self,
        target: NodeId,
        timeout: Duration,
    ) -> Result<Vec<NodeRecord>, ForkDiscoveryError> {
        if self.is_closed() {
            return Err(ForkDiscoveryError::ListenerClosed);
        }

        let deadline = Instant::now() + timeout;
        let local = self.local_record();
        let self_id = local.node_id();
        let mut found: HashMap<NodeId, NodeRecord> = self
            .known()
            .into_iter()
            .map(|r| (r.node_id(), r))
            .collect();
        let mut queried: HashSet<NodeId> = HashSet::new();
        let mut failed: HashSet<NodeId> = HashSet::new();

        while Instant::now() < deadline {
            let known: Vec<NodeRecord> = found.values().cloned().collect();
            let batch: Vec<NodeRecord> = find_k_closest(&known, &target, BUCKET_SIZE)
                .into_iter()
                .filter(|r| !queried.contains(&r.node_id()))
                .take(ALPHA)
                .collect();
            if batch.is_empty() {
                break;
            }

            for record in batch {
                queried.insert(record.node_id());
                let Some(node) = self.reachable(&record) else {
                    trace!(node_id = %record.node_id(), "Lookup peer unreachable");
                    self.table.write().remove(&record.node_id());
                    failed.insert(record.node_id());
                    continue;
                };
                self.learn(&node.local_record());
                for r in node.closest(&local, &target) {
                    if r.node_id() != self_id {
                        found.entry(r.node_id()).or_insert(r);
                    }
                }
            }
        }

        let known: Vec<NodeRecord> = found
            .into_values()
            .filter(|r| !failed.contains(&r.node_id()))
            .collect();
        Ok(find_k_closest(&known, &target, BUCKET_SIZE))
    }

    async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut nodes = self.network.nodes.write();
        if nodes
            .get(&self.port)
            .is_some_and(|node| std::ptr::eq(node.as_ref(), self))
        {
            nodes.remove(&self.port);
        }
    }
}
