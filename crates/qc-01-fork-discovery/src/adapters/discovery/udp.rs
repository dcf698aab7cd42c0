//! # UDP Discovery Substrate
//!
//! A minimal discovery protocol over tokio UDP sockets. Messages are bincode
//! encoded and carry signed node records:
//!
//! - `PING { nonce, record }` → `PONG { nonce, record }`
//! - `FIND_NODE { nonce, target }` → `NODES { nonce, records }`
//!
//! A background task answers requests and routes responses to waiting
//! callers by nonce. Transport security is out of scope; records are
//! authenticated by their signatures only.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, trace};

use super::memory::{ALPHA, BUCKET_SIZE};
use crate::domain::{
    find_k_closest, ForkDiscoveryError, NodeId, NodeRecord, RecordTable, MAX_TABLE_SIZE,
};
use crate::ports::{DiscoveryBackend, DiscoveryTransport};

/// Maximum UDP payload accepted.
pub const MAX_PACKET_SIZE: usize = 8 * 1024;

/// Default time to wait for a single response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Message {
    Ping { nonce: u64, record: Vec<u8> },
    Pong { nonce: u64, record: Vec<u8> },
    FindNode { nonce: u64, target: [u8; 32] },
    Nodes { nonce: u64, records: Vec<Vec<u8>> },
}

impl Message {
    fn nonce(&self) -> u64 {
        match self {
            Message::Ping { nonce, .. }
            | Message::Pong { nonce, .. }
            | Message::FindNode { nonce, .. }
            | Message::Nodes { nonce, .. } => *nonce,
        }
    }
}

/// UDP discovery backend.
///
/// Holds the node key so that the advertised record can follow the port
/// actually bound (e.g. when binding port 0).
pub struct UdpDiscovery {
    key: SigningKey,
    request_timeout: Duration,
}

impl UdpDiscovery {
    /// Backend signing with `key`.
    pub fn new(key: SigningKey) -> Self {
        Self {
            key,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[async_trait]
impl DiscoveryBackend for UdpDiscovery {
    async fn bind(
        &self,
        bind_addr: SocketAddr,
        mut local: NodeRecord,
    ) -> Result<Arc<dyn DiscoveryTransport>, ForkDiscoveryError> {
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| ForkDiscoveryError::BindError {
                addr: bind_addr,
                reason: e.to_string(),
            })?;
        let bound = socket
            .local_addr()
            .map_err(|e| ForkDiscoveryError::BindError {
                addr: bind_addr,
                reason: e.to_string(),
            })?;

        if bound.port() != local.udp_port {
            local.udp_port = bound.port();
            local.sign(&self.key);
        }
        let advertised = Advertised::new(local)?;
        let local_id = advertised.record.node_id();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let socket = Arc::new(socket);
        let transport = Arc::new_cyclic(|this| UdpTransport {
            socket: Mutex::new(Some(Arc::clone(&socket))),
            local: RwLock::new(advertised),
            table: RwLock::new(RecordTable::new(local_id, MAX_TABLE_SIZE)),
            pending: Mutex::new(HashMap::new()),
            next_nonce: AtomicU64::new(rand::random()),
            request_timeout: self.request_timeout,
            shutdown: shutdown_tx,
            task: Mutex::new(None),
            this: this.clone(),
        });

        let handle = tokio::spawn(receive_loop(Arc::clone(&transport), socket, shutdown_rx));
        *transport.task.lock() = Some(handle);

        info!(%bound, "UDP discovery socket bound");
        Ok(transport)
    }
}

/// Our record together with its wire encoding.
struct Advertised {
    record: NodeRecord,
    bytes: Vec<u8>,
}

impl Advertised {
    fn new(record: NodeRecord) -> Result<Self, ForkDiscoveryError> {
        let bytes = record.to_bytes()?;
        Ok(Self { record, bytes })
    }
}

/// A bound UDP endpoint.
pub struct UdpTransport {
    socket: Mutex<Option<Arc<UdpSocket>>>,
    local: RwLock<Advertised>,
    table: RwLock<RecordTable>,
    pending: Mutex<HashMap<u64, oneshot::Sender<Message>>>,
    next_nonce: AtomicU64,
    request_timeout: Duration,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
    this: Weak<UdpTransport>,
}

impl UdpTransport {
    /// Records currently in the table.
    pub fn known(&self) -> Vec<NodeRecord> {
        self.table.read().records()
    }

    fn learn(&self, record: NodeRecord) {
        self.table.write().insert(record);
    }

    fn local_bytes(&self) -> Vec<u8> {
        self.local.read().bytes.clone()
    }

    fn socket(&self) -> Result<Arc<UdpSocket>, ForkDiscoveryError> {
        self.socket
            .lock()
            .clone()
            .ok_or(ForkDiscoveryError::ListenerClosed)
    }

    async fn send(&self, to: SocketAddr, message: &Message) -> Result<(), ForkDiscoveryError> {
        let bytes =
            bincode::serialize(message).map_err(|e| ForkDiscoveryError::Transport(e.to_string()))?;
        self.socket()?
            .send_to(&bytes, to)
            .await
            .map_err(|e| ForkDiscoveryError::Transport(format!("send to {to}: {e}")))?;
        Ok(())
    }

    async fn request(
        &self,
        to: SocketAddr,
        timeout: Duration,
        build: impl FnOnce(u64) -> Message,
    ) -> Result<Message, ForkDiscoveryError> {
        let nonce = self.next_nonce.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(nonce, tx);

        if let Err(e) = self.send(to, &build(nonce)).await {
            self.pending.lock().remove(&nonce);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(ForkDiscoveryError::ListenerClosed),
            Err(_) => {
                self.pending.lock().remove(&nonce);
                Err(ForkDiscoveryError::Transport(format!("{to} did not answer")))
            }
        }
    }

    async fn query(
        &self,
        peer: &NodeRecord,
        target: NodeId,
        timeout: Duration,
    ) -> Result<Vec<NodeRecord>, ForkDiscoveryError> {
        let reply = self
            .request(peer.udp_socket_addr(), timeout, |nonce| Message::FindNode {
                nonce,
                target: target.0,
            })
            .await?;
        match reply {
            Message::Nodes { records, .. } => Ok(records
                .iter()
                .filter_map(|bytes| NodeRecord::from_bytes(bytes).ok())
                .collect()),
            other => Err(ForkDiscoveryError::Transport(format!(
                "unexpected reply to FIND_NODE (nonce {})",
                other.nonce()
            ))),
        }
    }

    async fn handle(&self, from: SocketAddr, message: Message) {
        match message {
            Message::Ping { nonce, record } => {
                match NodeRecord::from_bytes(&record) {
                    Ok(r) if r.verify_signature() => self.learn(r),
                    _ => trace!(%from, "PING with invalid record"),
                }
                let pong = Message::Pong {
                    nonce,
                    record: self.local_bytes(),
                };
                if let Err(e) = self.send(from, &pong).await {
                    trace!(%from, error = %e, "Failed to send PONG");
                }
            }
            Message::FindNode { nonce, target } => {
                let records = self
                    .table
                    .read()
                    .closest(&NodeId::new(target), BUCKET_SIZE)
                    .iter()
                    .filter_map(|r| r.to_bytes().ok())
                    .collect();
                if let Err(e) = self.send(from, &Message::Nodes { nonce, records }).await {
                    trace!(%from, error = %e, "Failed to send NODES");
                }
            }
            reply @ (Message::Pong { .. } | Message::Nodes { .. }) => {
                let waiter = self.pending.lock().remove(&reply.nonce());
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(reply);
                    }
                    None => trace!(%from, "Unsolicited response"),
                }
            }
        }
    }
}

async fn receive_loop(
    transport: Arc<UdpTransport>,
    socket: Arc<UdpSocket>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = vec![0u8; MAX_PACKET_SIZE];
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            received = socket.recv_from(&mut buf) => {
                let (len, from) = match received {
                    Ok(r) => r,
                    Err(e) => {
                        trace!(error = %e, "UDP receive failed");
                        continue;
                    }
                };
                match bincode::deserialize::<Message>(&buf[..len]) {
                    Ok(message) => transport.handle(from, message).await,
                    Err(e) => trace!(%from, error = %e, "Dropping undecodable packet"),
                }
            }
        }
    }
    debug!("UDP receive loop stopped");
}

#[async_trait]
impl DiscoveryTransport for UdpTransport {
    fn local_record(&self) -> NodeRecord {
        self.local.read().record.clone()
    }

    fn update_local_record(&self, record: NodeRecord) -> Result<(), ForkDiscoveryError> {
        self.socket()?;
        let mut local = self.local.write();
        if record.node_id() != local.record.node_id() {
            return Err(ForkDiscoveryError::InvalidRecord(
                "replacement record has a different node id".to_string(),
            ));
        }
        *local = Advertised::new(record)?;
        Ok(())
    }

    async fn ping(&self, remote: &NodeRecord) -> Result<NodeRecord, ForkDiscoveryError> {
        let record = self.local_bytes();
        let reply = self
            .request(remote.udp_socket_addr(), self.request_timeout, |nonce| {
                Message::Ping { nonce, record }
            })
            .await?;
        let Message::Pong { record, .. } = reply else {
            return Err(ForkDiscoveryError::Transport("unexpected reply to PING".to_string()));
        };
        let record = NodeRecord::from_bytes(&record)?;
        if !record.verify_signature() {
            return Err(ForkDiscoveryError::InvalidRecord(
                "PONG record signature does not verify".to_string(),
            ));
        }
        self.learn(record.clone());
        Ok(record)
    }

    async fn find_node(
        &self,
        target: NodeId,
        timeout: Duration,
    ) -> Result<Vec<NodeRecord>, ForkDiscoveryError> {
        self.socket()?;
        let this = self.this.upgrade().ok_or(ForkDiscoveryError::ListenerClosed)?;

        let deadline = Instant::now() + timeout;
        let self_id = self.local_record().node_id();
        let mut found: HashMap<NodeId, NodeRecord> = self
            .known()
            .into_iter()
            .map(|r| (r.node_id(), r))
            .collect();
        let mut queried: HashSet<NodeId> = HashSet::new();
        let mut failed: HashSet<NodeId> = HashSet::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(%target, found = found.len(), "Lookup deadline reached");
                break;
            }

            let known: Vec<NodeRecord> = found.values().cloned().collect();
            let batch: Vec<NodeRecord> = find_k_closest(&known, &target, BUCKET_SIZE)
                .into_iter()
                .filter(|r| !queried.contains(&r.node_id()))
                .take(ALPHA)
                .collect();
            if batch.is_empty() {
                break;
            }

            let per_query = self.request_timeout.min(remaining);
            let mut queries = JoinSet::new();
            for peer in batch {
                queried.insert(peer.node_id());
                let this = Arc::clone(&this);
                queries.spawn(async move {
                    let result = this.query(&peer, target, per_query).await;
                    (peer, result)
                });
            }

            while let Some(joined) = queries.join_next().await {
                match joined {
                    Ok((peer, Ok(records))) => {
                        if peer.verify_signature() {
                            self.learn(peer);
                        }
                        for record in records {
                            if record.node_id() != self_id {
                                found.entry(record.node_id()).or_insert(record);
                            }
                        }
                    }
                    Ok((peer, Err(e))) => {
                        trace!(node_id = %peer.node_id(), error = %e, "FIND_NODE failed");
                        self.table.write().remove(&peer.node_id());
                        failed.insert(peer.node_id());
                    }
                    Err(e) => debug!(error = %e, "FIND_NODE task failed"),
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
        let _ = self.shutdown.send(true);
        self.socket.lock().take();
        self.pending.lock().clear();

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                debug!(error = %e, "UDP receive task ended abnormally");
            }
        }
    }
}
