//! Tests for discovery listener lifecycle and substrates

use super::*;
use crate::domain::{ForkDiscoveryError, NodeId, NodeRecord};
use crate::ports::{DiscoveryBackend, DiscoveryTransport};
use crate::test_utils::{test_key, test_record};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(2);

fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

fn record(seed: u8, port: u16) -> NodeRecord {
    test_record(&test_key(seed), port, port + 1000, None)
}

async fn start(
    network: &InMemoryNetwork,
    seed: u8,
    port: u16,
    bootstrap: &[NodeRecord],
) -> (DiscoveryListener, BootstrapReport) {
    DiscoveryListener::start(network, addr(port), record(seed, port), bootstrap, TIMEOUT)
        .await
        .unwrap()
}

// =============================================================================
// TEST GROUP 1: Startup
// =============================================================================

#[tokio::test]
async fn test_bind_conflict_is_fatal() {
    let network = InMemoryNetwork::new();
    let (_first, _) = start(&network, 1, 3000, &[]).await;

    let err = DiscoveryListener::start(&network, addr(3000), record(2, 3000), &[], TIMEOUT)
        .await
        .unwrap_err();

    assert!(matches!(err, ForkDiscoveryError::BindError { .. }));
}

#[tokio::test]
async fn test_empty_bootstrap_is_not_an_error() {
    let network = InMemoryNetwork::new();
    let (listener, report) = start(&network, 1, 3000, &[]).await;

    assert!(report.is_ok());
    assert_eq!(report.attempted, 0);
    assert!(!listener.is_closed());
}

#[tokio::test]
async fn test_unreachable_bootstrap_is_reported_not_fatal() {
    let network = InMemoryNetwork::new();
    let ghost = record(9, 3999);

    let (listener, report) = start(&network, 1, 3000, &[ghost]).await;

    assert_eq!(
        report.error,
        Some(ForkDiscoveryError::BootstrapError { attempted: 1 })
    );
    assert_eq!(report.reachable, 0);
    // Still operational
    assert!(listener.lookup(NodeId::random(), TIMEOUT).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_partial_bootstrap_succeeds() {
    let network = InMemoryNetwork::new();
    let (boot, _) = start(&network, 1, 3000, &[]).await;

    let (_, report) = start(&network, 2, 3001, &[boot.local_record(), record(9, 3999)]).await;

    assert!(report.is_ok());
    assert_eq!(report.attempted, 2);
    assert_eq!(report.reachable, 1);
}

// =============================================================================
// TEST GROUP 2: Lookups
// =============================================================================

#[tokio::test]
async fn test_lookup_finds_nodes_through_bootstrap() {
    let network = InMemoryNetwork::new();
    let (boot, _) = start(&network, 1, 3000, &[]).await;
    let bootstrap = vec![boot.local_record()];

    let mut others = Vec::new();
    for i in 0..5u8 {
        others.push(start(&network, 10 + i, 3001 + i as u16, &bootstrap).await.0);
    }
    let (searcher, _) = start(&network, 20, 3100, &bootstrap).await;

    let found = searcher.lookup(NodeId::random(), TIMEOUT).await.unwrap();

    assert_eq!(found.len(), 6);
    assert!(found.iter().all(|r| r.node_id() != searcher.local_record().node_id()));
    for other in &others {
        assert!(found.iter().any(|r| r.node_id() == other.local_record().node_id()));
    }
}

#[tokio::test]
async fn test_lookup_discards_unverifiable_records() {
    let network = InMemoryNetwork::new();
    let mut forged = record(1, 3000);
    forged.tcp_port = 1;
    let (boot, _) =
        DiscoveryListener::start(&network, addr(3000), forged, &[], TIMEOUT).await.unwrap();
    let (honest, _) = start(&network, 2, 3001, &[boot.local_record()]).await;
    let (searcher, _) = start(&network, 3, 3002, &[honest.local_record()]).await;

    let found = searcher.lookup(NodeId::random(), TIMEOUT).await.unwrap();

    assert!(found.iter().all(NodeRecord::verify_signature));
    assert!(found.iter().any(|r| r.node_id() == honest.local_record().node_id()));
    assert!(found.iter().all(|r| r.udp_port != 3000));
}

struct SlowTransport {
    local: NodeRecord,
}

#[async_trait]
impl DiscoveryTransport for SlowTransport {
    fn local_record(&self) -> NodeRecord {
        self.local.clone()
    }

    async fn ping(&self, _remote: &NodeRecord) -> Result<NodeRecord, ForkDiscoveryError> {
        Err(ForkDiscoveryError::Transport("unreachable".to_string()))
    }

    fn update_local_record(&self, _record: NodeRecord) -> Result<(), ForkDiscoveryError> {
        Ok(())
    }

    async fn find_node(
        &self,
        _target: NodeId,
        _timeout: Duration,
    ) -> Result<Vec<NodeRecord>, ForkDiscoveryError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(vec![self.local.clone()])
    }

    async fn shutdown(&self) {}
}

struct SlowBackend;

#[async_trait]
impl DiscoveryBackend for SlowBackend {
    async fn bind(
        &self,
        _bind_addr: SocketAddr,
        local: NodeRecord,
    ) -> Result<Arc<dyn DiscoveryTransport>, ForkDiscoveryError> {
        Ok(Arc::new(SlowTransport { local }))
    }
}

#[tokio::test]
async fn test_lookup_skips_departed_nodes() {
    let network = InMemoryNetwork::new();
    let (boot, _) = start(&network, 1, 3000, &[]).await;
    let (gone, _) = start(&network, 2, 3001, &[boot.local_record()]).await;
    let (stays, _) = start(&network, 3, 3002, &[boot.local_record()]).await;
    let gone_id = gone.local_record().node_id();
    gone.close().await;

    let (searcher, _) = start(&network, 4, 3003, &[boot.local_record()]).await;
    let found = searcher.lookup(NodeId::random(), TIMEOUT).await.unwrap();

    assert!(found.iter().all(|r| r.node_id() != gone_id));
    assert!(found.iter().any(|r| r.node_id() == stays.local_record().node_id()));
}

#[tokio::test]
async fn test_lookup_overrunning_transport_yields_empty() {
    let (listener, _) =
        DiscoveryListener::start(&SlowBackend, addr(3000), record(1, 3000), &[], TIMEOUT)
            .await
            .unwrap();

    let found = listener
        .lookup(NodeId::random(), Duration::from_millis(20))
        .await
        .unwrap();

    assert!(found.is_empty());
}

// =============================================================================
// TEST GROUP 3: Advertised Record
// =============================================================================

#[tokio::test]
async fn test_updated_record_is_served_to_new_peers() {
    let network = InMemoryNetwork::new();
    let key = test_key(1);
    let (node, _) = start(&network, 1, 3000, &[]).await;
    let original = node.local_record();

    let mut updated = original.clone();
    updated.tcp_port = 7777;
    updated.seq += 1;
    updated.sign(&key);
    node.update_local_record(updated.clone()).unwrap();
    assert_eq!(node.local_record(), updated);

    let (searcher, report) = start(&network, 2, 3001, &[original]).await;
    assert!(report.is_ok());
    let found = searcher.lookup(NodeId::random(), TIMEOUT).await.unwrap();
    assert!(found.iter().any(|r| r.tcp_port == 7777));
}

#[tokio::test]
async fn test_update_rejects_foreign_record_and_closed_listener() {
    let network = InMemoryNetwork::new();
    let (node, _) = start(&network, 1, 3000, &[]).await;
    let original = node.local_record();

    let err = node.update_local_record(record(2, 3000)).unwrap_err();
    assert!(matches!(err, ForkDiscoveryError::InvalidRecord(_)));
    assert_eq!(node.local_record(), original);

    node.close().await;
    assert_eq!(
        node.update_local_record(original),
        Err(ForkDiscoveryError::ListenerClosed)
    );
}

// =============================================================================
// TEST GROUP 4: Close
// =============================================================================

#[tokio::test]
async fn test_close_is_idempotent_and_blocks_lookups() {
    let network = InMemoryNetwork::new();
    let (listener, _) = start(&network, 1, 3000, &[]).await;

    listener.close().await;
    listener.close().await;

    assert!(listener.is_closed());
    assert_eq!(
        listener.lookup(NodeId::random(), TIMEOUT).await,
        Err(ForkDiscoveryError::ListenerClosed)
    );
}

#[tokio::test]
async fn test_close_releases_port() {
    let network = InMemoryNetwork::new();
    let (listener, _) = start(&network, 1, 3000, &[]).await;
    assert_eq!(network.len(), 1);

    listener.close().await;

    assert!(network.is_empty());
    let (_again, _) = start(&network, 2, 3000, &[]).await;
}

#[tokio::test]
async fn test_closed_node_is_unreachable() {
    let network = InMemoryNetwork::new();
    let (boot, _) = start(&network, 1, 3000, &[]).await;
    let boot_record = boot.local_record();
    boot.close().await;

    let (_, report) = start(&network, 2, 3001, &[boot_record]).await;
    assert!(!report.is_ok());
}

#[tokio::test]
async fn test_close_during_lookup() {
    let network = InMemoryNetwork::new();
    let (boot, _) = start(&network, 1, 3000, &[]).await;
    let (listener, _) = start(&network, 2, 3001, &[boot.local_record()]).await;
    let listener = Arc::new(listener);

    let searcher = Arc::clone(&listener);
    let lookup = tokio::spawn(async move { searcher.lookup(NodeId::random(), TIMEOUT).await });
    listener.close().await;

    let result = lookup.await.unwrap();
    assert!(result.is_ok() || result == Err(ForkDiscoveryError::ListenerClosed));
}

// =============================================================================
// TEST GROUP 5: UDP Substrate
// =============================================================================

#[cfg(feature = "network")]
mod udp {
    use super::*;

    async fn start_udp(seed: u8, bootstrap: &[NodeRecord]) -> (DiscoveryListener, BootstrapReport) {
        let key = test_key(seed);
        let backend = UdpDiscovery::new(key.clone());
        let local = test_record(&key, 0, 4000 + seed as u16, None);
        DiscoveryListener::start(&backend, addr(0), local, bootstrap, TIMEOUT)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_bound_port_is_advertised_and_signed() {
        let (listener, _) = start_udp(1, &[]).await;
        let local = listener.local_record();

        assert_ne!(local.udp_port, 0);
        assert!(local.verify_signature());
        listener.close().await;
    }

    #[tokio::test]
    async fn test_udp_bootstrap_and_lookup() {
        let (boot, _) = start_udp(1, &[]).await;
        let (node, report) = start_udp(2, &[boot.local_record()]).await;

        assert!(report.is_ok());
        let found = node.lookup(NodeId::random(), TIMEOUT).await.unwrap();
        assert!(found.iter().any(|r| r.node_id() == boot.local_record().node_id()));

        node.close().await;
        boot.close().await;
    }

    #[tokio::test]
    async fn test_udp_bind_conflict() {
        let (boot, _) = start_udp(1, &[]).await;
        let port = boot.local_record().udp_port;
        let key = test_key(2);

        let err = DiscoveryListener::start(
            &UdpDiscovery::new(key.clone()),
            addr(port),
            test_record(&key, port, 0, None),
            &[],
            TIMEOUT,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ForkDiscoveryError::BindError { .. }));
        boot.close().await;
    }

    #[tokio::test]
    async fn test_udp_unreachable_bootstrap() {
        let (dead, _) = start_udp(1, &[]).await;
        let dead_record = dead.local_record();
        dead.close().await;

        let key = test_key(2);
        let backend =
            UdpDiscovery::new(key.clone()).with_request_timeout(Duration::from_millis(50));
        let (node, report) = DiscoveryListener::start(
            &backend,
            addr(0),
            test_record(&key, 0, 0, None),
            &[dead_record],
            TIMEOUT,
        )
        .await
        .unwrap();

        assert_eq!(
            report.error,
            Some(ForkDiscoveryError::BootstrapError { attempted: 1 })
        );
        node.close().await;
    }

    #[tokio::test]
    async fn test_udp_lookup_keeps_results_when_peers_do_not_answer() {
        let (boot, _) = start_udp(1, &[]).await;
        for seed in 10..16u8 {
            let (dead, _) = start_udp(seed, &[boot.local_record()]).await;
            dead.close().await;
        }

        let key = test_key(2);
        let backend =
            UdpDiscovery::new(key.clone()).with_request_timeout(Duration::from_millis(300));
        let (node, report) = DiscoveryListener::start(
            &backend,
            addr(0),
            test_record(&key, 0, 0, None),
            &[boot.local_record()],
            TIMEOUT,
        )
        .await
        .unwrap();
        assert!(report.is_ok());

        // Six silent peers at 300ms each would take 1.8s if asked one by one.
        let started = std::time::Instant::now();
        let found = node
            .lookup(NodeId::random(), Duration::from_millis(500))
            .await
            .unwrap();

        assert!(found.iter().any(|r| r.node_id() == boot.local_record().node_id()));
        assert!(started.elapsed() < Duration::from_millis(500) + LOOKUP_GRACE);
        node.close().await;
        boot.close().await;
    }

    #[tokio::test]
    async fn test_udp_updated_record_is_served_in_pong() {
        let key = test_key(1);
        let (node, _) = start_udp(1, &[]).await;
        let original = node.local_record();

        let mut updated = original.clone();
        updated.tcp_port = 7777;
        updated.seq += 1;
        updated.sign(&key);
        node.update_local_record(updated).unwrap();

        let (searcher, report) = start_udp(2, &[original]).await;
        assert!(report.is_ok());
        let found = searcher.lookup(NodeId::random(), TIMEOUT).await.unwrap();
        assert!(found.iter().any(|r| r.tcp_port == 7777));

        searcher.close().await;
        node.close().await;
    }
}
