//! # Fork-Aware Discovery Node
//!
//! Runs the discovery listener over UDP and periodically logs the dialable
//! addresses of peers on the local fork.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (TOML file from `QC_DISCOVERY_CONFIG` or argv[1])
//! 2. Load or generate the node key
//! 3. Bind the listener and contact bootstrap nodes
//! 4. Search for peers until Ctrl+C

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use qc_01_fork_discovery::{
    FileKeyStore, ForkDiscoveryApi, ForkDiscoveryService, NodeConfig, SystemTimeSource,
    TracingReporter, UdpDiscovery,
};

/// Load configuration from file and environment.
fn load_config() -> Result<NodeConfig> {
    let path = std::env::var("QC_DISCOVERY_CONFIG")
        .ok()
        .or_else(|| std::env::args().nth(1));

    let mut config = match path {
        Some(path) => {
            info!("Loading configuration from {path}");
            NodeConfig::load(&path).with_context(|| format!("Failed to load {path}"))?
        }
        None => {
            warn!("No configuration file given, using defaults");
            NodeConfig::default()
        }
    };

    // Override ports from environment
    if let Ok(port) = std::env::var("QC_UDP_PORT") {
        if let Ok(p) = port.parse() {
            config.discovery.udp_port = p;
        }
    }
    if let Ok(port) = std::env::var("QC_TCP_PORT") {
        if let Ok(p) = port.parse() {
            config.discovery.tcp_port = p;
        }
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = load_config()?;

    let key = FileKeyStore::new(&config.discovery.data_dir)
        .load_or_generate()
        .context("Failed to load node key")?;

    let service = ForkDiscoveryService::new(
        config.discovery.clone(),
        config.chain.genesis()?,
        config.chain.schedule()?,
        Arc::new(SystemTimeSource::new()),
        Arc::new(TracingReporter::new()),
    )?
    .with_timing(config.chain.timing());
    let service = Arc::new(service);

    let report = service
        .start(&UdpDiscovery::new(key.clone()), &key)
        .await
        .context("Failed to start discovery")?;
    if let Some(e) = &report.error {
        warn!("Bootstrap incomplete: {e}");
    }

    info!("Fork digest: {}", service.local_fork_digest()?);
    if let Some(listener) = service.listener() {
        if let Ok(text) = listener.local_record().to_text() {
            info!("Local record: {text}");
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (sink, mut peers) = mpsc::channel(16);
    let search = service.spawn_peer_search(sink, shutdown_rx);

    let printer = tokio::spawn(async move {
        while let Some(batch) = peers.recv().await {
            for addr in batch {
                info!("Compatible peer: {addr}");
            }
        }
    });

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    info!("Initiating graceful shutdown...");
    if let Err(e) = shutdown_tx.send(true) {
        error!("Failed to send shutdown signal: {e}");
    }
    if let Err(e) = search.await {
        error!("Peer search task failed: {e}");
    }
    service.stop().await;
    printer.abort();

    info!("Shutdown complete");
    Ok(())
}
