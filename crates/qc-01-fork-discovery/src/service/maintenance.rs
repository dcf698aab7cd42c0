use std::sync::Arc;

use multiaddr::Multiaddr;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

use crate::domain::{ForkDiscoveryError, NodeId};
use crate::ports::ForkDiscoveryApi;
use crate::service::ForkDiscoveryService;

impl ForkDiscoveryService {
    /// Periodically look up random targets and forward vetted addresses to `sink`.
    ///
    /// Runs every `search_interval_secs`. Each round first re-advertises the
    /// local record if a fork has activated since the last one. Stops when `shutdown` turns true
    /// or is dropped, when `sink` is dropped, or when the listener closes.
    pub fn spawn_peer_search(
        self: &Arc<Self>,
        sink: mpsc::Sender<Vec<Multiaddr>>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(service.config.search_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        match service.refresh_local_record() {
                            Ok(_) => {}
                            Err(ForkDiscoveryError::ListenerClosed) => break,
                            Err(e) => warn!(error = %e, "Could not refresh local record"),
                        }
                        match service.discover_peers(NodeId::random()).await {
                            Ok(peers) if peers.is_empty() => trace!("Peer search found nothing new"),
                            Ok(peers) => {
                                debug!(count = peers.len(), "Peer search found compatible peers");
                                if sink.send(peers).await.is_err() {
                                    debug!("Peer sink dropped");
                                    break;
                                }
                            }
                            Err(ForkDiscoveryError::ListenerClosed) => break,
                            Err(e) => warn!(error = %e, "Peer search failed"),
                        }
                    }
                }
            }
            debug!("Peer search stopped");
        })
    }
}
