use std::sync::Arc;

use k256::ecdsa::SigningKey;
use tracing::{info, warn};

use crate::adapters::{BootstrapReport, DiscoveryListener};
use crate::domain::{attach, retrieve, ForkDiscoveryError, NodeRecord};
use crate::ports::DiscoveryBackend;
use crate::service::ForkDiscoveryService;

/// Parse bootstrap records from their `enr:` text form.
///
/// Invalid entries are skipped with a warning.
pub fn parse_bootstrap_nodes(nodes: &[String]) -> Vec<NodeRecord> {
    nodes
        .iter()
        .filter_map(|text| match NodeRecord::from_text(text) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(node = %text, error = %e, "Skipping invalid bootstrap record");
                None
            }
        })
        .collect()
}

impl ForkDiscoveryService {
    /// Start the discovery listener on `backend` with identity `key`.
    ///
    /// Calling `start` while a listener is running keeps the running one,
    /// including when the calls race.
    ///
    /// # Errors
    ///
    /// `DigestComputation` if the local fork entry cannot be built, and
    /// `BindError` if the listener cannot bind. Unreachable bootstrap nodes
    /// are reported in the returned [`BootstrapReport`].
    pub async fn start(
        &self,
        backend: &dyn DiscoveryBackend,
        key: &SigningKey,
    ) -> Result<BootstrapReport, ForkDiscoveryError> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.listener().is_some() {
            warn!("Discovery already running");
            return Ok(BootstrapReport::default());
        }

        let fork_digest = self.current_fork_digest()?;
        let local = self.build_local_record(key)?;
        let bootstrap = parse_bootstrap_nodes(&self.config.bootstrap_nodes);
        let (listener, report) = DiscoveryListener::start(
            backend,
            self.config.listen_addr(),
            local,
            &bootstrap,
            self.config.bootstrap_timeout(),
        )
        .await?;

        let listener = Arc::new(listener);
        info!(
            node_id = %listener.local_record().node_id(),
            %fork_digest,
            "Fork-aware discovery started"
        );
        *self.node_key.write() = Some(key.clone());
        *self.listener.write() = Some(listener);
        Ok(report)
    }

    /// Close the listener. Idempotent.
    pub async fn stop(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        let listener = self.listener.write().take();
        self.node_key.write().take();
        if let Some(listener) = listener {
            listener.close().await;
        }
    }

    /// Re-sign and re-advertise the local record when the fork entry for
    /// the current epoch differs from the advertised one.
    ///
    /// Returns true if the record was replaced.
    ///
    /// # Errors
    ///
    /// `ListenerClosed` if discovery is not running, `DigestComputation` if
    /// the current entry cannot be built.
    pub fn refresh_local_record(&self) -> Result<bool, ForkDiscoveryError> {
        let listener = self.listener().ok_or(ForkDiscoveryError::ListenerClosed)?;
        let entry = self.current_fork_entry()?;
        let mut record = listener.local_record();
        if retrieve(&record).ok() == Some(entry) {
            return Ok(false);
        }

        let key = self
            .node_key
            .read()
            .clone()
            .ok_or(ForkDiscoveryError::ListenerClosed)?;
        attach(&mut record, &entry)?;
        record.sign(&key);
        let seq = record.seq;
        listener.update_local_record(record)?;

        info!(
            seq,
            fork_digest = %entry.current_fork_digest,
            next_fork_epoch = entry.next_fork_epoch,
            "Advertised fork entry updated"
        );
        Ok(true)
    }
}
