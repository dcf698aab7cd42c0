use async_trait::async_trait;
use multiaddr::Multiaddr;

use crate::domain::{filter_peers, ForkDigest, ForkDiscoveryError, ForkEntry, NodeId, NodeRecord};
use crate::ports::ForkDiscoveryApi;
use crate::service::ForkDiscoveryService;

#[async_trait]
impl ForkDiscoveryApi for ForkDiscoveryService {
    fn local_fork_digest(&self) -> Result<ForkDigest, ForkDiscoveryError> {
        self.current_fork_digest()
    }

    fn local_fork_entry(&self) -> Result<ForkEntry, ForkDiscoveryError> {
        self.current_fork_entry()
    }

    fn process_peers(&self, records: &[NodeRecord]) -> Result<Vec<Multiaddr>, ForkDiscoveryError> {
        let entry = self.current_fork_entry()?;
        Ok(filter_peers(
            records,
            entry.current_fork_digest,
            &entry,
            self.reporter.as_ref(),
        ))
    }

    async fn discover_peers(&self, target: NodeId) -> Result<Vec<Multiaddr>, ForkDiscoveryError> {
        let listener = self.listener().ok_or(ForkDiscoveryError::ListenerClosed)?;
        let records = listener
            .lookup(target, self.config.lookup_timeout())
            .await?;
        self.process_peers(&records)
    }
}
