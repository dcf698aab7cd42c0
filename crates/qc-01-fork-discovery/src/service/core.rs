use std::sync::Arc;

use k256::ecdsa::SigningKey;
use parking_lot::RwLock;

use crate::adapters::{DiscoveryConfig, DiscoveryListener};
use crate::domain::{
    attach, compute_fork_digest, ChainTiming, Epoch, ForkDigest, ForkDiscoveryError, ForkEntry,
    ForkSchedule, GenesisInfo, NodeRecord, NodeRecordConfig, PublicKey,
};
use crate::ports::{ForkEventReporter, TimeSource};

/// Fork-aware discovery service implementing the driving port.
///
/// Holds everything discovery needs as explicit state: configuration,
/// genesis parameters, the fork schedule, the clock, the event sink and the
/// live listener handle. `start` and `stop` are serialized by an async
/// mutex, so at most one listener is ever bound.
///
/// # Example
///
/// ```rust,ignore
/// use qc_01_fork_discovery::{ForkDiscoveryService, SystemTimeSource, TracingReporter};
///
/// let service = ForkDiscoveryService::new(
///     config.discovery.clone(),
///     config.chain.genesis()?,
///     config.chain.schedule()?,
///     Arc::new(SystemTimeSource::new()),
///     Arc::new(TracingReporter::new()),
/// )?;
/// let report = service.start(&backend, &key).await?;
/// ```
pub struct ForkDiscoveryService {
    pub(crate) config: DiscoveryConfig,
    pub(crate) genesis: GenesisInfo,
    pub(crate) schedule: ForkSchedule,
    pub(crate) timing: ChainTiming,
    pub(crate) time_source: Arc<dyn TimeSource>,
    pub(crate) reporter: Arc<dyn ForkEventReporter>,
    pub(crate) listener: RwLock<Option<Arc<DiscoveryListener>>>,
    /// Signing key of the running listener, kept to re-sign the record.
    pub(crate) node_key: RwLock<Option<SigningKey>>,
    pub(crate) lifecycle: tokio::sync::Mutex<()>,
}

impl ForkDiscoveryService {
    /// Create a new fork discovery service.
    ///
    /// # Errors
    ///
    /// `UnsupportedEncoding` or `Config` if `config` does not validate.
    pub fn new(
        config: DiscoveryConfig,
        genesis: GenesisInfo,
        schedule: ForkSchedule,
        time_source: Arc<dyn TimeSource>,
        reporter: Arc<dyn ForkEventReporter>,
    ) -> Result<Self, ForkDiscoveryError> {
        config.validate()?;
        Ok(Self {
            config,
            genesis,
            schedule,
            timing: ChainTiming::default(),
            time_source,
            reporter,
            listener: RwLock::new(None),
            node_key: RwLock::new(None),
            lifecycle: tokio::sync::Mutex::new(()),
        })
    }

    /// Override slot timing.
    #[must_use]
    pub fn with_timing(mut self, timing: ChainTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Discovery configuration.
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Fork schedule.
    pub fn schedule(&self) -> &ForkSchedule {
        &self.schedule
    }

    /// Epoch at the time source's current time.
    ///
    /// # Errors
    ///
    /// `DigestComputation` if genesis time is unknown.
    pub fn current_epoch(&self) -> Result<Epoch, ForkDiscoveryError> {
        if !self.genesis.is_known() {
            return Err(ForkDiscoveryError::DigestComputation(
                "genesis time is not set".to_string(),
            ));
        }
        let now = self.time_source.now().as_secs();
        Ok(self.timing.epoch_at(self.genesis.genesis_time, now))
    }

    /// Digest of the fork active at the current epoch.
    pub fn current_fork_digest(&self) -> Result<ForkDigest, ForkDiscoveryError> {
        let epoch = self.current_epoch()?;
        Ok(compute_fork_digest(
            self.schedule.fork_version_at(epoch),
            self.genesis.genesis_validators_root,
        ))
    }

    /// Fork entry for the current epoch.
    pub fn current_fork_entry(&self) -> Result<ForkEntry, ForkDiscoveryError> {
        let epoch = self.current_epoch()?;
        Ok(self
            .schedule
            .fork_entry(epoch, self.genesis.genesis_validators_root))
    }

    /// Signed record advertising our addresses and current fork entry.
    pub fn build_local_record(&self, key: &SigningKey) -> Result<NodeRecord, ForkDiscoveryError> {
        let entry = self.current_fork_entry()?;
        let mut record = NodeRecord::new_unsigned(NodeRecordConfig {
            seq: 1,
            pubkey: PublicKey::from_signing_key(key),
            ip: self.config.host_ip,
            udp_port: self.config.udp_port,
            tcp_port: self.config.tcp_port,
        });
        attach(&mut record, &entry)?;
        record.sign(key);
        Ok(record)
    }

    /// Live listener, if started and not stopped.
    pub fn listener(&self) -> Option<Arc<DiscoveryListener>> {
        self.listener.read().clone()
    }
}
