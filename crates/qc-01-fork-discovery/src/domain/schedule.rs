//! # Fork Schedule
//!
//! Maps epochs to the fork version active in them and answers the two
//! questions discovery needs: "which version is live now" and "what is the
//! next scheduled fork".

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::domain::{compute_fork_digest, Epoch, ForkEntry, ForkVersion, Root, FAR_FUTURE_EPOCH};

/// Chain parameters fixed at genesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenesisInfo {
    /// Unix time of genesis (seconds). Zero means not yet known.
    pub genesis_time: u64,
    /// Root that separates otherwise identical networks.
    pub genesis_validators_root: Root,
}

impl GenesisInfo {
    /// True once a genesis time has been set.
    pub fn is_known(&self) -> bool {
        self.genesis_time != 0
    }
}

/// Network fork schedule: genesis version plus `epoch → version` activations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkSchedule {
    forks: BTreeMap<Epoch, ForkVersion>,
}

impl ForkSchedule {
    /// Schedule with only the genesis fork active from epoch 0.
    pub fn new(genesis_fork_version: ForkVersion) -> Self {
        let mut forks = BTreeMap::new();
        forks.insert(0, genesis_fork_version);
        Self { forks }
    }

    /// Add a fork activating at `epoch`. Replaces any fork already at that epoch.
    #[must_use]
    pub fn with_fork(mut self, epoch: Epoch, version: ForkVersion) -> Self {
        self.forks.insert(epoch, version);
        self
    }

    /// Version active at genesis.
    pub fn genesis_fork_version(&self) -> ForkVersion {
        self.fork_version_at(0)
    }

    /// Version of the latest fork activated at or before `epoch`.
    pub fn fork_version_at(&self, epoch: Epoch) -> ForkVersion {
        self.forks
            .range(..=epoch)
            .next_back()
            .map(|(_, version)| *version)
            .unwrap_or_default()
    }

    /// First fork scheduled strictly after `epoch`.
    ///
    /// With nothing scheduled, returns the current version paired with
    /// `FAR_FUTURE_EPOCH`.
    pub fn next_fork(&self, epoch: Epoch) -> (ForkVersion, Epoch) {
        self.forks
            .range((Bound::Excluded(epoch), Bound::Unbounded))
            .next()
            .map(|(next_epoch, version)| (*version, *next_epoch))
            .unwrap_or_else(|| (self.fork_version_at(epoch), FAR_FUTURE_EPOCH))
    }

    /// Fork entry advertised by a node on this schedule at `epoch`.
    pub fn fork_entry(&self, epoch: Epoch, genesis_validators_root: Root) -> ForkEntry {
        let current_fork_digest =
            compute_fork_digest(self.fork_version_at(epoch), genesis_validators_root);
        let (next_fork_version, next_fork_epoch) = self.next_fork(epoch);
        ForkEntry {
            current_fork_digest,
            next_fork_version,
            next_fork_epoch,
        }
    }

    /// All scheduled activations in epoch order.
    pub fn iter(&self) -> impl Iterator<Item = (Epoch, ForkVersion)> + '_ {
        self.forks.iter().map(|(epoch, version)| (*epoch, *version))
    }
}

impl Default for ForkSchedule {
    fn default() -> Self {
        Self::new(ForkVersion::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS: ForkVersion = ForkVersion::new([0, 0, 0, 0]);
    const ALTAIR: ForkVersion = ForkVersion::new([1, 0, 0, 0]);
    const BELLATRIX: ForkVersion = ForkVersion::new([2, 0, 0, 0]);

    fn schedule() -> ForkSchedule {
        ForkSchedule::new(GENESIS)
            .with_fork(74_240, ALTAIR)
            .with_fork(144_896, BELLATRIX)
    }

    #[test]
    fn test_fork_version_at_boundaries() {
        let s = schedule();
        assert_eq!(s.fork_version_at(0), GENESIS);
        assert_eq!(s.fork_version_at(74_239), GENESIS);
        assert_eq!(s.fork_version_at(74_240), ALTAIR);
        assert_eq!(s.fork_version_at(144_896), BELLATRIX);
        assert_eq!(s.fork_version_at(u64::MAX), BELLATRIX);
    }

    #[test]
    fn test_next_fork_is_strictly_after() {
        let s = schedule();
        assert_eq!(s.next_fork(0), (ALTAIR, 74_240));
        assert_eq!(s.next_fork(74_240), (BELLATRIX, 144_896));
    }

    #[test]
    fn test_no_next_fork_uses_current_version_and_sentinel() {
        let s = schedule();
        assert_eq!(s.next_fork(144_896), (BELLATRIX, FAR_FUTURE_EPOCH));
        assert_eq!(s.next_fork(u64::MAX), (BELLATRIX, FAR_FUTURE_EPOCH));
        assert_eq!(
            ForkSchedule::new(GENESIS).next_fork(0),
            (GENESIS, FAR_FUTURE_EPOCH)
        );
    }

    #[test]
    fn test_fork_entry_with_scheduled_fork() {
        let s = ForkSchedule::new(GENESIS).with_fork(1, ForkVersion::new([0, 0, 0, 1]));
        let entry = s.fork_entry(0, Root::default());

        assert_eq!(
            entry.current_fork_digest,
            compute_fork_digest(GENESIS, Root::default())
        );
        assert_eq!(entry.next_fork_version, ForkVersion::new([0, 0, 0, 1]));
        assert_eq!(entry.next_fork_epoch, 1);
    }

    #[test]
    fn test_override_genesis_version() {
        let s = ForkSchedule::new(GENESIS).with_fork(0, ALTAIR);
        assert_eq!(s.genesis_fork_version(), ALTAIR);
        assert_eq!(s.iter().count(), 1);
    }
}
