//! Test utilities for fork-aware discovery.
//!
//! This module provides deterministic time and ready-made signed records.
//! Enable with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust,ignore
//! use qc_01_fork_discovery::test_utils::FixedTimeSource;
//! use qc_01_fork_discovery::TimeSource;
//!
//! let time_source = FixedTimeSource::new(1000);
//! assert_eq!(time_source.now().as_secs(), 1000);
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use k256::ecdsa::SigningKey;

use crate::domain::{attach, ForkEntry, NodeRecord, NodeRecordConfig, PublicKey, Timestamp};
use crate::ports::outbound::TimeSource;

/// A time source that returns a fixed timestamp until moved with [`set`](Self::set).
///
/// Clones share the same clock.
///
/// # Example
///
/// ```rust,ignore
/// use qc_01_fork_discovery::test_utils::FixedTimeSource;
/// use qc_01_fork_discovery::TimeSource;
///
/// let time = FixedTimeSource::new(12345);
/// let handle = time.clone();
/// handle.set(20000);
/// assert_eq!(time.now().as_secs(), 20000);
/// ```
#[derive(Debug, Clone)]
pub struct FixedTimeSource {
    timestamp: Arc<AtomicU64>,
}

impl FixedTimeSource {
    /// Create a new fixed time source with the given timestamp (in seconds).
    pub fn new(timestamp: u64) -> Self {
        Self {
            timestamp: Arc::new(AtomicU64::new(timestamp)),
        }
    }

    /// Get the configured timestamp value.
    pub fn timestamp(&self) -> u64 {
        self.timestamp.load(Ordering::SeqCst)
    }

    /// Move the clock.
    pub fn set(&self, timestamp: u64) {
        self.timestamp.store(timestamp, Ordering::SeqCst);
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.timestamp())
    }
}

/// Deterministic node key derived from `seed`. `seed` must be non-zero.
pub fn test_key(seed: u8) -> SigningKey {
    let mut secret = [seed; 32];
    secret[0] = 0x01;
    SigningKey::from_bytes((&secret).into()).unwrap_or_else(|_| SigningKey::random(&mut rand::thread_rng()))
}

/// Signed loopback record for `key`, optionally carrying a fork entry.
pub fn test_record(
    key: &SigningKey,
    udp_port: u16,
    tcp_port: u16,
    entry: Option<&ForkEntry>,
) -> NodeRecord {
    let mut record = NodeRecord::new_unsigned(NodeRecordConfig {
        seq: 1,
        pubkey: PublicKey::from_signing_key(key),
        ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
        udp_port,
        tcp_port,
    });
    if let Some(entry) = entry {
        attach(&mut record, entry).expect("fork entry fits in a fresh record");
    }
    record.sign(key);
    record
}
