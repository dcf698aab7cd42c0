//! Domain Errors for Fork-Aware Discovery

use std::net::SocketAddr;
use thiserror::Error;

/// Errors that can occur while advertising, discovering or vetting peers.
///
/// Per-candidate failures (`MissingEntry`, `MalformedEntry`, `InvalidRecord`)
/// never escape the compatibility filter; they only decide that a single
/// candidate is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForkDiscoveryError {
    /// The discovery listener could not bind its UDP port. Fatal to startup.
    #[error("Failed to bind discovery listener on {addr}: {reason}")]
    BindError {
        /// Address we attempted to bind.
        addr: SocketAddr,
        /// Underlying failure.
        reason: String,
    },

    /// None of the bootstrap nodes answered. Not fatal: the listener keeps running.
    #[error("No bootstrap node reachable ({attempted} attempted)")]
    BootstrapError {
        /// Number of bootstrap records contacted.
        attempted: usize,
    },

    /// The node record does not advertise a fork entry.
    #[error("Node record has no `{key}` entry")]
    MissingEntry {
        /// The reserved record key that was looked up.
        key: &'static str,
    },

    /// The fork entry bytes do not decode into the fixed schema.
    #[error("Malformed fork entry: {0}")]
    MalformedEntry(String),

    /// Local fork digest cannot be derived (e.g. genesis not known yet).
    #[error("Cannot compute local fork digest: {0}")]
    DigestComputation(String),

    /// Node record bytes or text could not be parsed or verified.
    #[error("Invalid node record: {0}")]
    InvalidRecord(String),

    /// Operation attempted on a closed discovery listener.
    #[error("Discovery listener is closed")]
    ListenerClosed,

    /// The configured wire encoding is not understood by the fork entry codec.
    #[error("Unsupported encoding `{0}` (expected `ssz` or `ssz_snappy`)")]
    UnsupportedEncoding(String),

    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Node identity key could not be loaded or persisted.
    #[error("Node key error: {0}")]
    KeyStore(String),

    /// Discovery substrate failure (send error, timeout, unreachable node).
    #[error("Transport error: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_mentions_address() {
        let err = ForkDiscoveryError::BindError {
            addr: "127.0.0.1:9000".parse().unwrap(),
            reason: "address in use".to_string(),
        };
        assert!(err.to_string().contains("127.0.0.1:9000"));
        assert!(err.to_string().contains("address in use"));
    }

    #[test]
    fn test_missing_entry_mentions_key() {
        let err = ForkDiscoveryError::MissingEntry { key: "eth2" };
        assert_eq!(err.to_string(), "Node record has no `eth2` entry");
    }

    #[test]
    fn test_bootstrap_error_counts_attempts() {
        let err = ForkDiscoveryError::BootstrapError { attempted: 3 };
        assert!(err.to_string().contains("3 attempted"));
    }
}
