//! Node record configuration.

use std::net::IpAddr;

use super::security::PublicKey;

/// Maximum encoded size of a node record (bytes)
pub const MAX_RECORD_SIZE: usize = 300;

/// Text prefix of an encoded record, as used in bootstrap lists
pub const RECORD_TEXT_PREFIX: &str = "enr:";

/// Configuration for creating a new NodeRecord
#[derive(Debug, Clone)]
pub struct NodeRecordConfig {
    /// Sequence number
    pub seq: u64,
    /// Public Key
    pub pubkey: PublicKey,
    /// IP Address
    pub ip: IpAddr,
    /// UDP Port (discovery)
    pub udp_port: u16,
    /// TCP Port (connections), 0 if the node does not accept connections
    pub tcp_port: u16,
}
