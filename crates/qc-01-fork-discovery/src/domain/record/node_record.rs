//! Node Record implementation.
//!
//! Reference: EIP-778 (Ethereum Node Records)

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use k256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};

use super::config::{NodeRecordConfig, MAX_RECORD_SIZE, RECORD_TEXT_PREFIX};
use super::security::{derive_node_id, sign_payload, verify_payload, PublicKey, Signature};
use crate::domain::{ForkDiscoveryError, NodeId};

/// Ethereum Node Record (EIP-778 inspired)
///
/// A self-signed record carrying node identity, addresses and arbitrary
/// key/value entries such as the fork entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// Sequence number (increment on ANY change)
    pub seq: u64,
    /// Node's public key (33 bytes compressed secp256k1)
    pub pubkey: PublicKey,
    /// IP address
    pub ip: IpAddr,
    /// UDP port for discovery
    pub udp_port: u16,
    /// TCP port for connections (0 if none)
    pub tcp_port: u16,
    /// Key/value entries, ordered by key
    entries: BTreeMap<String, Vec<u8>>,
    /// Signature over the record (64 bytes)
    pub signature: Signature,
}

/// Serialized shape of a record. Fixed-size fields travel as byte vectors.
#[derive(Serialize, Deserialize)]
struct RecordWire {
    seq: u64,
    pubkey: Vec<u8>,
    ip: IpAddr,
    udp_port: u16,
    tcp_port: u16,
    entries: BTreeMap<String, Vec<u8>>,
    signature: Vec<u8>,
}

impl NodeRecord {
    /// Create a new unsigned record (for building)
    pub fn new_unsigned(config: NodeRecordConfig) -> Self {
        Self {
            seq: config.seq,
            pubkey: config.pubkey,
            ip: config.ip,
            udp_port: config.udp_port,
            tcp_port: config.tcp_port,
            entries: BTreeMap::new(),
            signature: Signature::empty(),
        }
    }

    /// Get the Node ID derived from public key
    pub fn node_id(&self) -> NodeId {
        derive_node_id(&self.pubkey)
    }

    /// Discovery (UDP) socket address
    pub fn udp_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.udp_port)
    }

    /// Connection (TCP) socket address, `None` if no TCP port is advertised
    pub fn tcp_socket_addr(&self) -> Option<SocketAddr> {
        (self.tcp_port != 0).then(|| SocketAddr::new(self.ip, self.tcp_port))
    }

    // =========================================================================
    // ENTRIES
    // =========================================================================

    /// Set an entry. Bumps `seq` and invalidates the signature.
    ///
    /// # Errors
    ///
    /// `InvalidRecord` if the entries would exceed [`MAX_RECORD_SIZE`]
    /// bytes. The record is left unchanged.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: Vec<u8>,
    ) -> Result<(), ForkDiscoveryError> {
        let key = key.into();
        let replaced = self.entries.get(&key).map_or(0, |v| key.len() + v.len());
        let size = self.entries_size() - replaced + key.len() + value.len();
        if size > MAX_RECORD_SIZE {
            return Err(ForkDiscoveryError::InvalidRecord(format!(
                "entries take {size} bytes, limit is {MAX_RECORD_SIZE}"
            )));
        }
        self.entries.insert(key, value);
        self.touch();
        Ok(())
    }

    /// Get an entry.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Remove an entry. Bumps `seq` only if something was removed.
    pub fn remove(&mut self, key: &str) -> Option<Vec<u8>> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Iterate entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    fn entries_size(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    fn touch(&mut self) {
        self.seq = self.seq.saturating_add(1);
        self.signature = Signature::empty();
    }

    // =========================================================================
    // SIGNING
    // =========================================================================

    /// Get the signing payload (everything except signature)
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&self.seq.to_be_bytes());
        payload.extend_from_slice(&self.pubkey.0);
        match &self.ip {
            IpAddr::V4(v4) => {
                payload.push(4);
                payload.extend_from_slice(&v4.octets());
            }
            IpAddr::V6(v6) => {
                payload.push(16);
                payload.extend_from_slice(&v6.octets());
            }
        }
        payload.extend_from_slice(&self.udp_port.to_be_bytes());
        payload.extend_from_slice(&self.tcp_port.to_be_bytes());
        // `set` and `from_bytes` cap entries at MAX_RECORD_SIZE bytes, so
        // every count and length below fits in a u16.
        payload.extend_from_slice(&(self.entries.len() as u16).to_be_bytes());
        for (key, value) in &self.entries {
            payload.extend_from_slice(&(key.len() as u16).to_be_bytes());
            payload.extend_from_slice(key.as_bytes());
            payload.extend_from_slice(&(value.len() as u16).to_be_bytes());
            payload.extend_from_slice(value);
        }
        payload
    }

    /// Sign the record. The record's public key is replaced by the key's own.
    pub fn sign(&mut self, key: &SigningKey) {
        self.pubkey = PublicKey::from_signing_key(key);
        self.signature = sign_payload(key, &self.signing_payload());
    }

    /// Verify the signature is valid for this record
    pub fn verify_signature(&self) -> bool {
        !self.signature.is_empty()
            && verify_payload(&self.pubkey, &self.signing_payload(), &self.signature)
    }

    // =========================================================================
    // ENCODING
    // =========================================================================

    /// Binary form of the record.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ForkDiscoveryError> {
        let wire = RecordWire {
            seq: self.seq,
            pubkey: self.pubkey.0.to_vec(),
            ip: self.ip,
            udp_port: self.udp_port,
            tcp_port: self.tcp_port,
            entries: self.entries.clone(),
            signature: self.signature.0.to_vec(),
        };
        let bytes =
            bincode::serialize(&wire).map_err(|e| ForkDiscoveryError::InvalidRecord(e.to_string()))?;
        if bytes.len() > MAX_RECORD_SIZE {
            return Err(ForkDiscoveryError::InvalidRecord(format!(
                "record is {} bytes, limit is {MAX_RECORD_SIZE}",
                bytes.len()
            )));
        }
        Ok(bytes)
    }

    /// Parse the binary form. The signature is not checked here.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ForkDiscoveryError> {
        if bytes.len() > MAX_RECORD_SIZE {
            return Err(ForkDiscoveryError::InvalidRecord(format!(
                "record is {} bytes, limit is {MAX_RECORD_SIZE}",
                bytes.len()
            )));
        }
        let wire: RecordWire = bincode::deserialize(bytes)
            .map_err(|e| ForkDiscoveryError::InvalidRecord(e.to_string()))?;

        let pubkey: [u8; 33] = wire.pubkey.as_slice().try_into().map_err(|_| {
            ForkDiscoveryError::InvalidRecord(format!(
                "public key is {} bytes, expected 33",
                wire.pubkey.len()
            ))
        })?;
        let signature: [u8; 64] = wire.signature.as_slice().try_into().map_err(|_| {
            ForkDiscoveryError::InvalidRecord(format!(
                "signature is {} bytes, expected 64",
                wire.signature.len()
            ))
        })?;

        Ok(Self {
            seq: wire.seq,
            pubkey: PublicKey(pubkey),
            ip: wire.ip,
            udp_port: wire.udp_port,
            tcp_port: wire.tcp_port,
            entries: wire.entries,
            signature: Signature(signature),
        })
    }

    /// Text form: `enr:` followed by URL-safe base64 of the binary form.
    pub fn to_text(&self) -> Result<String, ForkDiscoveryError> {
        Ok(format!(
            "{RECORD_TEXT_PREFIX}{}",
            URL_SAFE_NO_PAD.encode(self.to_bytes()?)
        ))
    }

    /// Parse the text form and verify its signature.
    pub fn from_text(text: &str) -> Result<Self, ForkDiscoveryError> {
        let encoded = text.trim().strip_prefix(RECORD_TEXT_PREFIX).ok_or_else(|| {
            ForkDiscoveryError::InvalidRecord(format!("missing `{RECORD_TEXT_PREFIX}` prefix"))
        })?;
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| ForkDiscoveryError::InvalidRecord(e.to_string()))?;
        let record = Self::from_bytes(&bytes)?;
        if !record.verify_signature() {
            return Err(ForkDiscoveryError::InvalidRecord(
                "signature verification failed".to_string(),
            ));
        }
        Ok(record)
    }
}
