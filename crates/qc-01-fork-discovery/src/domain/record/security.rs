//! Cryptographic security for node records.
//!
//! SECURITY-CRITICAL: This file contains all signing and verification logic.
//! Isolate for security audits.

use k256::ecdsa::{
    signature::{Signer, Verifier},
    Signature as EcdsaSignature, SigningKey, VerifyingKey,
};
use sha3::{Digest, Keccak256};

use crate::domain::NodeId;

/// Compressed secp256k1 public key (33 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; 33]);

impl PublicKey {
    /// Create from bytes
    pub fn new(bytes: [u8; 33]) -> Self {
        Self(bytes)
    }

    /// Create an empty public key
    pub fn empty() -> Self {
        Self([0u8; 33])
    }

    /// Public half of `key`.
    pub fn from_signing_key(key: &SigningKey) -> Self {
        let sec1 = key.verifying_key().to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(sec1.as_bytes());
        Self(bytes)
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    /// Parse into a curve point. `None` if the bytes are not a valid point.
    pub fn verifying_key(&self) -> Option<VerifyingKey> {
        VerifyingKey::from_sec1_bytes(&self.0).ok()
    }
}

/// ECDSA signature (64 bytes: r + s)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Create from bytes
    pub fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Create an empty signature
    pub fn empty() -> Self {
        Self([0u8; 64])
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// True for the all-zero placeholder of an unsigned record.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

/// Sign `payload` (RFC 6979 deterministic, SHA-256 prehash).
pub fn sign_payload(key: &SigningKey, payload: &[u8]) -> Signature {
    let sig: EcdsaSignature = key.sign(payload);
    let mut bytes = [0u8; 64];
    bytes.copy_from_slice(&sig.to_bytes());
    Signature(bytes)
}

/// Verify `signature` over `payload` under `pubkey`.
pub fn verify_payload(pubkey: &PublicKey, payload: &[u8], signature: &Signature) -> bool {
    let Some(verifying_key) = pubkey.verifying_key() else {
        return false;
    };
    let Ok(sig) = EcdsaSignature::from_slice(&signature.0) else {
        return false;
    };
    verifying_key.verify(payload, &sig).is_ok()
}

/// Node ID = Keccak256 of the uncompressed public key without its 0x04 tag.
///
/// Keys that are not valid curve points hash their raw bytes instead, so
/// every record still has a stable identity for logging and routing.
pub fn derive_node_id(pubkey: &PublicKey) -> NodeId {
    let hash = match pubkey.verifying_key() {
        Some(key) => {
            let uncompressed = key.to_encoded_point(false);
            Keccak256::digest(&uncompressed.as_bytes()[1..])
        }
        None => Keccak256::digest(pubkey.0),
    };
    NodeId::new(hash.into())
}
