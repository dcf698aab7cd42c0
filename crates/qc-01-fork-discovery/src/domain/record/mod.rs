//! # Node Records
//!
//! Self-signed node identity records (EIP-778 inspired).
//!
//! ## Security Properties
//!
//! - Self-signed: Record is signed by the node's secp256k1 key
//! - Sequence number: Every mutation bumps `seq` and clears the signature
//! - Compact: Bounded binary form, `enr:` text form for bootstrap lists
//!
//! Reference: EIP-778 (Ethereum Node Records)

mod config;
mod node_record;
mod security;

pub use config::{NodeRecordConfig, MAX_RECORD_SIZE, RECORD_TEXT_PREFIX};
pub use node_record::NodeRecord;
pub use security::{derive_node_id, sign_payload, verify_payload, PublicKey, Signature};

#[cfg(test)]
mod tests;
