//! Tests for Node Records
//!
//! Reference: EIP-778 (Ethereum Node Records)

use super::*;
use k256::ecdsa::SigningKey;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

fn make_key(byte: u8) -> SigningKey {
    SigningKey::from_bytes((&[byte; 32]).into()).unwrap()
}

fn make_record(seq: u64, port: u16) -> NodeRecord {
    NodeRecord::new_unsigned(NodeRecordConfig {
        seq,
        pubkey: PublicKey::from_signing_key(&make_key(1)),
        ip: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 100)),
        udp_port: port,
        tcp_port: port,
    })
}

fn signed_record(seq: u64, port: u16) -> NodeRecord {
    let mut record = make_record(seq, port);
    record.set("eth2", vec![0xaa; 16]).unwrap();
    record.sign(&make_key(1));
    record
}

// =============================================================================
// TEST GROUP 1: Record Creation and Signing
// =============================================================================

#[test]
fn test_record_creation() {
    let record = make_record(1, 8080);

    assert_eq!(record.seq, 1);
    assert_eq!(record.udp_port, 8080);
    assert_eq!(record.entries().count(), 0);
    assert_eq!(
        record.tcp_socket_addr(),
        Some("192.168.1.100:8080".parse().unwrap())
    );
}

#[test]
fn test_record_signing_and_verification() {
    let mut record = make_record(1, 8080);

    // Unsigned records never verify
    assert!(!record.verify_signature());

    record.sign(&make_key(1));
    assert!(record.verify_signature());
}

#[test]
fn test_modified_record_fails_verification() {
    let mut record = signed_record(1, 8080);
    record.udp_port = 9999;
    assert!(!record.verify_signature());
}

#[test]
fn test_foreign_signature_fails_verification() {
    let mut record = signed_record(1, 8080);
    let other = signed_record(1, 8080);
    let mut forged = make_record(1, 8080);
    forged.sign(&make_key(2));

    record.signature = forged.signature;
    assert!(!record.verify_signature());
    assert!(other.verify_signature());
}

// =============================================================================
// TEST GROUP 2: Entries
// =============================================================================

#[test]
fn test_set_bumps_seq_and_clears_signature() {
    let mut record = signed_record(1, 8080);
    let seq = record.seq;

    record.set("eth2", vec![1, 2, 3]).unwrap();

    assert_eq!(record.seq, seq + 1);
    assert!(record.signature.is_empty());
    assert_eq!(record.get("eth2"), Some(&[1u8, 2, 3][..]));
}

#[test]
fn test_remove_missing_key_keeps_seq() {
    let mut record = make_record(5, 8080);
    assert_eq!(record.remove("eth2"), None);
    assert_eq!(record.seq, 5);

    record.set("eth2", vec![9]).unwrap();
    assert_eq!(record.remove("eth2"), Some(vec![9]));
    assert_eq!(record.seq, 7);
    assert!(record.get("eth2").is_none());
}

// =============================================================================
// TEST GROUP 3: Node ID Derivation
// =============================================================================

#[test]
fn test_node_id_derived_from_pubkey() {
    let record1 = make_record(1, 8080);
    let record2 = make_record(2, 9000);
    assert_eq!(record1.node_id(), record2.node_id());

    let mut record3 = make_record(1, 8080);
    record3.sign(&make_key(2));
    assert_ne!(record1.node_id(), record3.node_id());
}

#[test]
fn test_invalid_pubkey_still_has_node_id() {
    let mut record = make_record(1, 8080);
    record.pubkey = PublicKey::empty();
    assert_eq!(record.node_id(), record.node_id());
    assert_ne!(record.node_id(), make_record(1, 8080).node_id());
    assert!(!record.verify_signature());
}

// =============================================================================
// TEST GROUP 4: Encoding
// =============================================================================

#[test]
fn test_text_form_is_prefixed_and_parses() {
    let record = signed_record(3, 30303);
    let text = record.to_text().unwrap();

    assert!(text.starts_with("enr:"));
    assert_eq!(NodeRecord::from_text(&text).unwrap(), record);
}

#[test]
fn test_ipv6_record_survives_bytes() {
    let mut record = make_record(1, 4000);
    record.ip = IpAddr::V6(Ipv6Addr::LOCALHOST);
    record.sign(&make_key(3));

    let parsed = NodeRecord::from_bytes(&record.to_bytes().unwrap()).unwrap();
    assert_eq!(parsed.ip, IpAddr::V6(Ipv6Addr::LOCALHOST));
    assert!(parsed.verify_signature());
}

#[test]
fn test_from_text_rejects_missing_prefix() {
    let text = signed_record(1, 8080).to_text().unwrap();
    let err = NodeRecord::from_text(&text[4..]).unwrap_err();
    assert!(matches!(err, crate::domain::ForkDiscoveryError::InvalidRecord(_)));
}

#[test]
fn test_from_text_rejects_bad_base64() {
    assert!(NodeRecord::from_text("enr:***").is_err());
}

#[test]
fn test_from_text_rejects_unsigned_record() {
    let text = make_record(1, 8080).to_text().unwrap();
    assert!(NodeRecord::from_text(&text).is_err());
}

#[test]
fn test_oversized_record_rejected() {
    let mut record = make_record(1, 8080);
    record.set("blob", vec![0u8; MAX_RECORD_SIZE - 100]).unwrap();
    assert!(record.to_bytes().is_err());
    assert!(NodeRecord::from_bytes(&vec![0u8; MAX_RECORD_SIZE + 1]).is_err());
}

#[test]
fn test_set_rejects_entries_beyond_size_limit() {
    let mut record = make_record(1, 8080);
    let seq = record.seq;

    let err = record.set("blob", vec![0u8; 70_000]).unwrap_err();

    assert!(matches!(err, crate::domain::ForkDiscoveryError::InvalidRecord(_)));
    assert_eq!(record.seq, seq);
    assert!(record.get("blob").is_none());
}

#[test]
fn test_set_counts_replaced_entry_once() {
    let mut record = make_record(1, 8080);
    record.set("blob", vec![0u8; MAX_RECORD_SIZE - 4]).unwrap();
    record.set("blob", vec![1u8; MAX_RECORD_SIZE - 4]).unwrap();

    assert!(record.set("x", vec![0u8; 1]).is_err());
    assert_eq!(record.get("blob").map(<[u8]>::len), Some(MAX_RECORD_SIZE - 4));
}

#[test]
fn test_truncated_bytes_rejected() {
    let bytes = signed_record(1, 8080).to_bytes().unwrap();
    assert!(NodeRecord::from_bytes(&bytes[..bytes.len() / 2]).is_err());
}
