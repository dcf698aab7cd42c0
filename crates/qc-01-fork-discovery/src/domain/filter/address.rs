//! Dialable address construction for kept candidates.

use std::net::IpAddr;

use libp2p_identity::{secp256k1, PeerId, PublicKey as Libp2pPublicKey};
use multiaddr::{Multiaddr, Protocol};

use crate::domain::NodeRecord;

/// libp2p peer id of the record's secp256k1 key.
pub fn peer_id(record: &NodeRecord) -> Option<PeerId> {
    let key = secp256k1::PublicKey::try_from_bytes(record.pubkey.as_bytes()).ok()?;
    Some(Libp2pPublicKey::from(key).to_peer_id())
}

/// `/ip4|ip6/<ip>/tcp/<port>/p2p/<peer id>` for `record`.
///
/// `None` if the record advertises no TCP port, an unspecified IP, or a key
/// that is not a valid secp256k1 point.
pub fn dialable_address(record: &NodeRecord) -> Option<Multiaddr> {
    if record.tcp_port == 0 || record.ip.is_unspecified() {
        return None;
    }
    let peer_id = peer_id(record)?;
    let ip = match record.ip {
        IpAddr::V4(v4) => Protocol::Ip4(v4),
        IpAddr::V6(v6) => Protocol::Ip6(v6),
    };
    Some(
        Multiaddr::empty()
            .with(ip)
            .with(Protocol::Tcp(record.tcp_port))
            .with(Protocol::P2p(peer_id)),
    )
}
