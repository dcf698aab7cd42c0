//! # Discovery Adapters
//!
//! - `DiscoveryListener` - listener lifecycle over any `DiscoveryBackend`
//! - `InMemoryNetwork` - in-process substrate for tests and simulations
//! - `UdpDiscovery` - tokio UDP substrate (requires feature: `network`)

mod listener;
mod memory;
#[cfg(feature = "network")]
mod udp;

pub use listener::{BootstrapReport, DiscoveryListener, LOOKUP_GRACE};
pub use memory::{InMemoryNetwork, MemoryNode, ALPHA, BUCKET_SIZE};
#[cfg(feature = "network")]
pub use udp::{UdpDiscovery, UdpTransport, DEFAULT_REQUEST_TIMEOUT, MAX_PACKET_SIZE};

#[cfg(test)]
mod tests;
