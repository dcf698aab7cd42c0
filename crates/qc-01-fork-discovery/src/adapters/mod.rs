//! # Adapters
//!
//! Concrete implementations of the ports:
//!
//! - `discovery` - listener lifecycle, in-memory and UDP substrates
//! - `reporter` - fork event sinks (tracing, in-memory)
//! - `key_store` - persisted node identity key
//! - `config` - TOML configuration
//! - `time` - system clock

pub mod config;
pub mod discovery;
pub mod key_store;
pub mod reporter;
pub mod time;

pub use config::{ChainConfig, DiscoveryConfig, Encoding, ForkConfig, NodeConfig};
pub use discovery::{BootstrapReport, DiscoveryListener, InMemoryNetwork};
#[cfg(feature = "network")]
pub use discovery::UdpDiscovery;
pub use key_store::{FileKeyStore, KEY_FILE_NAME};
pub use reporter::{InMemoryReporter, TracingReporter, NEXT_FORK_DIVERGENCE_MESSAGE};
pub use time::SystemTimeSource;
