//! # TOML Configuration
//!
//! Loads discovery and chain parameters from a TOML file. Every field has a
//! default, so an empty file is a valid local-testnet config.
//!
//! # Config File Format
//!
//! ```toml
//! [discovery]
//! bootstrap_nodes = ["enr:..."]
//! listen_ip = "0.0.0.0"
//! host_ip = "192.168.1.100"
//! udp_port = 12000
//! tcp_port = 13000
//! encoding = "ssz_snappy"
//! data_dir = "/var/lib/qc/beacon"
//! lookup_timeout_ms = 2000
//! bootstrap_timeout_ms = 2000
//! search_interval_secs = 6
//!
//! [chain]
//! genesis_time = 1606824023
//! genesis_validators_root = "0x4b363db94e286120d76eb905340fdd4e54bfe9f06bf33ff6cf5ad27f511bfe95"
//! genesis_fork_version = "0x00000000"
//! seconds_per_slot = 12
//! slots_per_epoch = 32
//!
//! [[chain.forks]]
//! epoch = 74240
//! version = "0x01000000"
//! ```

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::{
    ChainTiming, Epoch, ForkDiscoveryError, ForkSchedule, ForkVersion, GenesisInfo, Root,
};

/// Wire encoding of gossip and req/resp payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Plain SSZ
    Ssz,
    /// SSZ with snappy framing
    SszSnappy,
}

impl FromStr for Encoding {
    type Err = ForkDiscoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ssz" => Ok(Self::Ssz),
            "ssz_snappy" => Ok(Self::SszSnappy),
            other => Err(ForkDiscoveryError::UnsupportedEncoding(other.to_string())),
        }
    }
}

/// Discovery listener settings. Built once at startup, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Bootstrap records in `enr:` text form
    pub bootstrap_nodes: Vec<String>,
    /// Address the UDP socket binds to
    pub listen_ip: IpAddr,
    /// Address advertised in the local record
    pub host_ip: IpAddr,
    /// Discovery port
    pub udp_port: u16,
    /// Connection port advertised to peers
    pub tcp_port: u16,
    /// Payload encoding identifier (`ssz` or `ssz_snappy`)
    pub encoding: String,
    /// Directory holding the node key; empty for an ephemeral key
    pub data_dir: PathBuf,
    /// Upper bound on a single lookup
    pub lookup_timeout_ms: u64,
    /// Upper bound on contacting each bootstrap node
    pub bootstrap_timeout_ms: u64,
    /// Interval between periodic peer searches
    pub search_interval_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            bootstrap_nodes: Vec::new(),
            listen_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            host_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            udp_port: 12000,
            tcp_port: 13000,
            encoding: "ssz_snappy".to_string(),
            data_dir: PathBuf::new(),
            lookup_timeout_ms: 2_000,
            bootstrap_timeout_ms: 2_000,
            search_interval_secs: 6,
        }
    }
}

impl DiscoveryConfig {
    /// Parsed encoding.
    ///
    /// # Errors
    ///
    /// `UnsupportedEncoding` for anything but `ssz` and `ssz_snappy`.
    pub fn encoding(&self) -> Result<Encoding, ForkDiscoveryError> {
        self.encoding.parse()
    }

    /// Check settings that cannot be expressed in types.
    pub fn validate(&self) -> Result<(), ForkDiscoveryError> {
        self.encoding()?;
        if self.search_interval_secs == 0 {
            return Err(ForkDiscoveryError::Config(
                "search_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Socket address the discovery listener binds to.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_ip, self.udp_port)
    }

    /// Lookup timeout.
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    /// Per-node bootstrap timeout.
    pub fn bootstrap_timeout(&self) -> Duration {
        Duration::from_millis(self.bootstrap_timeout_ms)
    }

    /// Interval between periodic searches.
    pub fn search_interval(&self) -> Duration {
        Duration::from_secs(self.search_interval_secs)
    }
}

/// One scheduled fork in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForkConfig {
    /// Activation epoch
    pub epoch: Epoch,
    /// Hex fork version
    pub version: String,
}

/// Chain parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Unix genesis time; 0 while unknown
    pub genesis_time: u64,
    /// Hex genesis validators root
    pub genesis_validators_root: String,
    /// Hex genesis fork version
    pub genesis_fork_version: String,
    /// Seconds per slot
    pub seconds_per_slot: u64,
    /// Slots per epoch
    pub slots_per_epoch: u64,
    /// Forks after genesis
    pub forks: Vec<ForkConfig>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        let timing = ChainTiming::default();
        Self {
            genesis_time: 0,
            genesis_validators_root: Root::default().to_string(),
            genesis_fork_version: ForkVersion::default().to_string(),
            seconds_per_slot: timing.seconds_per_slot,
            slots_per_epoch: timing.slots_per_epoch,
            forks: Vec::new(),
        }
    }
}

impl ChainConfig {
    /// Genesis time and validators root.
    pub fn genesis(&self) -> Result<GenesisInfo, ForkDiscoveryError> {
        let genesis_validators_root = Root::from_hex(&self.genesis_validators_root)
            .ok_or_else(|| {
                ForkDiscoveryError::Config(format!(
                    "invalid genesis_validators_root `{}`",
                    self.genesis_validators_root
                ))
            })?;
        Ok(GenesisInfo {
            genesis_time: self.genesis_time,
            genesis_validators_root,
        })
    }

    /// Fork schedule from the genesis version and listed forks.
    pub fn schedule(&self) -> Result<ForkSchedule, ForkDiscoveryError> {
        let mut schedule = ForkSchedule::new(parse_version(&self.genesis_fork_version)?);
        for fork in &self.forks {
            schedule = schedule.with_fork(fork.epoch, parse_version(&fork.version)?);
        }
        Ok(schedule)
    }

    /// Slot timing.
    pub fn timing(&self) -> ChainTiming {
        ChainTiming {
            seconds_per_slot: self.seconds_per_slot,
            slots_per_epoch: self.slots_per_epoch,
        }
    }
}

fn parse_version(s: &str) -> Result<ForkVersion, ForkDiscoveryError> {
    ForkVersion::from_hex(s)
        .ok_or_else(|| ForkDiscoveryError::Config(format!("invalid fork version `{s}`")))
}

/// Whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// `[discovery]` table
    pub discovery: DiscoveryConfig,
    /// `[chain]` table
    pub chain: ChainConfig,
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ForkDiscoveryError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ForkDiscoveryError::Config(format!(
                "failed to read {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ForkDiscoveryError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ForkDiscoveryError::Config(e.to_string()))?;
        config.discovery.validate()?;
        Ok(config)
    }
}
