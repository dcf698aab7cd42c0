//! Domain Layer - Pure business logic with no I/O
//!
//! This module contains the fork-compatibility logic including:
//! - Fork digest derivation (SSZ `ForkData` root, truncated)
//! - Fork schedule lookups (current and next fork per epoch)
//! - Fork entry codec (16-byte SSZ container under the `eth2` record key)
//! - Node records (EIP-778 inspired, secp256k1 signed)
//! - Peer compatibility filter (digest match, next-fork divergence)
//! - XOR distance for lookups

pub mod filter;
pub mod fork_digest;
pub mod fork_entry;
pub mod record;
pub mod schedule;
pub mod services;
/// Core domain types (entities, values, errors)
pub mod types;

pub use filter::*;
pub use fork_digest::*;
pub use fork_entry::*;
pub use record::*;
pub use schedule::*;
pub use services::*;
pub use types::*;
