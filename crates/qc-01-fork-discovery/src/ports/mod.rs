//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! This module defines the port interfaces (traits) for fork-aware discovery.
//!
//! ## Architecture
//!
//! - **Driving Ports (Inbound):** APIs this subsystem exposes to consumers
//! - **Driven Ports (Outbound):** SPIs this subsystem requires from adapters

pub mod inbound;
pub mod outbound;

pub use inbound::ForkDiscoveryApi;
pub use outbound::{DiscoveryBackend, DiscoveryTransport, ForkEventReporter, TimeSource};
