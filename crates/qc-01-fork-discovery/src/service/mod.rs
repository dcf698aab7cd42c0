//! # Fork Discovery Service
//!
//! High-level service implementing the `ForkDiscoveryApi` port.
//!
//! Computes the local fork digest and entry from the schedule and the
//! clock, signs the local record, runs the discovery listener and filters
//! every lookup result through the compatibility filter.

// Semantic submodules
mod api;
mod core;
mod lifecycle;
mod maintenance;

// Re-export public API
pub use self::core::ForkDiscoveryService;
pub use lifecycle::parse_bootstrap_nodes;
