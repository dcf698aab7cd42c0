//! Domain Services - Kademlia-style distance, selection and record tables
//!
//! The distance and sorting functions are pure and deterministic.
//! `RecordTable` is the bounded in-memory table each endpoint keeps.

// Semantic submodules
mod distance;
mod sorting;
mod table;

// Re-export public API
pub use distance::xor_distance;
pub use sorting::{find_k_closest, sort_by_distance};
pub use table::{RecordTable, MAX_TABLE_SIZE};
