//! # Fork Digest
//!
//! `compute_fork_digest` is a wire-format constant: every client on the
//! network must produce byte-identical output for the same inputs.
//!
//! The digest is the first four bytes of the SSZ `hash_tree_root` of
//!
//! ```text
//! ForkData {
//!     current_version: Bytes4,
//!     genesis_validators_root: Bytes32,
//! }
//! ```
//!
//! A two-field container merkleizes to exactly one SHA-256 over two
//! 32-byte chunks, the version right-padded with zeros and the root as is.

use sha2::{Digest, Sha256};

use crate::domain::{ForkDigest, ForkVersion, Root};

const BYTES_PER_CHUNK: usize = 32;

/// Return the 32-byte fork data root for `current_version` and
/// `genesis_validators_root`.
pub fn compute_fork_data_root(current_version: ForkVersion, genesis_validators_root: Root) -> Root {
    let mut version_chunk = [0u8; BYTES_PER_CHUNK];
    version_chunk[..ForkVersion::LEN].copy_from_slice(current_version.as_bytes());

    let mut hasher = Sha256::new();
    hasher.update(version_chunk);
    hasher.update(genesis_validators_root.as_bytes());
    Root::new(hasher.finalize().into())
}

/// Return the 4-byte fork digest for `current_version` and
/// `genesis_validators_root`.
pub fn compute_fork_digest(current_version: ForkVersion, genesis_validators_root: Root) -> ForkDigest {
    let root = compute_fork_data_root(current_version, genesis_validators_root);
    let mut digest = [0u8; ForkDigest::LEN];
    digest.copy_from_slice(&root.as_bytes()[..ForkDigest::LEN]);
    ForkDigest::new(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAINNET_GENESIS_VALIDATORS_ROOT: &str =
        "0x4b363db94e286120d76eb905340fdd4e54bfe9f06bf33ff6cf5ad27f511bfe95";

    fn mainnet_root() -> Root {
        Root::from_hex(MAINNET_GENESIS_VALIDATORS_ROOT).unwrap()
    }

    #[test]
    fn test_mainnet_phase0_digest() {
        let digest = compute_fork_digest(ForkVersion::new([0, 0, 0, 0]), mainnet_root());
        assert_eq!(digest, ForkDigest::new([0xb5, 0x30, 0x3f, 0x2a]));
    }

    #[test]
    fn test_mainnet_altair_digest() {
        let digest = compute_fork_digest(ForkVersion::new([1, 0, 0, 0]), mainnet_root());
        assert_eq!(digest, ForkDigest::new([0xaf, 0xca, 0xab, 0xa0]));
    }

    #[test]
    fn test_zero_inputs_digest() {
        // SHA-256 of 64 zero bytes starts with f5a5fd42
        let digest = compute_fork_digest(ForkVersion::default(), Root::default());
        assert_eq!(digest, ForkDigest::new([0xf5, 0xa5, 0xfd, 0x42]));
    }

    #[test]
    fn test_digest_is_deterministic() {
        for seed in 0u8..16 {
            let version = ForkVersion::new([seed, 0, 0, seed]);
            let root = Root::new([seed.wrapping_mul(7); 32]);
            assert_eq!(
                compute_fork_digest(version, root),
                compute_fork_digest(version, root)
            );
        }
    }

    #[test]
    fn test_distinct_genesis_roots_give_distinct_digests() {
        let version = ForkVersion::default();
        let digests: Vec<ForkDigest> = (3001u32..=3005)
            .map(|port| {
                let mut root = [0u8; 32];
                let label = port.to_string();
                root[..label.len()].copy_from_slice(label.as_bytes());
                compute_fork_digest(version, Root::new(root))
            })
            .chain(std::iter::once(compute_fork_digest(version, Root::default())))
            .collect();

        for (i, a) in digests.iter().enumerate() {
            for b in &digests[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_distinct_versions_give_distinct_digests() {
        let root = Root::default();
        assert_ne!(
            compute_fork_digest(ForkVersion::new([0, 0, 0, 0]), root),
            compute_fork_digest(ForkVersion::new([0, 0, 0, 1]), root)
        );
    }

    #[test]
    fn test_fork_data_root_prefix_is_digest() {
        let version = ForkVersion::new([2, 0, 0, 0]);
        let root = mainnet_root();
        let data_root = compute_fork_data_root(version, root);
        assert_eq!(
            &data_root.as_bytes()[..4],
            compute_fork_digest(version, root).as_bytes()
        );
    }
}
