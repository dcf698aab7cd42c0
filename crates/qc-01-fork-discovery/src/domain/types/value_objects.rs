//! Value Objects for Fork Identification
//!
//! Fixed-width byte values that identify a network instance and the
//! protocol version active in a given epoch.

use std::fmt;

/// Epoch number. A fixed-length unit of network time used to schedule forks.
pub type Epoch = u64;

/// Sentinel epoch meaning "no further fork is scheduled".
pub const FAR_FUTURE_EPOCH: Epoch = u64::MAX;

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Byte width of the value.
            pub const LEN: usize = $len;

            /// Wrap raw bytes.
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Borrow the raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Parse from a hex string, with or without `0x` prefix.
            pub fn from_hex(s: &str) -> Option<Self> {
                let s = s.strip_prefix("0x").unwrap_or(s);
                let mut bytes = [0u8; $len];
                hex::decode_to_slice(s, &mut bytes).ok()?;
                Some(Self(bytes))
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(0x{})", stringify!($name), hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }
    };
}

fixed_bytes!(
    /// Protocol version active during a contiguous epoch range.
    ForkVersion,
    4
);

fixed_bytes!(
    /// 4-byte fingerprint of (fork version, genesis validators root).
    ///
    /// Two nodes are on the same fork iff their digests are equal.
    ForkDigest,
    4
);

fixed_bytes!(
    /// 32-byte merkle root. Used for the genesis validators root, which is
    /// fixed at genesis and separates otherwise identical fork versions on
    /// different network instances.
    Root,
    32
);

/// Slot timing of the chain, used to derive the current epoch from genesis time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainTiming {
    /// Seconds per slot (default: 12)
    pub seconds_per_slot: u64,
    /// Slots per epoch (default: 32)
    pub slots_per_epoch: u64,
}

impl Default for ChainTiming {
    fn default() -> Self {
        Self {
            seconds_per_slot: 12,
            slots_per_epoch: 32,
        }
    }
}

impl ChainTiming {
    /// Slots elapsed since genesis. Zero before genesis.
    pub fn slots_since_genesis(&self, genesis_time: u64, now: u64) -> u64 {
        now.saturating_sub(genesis_time)
            .checked_div(self.seconds_per_slot)
            .unwrap_or(0)
    }

    /// Epoch containing `slot`.
    pub fn epoch_of_slot(&self, slot: u64) -> Epoch {
        slot.checked_div(self.slots_per_epoch).unwrap_or(0)
    }

    /// Epoch at wall-clock time `now`.
    pub fn epoch_at(&self, genesis_time: u64, now: u64) -> Epoch {
        self.epoch_of_slot(self.slots_since_genesis(genesis_time, now))
    }
}
