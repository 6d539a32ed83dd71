#![no_std]
#![warn(missing_docs)]
//! Persistence for the access policy and the power-loss accumulators
//!
//! Both records are stored as self-describing blocks (see [`block`]) on any
//! [`embedded_storage::Storage`] device, in two separate regions so that saving the accumulators
//! on power loss never rewrites the policy.
pub mod block;
pub mod store;

pub use store::SettingsStore;

/// Storage layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Offset of the policy block
    pub policy_offset: u32,
    /// Offset of the power-loss block
    pub power_loss_offset: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy_offset: 0,
            power_loss_offset: block::BLOCK_SIZE as u32,
        }
    }
}

impl Config {
    /// Both regions fit in `capacity` bytes without overlapping
    pub fn fits(&self, capacity: usize) -> bool {
        let size = block::BLOCK_SIZE as u64;
        let policy = self.policy_offset as u64;
        let power_loss = self.power_loss_offset as u64;

        let disjoint = policy + size <= power_loss || power_loss + size <= policy;
        disjoint && policy + size <= capacity as u64 && power_loss + size <= capacity as u64
    }
}

/// Error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The storage device failed
    Storage(E),
    /// The region has never been written
    Blank,
    /// The region holds something other than the expected record
    BadMagic,
    /// The record was written by an incompatible layout version
    UnsupportedVersion(u16),
    /// Length or CRC check failed
    Corrupt,
    /// The payload could not be encoded or decoded
    Encoding,
    /// The record does not fit in a block
    TooLarge,
    /// The configured regions overlap or exceed the device
    InvalidLayout,
}

impl<E> Error<E> {
    /// The device itself works but the region holds no usable record
    pub fn is_missing_record(&self) -> bool {
        matches!(
            self,
            Error::Blank | Error::BadMagic | Error::UnsupportedVersion(_) | Error::Corrupt | Error::Encoding
        )
    }
}

impl<E> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Storage(_) => write!(f, "storage device error"),
            Error::Blank => write!(f, "region is blank"),
            Error::BadMagic => write!(f, "unexpected record magic"),
            Error::UnsupportedVersion(v) => write!(f, "unsupported record version {}", v),
            Error::Corrupt => write!(f, "record failed integrity check"),
            Error::Encoding => write!(f, "record encoding error"),
            Error::TooLarge => write!(f, "record too large for its block"),
            Error::InvalidLayout => write!(f, "invalid storage layout"),
        }
    }
}
