//! Per-run endianness decoder.
//!
//! A send stream is written in the sender's byte order. The first BEGIN's
//! magic tells the reader whether multi-byte fields need swapping; that
//! decision is made once and threaded through every field access. The raw
//! wire bytes are never rewritten — the rolling checksum covers them as
//! transmitted.

use zsplit_checksums::{Fletcher4, UnalignedBufferError};

/// Byte order of the stream relative to the host.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum StreamEndian {
    /// Sender and host agree; fields are read as-is.
    #[default]
    Native,
    /// Sender used the opposite byte order; every multi-byte field (and
    /// every checksum word) is swapped on access.
    Swapped,
}

impl StreamEndian {
    /// Decodes a 32-bit field from its wire representation.
    #[must_use]
    pub const fn decode_u32(self, raw: u32) -> u32 {
        match self {
            Self::Native => raw,
            Self::Swapped => raw.swap_bytes(),
        }
    }

    /// Encodes a 32-bit field into its wire representation.
    #[must_use]
    pub const fn encode_u32(self, value: u32) -> u32 {
        // Swapping is an involution, so encode and decode coincide.
        self.decode_u32(value)
    }

    /// Decodes a 64-bit field from its wire representation.
    #[must_use]
    pub const fn decode_u64(self, raw: u64) -> u64 {
        match self {
            Self::Native => raw,
            Self::Swapped => raw.swap_bytes(),
        }
    }

    /// Encodes a 64-bit field into its wire representation.
    #[must_use]
    pub const fn encode_u64(self, value: u64) -> u64 {
        self.decode_u64(value)
    }

    /// Folds wire bytes into `acc` with the matching Fletcher-4 variant.
    pub fn fold(self, acc: &mut Fletcher4, buf: &[u8]) -> Result<(), UnalignedBufferError> {
        match self {
            Self::Native => acc.update_native(buf),
            Self::Swapped => acc.update_byteswap(buf),
        }
    }
}
