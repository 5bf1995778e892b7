//! Stream-header decoding.
//!
//! The BEGIN record's `versioninfo` word packs the header type into its low
//! two bits and the sender's feature flags into the thirty bits above them.
//! The header type decides which driver walks the stream: a single
//! sub-stream, or a compound stream wrapping inner sub-streams behind a
//! property-bearing outer BEGIN/END pair.

const HDRTYPE_BITS: u64 = 0x3;
const FEATUREFLAG_SHIFT: u64 = 2;
const FEATUREFLAG_BITS: u64 = (1 << 30) - 1;

const HDRTYPE_SUBSTREAM: u64 = 0x1;
const HDRTYPE_COMPOUND: u64 = 0x2;

/// Shape of a send stream as declared by its first BEGIN.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StreamShape {
    /// A single BEGIN/body/END sub-stream.
    Single,
    /// An outer BEGIN/END pair carrying properties, enclosing one or more
    /// inner sub-streams.
    Compound,
}

impl StreamShape {
    /// Extracts the stream shape from a BEGIN's `versioninfo` word.
    ///
    /// Returns `None` for header types this tool does not understand;
    /// callers report the feature flags from the same word.
    #[must_use]
    pub fn from_versioninfo(versioninfo: u64) -> Option<Self> {
        match versioninfo & HDRTYPE_BITS {
            HDRTYPE_SUBSTREAM => Some(Self::Single),
            HDRTYPE_COMPOUND => Some(Self::Compound),
            _ => None,
        }
    }
}

/// Extracts the sender's feature flags from a BEGIN's `versioninfo` word.
#[must_use]
pub fn feature_flags(versioninfo: u64) -> u64 {
    (versioninfo >> FEATUREFLAG_SHIFT) & FEATUREFLAG_BITS
}
