use core::fmt;

use thiserror::Error;

/// Error raised when a buffer handed to the accumulator is not a whole
/// number of 32-bit words.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
#[error("Fletcher-4 requires 4-byte-aligned buffers, received {len} bytes")]
pub struct UnalignedBufferError {
    len: usize,
}

impl UnalignedBufferError {
    /// Number of bytes the caller supplied when the error was raised.
    #[must_use]
    pub const fn len(self) -> usize {
        self.len
    }

    /// Reports whether the offending buffer was empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }
}

/// Point-in-time value of a [`Fletcher4`] accumulator.
///
/// The digest is the four 64-bit words in accumulation order. Displaying a
/// digest renders the `a/b/c/d` form used by the stream diagnostics.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Fletcher4Digest([u64; 4]);

impl Fletcher4Digest {
    /// The all-zero digest of an empty byte sequence.
    pub const ZERO: Self = Self([0; 4]);

    /// Builds a digest from its four accumulator words.
    #[must_use]
    pub const fn new(words: [u64; 4]) -> Self {
        Self(words)
    }

    /// Returns the four accumulator words in order.
    #[must_use]
    pub const fn words(self) -> [u64; 4] {
        self.0
    }
}

impl fmt::Display for Fletcher4Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a:x}/{b:x}/{c:x}/{d:x}")
    }
}

impl From<[u64; 4]> for Fletcher4Digest {
    fn from(words: [u64; 4]) -> Self {
        Self(words)
    }
}

/// Incremental Fletcher-4 accumulator.
///
/// Fletcher-4 folds a stream of 32-bit words into four 64-bit running sums:
/// each word is added to `a`, then `a` into `b`, `b` into `c`, and `c` into
/// `d`, all with wrapping arithmetic. The four sums give the checksum its
/// 256-bit width while keeping the update loop to plain integer adds.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Fletcher4 {
    words: [u64; 4],
}

impl Fletcher4 {
    /// Creates a new accumulator with zeroed state.
    #[must_use]
    pub const fn new() -> Self {
        Self { words: [0; 4] }
    }

    /// Resets the accumulator back to the empty-sequence state.
    pub fn reset(&mut self) {
        self.words = [0; 4];
    }

    /// Returns the current digest without disturbing the running state.
    #[must_use]
    pub const fn digest(&self) -> Fletcher4Digest {
        Fletcher4Digest(self.words)
    }

    /// Folds `buf` into the accumulator as native-endian 32-bit words.
    pub fn update_native(&mut self, buf: &[u8]) -> Result<(), UnalignedBufferError> {
        self.fold(buf, false)
    }

    /// Folds `buf` into the accumulator, byte-swapping each 32-bit word.
    ///
    /// Used when the stream was produced by a sender of the opposite
    /// endianness: the swap recovers the word values the sender folded, so
    /// the accumulator tracks the checksum the sender's END record carries.
    pub fn update_byteswap(&mut self, buf: &[u8]) -> Result<(), UnalignedBufferError> {
        self.fold(buf, true)
    }

    fn fold(&mut self, buf: &[u8], swap: bool) -> Result<(), UnalignedBufferError> {
        if buf.len() % 4 != 0 {
            return Err(UnalignedBufferError { len: buf.len() });
        }

        let [mut a, mut b, mut c, mut d] = self.words;

        for chunk in buf.chunks_exact(4) {
            let word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let word = if swap { word.swap_bytes() } else { word };

            a = a.wrapping_add(u64::from(word));
            b = b.wrapping_add(a);
            c = c.wrapping_add(b);
            d = d.wrapping_add(c);
        }

        self.words = [a, b, c, d];
        Ok(())
    }
}
