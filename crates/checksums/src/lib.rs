#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `zsplit_checksums` implements the incremental Fletcher-4 checksum that
//! authenticates every byte of a ZFS send stream. The transport folds each
//! transmitted buffer into a 256-bit accumulator; the value of the
//! accumulator immediately before an END record is the value carried in
//! that END's checksum field.
//!
//! # Design
//!
//! [`Fletcher4`] is a plain four-word accumulator with two folding
//! entry points: [`Fletcher4::update_native`] consumes a buffer as
//! native-endian 32-bit words, while [`Fletcher4::update_byteswap`] swaps
//! each word's bytes first. Byte-swapped streams are folded with the
//! swapped variant so the accumulator always reflects the *sender's* word
//! order, which is what the END record on the wire was computed over.
//! [`Fletcher4Digest`] captures a point-in-time value for comparison and
//! for the mismatch diagnostics.
//!
//! # Invariants
//!
//! - Folding is associative over buffer boundaries: splitting a byte
//!   sequence into arbitrary chunks and folding them in order yields the
//!   same digest as folding the whole sequence at once.
//! - Buffers must be a multiple of four bytes. Every unit the splitter
//!   transports (records, property payloads, block data) satisfies this.

mod fletcher;

pub use fletcher::{Fletcher4, Fletcher4Digest, UnalignedBufferError};
