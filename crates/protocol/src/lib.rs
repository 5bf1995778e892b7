#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `zsplit_protocol` models the on-wire format of a ZFS send stream: the
//! fixed 312-byte replay record bracketing every transmitted unit, the
//! stream-header word that distinguishes single from compound streams, and
//! the XDR-encoded name-value list carried as the payload of a compound
//! BEGIN record.
//!
//! # Design
//!
//! The crate never byte-swaps a frame in place. [`ReplayRecord`] owns the
//! raw wire bytes — which is what the Fletcher-4 checksum covers — and a
//! [`StreamEndian`] decoder, chosen once per run from the BEGIN magic,
//! translates individual fields on access. Typed field bundles
//! ([`record::BeginFields`], [`record::EndFields`], and the body-record
//! views) decode a whole record for diagnostics and property rewriting.
//!
//! The [`nvlist`] module implements the XDR name-value codec
//! (pack/unpack/iterate/add) with opaque pass-through for value types the
//! splitter never rewrites, so unknown properties survive a round trip
//! byte-for-byte.

pub mod endian;
pub mod header;
pub mod nvlist;
pub mod record;

pub use endian::StreamEndian;
pub use header::StreamShape;
pub use nvlist::{NvList, NvValue, NvlistError};
pub use record::{RecordError, RecordKind, ReplayRecord, RECORD_SIZE, STREAM_MAGIC};
