//! Error types for a split run.

use std::io;

use thiserror::Error;

use zsplit_checksums::UnalignedBufferError;
use zsplit_protocol::{NvlistError, RecordError};

/// Result type for split operations.
pub type SplitResult<T> = Result<T, SplitError>;

/// Errors that abort a split run.
///
/// A checksum mismatch between the input's END record and the accumulated
/// stream checksum is deliberately *not* represented here: a best-effort
/// split of a damaged stream is still useful, so mismatches are logged and
/// counted in the run report instead.
#[derive(Debug, Error)]
pub enum SplitError {
    /// The first record's magic matches neither endian variant.
    #[error("invalid stream (bad magic number)")]
    BadMagic,
    /// A record or payload ended before its announced length.
    #[error("stream truncated: read {got} of {needed} bytes")]
    ShortRead {
        /// Bytes the structure required.
        needed: usize,
        /// Bytes actually available.
        got: usize,
    },
    /// A read or write system call failed.
    #[error("I/O error: {0}")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),
    /// The compound property list failed to unpack or repack.
    #[error("invalid stream (malformed property list): {0}")]
    Prop(
        #[from]
        #[source]
        NvlistError,
    ),
    /// A property entry did not have the layout the rewriter requires.
    #[error("invalid stream (property {key:?} has unexpected type)")]
    PropLayout {
        /// Name of the offending entry.
        key: String,
    },
    /// A record field could not be interpreted or rewritten.
    #[error(transparent)]
    Record(#[from] RecordError),
    /// The stream declares a header type this tool does not understand.
    #[error("stream has unsupported feature flags {features:#x}")]
    UnsupportedStream {
        /// Feature flags from the BEGIN's versioninfo word.
        features: u64,
    },
    /// A snapshot name is missing its `@` component.
    #[error("invalid stream (bad snapshot name {name:?})")]
    BadSnapshotName {
        /// The offending name.
        name: String,
    },
    /// A transported unit was not a whole number of checksum words.
    #[error("stream unit not checksummable: {0}")]
    Checksum(
        #[from]
        #[source]
        UnalignedBufferError,
    ),
    /// A single (non-compound) stream cannot feed the concatenated sink.
    #[error("single stream to stdout is not supported")]
    SingleToStream,
    /// One file per sub-snapshot is the only file-mode layout.
    #[error("monolithic output requires a stream sink")]
    MonolithicToFiles,
}
