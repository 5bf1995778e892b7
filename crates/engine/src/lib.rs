#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `zsplit_engine` rewrites one ZFS send stream into a set of equivalent
//! sub-streams bounded by a byte or record budget. Each sub-stream is a
//! well-formed send stream of its own: a synthesized BEGIN whose snapshot
//! identifier chains to the previous sub-stream, the original record
//! payloads byte-for-byte, and an END checksummed over exactly the
//! sub-stream's bytes.
//!
//! # Design
//!
//! [`split_stream`] detects the input's endianness and shape, then hands
//! off to one of three driver variants (single, compound-to-files,
//! compound-to-stream) that share the boundary logic in [`driver`]. The
//! per-run state lives in a [`handler::SplitHandler`]; compound property
//! lists are rewritten by [`props`]; optional snapshot renaming and resumed
//! output are the [`alias`] and [`gate`] components. All diagnostics are
//! `tracing` events on stderr.
//!
//! # Invariants
//!
//! - Every emitted sub-stream replays independently: its END checksum is
//!   the Fletcher-4 of all its preceding bytes.
//! - The sub-snapshot chain links `from_guid` to the previous `to_guid`,
//!   starting from the original stream's incremental base; the terminal
//!   sub-stream restores the original identifiers.
//! - Split counters are zeroed atomically with every BEGIN emission.
//! - Input checksum mismatches are reported, never fatal.

pub mod alias;
pub mod driver;
pub mod error;
pub mod gate;
pub mod handler;
pub mod props;
pub mod sink;

mod dump;
mod io;

pub use alias::SnapshotAliaser;
pub use driver::{split_stream, SplitConfig, SplitReport};
pub use error::{SplitError, SplitResult};
pub use gate::{GateStage, OutputGate};
pub use handler::{SubSnapshot, PART_NAME_INFIX};
pub use sink::{part_file_name, OutputTarget};
