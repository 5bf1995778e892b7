//! The split driver: consumes the input record sequence, decides where
//! split boundaries fall, and emits the synthetic framing.
//!
//! Three variants share the decision loop. A single stream is rewritten to
//! part files; a compound stream is rewritten either to part files (each
//! carrying its own rewritten outer frame) or to one concatenated stream
//! whose outer frame stays open across intermediate boundaries. The
//! concatenated variant distinguishes the terminal condition by peeking one
//! record past each inner END: a second END is the end of the compound
//! stream, anything else makes the intermediate END an ordinary boundary.
//!
//! Two checksum accumulators are live at all times: `stream_sum` covers the
//! bytes consumed from the input since its BEGIN (verified against the
//! input's END), `sub_sum` covers the bytes emitted to the current
//! sub-stream (stamped into each synthetic END). END records themselves are
//! never folded, because an END carries the checksum of everything before
//! it.

use std::io::{self, Read, Write};

use tracing::{debug, warn};

use zsplit_checksums::{Fletcher4, Fletcher4Digest};
use zsplit_protocol::{
    header, RecordKind, ReplayRecord, StreamEndian, StreamShape, RECORD_SIZE, STREAM_MAGIC,
};

use crate::alias::SnapshotAliaser;
use crate::dump;
use crate::error::{SplitError, SplitResult};
use crate::gate::OutputGate;
use crate::handler::{derive_guid, part_to_name, SplitHandler, SubSnapshot};
use crate::io::read_full;
use crate::sink::{OutputSink, OutputTarget};

/// Tunables for one split run.
#[derive(Clone, Debug)]
pub struct SplitConfig {
    /// Byte budget per sub-stream; `0` disables the byte threshold.
    pub max_bytes: u64,
    /// Record budget per sub-stream.
    pub max_blocks: u32,
    /// Rotate to a fresh part file per sub-snapshot.
    pub per_snapshot: bool,
    /// Replace the terminal snapshot name with a generated identifier.
    pub rename_snapshot: bool,
    /// Arm the resume gate on this intermediate snapshot name.
    pub resume_snapshot: Option<String>,
    /// Emit per-record diagnostics.
    pub dump_records: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            max_bytes: 0,
            max_blocks: i32::MAX as u32,
            per_snapshot: true,
            rename_snapshot: false,
            resume_snapshot: None,
            dump_records: false,
        }
    }
}

/// Outcome of a completed run.
#[derive(Clone, Debug)]
pub struct SplitReport {
    /// The emitted sub-snapshot chain, in order.
    pub sub_snapshots: Vec<SubSnapshot>,
    /// Count of END records whose checksum disagreed with the
    /// accumulated stream checksum. Mismatches do not abort the run.
    pub checksum_mismatches: u32,
}

/// Compound outer frame: BEGIN, its property payload, and END.
struct PkgFrame {
    begin: ReplayRecord,
    end: ReplayRecord,
    props: Option<Vec<u8>>,
}

/// Splits the send stream on `input` into sub-streams on `target`.
///
/// The stream's endianness is detected from the first BEGIN's magic; a
/// magic matching neither byte order aborts with [`SplitError::BadMagic`]
/// before any output is produced.
pub fn split_stream<R: Read, W: Write>(
    mut input: R,
    target: OutputTarget<W>,
    config: SplitConfig,
) -> SplitResult<SplitReport> {
    let mut buf = [0u8; RECORD_SIZE];
    let got = read_full(&mut input, &mut buf)?;
    if got < RECORD_SIZE {
        return Err(SplitError::ShortRead {
            needed: RECORD_SIZE,
            got,
        });
    }
    let first = ReplayRecord::from_bytes(buf);

    let endian = if first.raw_kind() == RecordKind::Begin.as_raw()
        && first.begin_magic_raw() == STREAM_MAGIC
    {
        StreamEndian::Native
    } else if first.raw_kind() == RecordKind::Begin.as_raw().swap_bytes()
        && first.begin_magic_raw() == STREAM_MAGIC.swap_bytes()
    {
        StreamEndian::Swapped
    } else {
        return Err(SplitError::BadMagic);
    };

    let versioninfo = first.begin_versioninfo(endian);
    let Some(shape) = StreamShape::from_versioninfo(versioninfo) else {
        return Err(SplitError::UnsupportedStream {
            features: header::feature_flags(versioninfo),
        });
    };

    if shape == StreamShape::Single && matches!(target, OutputTarget::Stream(_)) {
        return Err(SplitError::SingleToStream);
    }
    if !config.per_snapshot && matches!(target, OutputTarget::Directory(_)) {
        return Err(SplitError::MonolithicToFiles);
    }

    let mut splitter = Splitter::new(input, target, config, endian);
    splitter.precache_alias(&first);
    splitter.fold_into_stream(first.as_bytes())?;
    debug!(checksum = %splitter.stream_sum.digest(), "first BEGIN checksum");

    match shape {
        StreamShape::Single => splitter.run_single(&first)?,
        StreamShape::Compound => {
            if splitter.sink.is_stream() {
                splitter.run_compound_stream(&first)?;
            } else {
                splitter.run_compound_files(&first)?;
            }
        }
    }

    splitter.finish()
}

struct Splitter<R, W> {
    input: R,
    endian: StreamEndian,
    config: SplitConfig,
    handler: SplitHandler,
    sink: OutputSink<W>,
    gate: OutputGate,
    aliaser: SnapshotAliaser,
    stream_sum: Fletcher4,
    mismatches: u32,
}

impl<R: Read, W: Write> Splitter<R, W> {
    fn new(input: R, target: OutputTarget<W>, config: SplitConfig, endian: StreamEndian) -> Self {
        let handler = SplitHandler::new(config.max_bytes, config.max_blocks, config.per_snapshot);
        let gate = OutputGate::new(config.resume_snapshot.clone());
        let aliaser = SnapshotAliaser::new(config.rename_snapshot);
        Self {
            input,
            endian,
            config,
            handler,
            sink: OutputSink::new(target),
            gate,
            aliaser,
            stream_sum: Fletcher4::new(),
            mismatches: 0,
        }
    }

    // ---- driver variants ----

    /// Single sub-stream input: body records flow into part files; the
    /// terminal END re-cuts a closing sub-stream with the original
    /// identifiers.
    fn run_single(&mut self, first_begin: &ReplayRecord) -> SplitResult<()> {
        let mut sub_sum = Fletcher4::new();
        self.open_substream(None, first_begin, false, &mut sub_sum)?;

        loop {
            let Some(mut rec) = self.read_record()? else {
                warn!("input ended before the terminal END record");
                return Ok(());
            };
            if rec.is_kind(RecordKind::End) {
                let expected = self.stream_sum.digest();
                self.close_substream(first_begin, Some(&rec), Some(expected), &mut sub_sum, false)?;
                self.stream_sum.reset();
                self.open_substream(None, first_begin, true, &mut sub_sum)?;
                return Ok(());
            }
            if self.handler.should_split() {
                self.close_substream(first_begin, None, None, &mut sub_sum, false)?;
                self.open_substream(None, first_begin, false, &mut sub_sum)?;
            }
            self.copy_record(&mut rec, &mut sub_sum)?;
        }
    }

    /// Compound input to part files: every BEGIN/END-triggered boundary
    /// re-emits the outer frame with rewritten properties; byte/block
    /// boundaries cut bare sub-streams. Assumes at most one inner
    /// BEGIN/END pair; a further pair is treated as a fresh boundary
    /// trigger against the first pair's BEGIN.
    fn run_compound_files(&mut self, pkg_begin: &ReplayRecord) -> SplitResult<()> {
        let frame = self.read_pkg_frame(pkg_begin)?;
        self.handler.reset_counters();
        self.stream_sum.reset();

        let Some(cur_begin) = self.read_record()? else {
            warn!("input ended before the inner BEGIN record");
            return Ok(());
        };
        let mut sub_sum = Fletcher4::new();
        self.open_substream(Some(&frame), &cur_begin, false, &mut sub_sum)?;

        let mut end_seen = false;
        loop {
            let Some(mut rec) = self.read_record()? else {
                warn!("input ended before the terminal END record");
                return Ok(());
            };
            if rec.is_kind(RecordKind::End) {
                if end_seen {
                    // The outer END following the inner one: done.
                    return Ok(());
                }
                let expected = self.stream_sum.digest();
                let double = self.handler.first_split();
                self.close_substream(&cur_begin, Some(&rec), Some(expected), &mut sub_sum, double)?;
                self.stream_sum.reset();
                self.open_substream(Some(&frame), &cur_begin, true, &mut sub_sum)?;
                end_seen = true;
                continue;
            }
            end_seen = false;
            if rec.is_kind(RecordKind::Begin) {
                // A further inner pair: boundary trigger; the input BEGIN
                // is consumed and replaced by the minted one.
                self.open_substream(Some(&frame), &cur_begin, false, &mut sub_sum)?;
                continue;
            }
            if self.handler.should_split() {
                let double = self.handler.first_split();
                self.close_substream(&cur_begin, None, None, &mut sub_sum, double)?;
                self.open_substream(None, &cur_begin, false, &mut sub_sum)?;
            }
            self.copy_record(&mut rec, &mut sub_sum)?;
        }
    }

    /// Compound input to one concatenated stream: the outer frame is
    /// written once up front, intermediate inner ENDs become boundaries
    /// without closing it, and the terminal END pair (detected by
    /// peek-ahead) cuts the closing sub-stream behind a re-emitted outer
    /// frame carrying the original identifiers.
    fn run_compound_stream(&mut self, pkg_begin: &ReplayRecord) -> SplitResult<()> {
        let frame = self.read_pkg_frame(pkg_begin)?;
        self.handler.reset_counters();
        self.stream_sum.reset();

        let Some(mut cur_begin) = self.read_record()? else {
            warn!("input ended before the inner BEGIN record");
            return Ok(());
        };
        let mut sub_sum = Fletcher4::new();
        self.open_substream(Some(&frame), &cur_begin, false, &mut sub_sum)?;

        loop {
            let Some(mut rec) = self.read_record()? else {
                warn!("input ended before the terminal END record");
                return Ok(());
            };
            if rec.is_kind(RecordKind::End) {
                let expected = self.stream_sum.digest();
                self.stream_sum.reset();
                let Some(peeked) = self.read_record()? else {
                    warn!("input ended inside the terminal END pair");
                    return Ok(());
                };
                if peeked.is_kind(RecordKind::End) {
                    self.close_substream(
                        &cur_begin,
                        Some(&rec),
                        Some(expected),
                        &mut sub_sum,
                        false,
                    )?;
                    self.open_substream(Some(&frame), &cur_begin, true, &mut sub_sum)?;
                    return Ok(());
                }
                // Intermediate boundary: the outer frame stays open and
                // the peeked BEGIN supplies the next sub-stream's base
                // identity. Its bytes are already folded into the fresh
                // stream checksum.
                self.close_substream(&cur_begin, Some(&rec), Some(expected), &mut sub_sum, false)?;
                cur_begin = peeked;
                self.open_substream(None, &cur_begin, false, &mut sub_sum)?;
                continue;
            }
            if self.handler.should_split() {
                self.close_substream(&cur_begin, None, None, &mut sub_sum, false)?;
                self.open_substream(None, &cur_begin, false, &mut sub_sum)?;
            }
            self.copy_record(&mut rec, &mut sub_sum)?;
        }
    }

    // ---- record transport ----

    /// Reads one record, folding its bytes into the stream checksum
    /// (END records excluded) and pre-seeding the rename cache from BEGIN
    /// names. `None` means clean end-of-input at a record boundary.
    fn read_record(&mut self) -> SplitResult<Option<ReplayRecord>> {
        let mut buf = [0u8; RECORD_SIZE];
        let got = read_full(&mut self.input, &mut buf)?;
        if got == 0 {
            return Ok(None);
        }
        if got < RECORD_SIZE {
            return Err(SplitError::ShortRead {
                needed: RECORD_SIZE,
                got,
            });
        }
        let rec = ReplayRecord::from_bytes(buf);
        if !rec.is_kind(RecordKind::End) {
            self.precache_alias(&rec);
            self.fold_into_stream(rec.as_bytes())?;
        }
        Ok(Some(rec))
    }

    /// Writes one record, applying the snapshot alias to BEGIN names and
    /// folding the on-wire bytes into `sub_sum` (END records excluded).
    fn write_record(&mut self, rec: &mut ReplayRecord, sub_sum: &mut Fletcher4) -> SplitResult<()> {
        if !rec.is_kind(RecordKind::End) {
            if self.aliaser.enabled() && rec.is_kind(RecordKind::Begin) {
                let name = rec.begin_to_name();
                if let Some((fs, snap)) = name.split_once('@') {
                    let alias = self.aliaser.alias(snap);
                    if alias != snap {
                        rec.set_begin_to_name(&format!("{fs}@{alias}"))?;
                    }
                }
            }
            self.endian.fold(sub_sum, rec.as_bytes())?;
        }
        self.write_out(rec.as_bytes())?;
        if self.config.dump_records {
            dump::record(rec, self.endian, sub_sum);
        }
        self.handler.tick(RECORD_SIZE as u64, 1);
        Ok(())
    }

    /// Copies a body record and its payload, advancing the split budget.
    fn copy_record(&mut self, rec: &mut ReplayRecord, sub_sum: &mut Fletcher4) -> SplitResult<()> {
        self.write_record(rec, sub_sum)?;
        let payload = match rec.kind(self.endian)? {
            RecordKind::Object => (u64::from(rec.object_bonus_len(self.endian)) + 7) & !7,
            RecordKind::Write => rec.write_length(self.endian),
            _ => 0,
        };
        if payload > 0 {
            self.copy_payload(payload, sub_sum)?;
            self.handler.tick(payload, 0);
        }
        Ok(())
    }

    /// Streams `len` payload bytes through a bounded buffer, folding each
    /// chunk into both accumulators.
    fn copy_payload(&mut self, len: u64, sub_sum: &mut Fletcher4) -> SplitResult<()> {
        const COPY_BUF: usize = 1 << 20;

        let cap = len.min(COPY_BUF as u64) as usize;
        let mut buf = vec![0u8; cap];
        let mut remaining = len;
        while remaining > 0 {
            let want = remaining.min(cap as u64) as usize;
            let got = read_full(&mut self.input, &mut buf[..want])?;
            if got < want {
                return Err(SplitError::ShortRead { needed: want, got });
            }
            self.write_out(&buf[..got])?;
            self.fold_into_stream(&buf[..got])?;
            self.endian.fold(sub_sum, &buf[..got])?;
            remaining -= got as u64;
        }
        Ok(())
    }

    /// Sink write honoring the resume gate: suppressed writes succeed
    /// without emitting bytes, so checksums and counters are unaffected.
    fn write_out(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.sink.is_stream() && self.gate.writes_suppressed() {
            return Ok(());
        }
        self.sink.write_all(buf)
    }

    fn fold_into_stream(&mut self, buf: &[u8]) -> SplitResult<()> {
        self.endian.fold(&mut self.stream_sum, buf)?;
        Ok(())
    }

    fn precache_alias(&mut self, rec: &ReplayRecord) {
        if self.aliaser.enabled() && rec.is_kind(RecordKind::Begin) {
            if let Some((_, snap)) = rec.begin_to_name().split_once('@') {
                let _ = self.aliaser.alias(snap);
            }
        }
    }

    // ---- boundary emission ----

    /// Builds an END for the sub-stream opened by `begin`. `base_end`
    /// seeds the frame when the original END is at hand.
    fn new_end_record(
        &self,
        begin: &ReplayRecord,
        base_end: Option<&ReplayRecord>,
        sum: Fletcher4Digest,
    ) -> ReplayRecord {
        let mut rec = base_end.cloned().unwrap_or_default();
        rec.set_kind(self.endian, RecordKind::End);
        rec.set_end_checksum(self.endian, sum);
        rec.set_end_to_guid(self.endian, begin.begin_to_guid(self.endian));
        rec
    }

    fn write_split_end(
        &mut self,
        begin: &ReplayRecord,
        base_end: Option<&ReplayRecord>,
        sum: &Fletcher4,
    ) -> SplitResult<()> {
        let rec = self.new_end_record(begin, base_end, sum.digest());
        if self.config.dump_records {
            dump::record(&rec, self.endian, sum);
        }
        self.write_out(rec.as_bytes())?;
        Ok(())
    }

    /// Inner END followed by an outer END closing a compound frame; the
    /// outer END carries the empty-sequence checksum.
    fn write_double_end(
        &mut self,
        begin: &ReplayRecord,
        base_end: Option<&ReplayRecord>,
        sum: &Fletcher4,
    ) -> SplitResult<()> {
        self.write_split_end(begin, base_end, sum)?;
        let empty = Fletcher4::new();
        self.write_split_end(begin, None, &empty)
    }

    /// Closes the current sub-stream: writes its synthetic END (doubled
    /// when closing the run's first compound sub-stream), verifies the
    /// original END when one triggered the boundary, and zeroes the
    /// sub-stream accumulator.
    fn close_substream(
        &mut self,
        cur_begin: &ReplayRecord,
        end_rec: Option<&ReplayRecord>,
        expected: Option<Fletcher4Digest>,
        sub_sum: &mut Fletcher4,
        double: bool,
    ) -> SplitResult<()> {
        if double {
            self.write_double_end(cur_begin, end_rec, sub_sum)?;
        } else {
            self.write_split_end(cur_begin, end_rec, sub_sum)?;
        }
        if let (Some(end), Some(expected)) = (end_rec, expected) {
            self.verify_end_checksum(end, expected);
        }
        sub_sum.reset();
        self.handler.tick(RECORD_SIZE as u64, 1);
        Ok(())
    }

    /// Opens the successor sub-stream: mints its BEGIN, re-emits the
    /// compound frame when the boundary calls for one, advances the
    /// resume gate, and writes the BEGIN. A terminal sub-stream is closed
    /// immediately with the finale its shape requires.
    fn open_substream(
        &mut self,
        pkg: Option<&PkgFrame>,
        cur_begin: &ReplayRecord,
        terminal: bool,
        sub_sum: &mut Fletcher4,
    ) -> SplitResult<()> {
        let mut new_begin = self.next_split_begin(cur_begin, terminal)?;

        if let Some(frame) = pkg {
            self.write_pkg_frame(frame, cur_begin, &new_begin)?;
        }

        if let Some((_, snap)) = new_begin.begin_to_name().split_once('@') {
            self.gate.observe_boundary(snap);
        }

        self.write_record(&mut new_begin, sub_sum)?;
        debug!(checksum = %sub_sum.digest(), "new BEGIN checksum");

        if terminal {
            if pkg.is_some() {
                self.write_double_end(&new_begin, None, sub_sum)?;
                if self.sink.is_stream() {
                    // The concatenated shape needs one more END after the
                    // property-bearing frame.
                    sub_sum.reset();
                    let empty = Fletcher4::new();
                    self.write_split_end(&new_begin, None, &empty)?;
                }
            } else {
                self.write_split_end(&new_begin, None, sub_sum)?;
            }
            sub_sum.reset();
        }
        Ok(())
    }

    /// Mints the next sub-stream's BEGIN from the current one and appends
    /// the matching entry to the sub-snapshot chain. A terminal BEGIN
    /// keeps the original identifiers so receivers land on the correct
    /// final snapshot; part numbering restarts behind it.
    fn next_split_begin(
        &mut self,
        cur_begin: &ReplayRecord,
        terminal: bool,
    ) -> SplitResult<ReplayRecord> {
        let endian = self.endian;
        let base_to_guid = cur_begin.begin_to_guid(endian);
        let base_to_name = cur_begin.begin_to_name();

        let index = self.handler.advance_snap_index();
        let filename = if self.handler.per_snapshot() {
            self.sink.rotate()?
        } else {
            self.sink.current_name()
        };

        let mut rec = cur_begin.clone();
        let (to_guid, to_name) = if terminal {
            self.handler.reset_snap_index();
            self.handler.set_first_split(true);
            (base_to_guid, base_to_name)
        } else {
            let part_guid = derive_guid(base_to_guid, index);
            let part_name = part_to_name(&base_to_name, index)?;
            rec.set_begin_to_guid(endian, part_guid);
            rec.set_begin_to_name(&part_name)?;
            self.handler.set_first_split(false);
            (part_guid, part_name)
        };

        let from_guid = match self.handler.last_snapshot() {
            Some(prev) => prev.to_guid,
            None => {
                self.handler.set_first_split(true);
                cur_begin.begin_from_guid(endian)
            }
        };
        rec.set_begin_from_guid(endian, from_guid);

        self.handler.push_snapshot(SubSnapshot {
            from_guid,
            to_guid,
            to_name,
            filename,
        });
        self.handler.reset_counters();
        Ok(rec)
    }

    // ---- compound frame handling ----

    /// Reads the outer BEGIN's property payload and the outer END,
    /// verifying the END against a local accumulator covering exactly the
    /// frame bytes.
    fn read_pkg_frame(&mut self, pkg_begin: &ReplayRecord) -> SplitResult<PkgFrame> {
        let mut frame_sum = Fletcher4::new();
        self.endian.fold(&mut frame_sum, pkg_begin.as_bytes())?;

        let prop_len = self.expected_payload_len(pkg_begin);
        let props = if prop_len > 0 {
            let mut buf = vec![0u8; prop_len];
            let got = read_full(&mut self.input, &mut buf)?;
            if got < prop_len {
                return Err(SplitError::ShortRead {
                    needed: prop_len,
                    got,
                });
            }
            self.endian.fold(&mut frame_sum, &buf)?;
            Some(buf)
        } else {
            None
        };

        let Some(end) = self.read_record()? else {
            return Err(SplitError::ShortRead {
                needed: RECORD_SIZE,
                got: 0,
            });
        };
        self.verify_end_checksum(&end, frame_sum.digest());

        Ok(PkgFrame {
            begin: pkg_begin.clone(),
            end,
            props,
        })
    }

    fn expected_payload_len(&self, rec: &ReplayRecord) -> usize {
        rec.payload_len(self.endian) as usize
    }

    /// Emits the compound frame for the sub-stream opened by `new_begin`:
    /// the outer BEGIN with its payload length retargeted to the rewritten
    /// properties, the property bytes, and an outer END checksummed over
    /// exactly those frame bytes.
    fn write_pkg_frame(
        &mut self,
        frame: &PkgFrame,
        cur_begin: &ReplayRecord,
        new_begin: &ReplayRecord,
    ) -> SplitResult<()> {
        let new_props = match &frame.props {
            Some(bytes) if !bytes.is_empty() => Some(crate::props::rewrite_properties(
                bytes,
                cur_begin,
                new_begin,
                self.endian,
                &mut self.aliaser,
            )?),
            _ => None,
        };

        let mut frame_sum = Fletcher4::new();
        let mut pkg_begin = frame.begin.clone();
        let prop_len = new_props.as_ref().map_or(0, Vec::len) as u32;
        pkg_begin.set_payload_len(self.endian, prop_len);
        self.write_record(&mut pkg_begin, &mut frame_sum)?;

        if let Some(props) = &new_props {
            self.write_out(props)?;
            if self.config.dump_records {
                dump::props(props);
            }
            self.handler.tick(props.len() as u64, 0);
            self.endian.fold(&mut frame_sum, props)?;
        }

        self.write_split_end(&frame.begin, Some(&frame.end), &frame_sum)?;
        self.handler.tick(RECORD_SIZE as u64, 1);
        Ok(())
    }

    // ---- verification and wrap-up ----

    fn verify_end_checksum(&mut self, end: &ReplayRecord, expected: Fletcher4Digest) {
        let carried = end.end_checksum(self.endian);
        if carried == expected {
            debug!(checksum = %carried, "stream checksum verified");
        } else {
            warn!(
                carried = %carried,
                expected = %expected,
                "END checksum differs from accumulated stream checksum"
            );
            self.mismatches += 1;
        }
    }

    fn finish(mut self) -> SplitResult<SplitReport> {
        self.sink.flush()?;
        let report = SplitReport {
            sub_snapshots: self.handler.into_snapshots(),
            checksum_mismatches: self.mismatches,
        };
        debug!(
            sub_snapshots = report.sub_snapshots.len(),
            checksum_mismatches = report.checksum_mismatches,
            "split run complete"
        );
        for (index, snap) in report.sub_snapshots.iter().enumerate() {
            debug!(
                index,
                fromguid = format_args!("{:x}", snap.from_guid),
                toguid = format_args!("{:x}", snap.to_guid),
                toname = %snap.to_name,
                filename = %snap.filename,
                "sub-snapshot"
            );
        }
        Ok(report)
    }
}
