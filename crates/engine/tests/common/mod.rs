//! Shared helpers: a send-stream builder with the same rolling-checksum
//! discipline as a real sender, and walkers over emitted sub-streams.
#![allow(dead_code)] // each test binary uses a different helper subset

use zsplit_checksums::Fletcher4;
use zsplit_protocol::{NvList, RecordKind, ReplayRecord, StreamEndian, RECORD_SIZE, STREAM_MAGIC};

/// Header-type word for a single sub-stream.
pub const SHAPE_SINGLE: u64 = 0x1;
/// Header-type word for a compound stream.
pub const SHAPE_COMPOUND: u64 = 0x2;

/// Builds wire-accurate send streams: every record and payload is folded
/// into a rolling checksum, and each END carries the accumulated value.
pub struct StreamBuilder {
    endian: StreamEndian,
    bytes: Vec<u8>,
    sum: Fletcher4,
    payloads: Vec<u8>,
}

impl StreamBuilder {
    pub fn new(endian: StreamEndian) -> Self {
        Self {
            endian,
            bytes: Vec::new(),
            sum: Fletcher4::new(),
            payloads: Vec::new(),
        }
    }

    fn push_record(&mut self, rec: &ReplayRecord) {
        if !rec.is_kind(RecordKind::End) {
            self.endian
                .fold(&mut self.sum, rec.as_bytes())
                .expect("record frames are aligned");
        }
        self.bytes.extend_from_slice(rec.as_bytes());
    }

    fn push_payload(&mut self, data: &[u8]) {
        self.endian
            .fold(&mut self.sum, data)
            .expect("payloads are aligned");
        self.bytes.extend_from_slice(data);
    }

    /// Appends a BEGIN record.
    pub fn begin(&mut self, shape: u64, to_guid: u64, from_guid: u64, name: &str) -> &mut Self {
        let rec = begin_record(self.endian, shape, to_guid, from_guid, name, 0);
        self.push_record(&rec);
        self
    }

    /// Appends a compound outer frame: BEGIN with `props` as payload,
    /// then an END checksummed over exactly those bytes.
    pub fn compound_frame(
        &mut self,
        to_guid: u64,
        from_guid: u64,
        name: &str,
        props: &[u8],
    ) -> &mut Self {
        let rec = begin_record(
            self.endian,
            SHAPE_COMPOUND,
            to_guid,
            from_guid,
            name,
            props.len() as u32,
        );
        self.push_record(&rec);
        self.push_payload(props);
        self.end(to_guid)
    }

    /// Appends an OBJECT record with an 8-byte-rounded bonus payload.
    pub fn object(&mut self, bonus_len: u32, bonus: &[u8]) -> &mut Self {
        assert_eq!(
            bonus.len(),
            ((bonus_len as usize) + 7) & !7,
            "bonus payload must be the rounded length"
        );
        let mut rec = ReplayRecord::zeroed();
        rec.set_kind(self.endian, RecordKind::Object);
        rec.set_object_bonus_len(self.endian, bonus_len);
        self.push_record(&rec);
        self.push_payload(bonus);
        self.payloads.extend_from_slice(bonus);
        self
    }

    /// Appends a WRITE record trailed by `data`.
    pub fn write(&mut self, data: &[u8]) -> &mut Self {
        let mut rec = ReplayRecord::zeroed();
        rec.set_kind(self.endian, RecordKind::Write);
        rec.set_write_length(self.endian, data.len() as u64);
        self.push_record(&rec);
        self.push_payload(data);
        self.payloads.extend_from_slice(data);
        self
    }

    /// Appends a payload-free FREEOBJECTS record (a cheap block filler).
    pub fn filler(&mut self) -> &mut Self {
        let mut rec = ReplayRecord::zeroed();
        rec.set_kind(self.endian, RecordKind::FreeObjects);
        self.push_record(&rec);
        self
    }

    /// Appends an END carrying the accumulated checksum, then resets the
    /// accumulator.
    pub fn end(&mut self, to_guid: u64) -> &mut Self {
        let mut rec = ReplayRecord::zeroed();
        rec.set_kind(self.endian, RecordKind::End);
        rec.set_end_checksum(self.endian, self.sum.digest());
        rec.set_end_to_guid(self.endian, to_guid);
        self.bytes.extend_from_slice(rec.as_bytes());
        self.sum.reset();
        self
    }

    /// The finished stream bytes.
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }

    /// Concatenated body payloads, for preservation checks.
    pub fn payload_bytes(&self) -> Vec<u8> {
        self.payloads.clone()
    }
}

/// Builds a BEGIN record frame.
pub fn begin_record(
    endian: StreamEndian,
    shape: u64,
    to_guid: u64,
    from_guid: u64,
    name: &str,
    payload_len: u32,
) -> ReplayRecord {
    let mut rec = ReplayRecord::zeroed();
    rec.set_kind(endian, RecordKind::Begin);
    rec.set_payload_len(endian, payload_len);
    rec.set_begin_magic(endian, STREAM_MAGIC);
    rec.set_begin_versioninfo(endian, shape);
    rec.set_begin_to_guid(endian, to_guid);
    rec.set_begin_from_guid(endian, from_guid);
    rec.set_begin_to_name(name).expect("short name");
    rec
}

/// A property list of the shape a compound BEGIN carries: `snaps` maps
/// names to guids, `snapprops` holds an empty entry for the target.
pub fn props_with_snaps(to_guid: u64, tosnap: &str, snaps: &[(&str, u64)]) -> Vec<u8> {
    let mut snaps_list = NvList::new();
    for (name, guid) in snaps {
        snaps_list.add_uint64(*name, *guid);
    }

    let mut snapprops = NvList::new();
    snapprops.add_list(tosnap, NvList::new());

    let mut fs = NvList::new();
    fs.add_uint64("parentfromsnap", 0);
    fs.add_list("snaps", snaps_list);
    fs.add_list("snapprops", snapprops);

    let mut fss = NvList::new();
    fss.add_list("0xfs", fs);

    let mut root = NvList::new();
    root.add_uint64("toguid", to_guid);
    root.add_string("fromsnap", "");
    root.add_string("tosnap", tosnap);
    root.add_list("fss", fss);
    root.pack()
}

/// One record and its trailing payload from an emitted stream.
pub struct Entry {
    pub rec: ReplayRecord,
    pub payload: Vec<u8>,
}

impl Entry {
    pub fn kind(&self, endian: StreamEndian) -> RecordKind {
        self.rec.kind(endian).expect("known record kind")
    }
}

/// Walks a stream into records and payloads.
pub fn parse_entries(bytes: &[u8], endian: StreamEndian) -> Vec<Entry> {
    let mut entries = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        assert!(
            pos + RECORD_SIZE <= bytes.len(),
            "truncated record at byte {pos}"
        );
        let mut frame = [0u8; RECORD_SIZE];
        frame.copy_from_slice(&bytes[pos..pos + RECORD_SIZE]);
        let rec = ReplayRecord::from_bytes(frame);
        pos += RECORD_SIZE;

        let payload_len = match rec.kind(endian).expect("known record kind") {
            RecordKind::Begin => rec.payload_len(endian) as usize,
            RecordKind::Object => ((rec.object_bonus_len(endian) as usize) + 7) & !7,
            RecordKind::Write => rec.write_length(endian) as usize,
            _ => 0,
        };
        assert!(
            pos + payload_len <= bytes.len(),
            "truncated payload at byte {pos}"
        );
        let payload = bytes[pos..pos + payload_len].to_vec();
        pos += payload_len;

        entries.push(Entry { rec, payload });
    }
    entries
}

/// Asserts the defining stream invariant: every END's checksum equals the
/// Fletcher-4 of all bytes since the previous END (ENDs excluded).
pub fn assert_checksums_consistent(bytes: &[u8], endian: StreamEndian) {
    let mut sum = Fletcher4::new();
    for (index, entry) in parse_entries(bytes, endian).iter().enumerate() {
        if entry.rec.is_kind(RecordKind::End) {
            assert_eq!(
                entry.rec.end_checksum(endian),
                sum.digest(),
                "END at entry {index} carries a stale checksum"
            );
            sum.reset();
        } else {
            endian
                .fold(&mut sum, entry.rec.as_bytes())
                .expect("aligned record");
            endian.fold(&mut sum, &entry.payload).expect("aligned payload");
        }
    }
}

/// Concatenated OBJECT/WRITE payload bytes of a stream.
pub fn body_payloads(entries: &[Entry], endian: StreamEndian) -> Vec<u8> {
    entries
        .iter()
        .filter(|e| {
            matches!(
                e.kind(endian),
                RecordKind::Object | RecordKind::Write
            )
        })
        .flat_map(|e| e.payload.clone())
        .collect()
}

/// The BEGIN entries of a stream, in order.
pub fn begin_entries<'a>(entries: &'a [Entry], endian: StreamEndian) -> Vec<&'a Entry> {
    entries
        .iter()
        .filter(|e| e.kind(endian) == RecordKind::Begin)
        .collect()
}
