//! The fixed-size replay record framing a send stream.
//!
//! Every unit of a send stream is announced by a 312-byte record: a 32-bit
//! kind tag, a 32-bit payload length, and a kind-specific body. Only BEGIN
//! and END are structurally significant to the splitter; the other kinds
//! matter only for their payload length and for diagnostics.
//!
//! [`ReplayRecord`] keeps the frame exactly as it appeared on the wire.
//! Field accessors take the per-run [`StreamEndian`] and translate on the
//! way in and out, so a mutated record re-encodes in the sender's byte
//! order and the checksum keeps covering wire-order bytes.

use thiserror::Error;

use zsplit_checksums::Fletcher4Digest;

use crate::endian::StreamEndian;

/// Size in bytes of every replay record on the wire.
pub const RECORD_SIZE: usize = 312;

/// Magic number carried by the first BEGIN of every send stream.
pub const STREAM_MAGIC: u64 = 0x2F5bacbac;

/// Maximum length of a dataset name, including the terminating NUL.
pub const MAX_NAME_LEN: usize = 256;

// Union body offsets. The tagged body starts after the kind and
// payload-length words.
const BODY: usize = 8;
const BEGIN_MAGIC: usize = BODY;
const BEGIN_VERSIONINFO: usize = BODY + 8;
const BEGIN_CREATION_TIME: usize = BODY + 16;
const BEGIN_OBJECT_TYPE: usize = BODY + 24;
const BEGIN_FLAGS: usize = BODY + 28;
const BEGIN_TO_GUID: usize = BODY + 32;
const BEGIN_FROM_GUID: usize = BODY + 40;
const BEGIN_TO_NAME: usize = BODY + 48;

const END_CHECKSUM: usize = BODY;
const END_TO_GUID: usize = BODY + 32;

const OBJECT_OBJECT: usize = BODY;
const OBJECT_TYPE: usize = BODY + 8;
const OBJECT_BONUS_TYPE: usize = BODY + 12;
const OBJECT_BLOCK_SIZE: usize = BODY + 16;
const OBJECT_BONUS_LEN: usize = BODY + 20;

const FREEOBJECTS_FIRST: usize = BODY;
const FREEOBJECTS_COUNT: usize = BODY + 8;

const WRITE_OBJECT: usize = BODY;
const WRITE_TYPE: usize = BODY + 8;
const WRITE_OFFSET: usize = BODY + 16;
const WRITE_LENGTH: usize = BODY + 24;
const WRITE_TO_GUID: usize = BODY + 32;
const WRITE_CHECKSUM_TYPE: usize = BODY + 40;
const WRITE_KEY_PROP: usize = BODY + 80;

const WRITE_BYREF_OBJECT: usize = BODY;
const WRITE_BYREF_OFFSET: usize = BODY + 8;
const WRITE_BYREF_LENGTH: usize = BODY + 16;
const WRITE_BYREF_TO_GUID: usize = BODY + 24;
const WRITE_BYREF_REF_GUID: usize = BODY + 32;
const WRITE_BYREF_REF_OBJECT: usize = BODY + 40;
const WRITE_BYREF_REF_OFFSET: usize = BODY + 48;
const WRITE_BYREF_CHECKSUM_TYPE: usize = BODY + 56;
const WRITE_BYREF_KEY_PROP: usize = BODY + 96;

const FREE_OBJECT: usize = BODY;
const FREE_OFFSET: usize = BODY + 8;
const FREE_LENGTH: usize = BODY + 16;

const SPILL_OBJECT: usize = BODY;
const SPILL_LENGTH: usize = BODY + 8;

/// Errors raised while interpreting or mutating a replay record.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RecordError {
    /// The record's kind tag matches no known record kind.
    #[error("unknown replay record kind {raw:#x}")]
    UnknownKind {
        /// Raw kind tag after endian decoding.
        raw: u32,
    },
    /// A snapshot name does not fit the fixed name field.
    #[error("snapshot name of {len} bytes exceeds the {max}-byte name field", max = MAX_NAME_LEN - 1)]
    NameTooLong {
        /// Length of the rejected name in bytes.
        len: usize,
    },
}

/// Kind tag of a replay record.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum RecordKind {
    /// Opens a (sub-)stream; carries snapshot identifiers.
    Begin = 0,
    /// Describes an object; trailed by an 8-byte-rounded bonus payload.
    Object = 1,
    /// Frees a range of objects.
    FreeObjects = 2,
    /// Block write; trailed by exactly `length` bytes of data.
    Write = 3,
    /// Frees a byte range within an object.
    Free = 4,
    /// Closes a (sub-)stream; carries the checksum of everything before it.
    End = 5,
    /// Deduplicated write referencing an earlier block.
    WriteByref = 6,
    /// Spill-block write.
    Spill = 7,
}

impl RecordKind {
    /// Decodes a kind tag, failing on values outside the known set.
    pub fn from_raw(raw: u32) -> Result<Self, RecordError> {
        match raw {
            0 => Ok(Self::Begin),
            1 => Ok(Self::Object),
            2 => Ok(Self::FreeObjects),
            3 => Ok(Self::Write),
            4 => Ok(Self::Free),
            5 => Ok(Self::End),
            6 => Ok(Self::WriteByref),
            7 => Ok(Self::Spill),
            _ => Err(RecordError::UnknownKind { raw }),
        }
    }

    /// Returns the wire tag of this kind.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self as u32
    }
}

/// One 312-byte replay record, held exactly as transmitted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReplayRecord {
    bytes: [u8; RECORD_SIZE],
}

impl Default for ReplayRecord {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl ReplayRecord {
    /// Returns an all-zero record frame.
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            bytes: [0; RECORD_SIZE],
        }
    }

    /// Wraps a raw wire frame.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; RECORD_SIZE]) -> Self {
        Self { bytes }
    }

    /// The raw wire frame; this is what checksums and writes must cover.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; RECORD_SIZE] {
        &self.bytes
    }

    fn u32_at(&self, off: usize) -> u32 {
        let b = &self.bytes;
        u32::from_ne_bytes([b[off], b[off + 1], b[off + 2], b[off + 3]])
    }

    fn put_u32(&mut self, off: usize, raw: u32) {
        self.bytes[off..off + 4].copy_from_slice(&raw.to_ne_bytes());
    }

    fn u64_at(&self, off: usize) -> u64 {
        let b = &self.bytes;
        u64::from_ne_bytes([
            b[off],
            b[off + 1],
            b[off + 2],
            b[off + 3],
            b[off + 4],
            b[off + 5],
            b[off + 6],
            b[off + 7],
        ])
    }

    fn put_u64(&mut self, off: usize, raw: u64) {
        self.bytes[off..off + 8].copy_from_slice(&raw.to_ne_bytes());
    }

    /// The kind tag exactly as it appears on the wire, undecoded.
    #[must_use]
    pub fn raw_kind(&self) -> u32 {
        self.u32_at(0)
    }

    /// Decodes the record kind under the stream's byte order.
    pub fn kind(&self, endian: StreamEndian) -> Result<RecordKind, RecordError> {
        RecordKind::from_raw(endian.decode_u32(self.raw_kind()))
    }

    /// Tests the kind tag against `kind` in either byte order.
    ///
    /// Mirrors the wire-level classification done before the stream's
    /// endianness is settled (and keeps working after: a valid tag matches
    /// in exactly one order).
    #[must_use]
    pub fn is_kind(&self, kind: RecordKind) -> bool {
        let raw = self.raw_kind();
        raw == kind.as_raw() || raw == kind.as_raw().swap_bytes()
    }

    /// Stamps the kind tag in the stream's byte order.
    pub fn set_kind(&mut self, endian: StreamEndian, kind: RecordKind) {
        self.put_u32(0, endian.encode_u32(kind.as_raw()));
    }

    /// Payload length announced by this record.
    #[must_use]
    pub fn payload_len(&self, endian: StreamEndian) -> u32 {
        endian.decode_u32(self.u32_at(4))
    }

    /// Overwrites the announced payload length.
    pub fn set_payload_len(&mut self, endian: StreamEndian, len: u32) {
        self.put_u32(4, endian.encode_u32(len));
    }

    // ---- BEGIN fields ----

    /// Stream magic from a BEGIN body.
    #[must_use]
    pub fn begin_magic(&self, endian: StreamEndian) -> u64 {
        endian.decode_u64(self.u64_at(BEGIN_MAGIC))
    }

    /// Raw magic bytes, undecoded; used for endianness detection.
    #[must_use]
    pub fn begin_magic_raw(&self) -> u64 {
        self.u64_at(BEGIN_MAGIC)
    }

    /// Stamps the stream magic in the stream's byte order.
    pub fn set_begin_magic(&mut self, endian: StreamEndian, magic: u64) {
        self.put_u64(BEGIN_MAGIC, endian.encode_u64(magic));
    }

    /// Version/header-type word from a BEGIN body.
    #[must_use]
    pub fn begin_versioninfo(&self, endian: StreamEndian) -> u64 {
        endian.decode_u64(self.u64_at(BEGIN_VERSIONINFO))
    }

    /// Overwrites the version/header-type word.
    pub fn set_begin_versioninfo(&mut self, endian: StreamEndian, versioninfo: u64) {
        self.put_u64(BEGIN_VERSIONINFO, endian.encode_u64(versioninfo));
    }

    /// Snapshot creation time from a BEGIN body.
    #[must_use]
    pub fn begin_creation_time(&self, endian: StreamEndian) -> u64 {
        endian.decode_u64(self.u64_at(BEGIN_CREATION_TIME))
    }

    /// Dataset object type from a BEGIN body.
    #[must_use]
    pub fn begin_object_type(&self, endian: StreamEndian) -> u32 {
        endian.decode_u32(self.u32_at(BEGIN_OBJECT_TYPE))
    }

    /// Flags word from a BEGIN body.
    #[must_use]
    pub fn begin_flags(&self, endian: StreamEndian) -> u32 {
        endian.decode_u32(self.u32_at(BEGIN_FLAGS))
    }

    /// Identifier of the snapshot this stream produces.
    #[must_use]
    pub fn begin_to_guid(&self, endian: StreamEndian) -> u64 {
        endian.decode_u64(self.u64_at(BEGIN_TO_GUID))
    }

    /// Overwrites the target-snapshot identifier.
    pub fn set_begin_to_guid(&mut self, endian: StreamEndian, guid: u64) {
        self.put_u64(BEGIN_TO_GUID, endian.encode_u64(guid));
    }

    /// Identifier of the incremental base snapshot (zero for full sends).
    #[must_use]
    pub fn begin_from_guid(&self, endian: StreamEndian) -> u64 {
        endian.decode_u64(self.u64_at(BEGIN_FROM_GUID))
    }

    /// Overwrites the incremental-base identifier.
    pub fn set_begin_from_guid(&mut self, endian: StreamEndian, guid: u64) {
        self.put_u64(BEGIN_FROM_GUID, endian.encode_u64(guid));
    }

    /// NUL-terminated target snapshot name (`pool/fs@snap`).
    #[must_use]
    pub fn begin_to_name(&self) -> String {
        let field = &self.bytes[BEGIN_TO_NAME..BEGIN_TO_NAME + MAX_NAME_LEN];
        let len = field.iter().position(|&b| b == 0).unwrap_or(MAX_NAME_LEN);
        String::from_utf8_lossy(&field[..len]).into_owned()
    }

    /// Replaces the target snapshot name, zero-filling the rest of the
    /// fixed field.
    pub fn set_begin_to_name(&mut self, name: &str) -> Result<(), RecordError> {
        let bytes = name.as_bytes();
        if bytes.len() >= MAX_NAME_LEN {
            return Err(RecordError::NameTooLong { len: bytes.len() });
        }
        let field = &mut self.bytes[BEGIN_TO_NAME..BEGIN_TO_NAME + MAX_NAME_LEN];
        field.fill(0);
        field[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    // ---- END fields ----

    /// Checksum carried by an END body.
    #[must_use]
    pub fn end_checksum(&self, endian: StreamEndian) -> Fletcher4Digest {
        let mut words = [0u64; 4];
        for (i, word) in words.iter_mut().enumerate() {
            *word = endian.decode_u64(self.u64_at(END_CHECKSUM + i * 8));
        }
        Fletcher4Digest::new(words)
    }

    /// Stamps the END checksum in the stream's byte order.
    pub fn set_end_checksum(&mut self, endian: StreamEndian, digest: Fletcher4Digest) {
        for (i, word) in digest.words().into_iter().enumerate() {
            self.put_u64(END_CHECKSUM + i * 8, endian.encode_u64(word));
        }
    }

    /// Snapshot identifier carried by an END body.
    #[must_use]
    pub fn end_to_guid(&self, endian: StreamEndian) -> u64 {
        endian.decode_u64(self.u64_at(END_TO_GUID))
    }

    /// Overwrites the END's snapshot identifier.
    pub fn set_end_to_guid(&mut self, endian: StreamEndian, guid: u64) {
        self.put_u64(END_TO_GUID, endian.encode_u64(guid));
    }

    // ---- body-record payload lengths ----

    /// Bonus-buffer length announced by an OBJECT body (unrounded).
    #[must_use]
    pub fn object_bonus_len(&self, endian: StreamEndian) -> u32 {
        endian.decode_u32(self.u32_at(OBJECT_BONUS_LEN))
    }

    /// Overwrites an OBJECT's announced bonus length.
    pub fn set_object_bonus_len(&mut self, endian: StreamEndian, len: u32) {
        self.put_u32(OBJECT_BONUS_LEN, endian.encode_u32(len));
    }

    /// Data length announced by a WRITE body.
    #[must_use]
    pub fn write_length(&self, endian: StreamEndian) -> u64 {
        endian.decode_u64(self.u64_at(WRITE_LENGTH))
    }

    /// Overwrites a WRITE's announced data length.
    pub fn set_write_length(&mut self, endian: StreamEndian, len: u64) {
        self.put_u64(WRITE_LENGTH, endian.encode_u64(len));
    }
}

/// Decoded BEGIN body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BeginFields {
    /// Stream magic.
    pub magic: u64,
    /// Version and header-type word.
    pub versioninfo: u64,
    /// Snapshot creation time.
    pub creation_time: u64,
    /// Dataset object type.
    pub object_type: u32,
    /// Flags word.
    pub flags: u32,
    /// Target snapshot identifier.
    pub to_guid: u64,
    /// Incremental base identifier, zero for full sends.
    pub from_guid: u64,
    /// Target snapshot name.
    pub to_name: String,
}

impl BeginFields {
    /// Decodes the BEGIN body of `rec`.
    #[must_use]
    pub fn decode(rec: &ReplayRecord, endian: StreamEndian) -> Self {
        Self {
            magic: rec.begin_magic(endian),
            versioninfo: rec.begin_versioninfo(endian),
            creation_time: rec.begin_creation_time(endian),
            object_type: rec.begin_object_type(endian),
            flags: rec.begin_flags(endian),
            to_guid: rec.begin_to_guid(endian),
            from_guid: rec.begin_from_guid(endian),
            to_name: rec.begin_to_name(),
        }
    }
}

/// Decoded END body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EndFields {
    /// Fletcher-4 of every byte since the matching BEGIN.
    pub checksum: Fletcher4Digest,
    /// Snapshot identifier this END closes.
    pub to_guid: u64,
}

impl EndFields {
    /// Decodes the END body of `rec`.
    #[must_use]
    pub fn decode(rec: &ReplayRecord, endian: StreamEndian) -> Self {
        Self {
            checksum: rec.end_checksum(endian),
            to_guid: rec.end_to_guid(endian),
        }
    }
}

/// Decoded OBJECT body (diagnostic fields only).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ObjectFields {
    /// Object number.
    pub object: u64,
    /// Object type.
    pub object_type: u32,
    /// Bonus-buffer type.
    pub bonus_type: u32,
    /// Block size in bytes.
    pub block_size: u32,
    /// Bonus-buffer length in bytes, unrounded.
    pub bonus_len: u32,
}

impl ObjectFields {
    /// Decodes the OBJECT body of `rec`.
    #[must_use]
    pub fn decode(rec: &ReplayRecord, endian: StreamEndian) -> Self {
        Self {
            object: endian.decode_u64(rec.u64_at(OBJECT_OBJECT)),
            object_type: endian.decode_u32(rec.u32_at(OBJECT_TYPE)),
            bonus_type: endian.decode_u32(rec.u32_at(OBJECT_BONUS_TYPE)),
            block_size: endian.decode_u32(rec.u32_at(OBJECT_BLOCK_SIZE)),
            bonus_len: endian.decode_u32(rec.u32_at(OBJECT_BONUS_LEN)),
        }
    }
}

/// Decoded FREEOBJECTS body.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FreeObjectsFields {
    /// First object number in the freed range.
    pub first_object: u64,
    /// Number of objects freed.
    pub num_objects: u64,
}

impl FreeObjectsFields {
    /// Decodes the FREEOBJECTS body of `rec`.
    #[must_use]
    pub fn decode(rec: &ReplayRecord, endian: StreamEndian) -> Self {
        Self {
            first_object: endian.decode_u64(rec.u64_at(FREEOBJECTS_FIRST)),
            num_objects: endian.decode_u64(rec.u64_at(FREEOBJECTS_COUNT)),
        }
    }
}

/// Decoded WRITE body (diagnostic fields only).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WriteFields {
    /// Object number written to.
    pub object: u64,
    /// Object type.
    pub object_type: u32,
    /// Checksum algorithm of the dedup key.
    pub checksum_type: u8,
    /// Byte offset of the write.
    pub offset: u64,
    /// Data length; exactly this many payload bytes follow.
    pub length: u64,
    /// Dedup key properties.
    pub key_prop: u64,
}

impl WriteFields {
    /// Decodes the WRITE body of `rec`.
    #[must_use]
    pub fn decode(rec: &ReplayRecord, endian: StreamEndian) -> Self {
        Self {
            object: endian.decode_u64(rec.u64_at(WRITE_OBJECT)),
            object_type: endian.decode_u32(rec.u32_at(WRITE_TYPE)),
            checksum_type: rec.bytes[WRITE_CHECKSUM_TYPE],
            offset: endian.decode_u64(rec.u64_at(WRITE_OFFSET)),
            length: endian.decode_u64(rec.u64_at(WRITE_LENGTH)),
            key_prop: endian.decode_u64(rec.u64_at(WRITE_KEY_PROP)),
        }
    }
}

/// Decoded WRITE_BYREF body.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WriteByrefFields {
    /// Object number written to.
    pub object: u64,
    /// Checksum algorithm of the dedup key.
    pub checksum_type: u8,
    /// Dedup key properties.
    pub key_prop: u64,
    /// Byte offset of the write.
    pub offset: u64,
    /// Length of the referenced block.
    pub length: u64,
    /// Snapshot the write belongs to.
    pub to_guid: u64,
    /// Snapshot holding the referenced block.
    pub ref_guid: u64,
    /// Object holding the referenced block.
    pub ref_object: u64,
    /// Offset of the referenced block.
    pub ref_offset: u64,
}

impl WriteByrefFields {
    /// Decodes the WRITE_BYREF body of `rec`.
    #[must_use]
    pub fn decode(rec: &ReplayRecord, endian: StreamEndian) -> Self {
        Self {
            object: endian.decode_u64(rec.u64_at(WRITE_BYREF_OBJECT)),
            checksum_type: rec.bytes[WRITE_BYREF_CHECKSUM_TYPE],
            key_prop: endian.decode_u64(rec.u64_at(WRITE_BYREF_KEY_PROP)),
            offset: endian.decode_u64(rec.u64_at(WRITE_BYREF_OFFSET)),
            length: endian.decode_u64(rec.u64_at(WRITE_BYREF_LENGTH)),
            to_guid: endian.decode_u64(rec.u64_at(WRITE_BYREF_TO_GUID)),
            ref_guid: endian.decode_u64(rec.u64_at(WRITE_BYREF_REF_GUID)),
            ref_object: endian.decode_u64(rec.u64_at(WRITE_BYREF_REF_OBJECT)),
            ref_offset: endian.decode_u64(rec.u64_at(WRITE_BYREF_REF_OFFSET)),
        }
    }
}

/// Decoded FREE body.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FreeFields {
    /// Object number the range belongs to.
    pub object: u64,
    /// Start of the freed range.
    pub offset: u64,
    /// Length of the freed range; all-ones means "to end of object".
    pub length: u64,
}

impl FreeFields {
    /// Decodes the FREE body of `rec`.
    #[must_use]
    pub fn decode(rec: &ReplayRecord, endian: StreamEndian) -> Self {
        Self {
            object: endian.decode_u64(rec.u64_at(FREE_OBJECT)),
            offset: endian.decode_u64(rec.u64_at(FREE_OFFSET)),
            length: endian.decode_u64(rec.u64_at(FREE_LENGTH)),
        }
    }
}

/// Decoded SPILL body.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SpillFields {
    /// Object number the spill block belongs to.
    pub object: u64,
    /// Spill-block length.
    pub length: u64,
}

impl SpillFields {
    /// Decodes the SPILL body of `rec`.
    #[must_use]
    pub fn decode(rec: &ReplayRecord, endian: StreamEndian) -> Self {
        Self {
            object: endian.decode_u64(rec.u64_at(SPILL_OBJECT)),
            length: endian.decode_u64(rec.u64_at(SPILL_LENGTH)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn begin_record(endian: StreamEndian) -> ReplayRecord {
        let mut rec = ReplayRecord::zeroed();
        rec.set_kind(endian, RecordKind::Begin);
        rec.put_u64(BEGIN_MAGIC, endian.encode_u64(STREAM_MAGIC));
        rec.set_begin_to_guid(endian, 0x1122334455667788);
        rec.set_begin_from_guid(endian, 0xaabb);
        rec.set_begin_to_name("tank/data@snap").expect("short name fits");
        rec
    }

    #[test]
    fn kind_round_trips_in_both_byte_orders() {
        for endian in [StreamEndian::Native, StreamEndian::Swapped] {
            let mut rec = ReplayRecord::zeroed();
            rec.set_kind(endian, RecordKind::Write);
            assert_eq!(rec.kind(endian), Ok(RecordKind::Write));
            assert!(rec.is_kind(RecordKind::Write));
            assert!(!rec.is_kind(RecordKind::End));
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let mut rec = ReplayRecord::zeroed();
        rec.put_u32(0, 42);
        assert_eq!(
            rec.kind(StreamEndian::Native),
            Err(RecordError::UnknownKind { raw: 42 })
        );
    }

    #[test]
    fn begin_fields_decode_under_swapped_order() {
        let rec = begin_record(StreamEndian::Swapped);
        let fields = BeginFields::decode(&rec, StreamEndian::Swapped);
        assert_eq!(fields.magic, STREAM_MAGIC);
        assert_eq!(fields.to_guid, 0x1122334455667788);
        assert_eq!(fields.from_guid, 0xaabb);
        assert_eq!(fields.to_name, "tank/data@snap");
    }

    #[test]
    fn to_name_is_zero_filled_on_replacement() {
        let mut rec = begin_record(StreamEndian::Native);
        rec.set_begin_to_name("tank/data@a-much-longer-snapshot-name")
            .expect("fits");
        rec.set_begin_to_name("tank/data@s").expect("fits");
        assert_eq!(rec.begin_to_name(), "tank/data@s");

        // No residue of the longer name may remain in the fixed field.
        let field = &rec.as_bytes()[BEGIN_TO_NAME..BEGIN_TO_NAME + MAX_NAME_LEN];
        assert!(field["tank/data@s".len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn oversized_name_is_rejected() {
        let mut rec = ReplayRecord::zeroed();
        let name = "x".repeat(MAX_NAME_LEN);
        assert_eq!(
            rec.set_begin_to_name(&name),
            Err(RecordError::NameTooLong { len: MAX_NAME_LEN })
        );
    }

    #[test]
    fn end_checksum_round_trips_swapped() {
        let digest = Fletcher4Digest::new([1, 2, 3, u64::MAX]);
        let mut rec = ReplayRecord::zeroed();
        rec.set_kind(StreamEndian::Swapped, RecordKind::End);
        rec.set_end_checksum(StreamEndian::Swapped, digest);
        rec.set_end_to_guid(StreamEndian::Swapped, 0xdead);

        assert_eq!(rec.end_checksum(StreamEndian::Swapped), digest);
        assert_eq!(rec.end_to_guid(StreamEndian::Swapped), 0xdead);
        // Under the wrong decoder the words come back byte-reversed.
        assert_ne!(rec.end_checksum(StreamEndian::Native), digest);
    }

    #[test]
    fn payload_len_honours_stream_order() {
        let mut rec = ReplayRecord::zeroed();
        rec.set_payload_len(StreamEndian::Swapped, 0x1000);
        assert_eq!(rec.payload_len(StreamEndian::Swapped), 0x1000);
        assert_eq!(rec.payload_len(StreamEndian::Native), 0x1000u32.swap_bytes());
    }
}
