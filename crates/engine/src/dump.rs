//! Per-record diagnostics emitted at debug verbosity.

use tracing::debug;

use zsplit_checksums::Fletcher4;
use zsplit_protocol::record::{
    BeginFields, EndFields, FreeFields, FreeObjectsFields, ObjectFields, SpillFields,
    WriteByrefFields, WriteFields,
};
use zsplit_protocol::{header, NvList, RecordKind, ReplayRecord, StreamEndian};

/// Dumps one record's decoded fields together with the running sub-stream
/// checksum.
pub(crate) fn record(rec: &ReplayRecord, endian: StreamEndian, sum: &Fletcher4) {
    let Ok(kind) = rec.kind(endian) else {
        debug!(raw = rec.raw_kind(), "record of unknown kind");
        return;
    };

    match kind {
        RecordKind::Begin => {
            let f = BeginFields::decode(rec, endian);
            debug!(
                hdrtype = f.versioninfo & 0x3,
                features = header::feature_flags(f.versioninfo),
                magic = format_args!("{:x}", f.magic),
                creation_time = format_args!("{:x}", f.creation_time),
                object_type = f.object_type,
                flags = format_args!("{:#x}", f.flags),
                toguid = format_args!("{:x}", f.to_guid),
                fromguid = format_args!("{:x}", f.from_guid),
                toname = %f.to_name,
                checksum = %sum.digest(),
                "BEGIN record"
            );
        }
        RecordKind::Object => {
            let f = ObjectFields::decode(rec, endian);
            debug!(
                object = f.object,
                object_type = f.object_type,
                bonustype = f.bonus_type,
                blksz = f.block_size,
                bonuslen = f.bonus_len,
                "OBJECT record"
            );
        }
        RecordKind::FreeObjects => {
            let f = FreeObjectsFields::decode(rec, endian);
            debug!(firstobj = f.first_object, numobjs = f.num_objects, "FREEOBJECTS record");
        }
        RecordKind::Write => {
            let f = WriteFields::decode(rec, endian);
            debug!(
                object = f.object,
                object_type = f.object_type,
                checksum_type = f.checksum_type,
                offset = f.offset,
                length = f.length,
                props = format_args!("{:x}", f.key_prop),
                "WRITE record"
            );
        }
        RecordKind::WriteByref => {
            let f = WriteByrefFields::decode(rec, endian);
            debug!(
                object = f.object,
                checksum_type = f.checksum_type,
                props = format_args!("{:x}", f.key_prop),
                offset = f.offset,
                length = f.length,
                toguid = format_args!("{:x}", f.to_guid),
                refguid = format_args!("{:x}", f.ref_guid),
                refobject = f.ref_object,
                refoffset = f.ref_offset,
                "WRITE_BYREF record"
            );
        }
        RecordKind::Free => {
            let f = FreeFields::decode(rec, endian);
            debug!(
                object = f.object,
                offset = f.offset,
                length = f.length as i64,
                "FREE record"
            );
        }
        RecordKind::Spill => {
            let f = SpillFields::decode(rec, endian);
            debug!(object = f.object, length = f.length, "SPILL record");
        }
        RecordKind::End => {
            let f = EndFields::decode(rec, endian);
            debug!(
                checksum = %f.checksum,
                toguid = format_args!("{:x}", f.to_guid),
                "END record"
            );
        }
    }
}

/// Dumps a packed property list.
pub(crate) fn props(bytes: &[u8]) {
    match NvList::unpack(bytes) {
        Ok(list) => debug!(properties = ?list, "compound property list"),
        Err(err) => debug!(%err, "property list failed to unpack for dump"),
    }
}
