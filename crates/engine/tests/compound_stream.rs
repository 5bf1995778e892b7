//! Splitting compound streams: per-sub-snapshot files with rewritten
//! outer frames, and the concatenated single-stream variant.

mod common;

use std::fs;
use std::io::Cursor;

use common::{
    assert_checksums_consistent, begin_entries, body_payloads, parse_entries, props_with_snaps,
    StreamBuilder, SHAPE_SINGLE,
};
use zsplit_engine::{split_stream, OutputTarget, SplitConfig};
use zsplit_protocol::{NvList, NvValue, RecordKind, StreamEndian};

const GUID_A: u64 = 0xaaaa_bbbb_cccc_0001;
const PART_1: u64 = 0xaaaa_bbbb_cccc_0002;
const PART_2: u64 = 0xaaaa_bbbb_cccc_0003;
const GUID_OLD: u64 = 0x9999_0000_0000_0009;

fn compound_input(endian: StreamEndian, writes: &[&[u8]]) -> (Vec<u8>, Vec<u8>) {
    let props = props_with_snaps(GUID_A, "snap", &[("older", GUID_OLD), ("snap", GUID_A)]);
    let mut b = StreamBuilder::new(endian);
    b.compound_frame(GUID_A, 0, "tank/data@snap", &props);
    b.begin(SHAPE_SINGLE, GUID_A, 0, "tank/data@snap");
    for data in writes {
        b.write(data);
    }
    b.end(GUID_A);
    b.end(GUID_A);
    let payloads = b.payload_bytes();
    (b.finish(), payloads)
}

fn unpack_props(payload: &[u8]) -> NvList {
    NvList::unpack(payload).expect("rewritten properties unpack")
}

fn snaps_of(root: &NvList) -> &NvList {
    let Some(NvValue::List(fss)) = root.get("fss") else {
        panic!("fss missing");
    };
    let Some(NvValue::List(fs)) = fss.get("0xfs") else {
        panic!("fs entry missing");
    };
    let Some(NvValue::List(snaps)) = fs.get("snaps") else {
        panic!("snaps missing");
    };
    snaps
}

#[test]
fn files_mode_wraps_each_boundary_part_in_a_rewritten_frame() {
    let endian = StreamEndian::Native;
    let dir = tempfile::tempdir().expect("tempdir");
    let (input, payloads) = compound_input(endian, &[&[0x11; 512]]);

    let report = split_stream(
        Cursor::new(input),
        OutputTarget::<Vec<u8>>::Directory(dir.path().to_path_buf()),
        SplitConfig::default(),
    )
    .expect("split succeeds");

    assert_eq!(report.checksum_mismatches, 0);
    let chain = &report.sub_snapshots;
    assert_eq!(chain.len(), 2);
    assert_eq!((chain[0].from_guid, chain[0].to_guid), (0, PART_1));
    assert_eq!((chain[1].from_guid, chain[1].to_guid), (PART_1, GUID_A));

    // Part 1: outer frame with properties retargeted to the part
    // snapshot, then the inner sub-stream, then the doubled END closing
    // the compound shape.
    let part1 = fs::read(dir.path().join("zstream_part_1")).expect("part 1");
    assert_checksums_consistent(&part1, endian);
    let entries = parse_entries(&part1, endian);
    let kinds: Vec<RecordKind> = entries.iter().map(|e| e.kind(endian)).collect();
    assert_eq!(
        kinds,
        [
            RecordKind::Begin,
            RecordKind::End,
            RecordKind::Begin,
            RecordKind::Write,
            RecordKind::End,
            RecordKind::End,
        ]
    );

    let props = unpack_props(&entries[0].payload);
    assert_eq!(props.get("toguid"), Some(&NvValue::Uint64(PART_1)));
    assert_eq!(props.get("tosnap"), Some(&NvValue::String("snap".into())));
    let snaps = snaps_of(&props);
    assert_eq!(snaps.get("snap"), None, "target key is re-keyed");
    assert_eq!(snaps.get("snap_part_1"), Some(&NvValue::Uint64(PART_1)));
    assert_eq!(snaps.get("older"), Some(&NvValue::Uint64(GUID_OLD)));

    assert_eq!(entries[2].rec.begin_to_guid(endian), PART_1);
    assert_eq!(entries[2].rec.begin_to_name(), "tank/data@snap_part_1");
    assert_eq!(body_payloads(&entries, endian), payloads);

    // Part 2: the terminal sub-stream presents the original identifiers,
    // and its frame's properties do too.
    let part2 = fs::read(dir.path().join("zstream_part_2")).expect("part 2");
    assert_checksums_consistent(&part2, endian);
    let entries = parse_entries(&part2, endian);
    let kinds: Vec<RecordKind> = entries.iter().map(|e| e.kind(endian)).collect();
    assert_eq!(
        kinds,
        [
            RecordKind::Begin,
            RecordKind::End,
            RecordKind::Begin,
            RecordKind::End,
            RecordKind::End,
        ]
    );
    let props = unpack_props(&entries[0].payload);
    assert_eq!(props.get("toguid"), Some(&NvValue::Uint64(GUID_A)));
    let snaps = snaps_of(&props);
    assert_eq!(snaps.get("snap"), Some(&NvValue::Uint64(GUID_A)));
    assert_eq!(entries[2].rec.begin_to_guid(endian), GUID_A);
    assert_eq!(entries[2].rec.begin_from_guid(endian), PART_1);
}

#[test]
fn stream_mode_keeps_one_leading_frame_across_budget_boundaries() {
    let endian = StreamEndian::Native;
    let (input, payloads) = compound_input(endian, &[&[0x21; 512], &[0x22; 512]]);

    // The frame and inner BEGIN already count four records, so the budget
    // trips before the second WRITE.
    let config = SplitConfig {
        max_blocks: 4,
        ..SplitConfig::default()
    };
    let mut out = Vec::new();
    let report = split_stream(Cursor::new(input), OutputTarget::Stream(&mut out), config)
        .expect("split succeeds");

    assert_eq!(report.checksum_mismatches, 0);
    let chain = &report.sub_snapshots;
    assert_eq!(chain.len(), 3);
    assert_eq!((chain[0].from_guid, chain[0].to_guid), (0, PART_1));
    assert_eq!((chain[1].from_guid, chain[1].to_guid), (PART_1, PART_2));
    assert_eq!((chain[2].from_guid, chain[2].to_guid), (PART_2, GUID_A));
    assert_eq!(chain[1].to_name, "tank/data@snap_part_2");

    assert_checksums_consistent(&out, endian);
    let entries = parse_entries(&out, endian);
    let kinds: Vec<RecordKind> = entries.iter().map(|e| e.kind(endian)).collect();
    assert_eq!(
        kinds,
        [
            RecordKind::Begin, // outer frame
            RecordKind::End,
            RecordKind::Begin, // part 1
            RecordKind::Write,
            RecordKind::End,
            RecordKind::Begin, // part 2, no frame re-emitted
            RecordKind::Write,
            RecordKind::End,
            RecordKind::Begin, // terminal frame with original identifiers
            RecordKind::End,
            RecordKind::Begin, // terminal sub-stream
            RecordKind::End,
            RecordKind::End, // closes the compound shape
            RecordKind::End, // trailing stream terminator
        ]
    );

    assert_eq!(body_payloads(&entries, endian), payloads);

    // Exactly two property-bearing outer BEGINs: the leading one and the
    // terminal one restoring the original identifiers.
    let begins = begin_entries(&entries, endian);
    let framed: Vec<&&common::Entry> =
        begins.iter().filter(|e| !e.payload.is_empty()).collect();
    assert_eq!(framed.len(), 2);
    assert_eq!(
        unpack_props(&framed[0].payload).get("toguid"),
        Some(&NvValue::Uint64(PART_1))
    );
    assert_eq!(
        unpack_props(&framed[1].payload).get("toguid"),
        Some(&NvValue::Uint64(GUID_A))
    );

    // Mid-run parts chain inside the single frame.
    assert_eq!(entries[5].rec.begin_to_guid(endian), PART_2);
    assert_eq!(entries[5].rec.begin_from_guid(endian), PART_1);
}

#[test]
fn stream_mode_treats_inner_pairs_as_boundaries_by_peeking() {
    let endian = StreamEndian::Native;
    const GUID_B1: u64 = 0x5050_6060_7070_0001;
    const GUID_B2: u64 = 0x5050_6060_7070_0100;
    let part_of_b1 = 0x5050_6060_7070_0002; // lanes of B1 plus index 1
    let part_of_b2 = 0x5050_6060_7070_0102; // lanes of B2 plus index 2

    let props = props_with_snaps(GUID_B2, "s2", &[("s1", GUID_B1), ("s2", GUID_B2)]);
    let mut b = StreamBuilder::new(endian);
    b.compound_frame(GUID_B2, 0, "tank/data@s2", &props);
    b.begin(SHAPE_SINGLE, GUID_B1, 0, "tank/data@s1");
    b.write(&[0x31; 256]);
    b.end(GUID_B1);
    b.begin(SHAPE_SINGLE, GUID_B2, GUID_B1, "tank/data@s2");
    b.write(&[0x32; 256]);
    b.end(GUID_B2);
    b.end(GUID_B2);
    let payloads = b.payload_bytes();
    let input = b.finish();

    let mut out = Vec::new();
    let report = split_stream(
        Cursor::new(input),
        OutputTarget::Stream(&mut out),
        SplitConfig::default(),
    )
    .expect("split succeeds");

    // The intermediate END was recognized by peek-ahead as a boundary,
    // not as the end of the compound stream, and both inner checksums
    // verified against the input.
    assert_eq!(report.checksum_mismatches, 0);
    let chain = &report.sub_snapshots;
    assert_eq!(chain.len(), 3);
    assert_eq!((chain[0].from_guid, chain[0].to_guid), (0, part_of_b1));
    assert_eq!(chain[0].to_name, "tank/data@s1_part_1");
    assert_eq!(
        (chain[1].from_guid, chain[1].to_guid),
        (part_of_b1, part_of_b2),
        "the chain crosses the inner-pair boundary"
    );
    assert_eq!(chain[1].to_name, "tank/data@s2_part_2");
    assert_eq!((chain[2].from_guid, chain[2].to_guid), (part_of_b2, GUID_B2));
    assert_eq!(chain[2].to_name, "tank/data@s2");

    assert_checksums_consistent(&out, endian);
    let entries = parse_entries(&out, endian);
    assert_eq!(body_payloads(&entries, endian), payloads);

    let begins = begin_entries(&entries, endian);
    let names: Vec<String> = begins.iter().map(|e| e.rec.begin_to_name()).collect();
    assert_eq!(
        names,
        [
            "tank/data@s2", // leading outer frame
            "tank/data@s1_part_1",
            "tank/data@s2_part_2",
            "tank/data@s2", // terminal outer frame
            "tank/data@s2", // terminal sub-stream
        ]
    );
}

#[test]
fn swapped_compound_input_round_trips() {
    let native_out = {
        let (input, _) = compound_input(StreamEndian::Native, &[&[0x41; 128]]);
        let mut out = Vec::new();
        split_stream(
            Cursor::new(input),
            OutputTarget::Stream(&mut out),
            SplitConfig::default(),
        )
        .expect("native split succeeds");
        out
    };
    let swapped_out = {
        let (input, _) = compound_input(StreamEndian::Swapped, &[&[0x41; 128]]);
        let mut out = Vec::new();
        split_stream(
            Cursor::new(input),
            OutputTarget::Stream(&mut out),
            SplitConfig::default(),
        )
        .expect("swapped split succeeds");
        out
    };

    assert_checksums_consistent(&native_out, StreamEndian::Native);
    assert_checksums_consistent(&swapped_out, StreamEndian::Swapped);

    let native = parse_entries(&native_out, StreamEndian::Native);
    let swapped = parse_entries(&swapped_out, StreamEndian::Swapped);
    assert_eq!(native.len(), swapped.len());
    for (n, s) in native.iter().zip(&swapped) {
        assert_eq!(n.kind(StreamEndian::Native), s.kind(StreamEndian::Swapped));
        if n.kind(StreamEndian::Native) == RecordKind::Begin {
            assert_eq!(
                n.rec.begin_to_guid(StreamEndian::Native),
                s.rec.begin_to_guid(StreamEndian::Swapped),
                "derived guids are computed on decoded values"
            );
            assert_eq!(n.rec.begin_to_name(), s.rec.begin_to_name());
        }
    }
}
