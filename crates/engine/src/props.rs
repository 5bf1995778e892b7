//! Property-list rewriting for compound sub-streams.
//!
//! A compound BEGIN carries a packed name-value tree describing the
//! snapshots the stream replicates. Each synthesized sub-stream gets a
//! rewritten copy in which the target identifiers match its own BEGIN:
//! `toguid` becomes the part guid, and the single `snaps`/`snapprops`
//! entry for the original target is re-keyed to the part name. With
//! renaming active the rewrite instead re-keys every sighting of the
//! cached original name to its alias and empties `fromsnap`.

use zsplit_protocol::{NvList, NvValue, ReplayRecord, StreamEndian};

use crate::alias::SnapshotAliaser;
use crate::error::{SplitError, SplitResult};

struct RewriteInfo {
    ori_to_guid: u64,
    new_to_guid: u64,
    ori_to_name: String,
    new_to_name: String,
}

/// Rewrites the packed properties of `cur_begin` to describe `new_begin`.
///
/// Returns the repacked blob; its length goes into the synthesized
/// compound BEGIN's payload-length field.
pub fn rewrite_properties(
    props: &[u8],
    cur_begin: &ReplayRecord,
    new_begin: &ReplayRecord,
    endian: StreamEndian,
    aliaser: &mut SnapshotAliaser,
) -> SplitResult<Vec<u8>> {
    let info = RewriteInfo {
        ori_to_guid: cur_begin.begin_to_guid(endian),
        new_to_guid: new_begin.begin_to_guid(endian),
        ori_to_name: snapshot_component(&cur_begin.begin_to_name())?.to_owned(),
        new_to_name: snapshot_component(&new_begin.begin_to_name())?.to_owned(),
    };

    let root = NvList::unpack(props)?;
    let rewritten = rewrite_root(&root, &info, aliaser)?;
    Ok(rewritten.pack())
}

fn rewrite_root(
    root: &NvList,
    info: &RewriteInfo,
    aliaser: &mut SnapshotAliaser,
) -> SplitResult<NvList> {
    let mut out = NvList::like(root);
    for pair in root.iter() {
        match (pair.name(), pair.value()) {
            ("toguid", _) => out.add_uint64("toguid", info.new_to_guid),
            ("fromsnap", _) if aliaser.enabled() => out.add_string("fromsnap", ""),
            ("tosnap", NvValue::String(tosnap)) => {
                out.add_string("tosnap", aliaser.alias(tosnap));
            }
            ("tosnap", _) => return Err(layout("tosnap")),
            ("fss", NvValue::List(fss)) => {
                let mut new_fss = NvList::like(fss);
                for fs in fss.iter() {
                    let NvValue::List(entry) = fs.value() else {
                        return Err(layout(fs.name()));
                    };
                    new_fss.add_list(fs.name(), rewrite_fs_entry(entry, info, aliaser)?);
                }
                out.add_list("fss", new_fss);
            }
            ("fss", _) => return Err(layout("fss")),
            _ => out.add_pair(pair),
        }
    }
    Ok(out)
}

fn rewrite_fs_entry(
    entry: &NvList,
    info: &RewriteInfo,
    aliaser: &mut SnapshotAliaser,
) -> SplitResult<NvList> {
    let mut out = NvList::like(entry);
    for pair in entry.iter() {
        match (pair.name(), pair.value()) {
            ("snaps", NvValue::List(snaps)) => {
                out.add_list("snaps", rewrite_snaps(snaps, info, aliaser)?);
            }
            ("snapprops", NvValue::List(snapprops)) => {
                out.add_list("snapprops", rewrite_snapprops(snapprops, info, aliaser)?);
            }
            ("snaps" | "snapprops", _) => return Err(layout(pair.name())),
            _ => out.add_pair(pair),
        }
    }
    Ok(out)
}

fn rewrite_snaps(
    snaps: &NvList,
    info: &RewriteInfo,
    aliaser: &mut SnapshotAliaser,
) -> SplitResult<NvList> {
    let mut out = NvList::like(snaps);
    for pair in snaps.iter() {
        let NvValue::Uint64(guid) = pair.value() else {
            return Err(layout(pair.name()));
        };
        if aliaser.enabled() {
            // Only the renamed snapshot survives; its guid is preserved
            // under the alias key.
            let alias = aliaser.alias(pair.name());
            if alias != pair.name() {
                out.add_uint64(alias, *guid);
            }
        } else if *guid == info.ori_to_guid {
            out.add_uint64(info.new_to_name.clone(), info.new_to_guid);
        } else {
            out.add_pair(pair);
        }
    }
    Ok(out)
}

fn rewrite_snapprops(
    snapprops: &NvList,
    info: &RewriteInfo,
    aliaser: &mut SnapshotAliaser,
) -> SplitResult<NvList> {
    let mut out = NvList::like(snapprops);
    for pair in snapprops.iter() {
        let renamed = aliaser.enabled() && aliaser.alias(pair.name()) != pair.name();
        let matches_target = !aliaser.enabled() && pair.name() == info.ori_to_name;

        if renamed || matches_target {
            let NvValue::List(props) = pair.value() else {
                return Err(layout(pair.name()));
            };
            out.add(aliaser.alias(&info.new_to_name), NvValue::List(props.clone()));
        } else if !aliaser.enabled() {
            out.add_pair(pair);
        }
        // With renaming active every non-matching entry is dropped.
    }
    Ok(out)
}

/// The part of a snapshot name after `@`.
pub(crate) fn snapshot_component(name: &str) -> SplitResult<&str> {
    name.split_once('@')
        .map(|(_, snap)| snap)
        .ok_or_else(|| SplitError::BadSnapshotName {
            name: name.to_owned(),
        })
}

fn layout(key: &str) -> SplitError {
    SplitError::PropLayout {
        key: key.to_owned(),
    }
}
