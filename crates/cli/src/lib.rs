#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `zsplit_cli` is the thin command-line front-end for the send-stream
//! splitter. It recognizes the splitter's switches (`--split-size`,
//! `--split-blocks`, `--monolithic`, `--stdout`, `--resume`, `--rename`,
//! `--output-dir`, repeated `-v`), validates the invocation, installs the
//! stderr subscriber, and delegates to [`zsplit_engine::split_stream`].
//!
//! # Design
//!
//! [`run`] accepts the argument iterator together with an input reader and
//! output/error handles, mirroring the binary's `main` while staying fully
//! testable. Interactive-terminal detection cannot be done on generic
//! handles, so the caller reports it through [`TtyStatus`]; the binary
//! fills it from the real file descriptors.
//!
//! # Errors
//!
//! Usage problems and fatal engine errors render one `zsplit: error:` line
//! on the error handle and map to exit status 1. Checksum mismatches in
//! the input are diagnostics, not failures.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::info;

use zsplit_engine::{split_stream, OutputTarget, SplitConfig, PART_NAME_INFIX};
use zsplit_logging::Verbosity;

/// Whether the process's standard streams are interactive terminals.
///
/// A send stream is binary on both ends: reading one from a keyboard or
/// writing one to a terminal is always a mistake.
#[derive(Clone, Copy, Debug, Default)]
pub struct TtyStatus {
    /// Standard input is a terminal.
    pub stdin: bool,
    /// Standard output is a terminal.
    pub stdout: bool,
}

fn command() -> Command {
    Command::new("zsplit")
        .about("Split a ZFS send stream into independently receivable sub-streams")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("split-size")
                .short('s')
                .long("split-size")
                .value_name("BYTES")
                .value_parser(clap::value_parser!(u64))
                .default_value("0")
                .help("Byte budget per sub-stream (0 = unlimited)"),
        )
        .arg(
            Arg::new("split-blocks")
                .short('b')
                .long("split-blocks")
                .value_name("RECORDS")
                .value_parser(clap::value_parser!(u32))
                .default_value("2147483647")
                .help("Record budget per sub-stream"),
        )
        .arg(
            Arg::new("monolithic")
                .short('S')
                .long("monolithic")
                .action(ArgAction::SetTrue)
                .requires("stdout")
                .help("Emit one concatenated stream instead of one file per sub-snapshot"),
        )
        .arg(
            Arg::new("stdout")
                .short('o')
                .long("stdout")
                .action(ArgAction::SetTrue)
                .help("Write the split stream to standard output"),
        )
        .arg(
            Arg::new("resume")
                .short('n')
                .long("resume")
                .value_name("SNAPSHOT")
                .help("Suppress output until the stream crosses this part snapshot"),
        )
        .arg(
            Arg::new("rename")
                .short('r')
                .long("rename")
                .action(ArgAction::SetTrue)
                .help("Rename the terminal snapshot to a generated identifier"),
        )
        .arg(
            Arg::new("output-dir")
                .short('d')
                .long("output-dir")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .default_value(".")
                .help("Directory receiving the part files"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase diagnostics (-vv dumps every record)"),
        )
}

fn config_from(matches: &ArgMatches, verbosity: Verbosity) -> SplitConfig {
    SplitConfig {
        max_bytes: matches.get_one::<u64>("split-size").copied().unwrap_or(0),
        max_blocks: matches
            .get_one::<u32>("split-blocks")
            .copied()
            .unwrap_or(i32::MAX as u32),
        per_snapshot: !matches.get_flag("monolithic"),
        rename_snapshot: matches.get_flag("rename"),
        resume_snapshot: matches.get_one::<String>("resume").cloned(),
        dump_records: verbosity >= Verbosity::Debug,
    }
}

fn usage_error<Err: Write>(stderr: &mut Err, message: &str) -> i32 {
    let _ = writeln!(stderr, "zsplit: error: {message}");
    1
}

/// Parses `args`, splits the stream on `input`, and reports the exit
/// status: 0 on success, 1 on any fatal error.
pub fn run<I, In, Out, Err>(
    args: I,
    input: In,
    stdout: &mut Out,
    stderr: &mut Err,
    tty: TtyStatus,
) -> i32
where
    I: IntoIterator,
    I::Item: Into<OsString> + Clone,
    In: Read,
    Out: Write,
    Err: Write,
{
    let matches = match command().try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(err) if err.use_stderr() => {
            let _ = write!(stderr, "{err}");
            return 1;
        }
        Err(err) => {
            // --help and --version render to standard output and succeed.
            let _ = write!(stdout, "{err}");
            return 0;
        }
    };

    let to_stdout = matches.get_flag("stdout");
    if tty.stdin {
        return usage_error(stderr, "the send stream must be read from standard input");
    }
    if to_stdout && tty.stdout {
        return usage_error(stderr, "refusing to write a binary stream to a terminal");
    }
    if let Some(resume) = matches.get_one::<String>("resume") {
        if !resume.contains(PART_NAME_INFIX) {
            return usage_error(
                stderr,
                "the resume snapshot must name a split part (missing `_part_`)",
            );
        }
    }

    let verbosity = Verbosity::from_flag_count(matches.get_count("verbose"));
    zsplit_logging::init(verbosity);

    let config = config_from(&matches, verbosity);
    let target = if to_stdout {
        OutputTarget::Stream(stdout)
    } else {
        let dir = matches
            .get_one::<PathBuf>("output-dir")
            .cloned()
            .unwrap_or_else(|| PathBuf::from("."));
        OutputTarget::Directory(dir)
    };

    match split_stream(input, target, config) {
        Ok(report) => {
            info!(
                sub_snapshots = report.sub_snapshots.len(),
                checksum_mismatches = report.checksum_mismatches,
                "split complete"
            );
            0
        }
        Err(err) => {
            let _ = writeln!(stderr, "zsplit: error: {err}");
            1
        }
    }
}

/// Maps a [`run`] status to the process exit code.
#[must_use]
pub fn exit_code_from(status: i32) -> ExitCode {
    ExitCode::from(clamped_status(status))
}

fn clamped_status(status: i32) -> u8 {
    status.clamp(0, 255) as u8
}
