//! Output sinks: one part file per sub-snapshot, or a caller-provided
//! concatenated stream.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

/// Where the split sub-streams go.
#[derive(Debug)]
pub enum OutputTarget<W> {
    /// One `zstream_part_<n>` file per sub-snapshot inside the directory.
    Directory(PathBuf),
    /// A single concatenated stream (stdout in the CLI).
    Stream(W),
}

/// Name of the `index`-th part file, counting from 1.
#[must_use]
pub fn part_file_name(index: u32) -> String {
    format!("zstream_part_{index}")
}

pub(crate) struct OutputSink<W> {
    kind: SinkKind<W>,
    file_index: u32,
}

enum SinkKind<W> {
    Files { dir: PathBuf, file: Option<File> },
    Stream(W),
}

impl<W: Write> OutputSink<W> {
    pub(crate) fn new(target: OutputTarget<W>) -> Self {
        let kind = match target {
            OutputTarget::Directory(dir) => SinkKind::Files { dir, file: None },
            OutputTarget::Stream(inner) => SinkKind::Stream(inner),
        };
        Self {
            kind,
            file_index: 0,
        }
    }

    pub(crate) fn is_stream(&self) -> bool {
        matches!(self.kind, SinkKind::Stream(_))
    }

    /// Part-file name recorded for the current sub-snapshot.
    pub(crate) fn current_name(&self) -> String {
        part_file_name(self.file_index)
    }

    /// Advances to the next part. For a directory sink this closes the
    /// current part file and opens the successor; a stream sink only
    /// advances the recorded index.
    pub(crate) fn rotate(&mut self) -> io::Result<String> {
        self.file_index += 1;
        let name = part_file_name(self.file_index);

        if let SinkKind::Files { dir, file } = &mut self.kind {
            let mut options = OpenOptions::new();
            options.append(true).create(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o664);
            }
            *file = Some(options.open(dir.join(&name))?);
        }

        Ok(name)
    }

    pub(crate) fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match &mut self.kind {
            SinkKind::Files { file: Some(file), .. } => file.write_all(buf),
            SinkKind::Files { file: None, .. } => Err(io::Error::other(
                "no part file open; sub-snapshot rotation has not happened",
            )),
            SinkKind::Stream(inner) => inner.write_all(buf),
        }
    }

    pub(crate) fn flush(&mut self) -> io::Result<()> {
        match &mut self.kind {
            SinkKind::Files { file: Some(file), .. } => file.flush(),
            SinkKind::Files { file: None, .. } => Ok(()),
            SinkKind::Stream(inner) => inner.flush(),
        }
    }
}
