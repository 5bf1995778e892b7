//! Blocking-read helper shared by the record and payload paths.

use std::io::{self, Read};

/// Fills `buf` from `reader`, retrying short reads until the buffer is
/// full or the stream ends. Returns the number of bytes placed in `buf`;
/// anything less than `buf.len()` means end-of-input was reached.
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
