//! Backward pattern locator.
//!
//! Finds the right-most occurrence of a byte pattern in a seekable source,
//! using a caller-provided scratch buffer both as the search window and as
//! an overflow guard.
//!
//! ## Algorithm
//!
//! The search keeps a backward offset `seek`, starting at 0. Each step
//! places the pattern window at `end - (len(pattern) + seek)` and compares
//! it against the pattern. The scan stops as soon as the window would no
//! longer fit in the buffer, so the buffer capacity bounds how far from the
//! end the search may look:
//!
//! ```text
//!  source:  | . . . . . . . . . . . . . . P P P . . . . |
//!                                       ^pos          ^end
//!                                       |<--- len + seek --->|
//! ```
//!
//! On a match the buffer holds the pattern followed by the rest of the
//! source, up to the buffer's capacity.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{self, Cursor, Seek, SeekFrom};
use tracing::trace;

/// A source that supports absolute seeking and positional reads.
///
/// `read_at` must not depend on the current cursor. Short reads at the end
/// of the stream are allowed.
pub trait ReadAtSeek: Seek {
    /// Reads up to `buf.len()` bytes starting at `offset`
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
}

impl ReadAtSeek for File {
    #[cfg(unix)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(self, buf, offset)
    }
}

impl<T: AsRef<[u8]>> ReadAtSeek for Cursor<T> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let data = self.get_ref().as_ref();
        let start = usize::try_from(offset).map_or(data.len(), |o| o.min(data.len()));
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }
}

/// Fills as much of `buf` as the source has from `offset` on.
///
/// Returns the number of bytes read; anything short of `buf.len()` means
/// end of stream was reached.
fn read_full_at<S: ReadAtSeek + ?Sized>(
    source: &S,
    buf: &mut [u8],
    offset: u64,
) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read_at(&mut buf[filled..], offset + filled as u64) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Returns the start offset of the last occurrence of `pattern` in `source`.
///
/// `buf.len()` is the search capacity: a pattern that only occurs further
/// than `buf.len()` bytes from the end is reported as
/// [`Error::NotFoundPattern`]. Size the buffer to the full source length
/// for a guaranteed find.
///
/// On success `buf` starts with the matched pattern, followed by the rest
/// of the source (truncated to the buffer's capacity). The source cursor is
/// left at the returned position; it is never relied upon, every call
/// measures from the end again.
///
/// # Errors
///
/// - [`Error::EmptyPattern`] before any I/O if `pattern` is empty
/// - [`Error::NotFoundPattern`] if there is no match within bounds, or the
///   source is too short to hold the pattern at all
/// - [`Error::Io`] for seek and read failures
pub fn last_index<S: ReadAtSeek + ?Sized>(
    source: &mut S,
    buf: &mut [u8],
    pattern: &[u8],
) -> Result<u64> {
    if pattern.is_empty() {
        return Err(Error::EmptyPattern);
    }

    let len = pattern.len() as u64;
    let capacity = buf.len() as u64;
    let mut seek: u64 = 0;

    loop {
        let span = len + seek;
        if span > capacity {
            trace!("Scan window of {} bytes exhausted", capacity);
            break;
        }

        let end = source.seek(SeekFrom::End(0))?;
        let Some(start) = end.checked_sub(span) else {
            // The source is shorter than the window: nowhere left to look.
            trace!("Source of {} bytes shorter than window of {}", end, span);
            break;
        };
        let pos = source.seek(SeekFrom::Start(start))?;

        // Only the window is compared on each step; the tail is read once
        // a match is confirmed.
        let read = read_full_at(&*source, &mut buf[..pattern.len()], pos)?;
        if read == pattern.len() && buf[..pattern.len()] == *pattern {
            read_full_at(&*source, &mut buf[pattern.len()..], pos + len)?;
            trace!("Pattern found at offset {}", pos);
            return Ok(pos);
        }

        seek += 1;
    }

    Err(Error::NotFoundPattern)
}
