//! File handle wrapper exposing the two splice primitives.
//!
//! A [`SpliceFile`] is either valid (it owns a live read-write descriptor)
//! or invalid (it owns nothing). Every operation checks validity first and
//! an invalid handle fails with [`Error::Invalid`] without touching the
//! filesystem. There is no way back from invalid to valid; open a new
//! handle instead.
//!
//! Splices are done in place: the file is measured, the locator reads the
//! tail following the last occurrence of the pattern, and a single
//! positional write lays down the new bytes followed by that tail. Nothing
//! is written to a temporary file first, so a failing write can leave the
//! target partially rewritten.
//!
//! On unix, a handle whose path has been unlinked by someone else keeps
//! writing to the orphaned inode and does not recreate the path. This is
//! platform behaviour and is left as is.

use crate::error::{Error, Result};
use crate::locate::last_index;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use tracing::debug;

/// Where new bytes go relative to the located pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Before,
    After,
}

/// An open, existing file that supports splicing bytes around a marker.
#[derive(Debug)]
pub struct SpliceFile {
    file: Option<File>,
}

impl SpliceFile {
    /// Opens an existing file for reading and writing.
    ///
    /// The file is neither created nor truncated. A missing path is
    /// reported as [`Error::NotExistsInputFile`]; every other failure
    /// (permission denied, ...) comes back as [`Error::Io`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Err(e) = fs::metadata(path) {
            return Err(match e.kind() {
                io::ErrorKind::NotFound => Error::not_exists(path),
                _ => Error::Io(e),
            });
        }

        let file = OpenOptions::new().read(true).write(true).open(path)?;
        debug!("Opened {} for splicing", path.display());

        Ok(Self { file: Some(file) })
    }

    /// Creates a handle that wraps no descriptor
    pub fn invalid() -> Self {
        Self { file: None }
    }

    /// Returns true if the handle wraps a live descriptor
    pub fn is_valid(&self) -> bool {
        self.file.is_some()
    }

    /// Returns the current on-disk length of the file
    pub fn size(&self) -> Result<u64> {
        let file = self.file.as_ref().ok_or(Error::Invalid)?;
        Ok(file.metadata()?.len())
    }

    /// Writes `data` immediately before the last occurrence of `pattern`.
    ///
    /// Content before the occurrence is untouched and the file grows by
    /// `data.len()` bytes.
    pub fn write_before(&mut self, pattern: &[u8], data: &[u8]) -> Result<()> {
        self.splice(pattern, data, Anchor::Before)
    }

    /// Writes `data` immediately after the last occurrence of `pattern`.
    ///
    /// The pattern itself is left in place and everything that followed it
    /// now follows `data`.
    pub fn write_after(&mut self, pattern: &[u8], data: &[u8]) -> Result<()> {
        self.splice(pattern, data, Anchor::After)
    }

    /// Flushes file data to disk and releases the descriptor.
    pub fn close(self) -> Result<()> {
        let file = self.file.ok_or(Error::Invalid)?;
        file.sync_data()?;
        Ok(())
    }

    /// Gives back the wrapped descriptor, if any
    pub fn into_inner(self) -> Option<File> {
        self.file
    }

    fn splice(&mut self, pattern: &[u8], data: &[u8], anchor: Anchor) -> Result<()> {
        if !self.is_valid() {
            return Err(Error::Invalid);
        }
        if pattern.is_empty() {
            return Err(Error::EmptyPattern);
        }

        let size = self.size()?;
        let file = self.file.as_mut().ok_or(Error::Invalid)?;

        let capacity = usize::try_from(size).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "file too large to splice")
        })?;
        let mut buf = vec![0u8; capacity];
        let pos = last_index(file, &mut buf, pattern)?;

        // last_index only succeeds with pos + pattern.len() <= size.
        let tail_len = (size - pos) as usize;
        let (offset, tail) = match anchor {
            Anchor::Before => (pos, &buf[..tail_len]),
            Anchor::After => (pos + pattern.len() as u64, &buf[pattern.len()..tail_len]),
        };

        let mut payload = Vec::with_capacity(data.len() + tail.len());
        payload.extend_from_slice(data);
        payload.extend_from_slice(tail);

        write_all_at(file, &payload, offset)?;
        debug!(
            "Spliced {} bytes {:?} pattern at offset {}",
            data.len(),
            anchor,
            pos
        );

        Ok(())
    }
}

impl From<File> for SpliceFile {
    fn from(file: File) -> Self {
        Self { file: Some(file) }
    }
}

#[cfg(unix)]
fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    std::os::unix::fs::FileExt::write_all_at(file, buf, offset)
}

#[cfg(windows)]
fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;

    while !buf.is_empty() {
        match file.seek_write(buf, offset) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => {
                buf = &buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
