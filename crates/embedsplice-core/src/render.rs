//! Rendering of generated Rust sources.
//!
//! A generated file holds one block per variable. Each block is a static
//! [`EmbeddedFiles`](crate::EmbeddedFiles) table whose first line inside the
//! literal is the block marker; new entries are spliced in right after it:
//!
//! ```text
//! // Code generated by embedsplice. DO NOT EDIT.
//!
//! pub static EMBED_FILES: ::embedsplice_core::EmbeddedFiles = ::embedsplice_core::EmbeddedFiles::new(&[
//!     // @InsertAfterBreakpoint EMBED_FILES
//!     ("file1", &[0x63, 0x6f, 0x6e]), // blake3:1a2b3c4d
//! ]);
//! ```

use crate::error::{Error, Result};
use std::fmt::Write as FmtWrite;

/// First line of every generated file
pub const HEADER: &str = "// Code generated by embedsplice. DO NOT EDIT.\n";

/// Marker comment new entries are inserted after
pub const DEFAULT_MARKER: &str = "// @InsertAfterBreakpoint";

/// Path of the table type referenced by generated code
pub const DEFAULT_REGISTRY_PATH: &str = "::embedsplice_core::EmbeddedFiles";

/// Tag preceding the content hash at the end of an entry line
const HASH_TAG: &str = "// blake3:";

/// Closes a block
const BLOCK_END: &str = "]);";

const INDENT: &str = "    ";

/// Compute a short hash of the content (first 8 chars of blake3)
pub fn content_hash(data: &[u8]) -> String {
    let hash = blake3::hash(data);
    hash.to_hex()[..8].to_string()
}

/// Returns the exact byte pattern marking the block of `var`.
///
/// The trailing newline keeps `FILES` from matching inside the marker of
/// `FILES_EXTRA`.
pub fn marker_for(marker: &str, var: &str) -> String {
    format!("{} {}\n", marker, var)
}

/// Locates the last marker line of `var`, accepting LF or CRLF endings.
///
/// Returns the byte offset of the marker and the exact pattern found,
/// line ending included.
pub fn find_marker(generated: &str, marker: &str, var: &str) -> Option<(usize, String)> {
    let lf = marker_for(marker, var);
    let crlf = format!("{} {}\r\n", marker, var);

    [lf, crlf]
        .into_iter()
        .filter_map(|pattern| generated.rfind(&pattern).map(|pos| (pos, pattern)))
        .max_by_key(|(pos, _)| *pos)
}

/// Checks that `name` can be used as a Rust static
pub fn validate_var_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(Error::invalid_arguments("missing variable name"));
    };

    if !(first.is_ascii_alphabetic() || first == '_')
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        || name == "_"
    {
        return Err(Error::invalid_arguments(format!(
            "'{}' is not a valid identifier",
            name
        )));
    }

    Ok(())
}

/// A single embedded file ready to be rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Lookup name, as written in the directive
    pub name: String,
    /// File contents
    pub data: Vec<u8>,
    /// Short content hash
    pub hash: String,
}

impl Entry {
    /// Creates a new entry, hashing its contents
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        let hash = content_hash(&data);
        Self {
            name: name.into(),
            data,
            hash,
        }
    }

    /// Renders the entry as one indented line ending in `line_ending`
    pub fn render_with(&self, line_ending: &str) -> String {
        let mut line = self.render();
        line.pop();
        line.push_str(line_ending);
        line
    }

    /// Renders the entry as one indented line, newline included
    pub fn render(&self) -> String {
        // "0x00, " is 6 bytes per input byte.
        let mut out = String::with_capacity(self.name.len() + self.data.len() * 6 + 48);

        let _ = write!(out, "{}({:?}, &[", INDENT, self.name);
        for (i, byte) in self.data.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{:#04x}", byte);
        }
        let _ = writeln!(out, "]), {}{}", HASH_TAG, self.hash);

        out
    }
}

/// Renders a complete block for `var`, entries in the given order
pub fn render_block(var: &str, marker: &str, registry_path: &str, entries: &[Entry]) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "pub static {}: {} = {}::new(&[",
        var, registry_path, registry_path
    );
    out.push_str(INDENT);
    out.push_str(&marker_for(marker, var));
    for entry in entries {
        out.push_str(&entry.render());
    }
    out.push_str("]);\n");

    out
}

/// Renders a whole generated file holding a single block
pub fn render_file(var: &str, marker: &str, registry_path: &str, entries: &[Entry]) -> String {
    format!(
        "{}\n{}",
        HEADER,
        render_block(var, marker, registry_path, entries)
    )
}

/// What a generated file already says about an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// No entry with this name in the block
    Missing,
    /// Present with the same content hash
    UpToDate,
    /// Present with a different (or no) content hash
    Stale,
}

/// Returns true if `generated` contains the block of `var`
pub fn has_block(generated: &str, marker: &str, var: &str) -> bool {
    find_marker(generated, marker, var).is_some()
}

/// Looks `entry` up in the block of `var` within `generated`
pub fn find_entry(generated: &str, marker: &str, var: &str, entry: &Entry) -> EntryState {
    let Some((start, block_marker)) = find_marker(generated, marker, var) else {
        return EntryState::Missing;
    };

    let block = generated[start + block_marker.len()..]
        .lines()
        .take_while(|line| line.trim() != BLOCK_END);

    let prefix = format!("({:?}, ", entry.name);
    for line in block {
        if !line.trim_start().starts_with(&prefix) {
            continue;
        }
        return match line.rsplit_once(HASH_TAG) {
            Some((_, hash)) if hash.trim() == entry.hash => EntryState::UpToDate,
            _ => EntryState::Stale,
        };
    }

    EntryState::Missing
}
