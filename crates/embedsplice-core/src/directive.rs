//! Discovery of embed directives in Rust sources.
//!
//! A directive is a line comment asking for files to be embedded next to
//! the source that contains it:
//!
//! ```text
//! //embedsplice:embed ASSETS logo.png data/table.bin
//! ```
//!
//! The first argument names the generated static, the rest are paths
//! relative to the directory of the source file.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Comment prefix introducing a directive
pub const DIRECTIVE_PREFIX: &str = "//embedsplice:embed";

/// One embed request found in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Source file the directive was found in
    pub source: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// Name of the generated static
    pub var: String,
    /// Files to embed, as written
    pub files: Vec<String>,
}

/// Parses all directives in `text`, attributing them to `path`.
///
/// A directive without any argument is an error. One naming only the
/// variable is returned as is and rejected later by the generator.
pub fn parse_directives(path: &Path, text: &str) -> Result<Vec<Directive>> {
    let mut directives = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let Some(rest) = line.trim_start().strip_prefix(DIRECTIVE_PREFIX) else {
            continue;
        };

        // "//embedsplice:embedded" is not ours.
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            continue;
        }

        let mut args = rest.split_whitespace();
        let Some(var) = args.next() else {
            return Err(Error::invalid_directive(
                path,
                index + 1,
                "missing variable name",
            ));
        };

        let directive = Directive {
            source: path.to_path_buf(),
            line: index + 1,
            var: var.to_string(),
            files: args.map(str::to_string).collect(),
        };
        trace!(
            "Found directive {} at {}:{}",
            directive.var,
            path.display(),
            directive.line
        );
        directives.push(directive);
    }

    Ok(directives)
}

/// Reads `path` and returns the directives it contains
pub fn scan_source(path: impl AsRef<Path>) -> Result<Vec<Directive>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    parse_directives(path, &text)
}
