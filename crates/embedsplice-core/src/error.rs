//! Error types for the embedsplice-core library.
//!
//! The first five variants are the splice engine's own taxonomy. I/O
//! failures coming from the platform are carried verbatim in [`Error::Io`]
//! and are never reclassified. The remaining variants belong to the
//! generator layer built on top of the engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for embedsplice operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all embedsplice operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A zero-length pattern was supplied
    #[error("empty pattern")]
    EmptyPattern,

    /// The pattern was not found within the bounded backward scan
    #[error("not found pattern")]
    NotFoundPattern,

    /// Open was requested on a path with no existing file
    #[error("input file does not exist: '{path}'")]
    NotExistsInputFile {
        /// The missing path
        path: PathBuf,
    },

    /// Operation attempted on a handle without a live descriptor
    #[error("invalid file handle")]
    Invalid,

    /// Platform I/O error, propagated as is
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The generator was called with unusable arguments
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// A directive named a variable but no files
    #[error("nothing to embed")]
    NothingToEmbed,

    /// A file to embed could not be read
    #[error("failed to open embedded file '{path}': {source}")]
    EmbedFileRead {
        /// Path of the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Creating or extending the generated file failed
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Splicing into the generated file failed
    #[error("failed to splice into '{path}': {source}")]
    Splice {
        /// The generated file
        path: PathBuf,
        /// What the splice engine reported
        #[source]
        source: Box<Error>,
    },

    /// A directive comment could not be parsed
    #[error("invalid directive at {}:{line}: {details}", .path.display())]
    InvalidDirective {
        /// Source file containing the directive
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// What is wrong with it
        details: String,
    },
}

impl Error {
    /// Creates a new missing input file error
    pub fn not_exists(path: impl Into<PathBuf>) -> Self {
        Self::NotExistsInputFile { path: path.into() }
    }

    /// Creates a new invalid arguments error
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Creates a new embedded file read error
    pub fn embed_file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::EmbedFileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Wraps a splice engine error with the path it happened on
    pub fn splice(path: impl Into<PathBuf>, source: Error) -> Self {
        Self::Splice {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Creates a new directive parse error
    pub fn invalid_directive(
        path: impl Into<PathBuf>,
        line: usize,
        details: impl Into<String>,
    ) -> Self {
        Self::InvalidDirective {
            path: path.into(),
            line,
            details: details.into(),
        }
    }

    /// Returns true for the errors the locator itself produces, as opposed
    /// to platform I/O or generator failures
    pub fn is_pattern_error(&self) -> bool {
        match self {
            Self::EmptyPattern | Self::NotFoundPattern => true,
            Self::Splice { source, .. } => source.is_pattern_error(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_exists("/tmp/missing.bin");
        assert!(err.to_string().contains("does not exist"));
        assert!(err.to_string().contains("/tmp/missing.bin"));

        let err = Error::invalid_directive("src/main.rs", 3, "missing variable name");
        assert_eq!(
            err.to_string(),
            "invalid directive at src/main.rs:3: missing variable name"
        );
    }

    #[test]
    fn test_io_is_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err = Error::from(io);
        assert_eq!(err.to_string(), "permission denied");
        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::PermissionDenied));
    }

    #[test]
    fn test_is_pattern_error() {
        assert!(Error::EmptyPattern.is_pattern_error());
        assert!(Error::NotFoundPattern.is_pattern_error());
        assert!(Error::splice("gen.rs", Error::NotFoundPattern).is_pattern_error());
        assert!(!Error::Invalid.is_pattern_error());
        assert!(!Error::NothingToEmbed.is_pattern_error());
    }
}
