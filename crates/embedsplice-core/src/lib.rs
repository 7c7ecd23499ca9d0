//! # embedsplice-core
//!
//! A library for embedding local files as byte literals in generated Rust
//! sources, by splicing new entries into an existing generated file instead
//! of rewriting it.
//!
//! This crate provides the core functionality for:
//! - Locating the last occurrence of a byte pattern, scanning backward
//!   from the end of a seekable source with a bounded buffer
//! - Inserting bytes immediately before or after that occurrence, in place
//! - Rendering, discovering and applying embed requests
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`locate`]: Backward pattern search over seekable sources
//! - [`file`]: File handle with the `write_before`/`write_after` splices
//! - [`render`]: Layout of generated files and entries
//! - [`directive`]: `//embedsplice:embed` comments in Rust sources
//! - [`generate`]: Creating and updating generated files
//! - [`registry`]: The read-only table generated code declares
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use embedsplice_core::SpliceFile;
//!
//! let mut file = SpliceFile::open("src/main_embedded.rs")?;
//! file.write_after(
//!     b"// @InsertAfterBreakpoint ASSETS\n",
//!     b"    (\"logo.png\", &[0x89, 0x50]),\n",
//! )?;
//! file.close()?;
//! # Ok::<(), embedsplice_core::Error>(())
//! ```
//!
//! Generated sources are then pulled in with `include!`:
//!
//! ```ignore
//! include!("main_embedded.rs");
//!
//! fn main() {
//!     let logo = ASSETS.get("logo.png");
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod directive;
pub mod error;
pub mod file;
pub mod generate;
pub mod locate;
pub mod registry;
pub mod render;

// Re-export primary types for convenience
pub use directive::{parse_directives, scan_source, Directive, DIRECTIVE_PREFIX};
pub use error::{Error, Result};
pub use file::SpliceFile;
pub use generate::{GenerateReport, Generator, GeneratorConfig};
pub use locate::{last_index, ReadAtSeek};
pub use registry::EmbeddedFiles;
pub use render::{Entry, EntryState, DEFAULT_MARKER, DEFAULT_REGISTRY_PATH};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
