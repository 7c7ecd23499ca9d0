//! Generation of embedded-file tables next to the sources that ask for them.
//!
//! ## Flow
//!
//! 1. Validate the variable name and read every requested file
//! 2. Derive the generated path from the source (`main.rs` -> `main_embedded.rs`)
//! 3. Create the generated file, or append a block for a new variable
//! 4. Otherwise splice each missing entry in right after the block marker
//!
//! Existing generated files are never rewritten as a whole. An entry whose
//! name is already present is left alone: identical content is reported as
//! unchanged, different content as stale.

use crate::directive::Directive;
use crate::error::{Error, Result};
use crate::file::SpliceFile;
use crate::render::{
    find_entry, find_marker, has_block, render_block, render_file, validate_var_name, Entry,
    EntryState, DEFAULT_MARKER, DEFAULT_REGISTRY_PATH,
};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Configuration for the generator
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Marker comment new entries are inserted after
    pub marker: String,
    /// Appended to the source file stem to name the generated file
    pub output_suffix: String,
    /// Path of the table type used in generated code
    pub registry_path: String,
    /// Compute the report without touching the filesystem
    pub dry_run: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            output_suffix: "_embedded".to_string(),
            registry_path: DEFAULT_REGISTRY_PATH.to_string(),
            dry_run: false,
        }
    }
}

impl GeneratorConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the marker comment
    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Sets the generated file name suffix
    pub fn output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.output_suffix = suffix.into();
        self
    }

    /// Sets the table type path used in generated code
    pub fn registry_path(mut self, path: impl Into<String>) -> Self {
        self.registry_path = path.into();
        self
    }

    /// Sets dry-run mode
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Outcome of one embed request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateReport {
    /// The generated file
    pub output: PathBuf,
    /// True if the generated file did not exist before
    pub created: bool,
    /// Entries added
    pub written: Vec<String>,
    /// Entries already present with the same content
    pub unchanged: Vec<String>,
    /// Entries present with different content, left untouched
    pub stale: Vec<String>,
}

/// Writes embedded-file tables
#[derive(Debug, Clone, Default)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    /// Creates a new generator with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new generator with custom configuration
    pub fn with_config(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Path of the file generated for `source`
    pub fn output_path(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        base_dir(source).join(format!("{}{}.rs", stem, self.config.output_suffix))
    }

    /// Runs a directive found in a source file
    pub fn run(&self, directive: &Directive) -> Result<GenerateReport> {
        self.embed(&directive.source, &directive.var, directive.files.as_slice())
    }

    /// Embeds `files` (relative to the directory of `source`) under `var`.
    pub fn embed<S: AsRef<str>>(
        &self,
        source: &Path,
        var: &str,
        files: &[S],
    ) -> Result<GenerateReport> {
        validate_var_name(var)?;
        if files.is_empty() {
            return Err(Error::NothingToEmbed);
        }

        let entries = self.load_entries(source, files)?;
        let output = self.output_path(source);
        let mut report = GenerateReport {
            output: output.clone(),
            ..Default::default()
        };

        let existing = match fs::read_to_string(&output) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(Error::Io(e)),
        };

        match existing {
            None => {
                report.created = true;
                report.written = entries.iter().map(|e| e.name.clone()).collect();
                let content = render_file(
                    var,
                    &self.config.marker,
                    &self.config.registry_path,
                    &newest_first(&entries),
                );
                if !self.config.dry_run {
                    fs::write(&output, content).map_err(|e| Error::file_write(&output, e))?;
                }
                info!("Created {} with {} entries", output.display(), entries.len());
            }
            Some(text) if !has_block(&text, &self.config.marker, var) => {
                report.written = entries.iter().map(|e| e.name.clone()).collect();
                let block = render_block(
                    var,
                    &self.config.marker,
                    &self.config.registry_path,
                    &newest_first(&entries),
                );
                if !self.config.dry_run {
                    append(&output, &block).map_err(|e| Error::file_write(&output, e))?;
                }
                info!("Added block {} to {}", var, output.display());
            }
            Some(text) => {
                let mut missing = Vec::new();
                for entry in &entries {
                    match find_entry(&text, &self.config.marker, var, entry) {
                        EntryState::Missing => missing.push(entry),
                        EntryState::UpToDate => {
                            debug!("{} is up to date in {}", entry.name, output.display());
                            report.unchanged.push(entry.name.clone());
                        }
                        EntryState::Stale => {
                            warn!(
                                "{} changed since it was embedded in {}; remove the generated file to refresh it",
                                entry.name,
                                output.display()
                            );
                            report.stale.push(entry.name.clone());
                        }
                    }
                }

                if !missing.is_empty() && !self.config.dry_run {
                    self.splice_entries(&output, &text, var, &missing)
                        .map_err(|e| Error::splice(&output, e))?;
                }
                report.written = missing.iter().map(|e| e.name.clone()).collect();
                info!(
                    "Spliced {} entries into {}",
                    report.written.len(),
                    output.display()
                );
            }
        }

        Ok(report)
    }

    fn load_entries<S: AsRef<str>>(&self, source: &Path, files: &[S]) -> Result<Vec<Entry>> {
        let dir = base_dir(source);
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(files.len());

        for name in files {
            let name = name.as_ref();
            if !seen.insert(name) {
                debug!("Skipping repeated file {}", name);
                continue;
            }

            let path = dir.join(name);
            let data = fs::read(&path).map_err(|e| Error::embed_file_read(&path, e))?;
            debug!("Read {} bytes from {}", data.len(), path.display());
            entries.push(Entry::new(name, data));
        }

        Ok(entries)
    }

    /// Splices `entries` after the marker of `var`, keeping the line
    /// ending the marker line already uses
    fn splice_entries(
        &self,
        output: &Path,
        text: &str,
        var: &str,
        entries: &[&Entry],
    ) -> Result<()> {
        let (_, pattern) =
            find_marker(text, &self.config.marker, var).ok_or(Error::NotFoundPattern)?;
        let line_ending = if pattern.ends_with("\r\n") { "\r\n" } else { "\n" };

        let mut file = SpliceFile::open(output)?;
        for entry in entries {
            file.write_after(pattern.as_bytes(), entry.render_with(line_ending).as_bytes())?;
        }
        file.close()
    }
}

/// Directory relative file names are resolved against
fn base_dir(source: &Path) -> &Path {
    source.parent().unwrap_or_else(|| Path::new(""))
}

/// Orders entries as repeated splices after the marker would leave them
fn newest_first(entries: &[Entry]) -> Vec<Entry> {
    entries.iter().rev().cloned().collect()
}

fn append(path: &Path, content: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().append(true).open(path)?;
    file.write_all(b"\n")?;
    file.write_all(content.as_bytes())?;
    file.sync_data()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{content_hash, HEADER};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn setup(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("main.rs");
        fs::write(&source, "fn main() {}\n").unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        (dir, source)
    }

    fn line(name: &str, content: &str) -> String {
        Entry::new(name, content.as_bytes().to_vec()).render()
    }

    #[test]
    fn test_output_path() {
        let generator = Generator::new();
        assert_eq!(
            generator.output_path(Path::new("src/main.rs")),
            PathBuf::from("src/main_embedded.rs")
        );
        assert_eq!(
            generator.output_path(Path::new("lib.rs")),
            PathBuf::from("lib_embedded.rs")
        );

        let generator = Generator::with_config(GeneratorConfig::new().output_suffix("_gen"));
        assert_eq!(
            generator.output_path(Path::new("a/b.rs")),
            PathBuf::from("a/b_gen.rs")
        );
    }

    #[test]
    fn test_creates_generated_file() {
        let (dir, source) = setup(&[("f1", "123123"), ("sub/f2", "456")]);

        let report = Generator::new()
            .embed(&source, "EMBED_FILES", &["f1", "sub/f2"])
            .unwrap();

        assert!(report.created);
        assert_eq!(report.written, vec!["f1", "sub/f2"]);
        assert_eq!(report.output, dir.path().join("main_embedded.rs"));

        let generated = fs::read_to_string(&report.output).unwrap();
        let expected = format!(
            "{HEADER}\n\
             pub static EMBED_FILES: ::embedsplice_core::EmbeddedFiles = ::embedsplice_core::EmbeddedFiles::new(&[\n\
             \x20   // @InsertAfterBreakpoint EMBED_FILES\n\
             {}{}]);\n",
            line("sub/f2", "456"),
            line("f1", "123123"),
        );
        assert_eq!(generated, expected);
    }

    #[test]
    fn test_splices_new_entry_after_marker() {
        let (dir, source) = setup(&[("file1", "content file1\n"), ("file2", "content file2\n")]);
        let generator = Generator::new();

        generator.embed(&source, "FILES", &["file1"]).unwrap();
        let report = generator.embed(&source, "FILES", &["file1", "file2"]).unwrap();

        assert!(!report.created);
        assert_eq!(report.written, vec!["file2"]);
        assert_eq!(report.unchanged, vec!["file1"]);

        let generated = fs::read_to_string(dir.path().join("main_embedded.rs")).unwrap();
        let marker = "    // @InsertAfterBreakpoint FILES\n";
        let expected_body = format!(
            "{}{}{}]);\n",
            marker,
            line("file2", "content file2\n"),
            line("file1", "content file1\n")
        );
        assert!(generated.ends_with(&expected_body), "{generated}");
    }

    #[test]
    fn test_rerun_is_noop() {
        let (dir, source) = setup(&[("f1", "abc")]);
        let generator = Generator::new();

        generator.embed(&source, "FILES", &["f1"]).unwrap();
        let before = fs::read(dir.path().join("main_embedded.rs")).unwrap();

        let report = generator.embed(&source, "FILES", &["f1"]).unwrap();
        assert!(report.written.is_empty());
        assert_eq!(report.unchanged, vec!["f1"]);
        assert_eq!(fs::read(dir.path().join("main_embedded.rs")).unwrap(), before);
    }

    #[test]
    fn test_stale_entry_is_left_alone() {
        let (dir, source) = setup(&[("f1", "abc")]);
        let generator = Generator::new();

        generator.embed(&source, "FILES", &["f1"]).unwrap();
        let before = fs::read_to_string(dir.path().join("main_embedded.rs")).unwrap();

        fs::write(dir.path().join("f1"), "changed").unwrap();
        let report = generator.embed(&source, "FILES", &["f1"]).unwrap();

        assert_eq!(report.stale, vec!["f1"]);
        assert!(report.written.is_empty());
        let after = fs::read_to_string(dir.path().join("main_embedded.rs")).unwrap();
        assert_eq!(after, before);
        assert!(after.contains(&content_hash(b"abc")));
    }

    #[test]
    fn test_second_variable_gets_own_block() {
        let (dir, source) = setup(&[("a", "A"), ("b", "B")]);
        let generator = Generator::new();

        generator.embed(&source, "FILES", &["a"]).unwrap();
        let report = generator.embed(&source, "FILES_EXTRA", &["b"]).unwrap();
        assert_eq!(report.written, vec!["b"]);

        generator.embed(&source, "FILES", &["b"]).unwrap();

        let generated = fs::read_to_string(dir.path().join("main_embedded.rs")).unwrap();
        assert_eq!(generated.matches(HEADER).count(), 1);
        assert_eq!(
            find_entry(&generated, DEFAULT_MARKER, "FILES", &Entry::new("b", b"B".to_vec())),
            EntryState::UpToDate
        );
        assert_eq!(
            find_entry(&generated, DEFAULT_MARKER, "FILES_EXTRA", &Entry::new("a", b"A".to_vec())),
            EntryState::Missing
        );
        assert!(generated.ends_with(&format!(
            "    // @InsertAfterBreakpoint FILES_EXTRA\n{}]);\n",
            line("b", "B")
        )));
    }

    #[test]
    fn test_splices_into_crlf_file() {
        let (dir, source) = setup(&[("f1", "abc"), ("f2", "def")]);
        let generator = Generator::new();
        let output = dir.path().join("main_embedded.rs");

        generator.embed(&source, "FILES", &["f1"]).unwrap();
        let crlf = fs::read_to_string(&output).unwrap().replace('\n', "\r\n");
        fs::write(&output, &crlf).unwrap();

        let report = generator.embed(&source, "FILES", &["f1", "f2"]).unwrap();
        assert_eq!(report.written, vec!["f2"]);
        assert_eq!(report.unchanged, vec!["f1"]);

        let generated = fs::read_to_string(&output).unwrap();
        assert_eq!(generated.matches("pub static FILES").count(), 1);
        assert!(generated.contains(&format!(
            "    // @InsertAfterBreakpoint FILES\r\n{}",
            Entry::new("f2", b"def".to_vec()).render_with("\r\n")
        )));
        assert!(!generated.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn test_argument_errors_write_nothing() {
        let (dir, source) = setup(&[("f1", "abc")]);
        let generator = Generator::new();
        let output = dir.path().join("main_embedded.rs");

        let none: [&str; 0] = [];
        assert!(matches!(
            generator.embed(&source, "FILES", &none),
            Err(Error::NothingToEmbed)
        ));
        assert!(matches!(
            generator.embed(&source, "", &["f1"]),
            Err(Error::InvalidArguments(_))
        ));
        match generator.embed(&source, "FILES", &["f1", "notexistsfile"]) {
            Err(Error::EmbedFileRead { path, .. }) => {
                assert_eq!(path, dir.path().join("notexistsfile"))
            }
            other => panic!("expected EmbedFileRead, got {other:?}"),
        }
        assert!(!output.exists());
    }

    #[test]
    fn test_dry_run() {
        let (dir, source) = setup(&[("f1", "abc")]);
        let generator = Generator::with_config(GeneratorConfig::new().dry_run(true));

        let report = generator.embed(&source, "FILES", &["f1"]).unwrap();
        assert!(report.created);
        assert_eq!(report.written, vec!["f1"]);
        assert!(!dir.path().join("main_embedded.rs").exists());
    }

    #[test]
    fn test_custom_marker_and_registry() {
        let (dir, source) = setup(&[("f1", "x")]);
        let config = GeneratorConfig::new()
            .marker("// >>> embed")
            .registry_path("crate::Table");
        let generator = Generator::with_config(config);

        generator.embed(&source, "T", &["f1"]).unwrap();
        let generated = fs::read_to_string(dir.path().join("main_embedded.rs")).unwrap();
        assert!(generated.contains("pub static T: crate::Table = crate::Table::new(&[\n"));
        assert!(generated.contains("    // >>> embed T\n"));
    }

    #[test]
    fn test_repeated_file_is_embedded_once() {
        let (dir, source) = setup(&[("f1", "x")]);
        let report = Generator::new()
            .embed(&source, "FILES", &["f1", "f1"])
            .unwrap();
        assert_eq!(report.written, vec!["f1"]);

        let generated = fs::read_to_string(dir.path().join("main_embedded.rs")).unwrap();
        assert_eq!(generated.matches("(\"f1\", ").count(), 1);
    }

    #[test]
    fn test_run_directive() {
        let (dir, source) = setup(&[("f1", "x")]);
        let directive = Directive {
            source: source.clone(),
            line: 1,
            var: "FILES".into(),
            files: vec!["f1".into()],
        };

        let report = Generator::new().run(&directive).unwrap();
        assert_eq!(report.output, dir.path().join("main_embedded.rs"));
        assert_eq!(report.written, vec!["f1"]);
    }
}
