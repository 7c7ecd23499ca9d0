//! embedsplice - Embed local files as byte literals in generated Rust sources
//!
//! This tool reads `//embedsplice:embed` directives (or a single request from
//! the command line) and splices the requested files, as byte arrays, into a
//! generated file next to the requesting source.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use embedsplice_core::{
    scan_source, Error as CoreError, GenerateReport, Generator, GeneratorConfig, DEFAULT_MARKER,
    DEFAULT_REGISTRY_PATH,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::{DirEntry, WalkDir};

/// Embed local files as byte literals spliced into generated Rust sources
#[derive(Parser, Debug)]
#[command(name = "embedsplice")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    options: GenerateOptions,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Embed files for a single source file
    Embed {
        /// Source file the generated file belongs to
        #[arg(short, long)]
        source: PathBuf,

        /// Name of the generated static
        var: String,

        /// Files to embed, relative to the source file's directory
        files: Vec<String>,
    },

    /// Find embed directives in Rust sources and run them
    Scan {
        /// Directory to search recursively
        #[arg(default_value = ".")]
        directory: PathBuf,
    },
}

#[derive(Args, Debug)]
struct GenerateOptions {
    /// Marker comment entries are inserted after
    #[arg(long, global = true, env = "EMBEDSPLICE_MARKER", default_value = DEFAULT_MARKER)]
    marker: String,

    /// Suffix appended to the source file stem to name the generated file
    #[arg(long, global = true, env = "EMBEDSPLICE_SUFFIX", default_value = "_embedded")]
    suffix: String,

    /// Path of the table type referenced by generated code
    #[arg(long, global = true, default_value = DEFAULT_REGISTRY_PATH)]
    registry_path: String,

    /// Dry run - don't write files, just show what would be embedded
    #[arg(long, global = true)]
    dry_run: bool,
}

impl GenerateOptions {
    fn generator(&self) -> Generator {
        let config = GeneratorConfig::new()
            .marker(&self.marker)
            .output_suffix(&self.suffix)
            .registry_path(&self.registry_path)
            .dry_run(self.dry_run);
        Generator::with_config(config)
    }
}

#[derive(Debug, Default)]
struct RunStats {
    sources_scanned: usize,
    directives_run: usize,
    written: usize,
    unchanged: usize,
    stale: usize,
}

impl RunStats {
    fn record(&mut self, report: &GenerateReport, dry_run: bool) {
        self.directives_run += 1;
        self.written += report.written.len();
        self.unchanged += report.unchanged.len();
        self.stale += report.stale.len();

        if report.written.is_empty() {
            debug!("Nothing new for {}", report.output.display());
            return;
        }

        let verb = if dry_run { "Would write" } else { "Wrote" };
        println!(
            "{} {} ({})",
            verb,
            report.output.display(),
            report.written.join(", ")
        );
    }

    fn print_summary(&self) {
        info!(
            "Summary: {} sources scanned, {} directives run, {} entries written, {} unchanged, {} stale",
            self.sources_scanned, self.directives_run, self.written, self.unchanged, self.stale
        );
        if self.stale > 0 {
            warn!(
                "{} stale entries kept their old content; delete the generated files to regenerate",
                self.stale
            );
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    let generator = cli.options.generator();
    let stats = match &cli.command {
        Command::Embed { source, var, files } => {
            process_single_source(&generator, source, var, files)?
        }
        Command::Scan { directory } => process_directory(&generator, directory)?,
    };

    stats.print_summary();
    Ok(())
}

/// Run one embed request given on the command line
fn process_single_source(
    generator: &Generator,
    source: &Path,
    var: &str,
    files: &[String],
) -> Result<RunStats> {
    if !source.is_file() {
        bail!("Source file does not exist: {}", source.display());
    }

    let mut stats = RunStats::default();
    let report = generator
        .embed(source, var, files)
        .map_err(explain)
        .with_context(|| format!("Failed to embed {} for {}", var, source.display()))?;
    stats.record(&report, generator.config().dry_run);

    Ok(stats)
}

/// Run every directive found under a directory, stopping at the first failure
fn process_directory(generator: &Generator, directory: &Path) -> Result<RunStats> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let generated_suffix = format!("{}.rs", generator.config().output_suffix);
    let mut stats = RunStats::default();

    let walker = WalkDir::new(directory)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e));

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", directory.display()))?;
        let path = entry.path();

        if !entry.file_type().is_file() || !is_rust_source(path) {
            continue;
        }

        // Our own output never holds directives.
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(&generated_suffix))
            .unwrap_or(false)
        {
            trace!("Skipping generated file: {}", path.display());
            continue;
        }

        stats.sources_scanned += 1;
        let directives = scan_source(path)
            .with_context(|| format!("Failed to read directives from {}", path.display()))?;

        for directive in &directives {
            debug!(
                "Running {} from {}:{}",
                directive.var,
                path.display(),
                directive.line
            );
            let report = generator.run(directive).map_err(explain).with_context(|| {
                format!(
                    "Failed to embed {} ({}:{})",
                    directive.var,
                    path.display(),
                    directive.line
                )
            })?;
            stats.record(&report, generator.config().dry_run);
        }
    }

    info!("Scanned {} sources", stats.sources_scanned);
    Ok(stats)
}

/// Points at the fix when the generated file no longer holds its block marker
fn explain(err: CoreError) -> anyhow::Error {
    if err.is_pattern_error() {
        anyhow::Error::new(err)
            .context("Block marker missing from the generated file; delete it to regenerate")
    } else {
        err.into()
    }
}

/// Hidden entries and cargo build output are not searched
fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }

    entry
        .file_name()
        .to_str()
        .map(|n| n.starts_with('.') || (n == "target" && entry.file_type().is_dir()))
        .unwrap_or(false)
}

fn is_rust_source(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("rs")
}
