//! fileprint - Concurrent content fingerprinting of a directory tree.
//!
//! Usage:
//!   fileprint [ROOT]                 Index ROOT (defaults to the filesystem root)
//!   fileprint ROOT -o out.csv        Write records to out.csv
//!   fileprint ROOT -a blake3         Hash with BLAKE3 instead of SHA-256
//!   fileprint --help                 Show help

mod display;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use fileprint_scan::{DigestAlgorithm, IndexConfig, IndexError, Indexer};

use crate::display::TerminalProgress;

#[derive(Parser)]
#[command(
    name = "fileprint",
    version,
    about = "Record a content digest for every file in a directory tree",
    long_about = "fileprint walks a directory tree, hashes every file on a pool of \
                  workers and writes one `path, hash, modified time` line per file.\n\n\
                  Files that cannot be read are reported on stderr and skipped."
)]
struct Cli {
    /// Directory to index (defaults to the filesystem root)
    root: Option<PathBuf>,

    /// Output file
    #[arg(short, long, default_value = "files.csv")]
    output: PathBuf,

    /// Hash algorithm
    #[arg(short, long, default_value = "sha256")]
    algorithm: Algorithm,

    /// Number of hashing workers (0 = one per logical core)
    #[arg(short = 'j', long, default_value = "0")]
    workers: usize,

    /// Append to an existing output file instead of replacing it
    #[arg(long)]
    append: bool,

    /// Hide progress bars
    #[arg(short, long)]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum Algorithm {
    #[default]
    Sha256,
    Blake3,
}

impl From<Algorithm> for DigestAlgorithm {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Sha256 => DigestAlgorithm::Sha256,
            Algorithm::Blake3 => DigestAlgorithm::Blake3,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = IndexConfig::builder()
        .root(cli.root.unwrap_or_else(fileprint_core::default_root))
        .output(cli.output)
        .algorithm(DigestAlgorithm::from(cli.algorithm))
        .workers(cli.workers)
        .append(cli.append)
        .build()
        .map_err(IndexError::from)?;

    run_index(config, cli.quiet)
}

/// Run the indexer with terminal progress and print a summary.
fn run_index(config: IndexConfig, quiet: bool) -> Result<()> {
    debug!(?config, "Parsed configuration");

    let display = Arc::new(TerminalProgress::new(quiet).context("Invalid progress template")?);
    let indexer = Indexer::new(config)
        .with_observer(display.clone())
        .with_error_hook(display.clone());

    let result = indexer.run();
    display.clear();
    let config = indexer.config();
    let summary = result.with_context(|| format!("Indexing {} failed", config.root.display()))?;

    if !quiet {
        eprintln!(
            "Indexed {} files into {} in {:.2}s",
            summary.files_hashed,
            config.output.display(),
            summary.duration.as_secs_f64()
        );
        if summary.error_count() > 0 {
            eprintln!("{} error(s) during indexing", summary.error_count());
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("fileprint=debug,fileprint_scan=debug,warn")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
