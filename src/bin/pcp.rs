//! `pcp` — parallel recursive copy.

use std::path::PathBuf;

use clap::Parser;
use walktree::cli::{ConcurrencyConfig, MetadataConfig, OutputConfig};

/// Default worker count for the copy consumer (spec.md §4.D).
const DEFAULT_WORKERS: usize = 256;

#[derive(Parser, Debug)]
#[command(about = "Recursively copy files and directories in parallel")]
struct Args {
    /// Source files or directories.
    #[arg(required = true)]
    sources: Vec<PathBuf>,
    /// Destination path.
    dest: PathBuf,

    #[command(flatten)]
    metadata: MetadataConfig,
    #[command(flatten)]
    concurrency: ConcurrencyConfig,
    #[command(flatten)]
    output: OutputConfig,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    args.output.init_tracing();

    let workers = args.concurrency.resolve(DEFAULT_WORKERS);
    let metadata = (&args.metadata).into();

    // A missing source is skippable-with-warning, not fatal: the remaining
    // sources still get copied (original_source/parallel_cp_r.py's `main`).
    let mut existing = Vec::with_capacity(args.sources.len());
    for source in &args.sources {
        if walktree::classify(source) == walktree::EntryKind::Nonexistent {
            eprintln!("Warning: Skipped {}: does not exist.", source.display());
            continue;
        }
        existing.push(source.clone());
    }
    if existing.is_empty() {
        println!();
        return Ok(());
    }

    let stats =
        walktree::consumers::copy::run_copy(&existing, &args.dest, metadata, workers, args.output.quiet)?;
    println!();
    tracing::info!(files = stats.files, dirs = stats.dirs, bytes = stats.bytes, "copy complete");
    Ok(())
}
