//! `prm` — parallel recursive delete.

use std::path::PathBuf;

use clap::Parser;
use walktree::cli::{ConcurrencyConfig, OutputConfig};

/// Default worker count for the delete consumer (spec.md §4.D).
const DEFAULT_WORKERS: usize = 512;

#[derive(Parser, Debug)]
#[command(about = "Recursively delete files and directories in parallel")]
struct Args {
    /// Paths to delete.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    #[command(flatten)]
    concurrency: ConcurrencyConfig,
    #[command(flatten)]
    output: OutputConfig,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    args.output.init_tracing();

    let workers = args.concurrency.resolve(DEFAULT_WORKERS);

    // A missing path is fatal for the whole invocation: nothing is deleted
    // (original_source/parallel_rm_r.py's `main`, which exits non-zero
    // before touching any of the given paths).
    for path in &args.paths {
        if walktree::classify(path) == walktree::EntryKind::Nonexistent {
            anyhow::bail!("Error: {} does not exist.", path.display());
        }
    }

    let stats = walktree::consumers::delete::run_delete(&args.paths, workers, args.output.quiet)?;
    println!();
    tracing::info!(files = stats.files, dirs = stats.dirs, "delete complete");
    Ok(())
}
