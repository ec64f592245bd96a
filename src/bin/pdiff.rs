//! `pdiff` — parallel recursive tree diff.

use std::path::PathBuf;

use clap::Parser;
use walktree::cli::{ConcurrencyConfig, OutputConfig};

/// Default worker count for the diff consumer (spec.md §4.D).
const DEFAULT_WORKERS: usize = 512;

#[derive(Parser, Debug)]
#[command(about = "Recursively diff two directory trees in parallel")]
struct Args {
    /// Source tree.
    source: PathBuf,
    /// Destination tree to compare against.
    dest: PathBuf,

    #[command(flatten)]
    concurrency: ConcurrencyConfig,
    #[command(flatten)]
    output: OutputConfig,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    args.output.init_tracing();

    let workers = args.concurrency.resolve(DEFAULT_WORKERS);
    let stats = walktree::consumers::diff::run_diff(&args.source, &args.dest, workers, args.output.quiet)?;
    println!();
    tracing::info!(files = stats.files, dirs = stats.dirs, "diff complete");
    Ok(())
}
