//! `pupload` — parallel recursive SFTP upload. Requires the `remote-sync` feature.

use std::path::PathBuf;

use clap::Parser;
use walktree::cli::{ConcurrencyConfig, OutputConfig};

/// Default worker count for the upload consumer (spec.md §4.D).
const DEFAULT_WORKERS: usize = 64;

#[derive(Parser, Debug)]
#[command(about = "Recursively upload files and directories to a remote host over SFTP")]
struct Args {
    /// Local source files or directories.
    #[arg(required = true)]
    sources: Vec<PathBuf>,

    /// Remote destination, as `[user@]host:path`.
    remote_dest: String,

    /// SSH port.
    #[arg(short = 'P', long, default_value_t = 22)]
    port: u16,

    #[command(flatten)]
    concurrency: ConcurrencyConfig,
    #[command(flatten)]
    output: OutputConfig,
}

fn parse_remote_dest(spec: &str) -> anyhow::Result<(String, String, PathBuf)> {
    let (user_host, path) = spec
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("invalid destination {spec:?}, expected [user@]host:path"))?;
    let (user, host) = match user_host.split_once('@') {
        Some((u, h)) => (u.to_string(), h.to_string()),
        None => (whoami_fallback(), user_host.to_string()),
    };
    Ok((user, host, PathBuf::from(path)))
}

fn whoami_fallback() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "root".to_string())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    args.output.init_tracing();

    let workers = args.concurrency.resolve(DEFAULT_WORKERS);
    let (user, host, remote_path) = parse_remote_dest(&args.remote_dest)?;

    let stats = walktree::consumers::upload::run_upload(
        &args.sources,
        &host,
        args.port,
        &user,
        &remote_path,
        workers,
        args.output.quiet,
    )?;
    println!();
    tracing::info!(files = stats.files, dirs = stats.dirs, bytes = stats.bytes, "upload complete");
    Ok(())
}
