//! Shared CLI argument groups, flattened into each consumer binary's parser.
//!
//! Grouped by functional concern the way `jmalicki-arsync/src/cli.rs` groups
//! `PathConfig`/`IoConfig`/`ConcurrencyConfig`/`MetadataConfig`/`OutputConfig`:
//! each group is its own `#[derive(clap::Args)]` struct under a named help
//! heading, flattened into the binary's top-level `clap::Parser`.

use clap::Args;

/// Worker-pool sizing, shared by every consumer binary.
#[derive(Args, Debug, Clone)]
#[command(next_help_heading = "Concurrency")]
pub struct ConcurrencyConfig {
    /// Number of worker threads. Defaults to the consumer's suggested size
    /// when unset.
    #[arg(long)]
    pub max_workers: Option<usize>,
}

impl ConcurrencyConfig {
    /// Resolve to an explicit worker count, falling back to `default` when unset.
    pub fn resolve(&self, default: usize) -> usize {
        self.max_workers.unwrap_or(default)
    }
}

/// rsync-style metadata preservation flags, used by the copy consumer.
#[derive(Args, Debug, Clone, Default)]
#[command(next_help_heading = "Metadata preservation")]
pub struct MetadataConfig {
    /// Archive mode: equivalent to -lptH.
    #[arg(short = 'a', long)]
    pub archive: bool,
    /// Copy symlinks as symlinks.
    #[arg(short = 'l', long)]
    pub links: bool,
    /// Preserve permission bits.
    #[arg(short = 'p', long)]
    pub perms: bool,
    /// Preserve modification times.
    #[arg(short = 't', long)]
    pub times: bool,
    /// Preserve hardlinks between sources as hardlinks in the destination.
    #[arg(short = 'H', long)]
    pub hard_links: bool,
}

impl From<&MetadataConfig> for crate::consumers::copy::MetadataConfig {
    fn from(cfg: &MetadataConfig) -> Self {
        Self {
            archive: cfg.archive,
            links: cfg.links,
            perms: cfg.perms,
            times: cfg.times,
            hard_links: cfg.hard_links,
        }
    }
}

/// Logging / output verbosity, shared by every consumer binary.
#[derive(Args, Debug, Clone)]
#[command(next_help_heading = "Output")]
pub struct OutputConfig {
    /// Suppress the in-place progress line.
    #[arg(long)]
    pub quiet: bool,
    /// Tracing filter directive (e.g. "info", "debug", "walktree=trace").
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl OutputConfig {
    /// Initialize the global `tracing` subscriber from this config. Call
    /// once, at the top of `main()`.
    pub fn init_tracing(&self) {
        let filter = tracing_subscriber::EnvFilter::try_new(&self.log_level)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
