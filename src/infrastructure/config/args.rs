use super::app_config::{CacheBackend, LogLevel};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "lazyfetch",
    version,
    about = "Cache-first media fetching with placeholders and prefetch",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Cache backend.
    #[arg(long, value_enum, global = true)]
    pub cache_backend: Option<CacheBackend>,

    /// Cache directory for the disk backend.
    #[arg(long, value_name = "PATH", global = true, env = "LAZYFETCH_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Request timeout in seconds.
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Maximum concurrent downloads.
    #[arg(long, global = true)]
    pub max_concurrent_downloads: Option<usize>,

    /// Share one fetch between concurrent requests for the same URL.
    #[arg(long, global = true)]
    pub coalesce_requests: Option<bool>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch URLs into the cache ahead of need.
    Prefetch {
        /// URLs to warm.
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,
    },

    /// Load one URL, cache first, and write the result.
    Get {
        /// URL to load.
        url: String,

        /// Where to write the payload.
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Show the cached entry for a URL.
    Inspect {
        /// URL to look up.
        url: String,
    },

    /// Show the effective configuration and where it is read from.
    Config {
        /// Write the effective configuration, CLI overrides included, back to the file.
        #[arg(long)]
        save: bool,
    },

    /// Print a placeholder data URI.
    Placeholder {
        /// Aspect width.
        #[arg(long, default_value_t = crate::application::DEFAULT_PLACEHOLDER_WIDTH)]
        width: u32,

        /// Aspect height.
        #[arg(long, default_value_t = crate::application::DEFAULT_PLACEHOLDER_HEIGHT)]
        height: u32,
    },
}
