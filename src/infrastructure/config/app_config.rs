//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::args::CliArgs;
use crate::application::LoaderConfig;
use crate::infrastructure::cache::{DEFAULT_CACHE_SIZE, default_cache_dir};

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Where cached payloads are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Files under the cache directory; survives restarts.
    #[default]
    Disk,
    /// Process-local LRU.
    Memory,
}

impl std::fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disk => write!(f, "disk"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Application configuration, loaded from `config.toml` and overridden by CLI flags.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log file path. Logs go to stderr when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Network configuration.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Loader configuration.
    #[serde(default)]
    pub loader: LoaderConfig,
}

/// Cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Storage backend.
    #[serde(default)]
    pub backend: CacheBackend,

    /// Cache directory override for the disk backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Maximum entries held by the memory backend.
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            dir: None,
            memory_capacity: DEFAULT_CACHE_SIZE,
        }
    }
}

impl CacheConfig {
    /// Returns the configured directory or the platform default.
    #[must_use]
    pub fn effective_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_cache_dir)
    }
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum concurrent downloads.
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,

    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
            user_agent: default_user_agent(),
        }
    }
}

const fn default_memory_capacity() -> usize {
    DEFAULT_CACHE_SIZE
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_concurrent_downloads() -> usize {
    8
}

fn default_user_agent() -> String {
    format!("{}/{}", crate::NAME, crate::VERSION)
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(backend) = args.cache_backend {
            self.cache.backend = backend;
        }
        if let Some(dir) = &args.cache_dir {
            self.cache.dir = Some(dir.clone());
        }
        if let Some(timeout_secs) = args.timeout_secs {
            self.network.timeout_secs = timeout_secs;
        }
        if let Some(max) = args.max_concurrent_downloads {
            self.network.max_concurrent_downloads = max;
        }
        if let Some(coalesce) = args.coalesce_requests {
            self.loader.coalesce_requests = coalesce;
        }
    }
}
