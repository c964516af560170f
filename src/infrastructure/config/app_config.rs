//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::domain::entities::PolicySettings;

const APP_NAME: &str = "sketch";
const APP_QUALIFIER: &str = "me";
const APP_ORGANIZATION: &str = "xiaopan";

const MIB: u64 = 1024 * 1024;

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level; also turns on strategy change diagnostics.
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

/// Application configuration, read from `config.toml` and overridden by CLI.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Cache sizing and location.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Initial request policy.
    #[serde(default)]
    pub policy: PolicySettings,

    /// Default executor settings.
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Default downloader settings.
    #[serde(default)]
    pub download: DownloadConfig,
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Preferred disk cache root; the platform cache dir is the fallback.
    #[serde(default)]
    pub disk_dir: Option<PathBuf>,

    /// Disk cache budget in MiB.
    #[serde(default = "default_disk_max_mb")]
    pub disk_max_mb: u64,

    /// Memory the cache tiers are sized against, in MiB.
    #[serde(default = "default_max_heap_mb")]
    pub max_heap_mb: u64,
}

impl CacheConfig {
    /// Disk cache budget in bytes, saturating at `u64::MAX`.
    #[must_use]
    pub const fn disk_max_bytes(&self) -> u64 {
        self.disk_max_mb.saturating_mul(MIB)
    }

    /// Memory budget in bytes, saturating at `u64::MAX`.
    #[must_use]
    pub const fn max_heap_bytes(&self) -> u64 {
        self.max_heap_mb.saturating_mul(MIB)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            disk_dir: None,
            disk_max_mb: default_disk_max_mb(),
            max_heap_mb: default_max_heap_mb(),
        }
    }
}

/// Executor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Worker threads.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

/// Downloader configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra attempts after a retryable failure.
    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
        }
    }
}

const fn default_disk_max_mb() -> u64 {
    100
}

const fn default_max_heap_mb() -> u64 {
    512
}

const fn default_workers() -> usize {
    3
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_retries() -> u32 {
    1
}

use super::args::CliArgs;

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: CliArgs) {
        if let Some(config_path) = args.config {
            self.config = Some(config_path);
        }
        if let Some(log_path) = args.log_path {
            self.log_path = Some(log_path);
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(disk_dir) = args.disk_dir {
            self.cache.disk_dir = Some(disk_dir);
        }
        if let Some(disk_max_mb) = args.disk_max_mb {
            self.cache.disk_max_mb = disk_max_mb;
        }
        if let Some(max_heap_mb) = args.max_heap_mb {
            self.cache.max_heap_mb = max_heap_mb;
        }
        if let Some(workers) = args.workers {
            self.executor.workers = workers;
        }
        if let Some(pause_load) = args.pause_load {
            self.policy.pause_load = pause_load;
        }
        if let Some(pause_download) = args.pause_download {
            self.policy.pause_download = pause_download;
        }
        if let Some(mobile_network_pause) = args.mobile_network_pause {
            self.policy.mobile_network_pause = mobile_network_pause;
        }
        if let Some(cache_in_disk) = args.cache_in_disk {
            self.policy.cache_in_disk = cache_in_disk;
        }
        if let Some(cache_in_memory) = args.cache_in_memory {
            self.policy.cache_in_memory = cache_in_memory;
        }
        if let Some(decode_gif) = args.decode_gif {
            self.policy.decode_gif = decode_gif;
        }
        if let Some(low_quality) = args.low_quality {
            self.policy.low_quality = low_quality;
        }
    }

    /// Replaces values the hub cannot run with by their defaults and
    /// returns the names of the adjusted fields.
    pub fn normalize(&mut self) -> Vec<&'static str> {
        let mut adjusted = Vec::new();
        if self.cache.disk_max_mb == 0 {
            self.cache.disk_max_mb = default_disk_max_mb();
            adjusted.push("cache.disk_max_mb");
        }
        if self.cache.max_heap_mb == 0 {
            self.cache.max_heap_mb = default_max_heap_mb();
            adjusted.push("cache.max_heap_mb");
        }
        if self.executor.workers == 0 {
            self.executor.workers = default_workers();
            adjusted.push("executor.workers");
        }
        if self.download.timeout_secs == 0 {
            self.download.timeout_secs = default_timeout_secs();
            adjusted.push("download.timeout_secs");
        }
        for field in &adjusted {
            warn!(field, "Invalid setting replaced by its default");
        }
        adjusted
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("sketch.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
            log_level = "debug"

            [cache]
            disk_dir = "/mnt/sdcard/cache"
            max_heap_mb = 64

            [policy]
            low_quality = true
            mobile_network_pause = true
        "#;

        let config: AppConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(
            config.cache.disk_dir,
            Some(PathBuf::from("/mnt/sdcard/cache"))
        );
        assert_eq!(config.cache.disk_max_mb, 100);
        assert_eq!(config.cache.max_heap_bytes(), 64 * MIB);
        assert!(config.policy.low_quality);
        assert!(config.policy.mobile_network_pause);
        assert!(config.policy.cache_in_disk); // default_true
        assert!(config.policy.decode_gif); // default_true
        assert_eq!(config.executor.workers, 3);
    }

    #[test]
    fn test_huge_sizes_saturate() {
        let cache = CacheConfig {
            disk_max_mb: u64::MAX,
            max_heap_mb: u64::MAX / 1024,
            ..CacheConfig::default()
        };
        assert_eq!(cache.disk_max_bytes(), u64::MAX);
        assert_eq!(cache.max_heap_bytes(), u64::MAX);

        let text = format!("[cache]\ndisk_max_mb = {}\n", i64::MAX);
        let config: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(config.cache.disk_max_bytes(), u64::MAX);
    }

    #[test]
    fn test_normalize_restores_unusable_values() {
        let mut config = AppConfig::default();
        config.cache.disk_max_mb = 0;
        config.executor.workers = 0;
        config.policy.low_quality = true;

        let adjusted = config.normalize();

        assert_eq!(adjusted, vec!["cache.disk_max_mb", "executor.workers"]);
        assert_eq!(config.cache.disk_max_mb, 100);
        assert_eq!(config.executor.workers, 3);
        assert!(config.policy.low_quality);
        assert!(config.normalize().is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.cache.disk_max_bytes(), 100 * MIB);
        assert_eq!(config.cache.max_heap_mb, 512);
        assert_eq!(config.policy, PolicySettings::default());
        assert_eq!(config.download.timeout_secs, 30);
        assert_eq!(config.download.retries, 1);
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let mut config: AppConfig = toml::from_str(
            r"
            [policy]
            pause_load = true
            [executor]
            workers = 8
            ",
        )
        .unwrap();
        let args = CliArgs::parse_from([
            "sketch",
            "--pause-load",
            "false",
            "--low-quality",
            "true",
            "--max-heap-mb",
            "128",
        ]);

        config.merge_with_args(args);

        assert!(!config.policy.pause_load);
        assert!(config.policy.low_quality);
        assert_eq!(config.cache.max_heap_mb, 128);
        assert_eq!(config.executor.workers, 8);
    }
}
