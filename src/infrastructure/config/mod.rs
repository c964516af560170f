//! Application configuration.

pub mod app_config;
/// Command-line arguments.
pub mod args;
/// TOML persistence of [`AppConfig`].
pub mod storage;

pub use app_config::{AppConfig, CacheConfig, DownloadConfig, ExecutorConfig, LogLevel};
pub use args::{CliArgs, NetworkArg};
pub use storage::{ConfigError, StorageManager};
