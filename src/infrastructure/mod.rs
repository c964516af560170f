//! Infrastructure layer with default strategy implementations and
//! host-facing adapters.

/// Default disk and memory caches.
pub mod cache;
/// Application configuration.
pub mod config;
/// Connectivity adapters.
pub mod network;
/// Default pipeline stages.
pub mod pipeline;

pub use cache::{LruDiskCache, LruMemoryCache};
pub use config::{AppConfig, CliArgs, LogLevel, StorageManager};
pub use network::ConnectivityMonitor;
