use super::app_config::LogLevel;
use crate::domain::NetworkState;
use clap::Parser;
use std::path::PathBuf;

/// Connectivity to assume at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum NetworkArg {
    /// No network.
    Offline,
    /// Mobile data only.
    Metered,
    /// Wi-Fi or wired.
    Unmetered,
}

impl From<NetworkArg> for NetworkState {
    fn from(arg: NetworkArg) -> Self {
        match arg {
            NetworkArg::Offline => Self::Disconnected,
            NetworkArg::Metered => Self::Metered,
            NetworkArg::Unmetered => Self::Unmetered,
        }
    }
}

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "sketch",
    version,
    about = "Builds the image pipeline configuration hub and reports its state",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Preferred disk cache root.
    #[arg(long, value_name = "PATH")]
    pub disk_dir: Option<PathBuf>,

    /// Disk cache budget in MiB.
    #[arg(long)]
    pub disk_max_mb: Option<u64>,

    /// Memory the cache tiers are sized against, in MiB.
    #[arg(long)]
    pub max_heap_mb: Option<u64>,

    /// Executor worker threads.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Serve requests from the memory cache only.
    #[arg(long)]
    pub pause_load: Option<bool>,

    /// Never go to the network.
    #[arg(long)]
    pub pause_download: Option<bool>,

    /// Pause downloads while only mobile data is available.
    #[arg(long)]
    pub mobile_network_pause: Option<bool>,

    /// Persist downloads to the disk cache.
    #[arg(long)]
    pub cache_in_disk: Option<bool>,

    /// Keep decoded images in memory.
    #[arg(long)]
    pub cache_in_memory: Option<bool>,

    /// Decode every GIF frame.
    #[arg(long)]
    pub decode_gif: Option<bool>,

    /// Trade quality for memory when decoding.
    #[arg(long)]
    pub low_quality: Option<bool>,

    /// Connectivity to assume at startup.
    #[arg(long, value_enum, default_value_t = NetworkArg::Unmetered)]
    pub network: NetworkArg,

    /// Images to load through the pipeline.
    #[arg(value_name = "URI")]
    pub uris: Vec<String>,
}
