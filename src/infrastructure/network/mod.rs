//! Connectivity adapters.

pub mod monitor;

pub use monitor::ConnectivityMonitor;
