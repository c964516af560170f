//! Hub construction and dispatch errors.

use thiserror::Error;

use super::CacheError;

/// Errors raised while building the hub.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum HubError {
    #[error("no usable disk cache directory: {0}")]
    DiskCacheUnavailable(#[source] CacheError),

    #[error("failed to start request executor: {0}")]
    Executor(String),

    #[error("failed to build downloader: {0}")]
    Downloader(String),
}

/// Errors raised by the designated-thread run loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum DispatchError {
    #[error("run loop driven from a thread other than its owner")]
    WrongThread,

    #[error("run loop is closed")]
    Closed,
}
