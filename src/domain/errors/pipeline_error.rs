//! Errors raised by the pluggable pipeline stages.

use thiserror::Error;

/// Decoder failures.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum DecodeError {
    #[error("unsupported image format")]
    UnsupportedFormat,

    #[error("failed to decode image: {0}")]
    Malformed(String),

    #[error("image is empty")]
    Empty,
}

/// Downloader failures.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum DownloadError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("download paused by policy")]
    Paused,
}

impl DownloadError {
    /// Returns whether another attempt could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) | Self::Body(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Paused => false,
        }
    }
}
