//! Cache error types.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Errors raised by disk and memory caches.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum CacheError {
    #[error("io error: {0}")]
    Io(String),

    #[error("cache is closed: {dir}")]
    Closed { dir: String },

    #[error("journal is corrupt: {reason}")]
    CorruptJournal { reason: String },

    #[error("entry exceeds cache budget: {size} > {max} bytes")]
    EntryTooLarge { size: u64, max: u64 },
}

impl CacheError {
    /// Creates an I/O error with context.
    #[must_use]
    pub fn io(context: &str, err: &std::io::Error) -> Self {
        Self::Io(format!("{context}: {err}"))
    }
}
