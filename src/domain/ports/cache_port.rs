//! Port definitions for the disk and memory caches.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::Identify;
use crate::domain::entities::{DecodedImage, ImageId};
use crate::domain::errors::CacheResult;

/// Persistent, size-bounded cache of raw image bytes.
/// Implementations must be thread-safe.
#[async_trait]
pub trait DiskCache: Identify + Send + Sync {
    /// Opens (creating if needed) a cache rooted at `dir`.
    ///
    /// # Errors
    /// Returns error if the directory or journal cannot be prepared.
    fn open(dir: PathBuf, version: u32, max_size: u64) -> CacheResult<Self>
    where
        Self: Sized;

    /// Root directory of the cache.
    fn dir(&self) -> &Path;

    /// Schema version tag the cache was opened with.
    fn version(&self) -> u32;

    /// Maximum number of bytes kept on disk.
    fn max_size(&self) -> u64;

    /// Reads raw bytes for an entry.
    async fn get_bytes(&self, id: &ImageId) -> Option<Vec<u8>>;

    /// Stores raw bytes for an entry.
    async fn put_bytes(&self, id: &ImageId, bytes: &[u8]) -> CacheResult<()>;

    /// Removes an entry.
    async fn evict(&self, id: &ImageId);

    /// Removes every entry.
    async fn clear(&self) -> CacheResult<()>;

    /// Number of entries currently stored.
    fn len(&self) -> usize;

    /// Returns true if the cache holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flushes the journal and stops accepting reads and writes.
    ///
    /// # Errors
    /// Returns error if the journal cannot be written.
    fn close(&self) -> CacheResult<()>;

    /// Returns true once `close` has run.
    fn is_closed(&self) -> bool;
}

/// In-memory cache of decoded images, bounded by bytes.
pub trait MemoryCache: Identify + Send + Sync {
    /// Creates an empty cache holding at most `max_size` bytes.
    fn sized_to(max_size: u64) -> Self
    where
        Self: Sized;

    /// Looks up an image, promoting it to most recently used.
    fn get(&self, id: &ImageId) -> Option<DecodedImage>;

    /// Stores an image, evicting older entries as needed.
    fn put(&self, id: ImageId, image: DecodedImage);

    /// Removes an image.
    fn remove(&self, id: &ImageId) -> Option<DecodedImage>;

    /// Bytes currently held.
    fn size(&self) -> u64;

    /// Byte budget.
    fn max_size(&self) -> u64;

    /// Number of images currently held.
    fn len(&self) -> usize;

    /// Returns true if the cache is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every image.
    fn clear(&self);
}

/// Resources that must be released before a replacement is installed.
///
/// `retire` runs while the hub holds the slot's write lock. It must not
/// call back into the hub (`describe`, the cache getters or setters); the
/// lock is not reentrant and the call would deadlock.
pub trait Retire {
    /// Releases the resource.
    ///
    /// # Errors
    /// Returns the teardown failure; callers log it and carry on.
    fn retire(&self) -> CacheResult<()>;
}

impl Retire for dyn DiskCache {
    fn retire(&self) -> CacheResult<()> {
        self.close()
    }
}

impl Retire for dyn MemoryCache {
    fn retire(&self) -> CacheResult<()> {
        self.clear();
        Ok(())
    }
}
