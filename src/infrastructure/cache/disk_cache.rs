//! Disk-based image cache for persistence across sessions.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, trace, warn};

use crate::domain::entities::ImageId;
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::{DiskCache, Identify};

/// Maximum disk cache size in bytes (100 MB default).
pub const DEFAULT_MAX_CACHE_SIZE: u64 = 100 * 1024 * 1024;

/// Schema version of the cache layout. Not tied to the application
/// version, so upgrading the application keeps existing entries.
pub const CACHE_VERSION: u32 = 1;

/// Name of the directory created under the cache root.
pub const CACHE_DIR_NAME: &str = "sketch";

const JOURNAL_FILE: &str = "journal";
const JOURNAL_MAGIC: &str = "sketch.disk-cache";
const ENTRY_EXT: &str = "img";
const TEMP_EXT: &str = "tmp";

/// Header stored in the journal file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Journal {
    /// Schema version the cache was written with.
    pub version: u32,
    /// Byte budget the cache was opened with.
    pub max_size: u64,
    /// Entries counted when the journal was last written.
    pub entries: usize,
}

impl Journal {
    fn render(&self) -> String {
        format!(
            "{JOURNAL_MAGIC}\n{}\n{}\n{}\n",
            self.version, self.max_size, self.entries
        )
    }

    fn parse(content: &str) -> CacheResult<Self> {
        let mut lines = content.lines();
        if lines.next() != Some(JOURNAL_MAGIC) {
            return Err(CacheError::CorruptJournal {
                reason: "bad magic".to_string(),
            });
        }
        let mut field = |name: &str| {
            lines.next().ok_or_else(|| CacheError::CorruptJournal {
                reason: format!("missing {name}"),
            })
        };
        let version = field("version")?;
        let max_size = field("max size")?;
        let entries = field("entry count")?;

        let corrupt = |name: &str| CacheError::CorruptJournal {
            reason: format!("invalid {name}"),
        };
        Ok(Self {
            version: version.parse().map_err(|_| corrupt("version"))?,
            max_size: max_size.parse().map_err(|_| corrupt("max size"))?,
            entries: entries.parse().map_err(|_| corrupt("entry count"))?,
        })
    }
}

/// Reads the journal in `dir`, if there is one.
///
/// # Errors
/// Returns error if the journal exists but cannot be read or parsed.
pub fn read_journal(dir: &Path) -> CacheResult<Option<Journal>> {
    let path = dir.join(JOURNAL_FILE);
    match std::fs::read_to_string(&path) {
        Ok(content) => Journal::parse(&content).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CacheError::io("Failed to read journal", &e)),
    }
}

fn has_ext(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e == ext)
}

/// Removes files a previous run left behind in `dir`.
///
/// Interrupted writes are always dropped. Entries are dropped as well when
/// the journal is missing, unreadable, or written by another schema
/// version, since nothing vouches for them any more.
///
/// Returns the number of files removed.
///
/// # Errors
/// Returns error if the directory exists but cannot be listed.
pub fn purge_stale_files(dir: &Path, version: u32) -> CacheResult<usize> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(CacheError::io("Failed to read cache dir", &e)),
    };

    let orphaned = match read_journal(dir) {
        Ok(Some(journal)) => journal.version != version,
        Ok(None) => true,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Discarding unreadable cache journal");
            true
        }
    };

    let mut removed = 0usize;
    for entry in entries.flatten() {
        let path = entry.path();
        let stale = has_ext(&path, TEMP_EXT)
            || (orphaned
                && (has_ext(&path, ENTRY_EXT)
                    || path.file_name().is_some_and(|n| n == JOURNAL_FILE)));
        if !stale {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove stale cache file"),
        }
    }

    if removed > 0 {
        debug!(dir = %dir.display(), removed, orphaned, "Purged stale cache files");
    }
    Ok(removed)
}

/// Disk-based image cache that persists raw image bytes, evicting the
/// least recently accessed files when over budget.
pub struct LruDiskCache {
    cache_dir: PathBuf,
    version: u32,
    max_size: u64,
    current_size: AtomicU64,
    item_count: AtomicUsize,
    closed: AtomicBool,
}

impl fmt::Debug for LruDiskCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruDiskCache")
            .field("cache_dir", &self.cache_dir)
            .field("version", &self.version)
            .field("max_size", &self.max_size)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl LruDiskCache {
    /// Returns the path for a cached image.
    fn cache_path(&self, id: &ImageId) -> PathBuf {
        self.cache_dir.join(format!("{}.{ENTRY_EXT}", id.as_str()))
    }

    fn write_journal(&self) -> CacheResult<()> {
        let journal = Journal {
            version: self.version,
            max_size: self.max_size,
            entries: self.item_count.load(Ordering::Relaxed),
        };
        let path = self.cache_dir.join(JOURNAL_FILE);
        std::fs::write(&path, journal.render())
            .map_err(|e| CacheError::io("Failed to write journal", &e))
    }

    fn ensure_open(&self) -> CacheResult<()> {
        if self.is_closed() {
            return Err(CacheError::Closed {
                dir: self.cache_dir.display().to_string(),
            });
        }
        Ok(())
    }

    /// Returns the current cache size in bytes.
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size.load(Ordering::Relaxed)
    }

    /// Checks if an image is cached.
    pub async fn contains(&self, id: &ImageId) -> bool {
        let path = self.cache_path(id);
        fs::try_exists(&path).await.unwrap_or(false)
    }

    /// Cleans up old cache entries if over size limit.
    async fn cleanup_if_needed(&self) {
        let current_size = self.current_size();
        if current_size <= self.max_size {
            return;
        }

        debug!(
            current_size = current_size,
            max_size = self.max_size,
            "Disk cache over limit, cleaning up"
        );

        let Ok(mut entries) = fs::read_dir(&self.cache_dir).await else {
            return;
        };

        let mut files: Vec<(PathBuf, std::time::SystemTime, u64)> = Vec::new();

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if !has_ext(&path, ENTRY_EXT) {
                continue;
            }

            if let Ok(meta) = entry.metadata().await {
                let touched = meta
                    .accessed()
                    .or_else(|_| meta.modified())
                    .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
                files.push((path, touched, meta.len()));
            }
        }

        files.sort_by_key(|(_, time, _)| *time);

        let mut freed_size = 0u64;
        let mut freed_count = 0usize;
        let target = current_size - self.max_size + (self.max_size / 10);

        for (path, _, size) in files {
            if freed_size >= target {
                break;
            }

            if let Err(e) = fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove old cache file");
            } else {
                trace!(path = %path.display(), "Removed old cache file");
                freed_size += size;
                freed_count += 1;
            }
        }
        self.current_size.fetch_sub(freed_size, Ordering::Relaxed);
        self.item_count.fetch_sub(freed_count, Ordering::Relaxed);

        debug!(
            freed_size = freed_size,
            freed_count = freed_count,
            "Disk cache cleanup complete"
        );
    }
}

impl Identify for LruDiskCache {
    fn append_identifier(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(
            out,
            "LruDiskCache(dir={}, version={}, maxSize={}MB)",
            self.cache_dir.display(),
            self.version,
            self.max_size / (1024 * 1024)
        )
    }
}

#[async_trait]
impl DiskCache for LruDiskCache {
    fn open(dir: PathBuf, version: u32, max_size: u64) -> CacheResult<Self> {
        std::fs::create_dir_all(&dir)
            .map_err(|e| CacheError::io("Failed to create cache dir", &e))?;

        let mut total_size = 0u64;
        let mut count = 0usize;
        let entries =
            std::fs::read_dir(&dir).map_err(|e| CacheError::io("Failed to read cache dir", &e))?;
        for entry in entries.flatten() {
            if has_ext(&entry.path(), ENTRY_EXT)
                && let Ok(meta) = entry.metadata()
            {
                total_size += meta.len();
                count += 1;
            }
        }

        let cache = Self {
            cache_dir: dir,
            version,
            max_size,
            current_size: AtomicU64::new(total_size),
            item_count: AtomicUsize::new(count),
            closed: AtomicBool::new(false),
        };
        cache.write_journal()?;

        debug!(
            dir = %cache.cache_dir.display(),
            entries = count,
            size = total_size,
            "Opened disk cache"
        );
        Ok(cache)
    }

    fn dir(&self) -> &Path {
        &self.cache_dir
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn max_size(&self) -> u64 {
        self.max_size
    }

    async fn get_bytes(&self, id: &ImageId) -> Option<Vec<u8>> {
        if self.is_closed() {
            return None;
        }
        let path = self.cache_path(id);
        if let Ok(bytes) = fs::read(&path).await {
            trace!(id = %id, path = %path.display(), "Disk cache hit");
            Some(bytes)
        } else {
            trace!(id = %id, "Disk cache miss");
            None
        }
    }

    async fn put_bytes(&self, id: &ImageId, bytes: &[u8]) -> CacheResult<()> {
        self.ensure_open()?;
        let new_size = bytes.len() as u64;
        if new_size > self.max_size {
            return Err(CacheError::EntryTooLarge {
                size: new_size,
                max: self.max_size,
            });
        }

        let path = self.cache_path(id);
        let temp_path = path.with_extension(format!("{ENTRY_EXT}.{TEMP_EXT}"));
        let old_size = fs::metadata(&path).await.map(|m| m.len()).ok();

        fs::write(&temp_path, bytes)
            .await
            .map_err(|e| CacheError::io("Failed to write cache file", &e))?;
        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| CacheError::io("Failed to commit cache file", &e))?;

        if let Some(old) = old_size {
            if new_size > old {
                self.current_size.fetch_add(new_size - old, Ordering::Relaxed);
            } else {
                self.current_size.fetch_sub(old - new_size, Ordering::Relaxed);
            }
        } else {
            self.current_size.fetch_add(new_size, Ordering::Relaxed);
            self.item_count.fetch_add(1, Ordering::Relaxed);
        }

        debug!(id = %id, path = %path.display(), size = bytes.len(), "Stored image in disk cache");

        self.cleanup_if_needed().await;

        Ok(())
    }

    async fn evict(&self, id: &ImageId) {
        let path = self.cache_path(id);
        let size = fs::metadata(&path).await.map(|m| m.len()).ok();
        if let Err(e) = fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(id = %id, error = %e, "Failed to evict from disk cache");
            }
        } else if let Some(s) = size {
            self.current_size.fetch_sub(s, Ordering::Relaxed);
            self.item_count.fetch_sub(1, Ordering::Relaxed);
            debug!(id = %id, "Evicted from disk cache");
        }
    }

    async fn clear(&self) -> CacheResult<()> {
        let mut entries = fs::read_dir(&self.cache_dir)
            .await
            .map_err(|e| CacheError::io("Failed to read cache dir", &e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheError::io("Failed to read entry", &e))?
        {
            let path = entry.path();
            if has_ext(&path, ENTRY_EXT) && fs::remove_file(&path).await.is_err() {
                warn!(path = %path.display(), "Failed to remove cache file");
            }
        }
        self.current_size.store(0, Ordering::Relaxed);
        self.item_count.store(0, Ordering::Relaxed);
        debug!("Cleared disk cache");
        Ok(())
    }

    fn len(&self) -> usize {
        self.item_count.load(Ordering::Relaxed)
    }

    fn close(&self) -> CacheResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.write_journal()?;
        debug!(dir = %self.cache_dir.display(), "Closed disk cache");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
