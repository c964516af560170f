//! In-memory LRU image cache bounded by decoded byte size.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::{DecodedImage, ImageId};
use crate::domain::ports::{Identify, MemoryCache};

/// Share of the heap the content cache may use.
pub const CONTENT_CACHE_DIVISOR: u64 = 8;

/// Share of the heap the placeholder cache may use.
pub const PLACEHOLDER_CACHE_DIVISOR: u64 = 16;

struct Inner {
    entries: LruCache<ImageId, DecodedImage>,
    size: u64,
}

/// In-memory LRU cache for decoded images.
/// Thread-safe; evicts least recently used images once the byte budget
/// is exceeded.
pub struct LruMemoryCache {
    name: &'static str,
    max_size: u64,
    inner: Mutex<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LruMemoryCache {
    /// Creates a named cache with the specified byte budget.
    #[must_use]
    pub fn named(name: &'static str, max_size: u64) -> Self {
        Self {
            name,
            max_size,
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                size: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let inner = self.inner.lock();
        CacheStats {
            hits,
            misses,
            hit_rate,
            len: inner.entries.len(),
            size: inner.size,
        }
    }

    /// Peeks at an image without promoting it in the LRU.
    pub fn peek(&self, id: &ImageId) -> Option<DecodedImage> {
        self.inner.lock().entries.peek(id).cloned()
    }

    fn trim_to(&self, inner: &mut Inner, budget: u64) {
        while inner.size > budget {
            let Some((id, evicted)) = inner.entries.pop_lru() else {
                break;
            };
            inner.size = inner.size.saturating_sub(evicted.byte_size());
            trace!(cache = self.name, id = %id, "Evicted image from memory cache");
        }
    }
}

impl fmt::Debug for LruMemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruMemoryCache")
            .field("name", &self.name)
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub len: usize,
    /// Bytes currently held.
    pub size: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cache: {} images ({} bytes), {:.1}% hit rate ({} hits, {} misses)",
            self.len, self.size, self.hit_rate, self.hits, self.misses
        )
    }
}

impl Identify for LruMemoryCache {
    fn append_identifier(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(
            out,
            "LruMemoryCache(name={}, maxSize={}KB)",
            self.name,
            self.max_size / 1024
        )
    }
}

impl MemoryCache for LruMemoryCache {
    fn sized_to(max_size: u64) -> Self {
        Self::named("memory", max_size)
    }

    fn get(&self, id: &ImageId) -> Option<DecodedImage> {
        let mut inner = self.inner.lock();
        if let Some(img) = inner.entries.get(id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(cache = self.name, id = %id, "Memory cache hit");
            Some(img.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(cache = self.name, id = %id, "Memory cache miss");
            None
        }
    }

    fn put(&self, id: ImageId, image: DecodedImage) {
        let size = image.byte_size();
        if size > self.max_size {
            debug!(cache = self.name, id = %id, size, "Image larger than memory cache budget, skipping");
            return;
        }

        let mut inner = self.inner.lock();
        if let Some(previous) = inner.entries.put(id, image) {
            inner.size = inner.size.saturating_sub(previous.byte_size());
        }
        inner.size += size;
        self.trim_to(&mut inner, self.max_size);
    }

    fn remove(&self, id: &ImageId) -> Option<DecodedImage> {
        let mut inner = self.inner.lock();
        let removed = inner.entries.pop(id)?;
        inner.size = inner.size.saturating_sub(removed.byte_size());
        Some(removed)
    }

    fn size(&self) -> u64 {
        self.inner.lock().size
    }

    fn max_size(&self) -> u64 {
        self.max_size
    }

    fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.size = 0;
        debug!(cache = self.name, "Cleared memory image cache");
    }
}
