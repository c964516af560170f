//! Default disk and memory cache implementations.

pub mod disk_cache;
pub mod memory_cache;

pub use disk_cache::{
    CACHE_DIR_NAME, CACHE_VERSION, DEFAULT_MAX_CACHE_SIZE, LruDiskCache, purge_stale_files,
};
pub use memory_cache::{
    CONTENT_CACHE_DIVISOR, CacheStats, LruMemoryCache, PLACEHOLDER_CACHE_DIVISOR,
};
