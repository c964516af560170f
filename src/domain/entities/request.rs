//! Request values built from the hub's policy at request-build time.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::image::{ImageId, ImageSize};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a load/display request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl RequestId {
    /// Allocates the next identifier.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Snapshot of the policy flags a request is built with.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Only serve from the memory cache.
    pub pause_load: bool,
    /// Never go to the network.
    pub pause_download: bool,
    /// Persist downloaded bytes to the disk cache.
    pub cache_in_disk: bool,
    /// Keep decoded images in the memory cache.
    pub cache_in_memory: bool,
    /// Decode every GIF frame instead of the first one.
    pub decode_gif: bool,
    /// Trade quality for memory when decoding.
    pub low_quality: bool,
    /// Target size for the cut processor, if any.
    pub resize: Option<ImageSize>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            pause_load: false,
            pause_download: false,
            cache_in_disk: true,
            cache_in_memory: true,
            decode_gif: true,
            low_quality: false,
            resize: None,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Policy switches as stored in settings files.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySettings {
    /// Only serve from the memory cache.
    #[serde(default)]
    pub pause_load: bool,
    /// Never go to the network.
    #[serde(default)]
    pub pause_download: bool,
    /// Pause downloads while only a metered network is available.
    #[serde(default)]
    pub mobile_network_pause: bool,
    /// Persist downloaded bytes to the disk cache.
    #[serde(default = "default_true")]
    pub cache_in_disk: bool,
    /// Keep decoded images in the memory cache.
    #[serde(default = "default_true")]
    pub cache_in_memory: bool,
    /// Decode every GIF frame.
    #[serde(default = "default_true")]
    pub decode_gif: bool,
    /// Trade quality for memory when decoding.
    #[serde(default)]
    pub low_quality: bool,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            pause_load: false,
            pause_download: false,
            mobile_network_pause: false,
            cache_in_disk: true,
            cache_in_memory: true,
            decode_gif: true,
            low_quality: false,
        }
    }
}

/// A request ready to be handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    /// Request identity, used to tag completion messages.
    pub id: RequestId,
    /// Source URI.
    pub uri: String,
    /// Cache key derived from the URI.
    pub image_id: ImageId,
    /// Policy captured when the request was built.
    pub options: RequestOptions,
}

/// Per-call request builder seeded from the hub's policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadHelper {
    options: RequestOptions,
}

impl LoadHelper {
    /// Creates a helper starting from `options`.
    #[must_use]
    pub const fn new(options: RequestOptions) -> Self {
        Self { options }
    }

    /// Requests a cut/resize to `size`.
    #[must_use]
    pub const fn resize(mut self, size: ImageSize) -> Self {
        self.options.resize = Some(size);
        self
    }

    /// Skips the disk cache for this request.
    #[must_use]
    pub const fn disable_disk_cache(mut self) -> Self {
        self.options.cache_in_disk = false;
        self
    }

    /// Skips the memory cache for this request.
    #[must_use]
    pub const fn disable_memory_cache(mut self) -> Self {
        self.options.cache_in_memory = false;
        self
    }

    /// Decodes at reduced quality for this request.
    #[must_use]
    pub const fn low_quality(mut self) -> Self {
        self.options.low_quality = true;
        self
    }

    /// Returns the options the request will be built with.
    #[must_use]
    pub const fn options(&self) -> &RequestOptions {
        &self.options
    }
}
