//! The pipeline's configuration hub.
//!
//! [`Configuration`] is built once at startup, on the designated thread,
//! and shared by reference afterwards. It owns one slot per pluggable
//! strategy, the two memory cache tiers and the disk cache, the policy
//! flags every request consults, and the download pause controller.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use directories::ProjectDirs;
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::dispatcher::{MainThreadDispatcher, RunLoopHandle};
use super::pause_controller::PauseController;
use super::slot::{CacheLifecycle, PolicyFlag, Replacement, StrategyHandle};
use crate::domain::entities::{ImageRequest, LoadHelper, PolicySettings, RequestOptions};
use crate::domain::errors::{CacheError, HubError};
use crate::domain::ports::{
    ConnectivityPort, DiskCache, HelperFactory, ImageDecoder, ImageDisplayer, ImageDownloader,
    ImageProcessor, ImageSizeCalculator, MemoryCache, RequestExecutor, RequestFactory,
    ResizeCalculator,
};
use crate::infrastructure::cache::{
    CACHE_DIR_NAME, CACHE_VERSION, CONTENT_CACHE_DIVISOR, DEFAULT_MAX_CACHE_SIZE, LruDiskCache,
    LruMemoryCache, PLACEHOLDER_CACHE_DIVISOR, purge_stale_files,
};
use crate::infrastructure::pipeline::{
    DefaultHelperFactory, DefaultImageDecoder, DefaultImageDisplayer, DefaultImageProcessor,
    DefaultImageSizeCalculator, DefaultRequestExecutor, DefaultRequestFactory,
    DefaultResizeCalculator, HttpImageDownloader,
};
use crate::infrastructure::pipeline::downloader::{DEFAULT_RETRIES, DEFAULT_TIMEOUT_SECS};
use crate::infrastructure::pipeline::executor::DEFAULT_WORKERS;

/// Heap size assumed when the host does not report one.
pub const DEFAULT_MAX_HEAP: u64 = 512 * 1024 * 1024;

/// Receives errors raised while retiring a replaced cache.
pub type TeardownListener = Arc<dyn Fn(&'static str, &CacheError) + Send + Sync>;

/// Environment inputs the hub depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubEnvironment {
    /// Preferred cache root (removable or user-chosen storage).
    pub external_cache_dir: Option<PathBuf>,
    /// Fallback cache root.
    pub internal_cache_dir: PathBuf,
    /// Memory budget the cache tiers are carved from, in bytes.
    pub max_heap: u64,
}

impl HubEnvironment {
    /// Uses the platform cache directory and the default heap size.
    #[must_use]
    pub fn detect() -> Self {
        let internal_cache_dir = ProjectDirs::from("me", "xiaopan", "sketch").map_or_else(
            || std::env::temp_dir().join("sketch-cache"),
            |dirs| dirs.cache_dir().to_path_buf(),
        );
        Self {
            external_cache_dir: None,
            internal_cache_dir,
            max_heap: DEFAULT_MAX_HEAP,
        }
    }

    /// Disk cache directories to try, preferred first.
    #[must_use]
    pub fn disk_cache_candidates(&self) -> Vec<PathBuf> {
        self.external_cache_dir
            .iter()
            .chain(std::iter::once(&self.internal_cache_dir))
            .map(|root| root.join(CACHE_DIR_NAME))
            .collect()
    }
}

/// Sizing of the default strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubOptions {
    /// Disk cache budget in bytes.
    pub disk_cache_max_size: u64,
    /// Worker threads of the default executor.
    pub executor_workers: usize,
    /// Per-request download timeout.
    pub download_timeout_secs: u64,
    /// Extra download attempts after a retryable failure.
    pub download_retries: u32,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            disk_cache_max_size: DEFAULT_MAX_CACHE_SIZE,
            executor_workers: DEFAULT_WORKERS,
            download_timeout_secs: DEFAULT_TIMEOUT_SECS,
            download_retries: DEFAULT_RETRIES,
        }
    }
}

/// Opens the disk cache in the first usable candidate directory, purging
/// files a previous run left behind first.
fn open_disk_cache(env: &HubEnvironment, max_size: u64) -> Result<LruDiskCache, HubError> {
    let mut last_error = None;
    for dir in env.disk_cache_candidates() {
        let opened = purge_stale_files(&dir, CACHE_VERSION)
            .and_then(|_| LruDiskCache::open(dir.clone(), CACHE_VERSION, max_size));
        match opened {
            Ok(cache) => return Ok(cache),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Disk cache directory unusable");
                last_error = Some(e);
            }
        }
    }
    Err(HubError::DiskCacheUnavailable(last_error.unwrap_or_else(|| {
        CacheError::Io("no cache directory candidates".to_string())
    })))
}

/// Central registry of strategies and policy for the image pipeline.
pub struct Configuration {
    environment: HubEnvironment,

    disk_cache: CacheLifecycle<dyn DiskCache>,
    memory_cache: CacheLifecycle<dyn MemoryCache>,
    placeholder_memory_cache: CacheLifecycle<dyn MemoryCache>,

    image_decoder: StrategyHandle<dyn ImageDecoder>,
    image_downloader: StrategyHandle<dyn ImageDownloader>,
    request_executor: StrategyHandle<dyn RequestExecutor>,
    image_displayer: StrategyHandle<dyn ImageDisplayer>,
    cut_processor: StrategyHandle<dyn ImageProcessor>,
    resize_calculator: StrategyHandle<dyn ResizeCalculator>,
    size_calculator: StrategyHandle<dyn ImageSizeCalculator>,
    request_factory: StrategyHandle<dyn RequestFactory>,
    helper_factory: StrategyHandle<dyn HelperFactory>,

    pause_load: PolicyFlag,
    cache_in_disk: PolicyFlag,
    cache_in_memory: PolicyFlag,
    decode_gif: PolicyFlag,
    low_quality: PolicyFlag,
    pause_controller: Arc<PauseController>,

    dispatcher: Arc<MainThreadDispatcher>,
    teardown_listener: RwLock<Option<TeardownListener>>,
}

impl Configuration {
    /// Builds the hub with default strategy sizing.
    ///
    /// # Errors
    /// Returns error if no disk cache directory is usable or a default
    /// strategy fails to start.
    pub fn new(
        environment: HubEnvironment,
        run_loop: &RunLoopHandle,
        connectivity: Arc<dyn ConnectivityPort>,
    ) -> Result<Self, HubError> {
        Self::with_options(environment, HubOptions::default(), run_loop, connectivity)
    }

    /// Builds the hub, installing every default strategy eagerly.
    ///
    /// The dispatcher is registered on `run_loop`, whose owner thread
    /// becomes the designated thread.
    ///
    /// # Errors
    /// Returns error if no disk cache directory is usable or a default
    /// strategy fails to start.
    pub fn with_options(
        environment: HubEnvironment,
        options: HubOptions,
        run_loop: &RunLoopHandle,
        connectivity: Arc<dyn ConnectivityPort>,
    ) -> Result<Self, HubError> {
        let disk: Arc<dyn DiskCache> =
            Arc::new(open_disk_cache(&environment, options.disk_cache_max_size)?);
        let memory: Arc<dyn MemoryCache> = Arc::new(LruMemoryCache::named(
            "content",
            environment.max_heap / CONTENT_CACHE_DIVISOR,
        ));
        let placeholder: Arc<dyn MemoryCache> = Arc::new(LruMemoryCache::named(
            "placeholder",
            environment.max_heap / PLACEHOLDER_CACHE_DIVISOR,
        ));

        let executor: Arc<dyn RequestExecutor> = Arc::new(
            DefaultRequestExecutor::new(options.executor_workers)
                .map_err(|e| HubError::Executor(e.to_string()))?,
        );
        let downloader: Arc<dyn ImageDownloader> = Arc::new(
            HttpImageDownloader::new(options.download_timeout_secs, options.download_retries)
                .map_err(|e| HubError::Downloader(e.to_string()))?,
        );
        let decoder: Arc<dyn ImageDecoder> = Arc::new(DefaultImageDecoder);
        let displayer: Arc<dyn ImageDisplayer> = Arc::new(DefaultImageDisplayer);
        let cut_processor: Arc<dyn ImageProcessor> = Arc::new(DefaultImageProcessor);
        let resize_calculator: Arc<dyn ResizeCalculator> = Arc::new(DefaultResizeCalculator);
        let size_calculator: Arc<dyn ImageSizeCalculator> = Arc::new(DefaultImageSizeCalculator);
        let request_factory: Arc<dyn RequestFactory> = Arc::new(DefaultRequestFactory);
        let helper_factory: Arc<dyn HelperFactory> = Arc::new(DefaultHelperFactory);

        let configuration = Self {
            environment,
            disk_cache: CacheLifecycle::new("diskCache", disk),
            memory_cache: CacheLifecycle::new("memoryCache", memory),
            placeholder_memory_cache: CacheLifecycle::new("placeholderImageMemoryCache", placeholder),
            image_decoder: StrategyHandle::new("imageDecoder", decoder),
            image_downloader: StrategyHandle::new("imageDownloader", downloader),
            request_executor: StrategyHandle::new("requestExecutor", executor),
            image_displayer: StrategyHandle::new("defaultImageDisplayer", displayer),
            cut_processor: StrategyHandle::new("defaultCutImageProcessor", cut_processor),
            resize_calculator: StrategyHandle::new("resizeCalculator", resize_calculator),
            size_calculator: StrategyHandle::new("imageSizeCalculator", size_calculator),
            request_factory: StrategyHandle::new("requestFactory", request_factory),
            helper_factory: StrategyHandle::new("helperFactory", helper_factory),
            pause_load: PolicyFlag::new("pauseLoad", false),
            cache_in_disk: PolicyFlag::new("cacheInDisk", true),
            cache_in_memory: PolicyFlag::new("cacheInMemory", true),
            decode_gif: PolicyFlag::new("decodeGifImage", true),
            low_quality: PolicyFlag::new("lowQualityImage", false),
            pause_controller: PauseController::new(connectivity),
            dispatcher: MainThreadDispatcher::attach(run_loop),
            teardown_listener: RwLock::new(None),
        };
        debug!(%configuration, "Configuration ready");
        Ok(configuration)
    }

    /// Environment the hub was built with.
    #[must_use]
    pub const fn environment(&self) -> &HubEnvironment {
        &self.environment
    }

    /// Dispatcher delivering completions to the designated thread.
    #[must_use]
    pub fn dispatcher(&self) -> Arc<MainThreadDispatcher> {
        self.dispatcher.clone()
    }

    /// Download pause controller.
    #[must_use]
    pub fn pause_controller(&self) -> Arc<PauseController> {
        self.pause_controller.clone()
    }

    /// Installs a listener for cache teardown failures. Replacing a cache
    /// still succeeds when teardown fails; the listener only observes it.
    pub fn set_teardown_listener(&self, listener: Option<TeardownListener>) -> &Self {
        *self.teardown_listener.write() = listener;
        self
    }

    fn report_teardown(&self, slot: &'static str, outcome: Replacement) {
        if let Replacement::ReplacedWithTeardownError(e) = outcome
            && let Some(listener) = self.teardown_listener.read().clone()
        {
            listener(slot, &e);
        }
    }

    // Caches

    /// Current disk cache.
    #[must_use]
    pub fn disk_cache(&self) -> Arc<dyn DiskCache> {
        self.disk_cache.get()
    }

    /// Closes the current disk cache and installs `cache`. `None` is ignored.
    pub fn set_disk_cache(&self, cache: Option<Arc<dyn DiskCache>>) -> &Self {
        let outcome = self.disk_cache.set(cache);
        self.report_teardown(self.disk_cache.name(), outcome);
        self
    }

    /// Current memory cache.
    #[must_use]
    pub fn memory_cache(&self) -> Arc<dyn MemoryCache> {
        self.memory_cache.get()
    }

    /// Clears the current content cache and installs `cache`. `None` is ignored.
    pub fn set_memory_cache(&self, cache: Option<Arc<dyn MemoryCache>>) -> &Self {
        let outcome = self.memory_cache.set(cache);
        self.report_teardown(self.memory_cache.name(), outcome);
        self
    }

    /// Current placeholder memory cache.
    #[must_use]
    pub fn placeholder_memory_cache(&self) -> Arc<dyn MemoryCache> {
        self.placeholder_memory_cache.get()
    }

    /// Clears the current placeholder cache and installs `cache`. `None` is ignored.
    pub fn set_placeholder_memory_cache(&self, cache: Option<Arc<dyn MemoryCache>>) -> &Self {
        let outcome = self.placeholder_memory_cache.set(cache);
        self.report_teardown(self.placeholder_memory_cache.name(), outcome);
        self
    }

    // Strategies

    /// Current image decoder.
    #[must_use]
    pub fn image_decoder(&self) -> Arc<dyn ImageDecoder> {
        self.image_decoder.get()
    }

    /// Installs a new image decoder. `None` is ignored.
    pub fn set_image_decoder(&self, decoder: Option<Arc<dyn ImageDecoder>>) -> &Self {
        self.image_decoder.set(decoder);
        self
    }

    /// Current image downloader.
    #[must_use]
    pub fn image_downloader(&self) -> Arc<dyn ImageDownloader> {
        self.image_downloader.get()
    }

    /// Installs a new image downloader. `None` is ignored.
    pub fn set_image_downloader(&self, downloader: Option<Arc<dyn ImageDownloader>>) -> &Self {
        self.image_downloader.set(downloader);
        self
    }

    /// Current request executor.
    #[must_use]
    pub fn request_executor(&self) -> Arc<dyn RequestExecutor> {
        self.request_executor.get()
    }

    /// Installs a new request executor. `None` is ignored.
    pub fn set_request_executor(&self, executor: Option<Arc<dyn RequestExecutor>>) -> &Self {
        self.request_executor.set(executor);
        self
    }

    /// Current image displayer.
    #[must_use]
    pub fn image_displayer(&self) -> Arc<dyn ImageDisplayer> {
        self.image_displayer.get()
    }

    /// Installs a new image displayer. `None` is ignored.
    pub fn set_image_displayer(&self, displayer: Option<Arc<dyn ImageDisplayer>>) -> &Self {
        self.image_displayer.set(displayer);
        self
    }

    /// Current cut processor.
    #[must_use]
    pub fn cut_processor(&self) -> Arc<dyn ImageProcessor> {
        self.cut_processor.get()
    }

    /// Installs a new cut processor. `None` is ignored.
    pub fn set_cut_processor(&self, processor: Option<Arc<dyn ImageProcessor>>) -> &Self {
        self.cut_processor.set(processor);
        self
    }

    /// Current resize calculator.
    #[must_use]
    pub fn resize_calculator(&self) -> Arc<dyn ResizeCalculator> {
        self.resize_calculator.get()
    }

    /// Installs a new resize calculator. `None` is ignored.
    pub fn set_resize_calculator(&self, calculator: Option<Arc<dyn ResizeCalculator>>) -> &Self {
        self.resize_calculator.set(calculator);
        self
    }

    /// Current size calculator.
    #[must_use]
    pub fn size_calculator(&self) -> Arc<dyn ImageSizeCalculator> {
        self.size_calculator.get()
    }

    /// Installs a new size calculator. `None` is ignored.
    pub fn set_size_calculator(&self, calculator: Option<Arc<dyn ImageSizeCalculator>>) -> &Self {
        self.size_calculator.set(calculator);
        self
    }

    /// Current request factory.
    #[must_use]
    pub fn request_factory(&self) -> Arc<dyn RequestFactory> {
        self.request_factory.get()
    }

    /// Installs a new request factory. `None` is ignored.
    pub fn set_request_factory(&self, factory: Option<Arc<dyn RequestFactory>>) -> &Self {
        self.request_factory.set(factory);
        self
    }

    /// Current helper factory.
    #[must_use]
    pub fn helper_factory(&self) -> Arc<dyn HelperFactory> {
        self.helper_factory.get()
    }

    /// Installs a new helper factory. `None` is ignored.
    pub fn set_helper_factory(&self, factory: Option<Arc<dyn HelperFactory>>) -> &Self {
        self.helper_factory.set(factory);
        self
    }

    // Policy

    /// Current pause load flag.
    #[must_use]
    pub fn is_pause_load(&self) -> bool {
        self.pause_load.get()
    }

    /// Serve requests from the memory cache only.
    pub fn set_pause_load(&self, value: bool) -> &Self {
        self.pause_load.set(value);
        self
    }

    /// Manual download pause, ignoring network state.
    #[must_use]
    pub fn is_pause_download(&self) -> bool {
        self.pause_controller.is_manual_pause()
    }

    /// Sets the pause download flag; repeating the current value is a no-op.
    pub fn set_pause_download(&self, value: bool) -> &Self {
        self.pause_controller.set_manual_pause(value);
        self
    }

    /// Current mobile network pause download flag.
    #[must_use]
    pub fn is_mobile_network_pause_download(&self) -> bool {
        self.pause_controller.is_auto_pause_enabled()
    }

    /// Pause downloads while only a metered network is available.
    pub fn set_mobile_network_pause_download(&self, value: bool) -> &Self {
        self.pause_controller.set_auto_pause_enabled(value);
        self
    }

    /// Effective download pause: manual, or automatic on a metered network.
    #[must_use]
    pub fn is_download_paused(&self) -> bool {
        self.pause_controller.effective_paused()
    }

    /// Current cache in disk flag.
    #[must_use]
    pub fn is_cache_in_disk(&self) -> bool {
        self.cache_in_disk.get()
    }

    /// Sets the cache in disk flag; repeating the current value is a no-op.
    pub fn set_cache_in_disk(&self, value: bool) -> &Self {
        self.cache_in_disk.set(value);
        self
    }

    /// Current cache in memory flag.
    #[must_use]
    pub fn is_cache_in_memory(&self) -> bool {
        self.cache_in_memory.get()
    }

    /// Sets the cache in memory flag; repeating the current value is a no-op.
    pub fn set_cache_in_memory(&self, value: bool) -> &Self {
        self.cache_in_memory.set(value);
        self
    }

    /// Current decode gif flag.
    #[must_use]
    pub fn is_decode_gif(&self) -> bool {
        self.decode_gif.get()
    }

    /// Sets the decode gif flag; repeating the current value is a no-op.
    pub fn set_decode_gif(&self, value: bool) -> &Self {
        self.decode_gif.set(value);
        self
    }

    /// Current low quality flag.
    #[must_use]
    pub fn is_low_quality(&self) -> bool {
        self.low_quality.get()
    }

    /// Sets the low quality flag; repeating the current value is a no-op.
    pub fn set_low_quality(&self, value: bool) -> &Self {
        self.low_quality.set(value);
        self
    }

    /// Routes stored settings through the ordinary setters.
    pub fn apply_settings(&self, settings: &PolicySettings) -> &Self {
        self.set_pause_load(settings.pause_load)
            .set_pause_download(settings.pause_download)
            .set_mobile_network_pause_download(settings.mobile_network_pause)
            .set_cache_in_disk(settings.cache_in_disk)
            .set_cache_in_memory(settings.cache_in_memory)
            .set_decode_gif(settings.decode_gif)
            .set_low_quality(settings.low_quality)
    }

    /// Policy snapshot for a request being built now.
    #[must_use]
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions {
            pause_load: self.is_pause_load(),
            pause_download: self.is_download_paused(),
            cache_in_disk: self.is_cache_in_disk(),
            cache_in_memory: self.is_cache_in_memory(),
            decode_gif: self.is_decode_gif(),
            low_quality: self.is_low_quality(),
            resize: None,
        }
    }

    /// Builds a request for `uri` with the current factory and policy.
    #[must_use]
    pub fn create_request(&self, uri: &str) -> ImageRequest {
        self.request_factory().create(uri, self.request_options())
    }

    /// Starts a per-call helper seeded with the current policy.
    #[must_use]
    pub fn load_helper(&self) -> LoadHelper {
        self.helper_factory().load_helper(self.request_options())
    }

    /// One line per slot and flag, for humans.
    #[must_use]
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Configuration:")?;

        macro_rules! slot {
            ($slot:expr) => {{
                write!(f, "\n{}: ", $slot.name())?;
                $slot.append_identifier(&mut *f)?;
            }};
        }
        slot!(self.disk_cache);
        slot!(self.memory_cache);
        slot!(self.placeholder_memory_cache);
        slot!(self.image_decoder);
        slot!(self.image_downloader);
        slot!(self.size_calculator);
        slot!(self.image_displayer);
        slot!(self.cut_processor);
        slot!(self.helper_factory);
        slot!(self.request_factory);
        slot!(self.resize_calculator);
        slot!(self.request_executor);

        for flag in [
            &self.pause_load,
            &self.decode_gif,
            &self.low_quality,
            &self.cache_in_disk,
            &self.cache_in_memory,
        ] {
            write!(f, "\n{}: {}", flag.name(), flag.get())?;
        }
        write!(f, "\npauseDownload: {}", self.is_pause_download())?;
        write!(
            f,
            "\nmobileNetworkPauseDownload: {}",
            self.is_mobile_network_pause_download()
        )
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("environment", &self.environment)
            .field("pause_controller", &self.pause_controller)
            .finish_non_exhaustive()
    }
}
