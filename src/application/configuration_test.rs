#[cfg(test)]
mod tests {
    use std::fmt;
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use image::DynamicImage;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    use crate::application::configuration::{Configuration, HubEnvironment, HubOptions};
    use crate::application::dispatcher::{MessageKind, MessageTag, RunLoop};
    use crate::domain::entities::{DecodedImage, ImageId, PolicySettings, RequestId};
    use crate::domain::errors::CacheError;
    use crate::domain::network::NetworkState;
    use crate::domain::ports::{DiskCache, Identify, MemoryCache};
    use crate::infrastructure::cache::{CACHE_DIR_NAME, CACHE_VERSION, LruDiskCache, LruMemoryCache};
    use crate::infrastructure::network::ConnectivityMonitor;

    const MIB: u64 = 1024 * 1024;

    struct Fixture {
        hub: Configuration,
        run_loop: RunLoop,
        monitor: Arc<ConnectivityMonitor>,
        dir: TempDir,
    }

    fn fixture_with(max_heap: u64, state: NetworkState) -> Fixture {
        let dir = TempDir::new().unwrap();
        let (run_loop, handle) = RunLoop::new();
        let monitor = ConnectivityMonitor::shared(state);
        let env = HubEnvironment {
            external_cache_dir: None,
            internal_cache_dir: dir.path().to_path_buf(),
            max_heap,
        };
        let options = HubOptions {
            executor_workers: 1,
            ..HubOptions::default()
        };
        let hub = Configuration::with_options(env, options, &handle, monitor.clone()).unwrap();
        Fixture {
            hub,
            run_loop,
            monitor,
            dir,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(64 * MIB, NetworkState::Unmetered)
    }

    fn sample_image() -> DecodedImage {
        DecodedImage::Static(Arc::new(DynamicImage::new_rgba8(10, 10)))
    }

    fn same<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
    }

    #[derive(Default)]
    struct CountingCache {
        clears: AtomicUsize,
        max_size: u64,
    }

    impl Identify for CountingCache {
        fn append_identifier(&self, out: &mut dyn fmt::Write) -> fmt::Result {
            write!(out, "CountingCache(maxSize={})", self.max_size)
        }
    }

    impl MemoryCache for CountingCache {
        fn sized_to(max_size: u64) -> Self {
            Self {
                clears: AtomicUsize::new(0),
                max_size,
            }
        }

        fn get(&self, _id: &ImageId) -> Option<DecodedImage> {
            None
        }

        fn put(&self, _id: ImageId, _image: DecodedImage) {}

        fn remove(&self, _id: &ImageId) -> Option<DecodedImage> {
            None
        }

        fn size(&self) -> u64 {
            0
        }

        fn max_size(&self) -> u64 {
            self.max_size
        }

        fn len(&self) -> usize {
            0
        }

        fn clear(&self) {
            self.clears.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs(f: impl FnOnce()) -> String {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        capture.contents()
    }

    #[test]
    fn test_memory_tiers_sized_from_heap() {
        let f = fixture_with(64 * MIB, NetworkState::Unmetered);

        assert_eq!(f.hub.memory_cache().max_size(), 8 * MIB);
        assert_eq!(f.hub.placeholder_memory_cache().max_size(), 4 * MIB);
    }

    #[test]
    fn test_disk_cache_defaults() {
        let f = fixture();
        let disk = f.hub.disk_cache();

        assert_eq!(disk.dir(), f.dir.path().join(CACHE_DIR_NAME));
        assert_eq!(disk.version(), CACHE_VERSION);
        assert_eq!(disk.max_size(), 100 * MIB);
        assert!(!disk.is_closed());
    }

    #[test]
    fn test_disk_cache_prefers_external_dir() {
        let external = TempDir::new().unwrap();
        let internal = TempDir::new().unwrap();
        let (_run_loop, handle) = RunLoop::new();
        let env = HubEnvironment {
            external_cache_dir: Some(external.path().to_path_buf()),
            internal_cache_dir: internal.path().to_path_buf(),
            max_heap: 64 * MIB,
        };

        let hub =
            Configuration::new(env, &handle, ConnectivityMonitor::shared(NetworkState::Unmetered))
                .unwrap();

        assert_eq!(hub.disk_cache().dir(), external.path().join(CACHE_DIR_NAME));
    }

    #[test]
    fn test_disk_cache_falls_back_to_internal_dir() {
        let root = TempDir::new().unwrap();
        let blocker = root.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        let (_run_loop, handle) = RunLoop::new();
        let env = HubEnvironment {
            external_cache_dir: Some(blocker),
            internal_cache_dir: root.path().join("internal"),
            max_heap: 64 * MIB,
        };

        let hub =
            Configuration::new(env, &handle, ConnectivityMonitor::shared(NetworkState::Unmetered))
                .unwrap();

        assert_eq!(
            hub.disk_cache().dir(),
            root.path().join("internal").join(CACHE_DIR_NAME)
        );
    }

    #[test]
    fn test_stale_files_are_purged_before_open() {
        let dir = TempDir::new().unwrap();
        let cache_dir = dir.path().join(CACHE_DIR_NAME);
        std::fs::create_dir_all(&cache_dir).unwrap();
        std::fs::write(cache_dir.join("leftover.img"), b"orphan").unwrap();
        let (_run_loop, handle) = RunLoop::new();
        let env = HubEnvironment {
            external_cache_dir: None,
            internal_cache_dir: dir.path().to_path_buf(),
            max_heap: 64 * MIB,
        };

        let hub =
            Configuration::new(env, &handle, ConnectivityMonitor::shared(NetworkState::Unmetered))
                .unwrap();

        assert!(hub.disk_cache().is_empty());
        assert!(!cache_dir.join("leftover.img").exists());
    }

    #[test]
    fn test_set_none_keeps_default_and_does_not_clear() {
        let f = fixture();
        let original = f.hub.memory_cache();
        original.put(ImageId::new("a"), sample_image());

        f.hub.set_memory_cache(None);

        assert!(same(&f.hub.memory_cache(), &original));
        assert_eq!(original.len(), 1);
    }

    #[test]
    fn test_set_none_is_noop_for_every_slot() {
        let f = fixture();
        let decoder = f.hub.image_decoder();
        let executor = f.hub.request_executor();
        let disk = f.hub.disk_cache();

        f.hub
            .set_image_decoder(None)
            .set_request_executor(None)
            .set_disk_cache(None)
            .set_image_downloader(None)
            .set_image_displayer(None)
            .set_cut_processor(None)
            .set_resize_calculator(None)
            .set_size_calculator(None)
            .set_request_factory(None)
            .set_helper_factory(None)
            .set_placeholder_memory_cache(None);

        assert!(same(&f.hub.image_decoder(), &decoder));
        assert!(same(&f.hub.request_executor(), &executor));
        assert!(same(&f.hub.disk_cache(), &disk));
        assert!(!disk.is_closed());
    }

    #[test]
    fn test_replacing_memory_cache_clears_previous_once() {
        let f = fixture();
        let first = Arc::new(CountingCache::sized_to(MIB));
        let second = Arc::new(CountingCache::sized_to(2 * MIB));

        f.hub.set_memory_cache(Some(first.clone()));
        assert_eq!(first.clears.load(Ordering::SeqCst), 0);

        f.hub.set_memory_cache(Some(second.clone()));
        assert_eq!(first.clears.load(Ordering::SeqCst), 1);
        assert_eq!(second.clears.load(Ordering::SeqCst), 0);

        let current: Arc<dyn MemoryCache> = second;
        assert!(same(&f.hub.memory_cache(), &current));
        assert_eq!(f.hub.memory_cache().max_size(), 2 * MIB);
    }

    #[test]
    fn test_replacing_default_memory_cache_drops_its_images() {
        let f = fixture();
        let original = f.hub.memory_cache();
        original.put(ImageId::new("a"), sample_image());

        f.hub.set_memory_cache(Some(Arc::new(LruMemoryCache::named("content", MIB))));

        assert!(original.is_empty());
    }

    #[test]
    fn test_placeholder_tier_is_independent() {
        let f = fixture();
        let content = f.hub.memory_cache();
        content.put(ImageId::new("a"), sample_image());

        f.hub.set_placeholder_memory_cache(Some(Arc::new(CountingCache::sized_to(MIB))));

        assert_eq!(content.len(), 1);
        assert_eq!(f.hub.placeholder_memory_cache().max_size(), MIB);
    }

    #[test]
    fn test_replacing_disk_cache_closes_previous() {
        let f = fixture();
        let original = f.hub.disk_cache();
        let other_dir = TempDir::new().unwrap();
        let next = LruDiskCache::open(other_dir.path().to_path_buf(), CACHE_VERSION, MIB).unwrap();

        f.hub.set_disk_cache(Some(Arc::new(next)));

        assert!(original.is_closed());
        assert_eq!(f.hub.disk_cache().dir(), other_dir.path());
    }

    #[test]
    fn test_teardown_failure_reaches_listener_and_still_installs() {
        let f = fixture();
        let seen: Arc<Mutex<Vec<(&'static str, String)>>> = Arc::default();
        let sink = seen.clone();
        f.hub.set_teardown_listener(Some(Arc::new(
            move |slot: &'static str, error: &CacheError| {
                sink.lock().push((slot, error.to_string()));
            },
        )));

        std::fs::remove_dir_all(f.hub.disk_cache().dir()).unwrap();
        let other_dir = TempDir::new().unwrap();
        let next = LruDiskCache::open(other_dir.path().to_path_buf(), CACHE_VERSION, MIB).unwrap();
        f.hub.set_disk_cache(Some(Arc::new(next)));

        assert_eq!(f.hub.disk_cache().dir(), other_dir.path());
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "diskCache");
    }

    #[test]
    fn test_flag_defaults_and_snapshot() {
        let f = fixture();
        let options = f.hub.request_options();

        assert!(!options.pause_load);
        assert!(!options.pause_download);
        assert!(options.cache_in_disk);
        assert!(options.cache_in_memory);
        assert!(options.decode_gif);
        assert!(!options.low_quality);
        assert_eq!(options.resize, None);
    }

    #[test]
    fn test_requests_capture_policy_at_build_time() {
        let f = fixture();
        let before = f.hub.create_request("https://example.com/a.png");

        f.hub.set_low_quality(true).set_cache_in_disk(false);
        let after = f.hub.create_request("https://example.com/a.png");

        assert!(!before.options.low_quality);
        assert!(after.options.low_quality);
        assert!(!after.options.cache_in_disk);
        assert_eq!(before.image_id, after.image_id);
        assert_ne!(before.id, after.id);
    }

    #[test]
    fn test_load_helper_starts_from_policy() {
        let f = fixture();
        f.hub.set_decode_gif(false);

        let helper = f.hub.load_helper().disable_memory_cache();

        assert!(!helper.options().decode_gif);
        assert!(!helper.options().cache_in_memory);
        assert!(f.hub.is_cache_in_memory());
    }

    #[test]
    fn test_apply_settings_routes_through_setters() {
        let f = fixture_with(64 * MIB, NetworkState::Metered);
        let settings = PolicySettings {
            pause_load: true,
            mobile_network_pause: true,
            cache_in_memory: false,
            ..PolicySettings::default()
        };

        f.hub.apply_settings(&settings);

        assert!(f.hub.is_pause_load());
        assert!(!f.hub.is_pause_download());
        assert!(f.hub.is_mobile_network_pause_download());
        assert!(f.hub.is_download_paused());
        assert!(!f.hub.is_cache_in_memory());
        assert!(f.hub.is_cache_in_disk());
    }

    #[test]
    fn test_mobile_network_pause_follows_connectivity() {
        let f = fixture_with(64 * MIB, NetworkState::Metered);

        f.hub.set_mobile_network_pause_download(true);
        assert!(f.hub.is_download_paused());
        assert!(f.hub.request_options().pause_download);

        f.monitor.update(NetworkState::Unmetered);
        assert!(!f.hub.is_download_paused());
        assert!(f.hub.is_mobile_network_pause_download());
    }

    #[test]
    fn test_manual_pause_wins_over_network() {
        let f = fixture_with(64 * MIB, NetworkState::Unmetered);

        f.hub
            .set_mobile_network_pause_download(true)
            .set_pause_download(true);

        assert!(f.hub.is_download_paused());
        f.hub.set_pause_download(false);
        assert!(!f.hub.is_download_paused());
    }

    #[test]
    fn test_dispatcher_keeps_per_request_order() {
        let mut f = fixture();
        let log: Arc<Mutex<Vec<(u64, MessageKind)>>> = Arc::default();

        let plan = [
            (1, vec![MessageKind::Started, MessageKind::Completed]),
            (2, vec![MessageKind::Failed]),
        ];

        let producers: Vec<_> = plan
            .into_iter()
            .map(|(request, kinds)| {
                let dispatcher = f.hub.dispatcher();
                let log = log.clone();
                thread::spawn(move || {
                    for kind in kinds {
                        let log = log.clone();
                        dispatcher
                            .post_callback(
                                MessageTag::new(RequestId(request), kind),
                                move |tag: &MessageTag| log.lock().push((tag.request.0, tag.kind)),
                            )
                            .unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        assert_eq!(f.run_loop.run_pending().unwrap(), 3);
        let log = log.lock();
        let first: Vec<MessageKind> = log
            .iter()
            .filter(|(request, _)| *request == 1)
            .map(|(_, kind)| *kind)
            .collect();
        assert_eq!(first, vec![MessageKind::Started, MessageKind::Completed]);
        assert!(log.contains(&(2, MessageKind::Failed)));
    }

    #[test]
    fn test_describe_lists_every_slot_and_flag() {
        let f = fixture();
        let info = f.hub.describe();
        let lines: Vec<&str> = info.lines().collect();

        assert_eq!(lines[0], "Configuration:");
        for prefix in [
            "diskCache: LruDiskCache(",
            "memoryCache: LruMemoryCache(name=content",
            "placeholderImageMemoryCache: LruMemoryCache(name=placeholder",
            "imageDecoder: ",
            "imageDownloader: HttpImageDownloader(",
            "imageSizeCalculator: ",
            "defaultImageDisplayer: ",
            "defaultCutImageProcessor: ",
            "helperFactory: ",
            "requestFactory: ",
            "resizeCalculator: ",
            "requestExecutor: DefaultRequestExecutor(workers=1)",
            "pauseLoad: false",
            "decodeGifImage: true",
            "lowQualityImage: false",
            "cacheInDisk: true",
            "cacheInMemory: true",
            "pauseDownload: false",
            "mobileNetworkPauseDownload: false",
        ] {
            assert!(
                lines.iter().any(|line| line.starts_with(prefix)),
                "missing {prefix:?} in {info}"
            );
        }
        assert_eq!(lines.len(), 20);
    }

    #[test]
    fn test_describe_reflects_replacements() {
        let f = fixture();
        f.hub.set_memory_cache(Some(Arc::new(CountingCache::sized_to(42))));

        assert!(
            f.hub
                .describe()
                .contains("memoryCache: CountingCache(maxSize=42)")
        );
    }

    #[test]
    fn test_only_real_changes_are_logged() {
        let f = fixture();

        let logs = capture_logs(|| {
            f.hub
                .set_disk_cache(None)
                .set_memory_cache(None)
                .set_placeholder_memory_cache(None)
                .set_image_decoder(None)
                .set_image_downloader(None)
                .set_request_executor(None)
                .set_image_displayer(None)
                .set_cut_processor(None)
                .set_resize_calculator(None)
                .set_size_calculator(None)
                .set_request_factory(None)
                .set_helper_factory(None);
            f.hub.set_pause_load(true);
            f.hub.set_pause_load(true);
            f.hub.set_cache_in_disk(true);
        });

        assert!(!logs.contains("slot="), "{logs}");
        assert_eq!(logs.matches("flag=pauseLoad").count(), 1, "{logs}");
        assert!(!logs.contains("flag=cacheInDisk"), "{logs}");
    }

    #[test]
    fn test_successful_set_is_logged_with_identifier() {
        let f = fixture();

        let logs = capture_logs(|| {
            f.hub.set_memory_cache(Some(Arc::new(CountingCache::sized_to(7))));
        });

        assert!(logs.contains("slot=memoryCache"), "{logs}");
        assert!(logs.contains("CountingCache(maxSize=7)"), "{logs}");
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        let f = fixture();
        let hub = &f.hub;

        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let cache = hub.memory_cache();
                        assert!(cache.max_size() > 0);
                        let _ = hub.request_options();
                    }
                });
            }
            scope.spawn(|| {
                for i in 1..=50u64 {
                    hub.set_memory_cache(Some(Arc::new(CountingCache::sized_to(i))));
                    hub.set_low_quality(i % 2 == 0);
                }
            });
        });

        assert_eq!(hub.memory_cache().max_size(), 50);
        assert!(hub.is_low_quality());
    }
}
