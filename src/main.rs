use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use futures_util::FutureExt;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use sketch::application::{
    Configuration, HubEnvironment, HubOptions, MessageKind, MessageTag, RunLoop, RunLoopHandle,
};
use sketch::domain::ports::{DiskCache, ImageDecoder, ImageDownloader, MemoryCache};
use sketch::domain::{CacheError, DecodedImage, DownloadError, ImageRequest, NetworkState};
use sketch::infrastructure::{AppConfig, CliArgs, ConnectivityMonitor, StorageManager};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(mut args: CliArgs) -> Result<(AppConfig, Vec<String>, NetworkState)> {
    let uris = std::mem::take(&mut args.uris);
    let network = args.network.into();

    let storage = match args.config.as_deref().and_then(std::path::Path::parent) {
        Some(dir) => StorageManager::with_dir(dir.to_path_buf()),
        None => StorageManager::new()?,
    };
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    config.normalize();
    Ok((config, uris, network))
}

fn build_hub(
    config: &AppConfig,
    run_loop: &RunLoopHandle,
    monitor: Arc<ConnectivityMonitor>,
) -> Result<Configuration> {
    let mut environment = HubEnvironment::detect();
    environment.external_cache_dir.clone_from(&config.cache.disk_dir);
    environment.max_heap = config.cache.max_heap_bytes();

    let options = HubOptions {
        disk_cache_max_size: config.cache.disk_max_bytes(),
        executor_workers: config.executor.workers,
        download_timeout_secs: config.download.timeout_secs,
        download_retries: config.download.retries,
    };

    let hub = Configuration::with_options(environment, options, run_loop, monitor)?;
    hub.set_teardown_listener(Some(Arc::new(|slot: &'static str, error: &CacheError| {
        warn!(slot, error = %error, "Cache teardown failed");
    })));
    hub.apply_settings(&config.policy);
    Ok(hub)
}

/// Strategies captured when a request is built; later swaps do not
/// affect it.
struct HubParts {
    memory: Arc<dyn MemoryCache>,
    disk: Arc<dyn DiskCache>,
    downloader: Arc<dyn ImageDownloader>,
    decoder: Arc<dyn ImageDecoder>,
}

/// Memory cache, then disk cache, then network, honouring the request's
/// policy snapshot.
async fn load(parts: &HubParts, request: &ImageRequest) -> Result<DecodedImage> {
    let options = &request.options;
    if options.cache_in_memory
        && let Some(image) = parts.memory.get(&request.image_id)
    {
        return Ok(image);
    }
    if options.pause_load {
        return Err(eyre!("loading is paused and the image is not in memory"));
    }

    let cached = if options.cache_in_disk {
        parts.disk.get_bytes(&request.image_id).await
    } else {
        None
    };
    let bytes = match cached {
        Some(bytes) => bytes,
        None if options.pause_download => return Err(DownloadError::Paused.into()),
        None => {
            let download = parts.downloader.download(&request.uri).await?;
            if options.cache_in_disk
                && let Err(e) = parts.disk.put_bytes(&request.image_id, &download.bytes).await
            {
                warn!(request = %request.id, error = %e, "Failed to store download");
            }
            download.bytes.to_vec()
        }
    };

    let image = parts.decoder.decode(&bytes, options)?;
    if options.cache_in_memory {
        parts.memory.put(request.image_id.clone(), image.clone());
    }
    Ok(image)
}

/// Turns a panic inside `work` into an error so its completion is still
/// posted.
async fn guarded<T>(work: impl Future<Output = Result<T>>) -> Result<T> {
    AssertUnwindSafe(work)
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(eyre!("request task panicked")))
}

fn summarize(image: &DecodedImage) -> String {
    match image {
        DecodedImage::Static(frame) => format!("{}x{}", frame.width(), frame.height()),
        DecodedImage::Animated(frames) => format!("{} frames", frames.len()),
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let (config, uris, network) = load_config(CliArgs::parse())?;
    init_logging(&config)?;
    info!(version = sketch::VERSION, "Starting sketch");

    let (mut run_loop, handle) = RunLoop::new();
    let monitor = ConnectivityMonitor::shared(network);
    let hub = build_hub(&config, &handle, monitor)?;
    println!("{}", hub.describe());

    if uris.is_empty() {
        return Ok(());
    }

    let remaining = Arc::new(AtomicUsize::new(uris.len()));
    let executor = hub.request_executor();
    for uri in &uris {
        let request = hub.create_request(uri);
        let parts = HubParts {
            memory: hub.memory_cache(),
            disk: hub.disk_cache(),
            downloader: hub.image_downloader(),
            decoder: hub.image_decoder(),
        };
        let dispatcher = hub.dispatcher();
        let remaining = remaining.clone();
        let handle = handle.clone();

        executor.submit(Box::pin(async move {
            let outcome = guarded(load(&parts, &request)).await;
            let kind = if outcome.is_ok() {
                MessageKind::Completed
            } else {
                MessageKind::Failed
            };
            let uri = request.uri;
            let posted = dispatcher.post_callback(
                MessageTag::new(request.id, kind),
                move |tag: &MessageTag| {
                    match &outcome {
                        Ok(image) => println!("{} {uri}: {}", tag.request, summarize(image)),
                        Err(e) => println!("{} {uri}: failed: {e}", tag.request),
                    }
                    if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                        handle.quit();
                    }
                },
            );
            if let Err(e) = posted {
                warn!(error = %e, "Dropping completion");
            }
        }));
    }

    let delivered = run_loop.run()?;
    info!(delivered, "All requests finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guarded_passes_results_through() {
        assert_eq!(guarded(async { Ok(7) }).await.unwrap(), 7);
        assert!(guarded(async { Err::<(), _>(eyre!("boom")) }).await.is_err());
    }

    #[tokio::test]
    async fn test_guarded_reports_panic_as_failure() {
        let outcome: Result<()> = guarded(async { panic!("decoder blew up") }).await;
        let err = outcome.unwrap_err();
        assert!(err.to_string().contains("panicked"));
    }
}
