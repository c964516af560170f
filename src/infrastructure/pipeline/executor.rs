//! Default request executor running work on a dedicated tokio runtime.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::future::BoxFuture;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, warn};

use crate::domain::ports::{Identify, RequestExecutor};

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 3;

/// Executes submitted request futures on a private multi-threaded runtime.
pub struct DefaultRequestExecutor {
    runtime: Option<Runtime>,
    workers: usize,
    in_flight: Arc<AtomicUsize>,
}

impl DefaultRequestExecutor {
    /// Starts an executor with `workers` threads.
    ///
    /// # Errors
    /// Returns error if the runtime cannot be started.
    pub fn new(workers: usize) -> std::io::Result<Self> {
        let workers = workers.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name("sketch-executor")
            .enable_all()
            .build()?;
        debug!(workers, "Started request executor");
        Ok(Self {
            runtime: Some(runtime),
            workers,
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Number of submitted tasks that have not finished yet.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for DefaultRequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultRequestExecutor")
            .field("workers", &self.workers)
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

impl Identify for DefaultRequestExecutor {
    fn append_identifier(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "DefaultRequestExecutor(workers={})", self.workers)
    }
}

impl RequestExecutor for DefaultRequestExecutor {
    fn submit(&self, task: BoxFuture<'static, ()>) {
        let Some(runtime) = self.runtime.as_ref() else {
            warn!("Request executor already shut down, dropping task");
            return;
        };
        let in_flight = self.in_flight.clone();
        in_flight.fetch_add(1, Ordering::Relaxed);
        runtime.spawn(async move {
            task.await;
            in_flight.fetch_sub(1, Ordering::Relaxed);
        });
    }
}

impl Drop for DefaultRequestExecutor {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
            debug!("Request executor shut down");
        }
    }
}
