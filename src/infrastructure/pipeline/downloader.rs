//! HTTP downloader backed by `reqwest`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::errors::DownloadError;
use crate::domain::ports::{Download, Identify, ImageDownloader};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of extra attempts after a retryable failure.
pub const DEFAULT_RETRIES: u32 = 1;

/// Downloads images over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpImageDownloader {
    http_client: reqwest::Client,
    timeout_secs: u64,
    retries: u32,
}

impl HttpImageDownloader {
    /// Creates a downloader with the given timeout and retry count.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(timeout_secs: u64, retries: u32) -> Result<Self, DownloadError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DownloadError::Request(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            timeout_secs,
            retries,
        })
    }

    async fn fetch(&self, uri: &str) -> Result<Download, DownloadError> {
        let response = self
            .http_client
            .get(uri)
            .send()
            .await
            .map_err(|e| DownloadError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DownloadError::Body(e.to_string()))?;

        Ok(Download {
            bytes,
            content_type,
        })
    }
}

impl Identify for HttpImageDownloader {
    fn append_identifier(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(
            out,
            "HttpImageDownloader(timeout={}s, retries={})",
            self.timeout_secs, self.retries
        )
    }
}

#[async_trait]
impl ImageDownloader for HttpImageDownloader {
    async fn download(&self, uri: &str) -> Result<Download, DownloadError> {
        let mut attempt = 0u32;
        loop {
            match self.fetch(uri).await {
                Ok(download) => {
                    debug!(uri, size = download.bytes.len(), "Downloaded image");
                    return Ok(download);
                }
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    warn!(uri, attempt, error = %e, "Download failed, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}
