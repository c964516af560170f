//! Port definitions for the pluggable pipeline stages.
//!
//! The hub never looks inside these; it only installs, swaps and
//! identifies them.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::future::BoxFuture;

use super::Identify;
use crate::domain::entities::{
    DecodedImage, ImageRequest, ImageSize, LoadHelper, Rect, RequestOptions,
};
use crate::domain::errors::{DecodeError, DownloadError};

/// Turns encoded bytes into pixels.
pub trait ImageDecoder: Identify + Send + Sync {
    /// Decodes `bytes` honouring the GIF and quality policy in `options`.
    ///
    /// # Errors
    /// Returns error if the bytes are not a supported image.
    fn decode(&self, bytes: &[u8], options: &RequestOptions) -> Result<DecodedImage, DecodeError>;
}

/// Body and metadata of a finished download.
#[derive(Debug, Clone)]
pub struct Download {
    /// Response body.
    pub bytes: Bytes,
    /// `Content-Type` header, when present.
    pub content_type: Option<String>,
}

/// Fetches image bytes from a URI.
#[async_trait]
pub trait ImageDownloader: Identify + Send + Sync {
    /// Downloads `uri`.
    ///
    /// # Errors
    /// Returns error on transport failure or a non-success status.
    async fn download(&self, uri: &str) -> Result<Download, DownloadError>;
}

/// Runs request work off the designated thread.
pub trait RequestExecutor: Identify + Send + Sync {
    /// Schedules `task`.
    fn submit(&self, task: BoxFuture<'static, ()>);
}

/// Something that can show an image.
pub trait DisplayTarget {
    /// Replaces the shown image.
    fn set_image(&mut self, image: Arc<image::DynamicImage>);
}

/// Puts a decoded image on a display target.
pub trait ImageDisplayer: Identify + Send + Sync {
    /// Shows `image` on `target`.
    fn display(&self, target: &mut dyn DisplayTarget, image: &DecodedImage);
}

/// Post-decode pixel processing (cut/resize).
pub trait ImageProcessor: Identify + Send + Sync {
    /// Produces the processed image.
    fn process(
        &self,
        image: &image::DynamicImage,
        resize: ImageSize,
        low_quality: bool,
    ) -> image::DynamicImage;
}

/// Where to cut from and how big the result is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePlan {
    /// Region of the source image to keep.
    pub src: Rect,
    /// Size of the produced image.
    pub dst: ImageSize,
}

/// Computes the crop/scale plan for a resize.
pub trait ResizeCalculator: Identify + Send + Sync {
    /// Plans fitting `image` into `resize`.
    fn calculate(&self, image: ImageSize, resize: ImageSize) -> ResizePlan;
}

/// Computes decode sizes.
pub trait ImageSizeCalculator: Identify + Send + Sync {
    /// Largest size worth decoding for a given display size.
    fn max_size(&self, display: ImageSize) -> ImageSize;

    /// Power-of-two subsampling factor that keeps the decoded image at
    /// least as large as `target`.
    fn sample_size(&self, image: ImageSize, target: ImageSize) -> u32;
}

/// Builds request values.
pub trait RequestFactory: Identify + Send + Sync {
    /// Creates a request for `uri` with the given policy snapshot.
    fn create(&self, uri: &str, options: RequestOptions) -> ImageRequest;
}

/// Builds per-call helpers.
pub trait HelperFactory: Identify + Send + Sync {
    /// Creates a helper seeded with `options`.
    fn load_helper(&self, options: RequestOptions) -> LoadHelper;
}
