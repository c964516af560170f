//! Default implementations of the pluggable pipeline stages.

pub mod calculator;
pub mod decoder;
pub mod display;
pub mod downloader;
pub mod executor;
pub mod factory;

pub use calculator::{DefaultImageSizeCalculator, DefaultResizeCalculator};
pub use decoder::DefaultImageDecoder;
pub use display::{DefaultImageDisplayer, DefaultImageProcessor};
pub use downloader::HttpImageDownloader;
pub use executor::DefaultRequestExecutor;
pub use factory::{DefaultHelperFactory, DefaultRequestFactory};
