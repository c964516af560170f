mod cache_port;
mod connectivity_port;
mod identify;
mod strategy_ports;

pub use cache_port::{DiskCache, MemoryCache, Retire};
pub use connectivity_port::{ConnectivityObserver, ConnectivityPort};
pub use identify::Identify;
pub use strategy_ports::{
    DisplayTarget, Download, HelperFactory, ImageDecoder, ImageDisplayer, ImageDownloader,
    ImageProcessor, ImageSizeCalculator, RequestExecutor, RequestFactory, ResizeCalculator,
    ResizePlan,
};

#[cfg(test)]
pub mod mocks {
    pub use super::connectivity_port::{MockConnectivityObserver, MockConnectivityPort};
}
