//! Domain error types.

mod cache_error;
mod hub_error;
mod pipeline_error;

pub use cache_error::{CacheError, CacheResult};
pub use hub_error::{DispatchError, HubError};
pub use pipeline_error::{DecodeError, DownloadError};
