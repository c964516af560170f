//! Domain layer with core entities and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Connectivity state.
pub mod network;
/// Port definitions.
pub mod ports;

pub use entities::{DecodedImage, ImageId, ImageRequest, ImageSize, RequestId, RequestOptions};
pub use errors::{CacheError, DecodeError, DispatchError, DownloadError, HubError};
pub use network::NetworkState;
