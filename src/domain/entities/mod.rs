//! Domain entity definitions.

mod image;
mod request;

pub use self::image::{AnimationFrame, DecodedImage, ImageId, ImageSize, Rect};
pub use request::{ImageRequest, LoadHelper, PolicySettings, RequestId, RequestOptions};
