//! Image identifiers, dimensions and decoded image values.

use std::sync::Arc;

/// Unique identifier for a cached image.
/// Generated from a hash of the image URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId(pub String);

impl ImageId {
    /// Creates a new `ImageId` from any string-like input.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates an `ImageId` from a URI by hashing it.
    #[must_use]
    pub fn from_uri(uri: &str) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(uri.as_bytes());
        let result = hasher.finalize();
        Self(hex::encode(&result[..16]))
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ImageId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ImageId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImageSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageSize {
    /// Creates a new size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if either dimension is zero.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis-aligned rectangle inside an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width of the rectangle.
    pub width: u32,
    /// Height of the rectangle.
    pub height: u32,
}

/// One frame of an animated image.
#[derive(Debug, Clone)]
pub struct AnimationFrame {
    /// Frame pixels.
    pub image: Arc<image::DynamicImage>,
    /// How long the frame stays on screen, in milliseconds.
    pub delay_ms: u32,
}

/// Output of a decoder.
#[derive(Debug, Clone)]
pub enum DecodedImage {
    /// A single still image.
    Static(Arc<image::DynamicImage>),
    /// An animated image (GIF) with its frames in display order.
    Animated(Vec<AnimationFrame>),
}

impl DecodedImage {
    /// Returns the image shown first: the still image or the first frame.
    #[must_use]
    pub fn first_frame(&self) -> Option<Arc<image::DynamicImage>> {
        match self {
            Self::Static(img) => Some(img.clone()),
            Self::Animated(frames) => frames.first().map(|f| f.image.clone()),
        }
    }

    /// Returns true for animated images.
    #[must_use]
    pub const fn is_animated(&self) -> bool {
        matches!(self, Self::Animated(_))
    }

    /// Approximate number of bytes held by the decoded pixels.
    #[must_use]
    pub fn byte_size(&self) -> u64 {
        match self {
            Self::Static(img) => img.as_bytes().len() as u64,
            Self::Animated(frames) => frames
                .iter()
                .map(|f| f.image.as_bytes().len() as u64)
                .sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_id_from_uri_is_stable() {
        let a = ImageId::from_uri("http://example.com/a.png");
        let b = ImageId::from_uri("http://example.com/a.png");
        let c = ImageId::from_uri("http://example.com/b.png");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_decoded_byte_size() {
        let img = Arc::new(image::DynamicImage::new_rgba8(4, 4));
        let still = DecodedImage::Static(img.clone());
        assert_eq!(still.byte_size(), 64);

        let animated = DecodedImage::Animated(vec![
            AnimationFrame {
                image: img.clone(),
                delay_ms: 100,
            },
            AnimationFrame {
                image: img,
                delay_ms: 100,
            },
        ]);
        assert_eq!(animated.byte_size(), 128);
        assert!(animated.is_animated());
    }
}
