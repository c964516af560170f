//! Default displayer and cut processor.

use std::fmt;

use image::DynamicImage;
use image::imageops::FilterType;

use crate::domain::entities::{DecodedImage, ImageSize};
use crate::domain::ports::{DisplayTarget, Identify, ImageDisplayer, ImageProcessor};

/// Shows the first frame immediately, without a transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultImageDisplayer;

impl Identify for DefaultImageDisplayer {
    fn append_identifier(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str("DefaultImageDisplayer")
    }
}

impl ImageDisplayer for DefaultImageDisplayer {
    fn display(&self, target: &mut dyn DisplayTarget, image: &DecodedImage) {
        if let Some(frame) = image.first_frame() {
            target.set_image(frame);
        }
    }
}

/// Centre-crops and scales to the requested size.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultImageProcessor;

impl Identify for DefaultImageProcessor {
    fn append_identifier(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str("DefaultImageProcessor")
    }
}

impl ImageProcessor for DefaultImageProcessor {
    fn process(&self, image: &DynamicImage, resize: ImageSize, low_quality: bool) -> DynamicImage {
        let unchanged = resize.is_empty()
            || (image.width() == resize.width && image.height() == resize.height);
        let processed = if unchanged {
            image.clone()
        } else {
            image.resize_to_fill(resize.width, resize.height, FilterType::Lanczos3)
        };

        if low_quality {
            DynamicImage::ImageRgb8(processed.to_rgb8())
        } else {
            processed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Default)]
    struct Canvas {
        shown: Option<Arc<DynamicImage>>,
    }

    impl DisplayTarget for Canvas {
        fn set_image(&mut self, image: Arc<DynamicImage>) {
            self.shown = Some(image);
        }
    }

    #[test]
    fn test_displayer_sets_first_frame() {
        let mut canvas = Canvas::default();
        let img = Arc::new(DynamicImage::new_rgb8(3, 3));
        DefaultImageDisplayer.display(&mut canvas, &DecodedImage::Static(img.clone()));

        assert!(canvas.shown.is_some_and(|shown| Arc::ptr_eq(&shown, &img)));
    }

    #[test]
    fn test_processor_fills_target() {
        let img = DynamicImage::new_rgba8(400, 200);
        let out = DefaultImageProcessor.process(&img, ImageSize::new(100, 100), false);
        assert_eq!((out.width(), out.height()), (100, 100));
        assert!(out.color().has_alpha());
    }

    #[test]
    fn test_processor_low_quality_without_resize() {
        let img = DynamicImage::new_rgba8(10, 10);
        let out = DefaultImageProcessor.process(&img, ImageSize::default(), true);
        assert_eq!((out.width(), out.height()), (10, 10));
        assert!(!out.color().has_alpha());
    }
}
