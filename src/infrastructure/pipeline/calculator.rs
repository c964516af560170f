//! Default resize and decode-size calculators.

use std::fmt;

use crate::domain::entities::{ImageSize, Rect};
use crate::domain::ports::{Identify, ImageSizeCalculator, ResizeCalculator, ResizePlan};

/// Plans a centre crop that keeps the target aspect ratio.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResizeCalculator;

#[allow(clippy::cast_possible_truncation)]
fn scale(value: u32, numer: u32, denom: u32) -> u32 {
    (u64::from(value) * u64::from(numer) / u64::from(denom.max(1))) as u32
}

impl Identify for DefaultResizeCalculator {
    fn append_identifier(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str("DefaultResizeCalculator")
    }
}

impl ResizeCalculator for DefaultResizeCalculator {
    fn calculate(&self, image: ImageSize, resize: ImageSize) -> ResizePlan {
        let full = Rect {
            x: 0,
            y: 0,
            width: image.width,
            height: image.height,
        };
        if image.is_empty() || resize.is_empty() {
            return ResizePlan {
                src: full,
                dst: image,
            };
        }

        // Never upscale: shrink the target until it fits the source.
        let width_limited =
            u64::from(resize.width) * u64::from(image.height)
                >= u64::from(resize.height) * u64::from(image.width);
        let dst = if resize.width <= image.width && resize.height <= image.height {
            resize
        } else if width_limited {
            ImageSize::new(image.width, scale(resize.height, image.width, resize.width))
        } else {
            ImageSize::new(scale(resize.width, image.height, resize.height), image.height)
        };

        let (src_width, src_height) = if width_limited {
            (image.width, scale(image.width, resize.height, resize.width))
        } else {
            (scale(image.height, resize.width, resize.height), image.height)
        };

        ResizePlan {
            src: Rect {
                x: (image.width - src_width) / 2,
                y: (image.height - src_height) / 2,
                width: src_width,
                height: src_height,
            },
            dst,
        }
    }
}

/// Decode sizes derived from the display size.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultImageSizeCalculator;

impl Identify for DefaultImageSizeCalculator {
    fn append_identifier(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str("DefaultImageSizeCalculator")
    }
}

impl ImageSizeCalculator for DefaultImageSizeCalculator {
    fn max_size(&self, display: ImageSize) -> ImageSize {
        ImageSize::new(scale(display.width, 3, 2), scale(display.height, 3, 2))
    }

    fn sample_size(&self, image: ImageSize, target: ImageSize) -> u32 {
        if target.is_empty() {
            return 1;
        }
        let mut sample = 1u32;
        while let Some(next) = sample.checked_mul(2)
            && image.width / next >= target.width
            && image.height / next >= target.height
        {
            sample = next;
        }
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ImageSize::new(400, 200), ImageSize::new(100, 100), Rect { x: 100, y: 0, width: 200, height: 200 }, ImageSize::new(100, 100) ; "wide_into_square")]
    #[test_case(ImageSize::new(200, 400), ImageSize::new(100, 100), Rect { x: 0, y: 100, width: 200, height: 200 }, ImageSize::new(100, 100) ; "tall_into_square")]
    #[test_case(ImageSize::new(100, 100), ImageSize::new(200, 100), Rect { x: 0, y: 25, width: 100, height: 50 }, ImageSize::new(100, 50) ; "no_upscale")]
    #[test_case(ImageSize::new(100, 100), ImageSize::new(0, 0), Rect { x: 0, y: 0, width: 100, height: 100 }, ImageSize::new(100, 100) ; "empty_target")]
    fn test_resize_plan(image: ImageSize, resize: ImageSize, src: Rect, dst: ImageSize) {
        let plan = DefaultResizeCalculator.calculate(image, resize);
        assert_eq!(plan.src, src);
        assert_eq!(plan.dst, dst);
    }

    #[test_case(ImageSize::new(4000, 3000), ImageSize::new(1000, 750), 4 ; "exact_quarter")]
    #[test_case(ImageSize::new(4000, 3000), ImageSize::new(1001, 750), 2 ; "just_over_quarter")]
    #[test_case(ImageSize::new(100, 100), ImageSize::new(200, 200), 1 ; "smaller_than_target")]
    #[test_case(ImageSize::new(100, 100), ImageSize::new(0, 0), 1 ; "no_target")]
    fn test_sample_size(image: ImageSize, target: ImageSize, expected: u32) {
        assert_eq!(
            DefaultImageSizeCalculator.sample_size(image, target),
            expected
        );
    }

    #[test]
    fn test_max_size_is_one_and_a_half_display() {
        assert_eq!(
            DefaultImageSizeCalculator.max_size(ImageSize::new(1080, 1920)),
            ImageSize::new(1620, 2880)
        );
    }
}
