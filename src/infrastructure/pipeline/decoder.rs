//! Default decoder backed by the `image` crate.

use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, ImageFormat};
use tracing::trace;

use crate::domain::entities::{AnimationFrame, DecodedImage, RequestOptions};
use crate::domain::errors::DecodeError;
use crate::domain::ports::{Identify, ImageDecoder};

/// Decodes PNG, JPEG, WebP and GIF.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultImageDecoder;

impl DefaultImageDecoder {
    fn finish(img: DynamicImage, low_quality: bool) -> DynamicImage {
        if low_quality {
            DynamicImage::ImageRgb8(img.to_rgb8())
        } else {
            img
        }
    }

    fn decode_gif(bytes: &[u8], low_quality: bool) -> Result<DecodedImage, DecodeError> {
        let decoder =
            GifDecoder::new(Cursor::new(bytes)).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let frames = decoder
            .into_frames()
            .collect_frames()
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;

        let mut frames: Vec<AnimationFrame> = frames
            .into_iter()
            .map(|frame| {
                let (numer, denom) = frame.delay().numer_denom_ms();
                let delay_ms = numer.checked_div(denom).unwrap_or(0);
                let img = DynamicImage::ImageRgba8(frame.into_buffer());
                AnimationFrame {
                    image: Arc::new(Self::finish(img, low_quality)),
                    delay_ms,
                }
            })
            .collect();

        match frames.len() {
            0 => Err(DecodeError::Empty),
            1 => Ok(DecodedImage::Static(frames.remove(0).image)),
            count => {
                trace!(frames = count, "Decoded animated GIF");
                Ok(DecodedImage::Animated(frames))
            }
        }
    }
}

impl Identify for DefaultImageDecoder {
    fn append_identifier(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str("DefaultImageDecoder")
    }
}

impl ImageDecoder for DefaultImageDecoder {
    fn decode(&self, bytes: &[u8], options: &RequestOptions) -> Result<DecodedImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        let format = image::guess_format(bytes).map_err(|_| DecodeError::UnsupportedFormat)?;

        if format == ImageFormat::Gif && options.decode_gif {
            return Self::decode_gif(bytes, options.low_quality);
        }

        let img = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        Ok(DecodedImage::Static(Arc::new(Self::finish(
            img,
            options.low_quality,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Frame, RgbaImage};

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::new_rgba8(8, 4);
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn gif_bytes(frames: usize) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut buf);
            let frames = (0..frames).map(|_| {
                Frame::from_parts(
                    RgbaImage::new(4, 4),
                    0,
                    0,
                    Delay::from_numer_denom_ms(100, 1),
                )
            });
            encoder.encode_frames(frames).unwrap();
        }
        buf
    }

    #[test]
    fn test_decode_png() {
        let decoded = DefaultImageDecoder
            .decode(&png_bytes(), &RequestOptions::default())
            .unwrap();
        let img = decoded.first_frame().unwrap();
        assert_eq!((img.width(), img.height()), (8, 4));
        assert!(img.color().has_alpha());
    }

    #[test]
    fn test_low_quality_drops_alpha() {
        let options = RequestOptions {
            low_quality: true,
            ..RequestOptions::default()
        };
        let decoded = DefaultImageDecoder.decode(&png_bytes(), &options).unwrap();
        assert!(!decoded.first_frame().unwrap().color().has_alpha());
    }

    #[test]
    fn test_animated_gif_respects_policy() {
        let bytes = gif_bytes(3);

        let animated = DefaultImageDecoder
            .decode(&bytes, &RequestOptions::default())
            .unwrap();
        match animated {
            DecodedImage::Animated(frames) => {
                assert_eq!(frames.len(), 3);
                assert_eq!(frames[0].delay_ms, 100);
            }
            DecodedImage::Static(_) => panic!("Expected animated image"),
        }

        let options = RequestOptions {
            decode_gif: false,
            ..RequestOptions::default()
        };
        let still = DefaultImageDecoder.decode(&bytes, &options).unwrap();
        assert!(!still.is_animated());
    }

    #[test]
    fn test_rejects_garbage() {
        let result = DefaultImageDecoder.decode(b"not an image", &RequestOptions::default());
        assert!(matches!(result, Err(DecodeError::UnsupportedFormat)));

        let result = DefaultImageDecoder.decode(b"", &RequestOptions::default());
        assert!(matches!(result, Err(DecodeError::Empty)));
    }
}
