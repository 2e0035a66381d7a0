//! # Resizer
//!
//! Decoding, thumbnail scaling and JPEG encoding. All functions here are
//! CPU-bound and blocking; async callers run them on the blocking pool.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};

use crate::cache::Dimensions;
use crate::error::ThumbnailError;

pub trait Resizer: Send + Sync {
    /// Native dimensions read from the image header.
    fn dimensions(&self, data: &[u8]) -> Result<Dimensions, ThumbnailError>;

    /// Decode `data`, fit it within `bounds` preserving aspect ratio and
    /// return the encoded JPEG.
    fn thumbnail(&self, data: &[u8], bounds: Dimensions) -> Result<Bytes, ThumbnailError>;
}

/// Largest size that fits `native` within `bounds` without changing its
/// aspect ratio. Images that already fit are never upscaled.
pub fn fit_within(native: Dimensions, bounds: Dimensions) -> Dimensions {
    let (orig_w, orig_h) = (u64::from(native.width()), u64::from(native.height()));
    let (max_w, max_h) = (u64::from(bounds.width()), u64::from(bounds.height()));

    if max_w >= orig_w && max_h >= orig_h {
        return native;
    }

    let (mut w, mut h) = (orig_w, orig_h);
    if orig_w > max_w {
        h = (orig_h * max_w / orig_w).max(1);
        w = max_w;
    }
    if h > max_h {
        w = (w * max_h / h).max(1);
        h = max_h;
    }

    // Both sides are bounded by the u32 inputs and clamped to at least 1
    Dimensions::new(w as u32, h as u32).unwrap_or(native)
}

/// [`Resizer`] backed by the `image` crate.
#[derive(Debug, Clone)]
pub struct ImageResizer {
    quality: u8,
    filter: FilterType,
}

impl ImageResizer {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            filter: FilterType::Lanczos3,
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    fn decode(data: &[u8]) -> Result<DynamicImage, ThumbnailError> {
        image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map_err(|e| ThumbnailError::Decode(e.to_string()))
    }

    fn encode(&self, image: &DynamicImage) -> Result<Bytes, ThumbnailError> {
        let mut out = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut out, self.quality);
        // JPEG has no alpha channel or 16-bit depth
        DynamicImage::ImageRgb8(image.to_rgb8())
            .write_with_encoder(encoder)
            .map_err(|e| ThumbnailError::Encode(e.to_string()))?;
        Ok(Bytes::from(out))
    }
}

impl Default for ImageResizer {
    fn default() -> Self {
        Self::new(75)
    }
}

impl Resizer for ImageResizer {
    fn dimensions(&self, data: &[u8]) -> Result<Dimensions, ThumbnailError> {
        let (width, height) = ImageReader::with_format(Cursor::new(data), ImageFormat::Jpeg)
            .into_dimensions()
            .map_err(|e| ThumbnailError::Decode(e.to_string()))?;

        Dimensions::new(width, height)
            .ok_or_else(|| ThumbnailError::Decode(format!("invalid image size {width}x{height}")))
    }

    fn thumbnail(&self, data: &[u8], bounds: Dimensions) -> Result<Bytes, ThumbnailError> {
        let source = Self::decode(data)?;
        let native = Dimensions::new(source.width(), source.height()).ok_or_else(|| {
            ThumbnailError::Decode(format!(
                "invalid image size {}x{}",
                source.width(),
                source.height()
            ))
        })?;

        let target = fit_within(native, bounds);
        if target == native {
            return self.encode(&source);
        }

        let scaled = source.resize_exact(target.width(), target.height(), self.filter);
        self.encode(&scaled)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use image::{Rgb, RgbImage};

    fn dims(w: u32, h: u32) -> Dimensions {
        Dimensions::new(w, h).unwrap()
    }

    /// Encode a gradient test image as JPEG.
    pub(crate) fn sample_jpeg(width: u32, height: u32) -> Bytes {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, 90)
            .encode_image(&img)
            .unwrap();
        Bytes::from(out)
    }

    #[test]
    fn test_fit_within_preserves_aspect_ratio() {
        assert_eq!(fit_within(dims(400, 200), dims(100, 100)), dims(100, 50));
        assert_eq!(fit_within(dims(200, 400), dims(100, 100)), dims(50, 100));
        assert_eq!(fit_within(dims(400, 200), dims(300, 50)), dims(100, 50));
    }

    #[test]
    fn test_fit_within_never_upscales() {
        assert_eq!(fit_within(dims(40, 20), dims(100, 100)), dims(40, 20));
        assert_eq!(fit_within(dims(100, 100), dims(100, 100)), dims(100, 100));
    }

    #[test]
    fn test_fit_within_clamps_to_one_pixel() {
        assert_eq!(fit_within(dims(1000, 1), dims(10, 10)), dims(10, 1));
        assert_eq!(fit_within(dims(1, 1000), dims(10, 10)), dims(1, 10));
    }

    #[test]
    fn test_dimensions_from_header() {
        let resizer = ImageResizer::default();
        assert_eq!(
            resizer.dimensions(&sample_jpeg(64, 48)).unwrap(),
            dims(64, 48)
        );
    }

    #[test]
    fn test_thumbnail_fits_bounding_box() {
        let resizer = ImageResizer::default();
        let thumb = resizer
            .thumbnail(&sample_jpeg(400, 200), dims(100, 100))
            .unwrap();

        let out = resizer.dimensions(&thumb).unwrap();
        assert_eq!(out, dims(100, 50));
        assert_eq!(out.width(), 2 * out.height());
    }

    #[test]
    fn test_thumbnail_is_deterministic() {
        let resizer = ImageResizer::default();
        let source = sample_jpeg(120, 80);
        let a = resizer.thumbnail(&source, dims(30, 30)).unwrap();
        let b = resizer.thumbnail(&source, dims(30, 30)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_garbage_is_decode_failure() {
        let resizer = ImageResizer::default();
        let err = resizer
            .thumbnail(b"<html>not an image</html>", dims(10, 10))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeFailure);
        assert_eq!(
            resizer.dimensions(b"nope").unwrap_err().kind(),
            ErrorKind::DecodeFailure
        );
    }

    #[test]
    fn test_quality_is_clamped() {
        assert_eq!(ImageResizer::new(0).quality(), 1);
        assert_eq!(ImageResizer::new(255).quality(), 100);
    }
}
