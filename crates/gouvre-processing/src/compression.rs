//! JPEG encoding for generated thumbnails.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::error::ThumbnailError;

/// Quality used when nothing else is configured.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Re-encodes images as baseline JPEG at a fixed quality.
#[derive(Debug, Clone, Copy)]
pub struct JpegCompressor {
    quality: u8,
}

impl Default for JpegCompressor {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl JpegCompressor {
    /// Quality is clamped to 1..=100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode `img`. Alpha is dropped since JPEG has no transparency.
    pub fn encode(&self, img: &DynamicImage) -> Result<Bytes, ThumbnailError> {
        let rgb = img.to_rgb8();
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, self.quality)
            .encode_image(&rgb)
            .map_err(|e| ThumbnailError::EncodeFailed(e.to_string()))?;
        Ok(Bytes::from(buffer))
    }
}
