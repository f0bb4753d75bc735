use bytes::Bytes;
use image::GenericImageView;

use crate::compression::JpegCompressor;
use crate::content_type::{describe, ContentType};
use crate::error::ThumbnailError;
use crate::image::resize::ImageResize;

/// What to generate for one source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThumbnailParams {
    pub filename: String,
    pub resolution: u32,
    pub square: bool,
}

impl ThumbnailParams {
    pub fn new(filename: impl Into<String>, resolution: u32, square: bool) -> Self {
        Self {
            filename: filename.into(),
            resolution,
            square,
        }
    }

    /// Name the generated bytes are cached under. Distinct parameters never share a name,
    /// so an existing file can be reused as-is.
    pub fn derived_filename(&self) -> String {
        if self.square {
            format!("{}.{}.sq.thumb.jpg", self.filename, self.resolution)
        } else {
            format!("{}.{}.thumb.jpg", self.filename, self.resolution)
        }
    }
}

/// Turns raw image bytes into JPEG thumbnails. Holds no state besides the output quality, so
/// one instance can be shared across tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThumbnailGenerator {
    compressor: JpegCompressor,
}

impl ThumbnailGenerator {
    pub fn new(quality: u8) -> Self {
        Self {
            compressor: JpegCompressor::new(quality),
        }
    }

    pub fn quality(&self) -> u8 {
        self.compressor.quality()
    }

    /// Generate a thumbnail of `source`. Square mode crops the centered square first; fit
    /// mode keeps the whole image. Identical inputs produce identical bytes.
    pub fn generate(
        &self,
        source: &[u8],
        resolution: u32,
        square: bool,
    ) -> Result<Bytes, ThumbnailError> {
        if resolution == 0 {
            return Err(ThumbnailError::InvalidResolution(resolution));
        }

        let content_type = ContentType::sniff(source)
            .ok_or_else(|| ThumbnailError::UnsupportedContentType(describe(source)))?;
        let img = content_type.decode(source)?;
        let (width, height) = img.dimensions();

        let thumb = if square {
            ImageResize::crop_square(&img, resolution)
        } else {
            ImageResize::fit(&img, resolution)
        };
        let encoded = self.compressor.encode(&thumb)?;

        tracing::debug!(
            content_type = content_type.mime_type(),
            source_width = width,
            source_height = height,
            resolution = resolution,
            square = square,
            output_size = encoded.len(),
            "Thumbnail generated"
        );

        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn encode_source(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, format)
            .unwrap();
        cursor.into_inner()
    }

    fn output_dimensions(bytes: &[u8]) -> (u32, u32) {
        assert_eq!(image::guess_format(bytes).unwrap(), ImageFormat::Jpeg);
        image::load_from_memory(bytes).unwrap().dimensions()
    }

    #[test]
    fn test_square_thumbnail_dimensions() {
        let source = encode_source(400, 200, ImageFormat::Png);
        let out = ThumbnailGenerator::new(90).generate(&source, 100, true).unwrap();
        assert_eq!(output_dimensions(&out), (100, 100));
    }

    #[test]
    fn test_fit_thumbnail_dimensions() {
        let source = encode_source(400, 200, ImageFormat::Png);
        let out = ThumbnailGenerator::new(90).generate(&source, 100, false).unwrap();
        assert_eq!(output_dimensions(&out), (100, 50));
    }

    #[test]
    fn test_all_supported_formats() {
        let generator = ThumbnailGenerator::default();
        for format in [
            ImageFormat::Png,
            ImageFormat::Jpeg,
            ImageFormat::Gif,
            ImageFormat::Bmp,
        ] {
            let source = encode_source(64, 32, format);
            let out = generator.generate(&source, 16, false).unwrap();
            assert_eq!(output_dimensions(&out), (16, 8), "format {:?}", format);
        }
    }

    #[test]
    fn test_output_is_deterministic() {
        let source = encode_source(120, 80, ImageFormat::Png);
        let generator = ThumbnailGenerator::new(75);
        let a = generator.generate(&source, 50, true).unwrap();
        let b = generator.generate(&source, 50, true).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_text_is_unsupported() {
        let err = ThumbnailGenerator::default()
            .generate(b"<html><body>not an image</body></html>", 100, true)
            .unwrap_err();
        assert!(matches!(err, ThumbnailError::UnsupportedContentType(ref t) if t.starts_with("text/plain")));
    }

    #[test]
    fn test_corrupt_png_fails_decode() {
        let mut source = encode_source(40, 40, ImageFormat::Png);
        source.truncate(40);
        let err = ThumbnailGenerator::default()
            .generate(&source, 10, false)
            .unwrap_err();
        assert!(matches!(err, ThumbnailError::DecodeFailed { .. }));
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let source = encode_source(10, 10, ImageFormat::Png);
        assert_eq!(
            ThumbnailGenerator::default().generate(&source, 0, true),
            Err(ThumbnailError::InvalidResolution(0))
        );
    }

    #[test]
    fn test_derived_filename() {
        assert_eq!(
            ThumbnailParams::new("cat.png", 128, false).derived_filename(),
            "cat.png.128.thumb.jpg"
        );
        assert_eq!(
            ThumbnailParams::new("cat.png", 128, true).derived_filename(),
            "cat.png.128.sq.thumb.jpg"
        );
    }
}
