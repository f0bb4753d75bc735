//! Content sniffing for thumbnail sources.
//!
//! The format is decided from the leading bytes only; filenames and client headers are never
//! trusted. Each supported format maps to the decoder that handles it.

use image::{DynamicImage, ImageFormat};

use crate::error::ThumbnailError;

/// Formats the thumbnail engine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Jpeg,
    Png,
    Gif,
    Bmp,
}

/// Sniffed format -> (tag, MIME type). Anything not listed is unsupported.
const DECODERS: [(ImageFormat, ContentType, &str); 4] = [
    (ImageFormat::Jpeg, ContentType::Jpeg, "image/jpeg"),
    (ImageFormat::Png, ContentType::Png, "image/png"),
    (ImageFormat::Gif, ContentType::Gif, "image/gif"),
    (ImageFormat::Bmp, ContentType::Bmp, "image/bmp"),
];

impl ContentType {
    /// Sniff `data` and return the supported format it belongs to, if any.
    pub fn sniff(data: &[u8]) -> Option<ContentType> {
        let format = image::guess_format(data).ok()?;
        DECODERS
            .iter()
            .find(|(f, _, _)| *f == format)
            .map(|(_, content_type, _)| *content_type)
    }

    pub fn mime_type(self) -> &'static str {
        DECODERS
            .iter()
            .find(|(_, c, _)| *c == self)
            .map(|(_, _, mime)| *mime)
            .unwrap_or("application/octet-stream")
    }

    fn image_format(self) -> ImageFormat {
        match self {
            ContentType::Jpeg => ImageFormat::Jpeg,
            ContentType::Png => ImageFormat::Png,
            ContentType::Gif => ImageFormat::Gif,
            ContentType::Bmp => ImageFormat::Bmp,
        }
    }

    /// Decode `data` with this format's decoder. GIFs yield their first frame.
    pub fn decode(self, data: &[u8]) -> Result<DynamicImage, ThumbnailError> {
        image::load_from_memory_with_format(data, self.image_format()).map_err(|e| {
            ThumbnailError::DecodeFailed {
                content_type: self.mime_type(),
                message: e.to_string(),
            }
        })
    }
}

/// Best-effort MIME description of arbitrary bytes, used when reporting unsupported input
/// and when serving stored files.
pub fn describe(data: &[u8]) -> String {
    if let Some(content_type) = ContentType::sniff(data) {
        return content_type.mime_type().to_string();
    }
    if let Ok(format) = image::guess_format(data) {
        return format.to_mime_type().to_string();
    }
    let looks_textual = !data.is_empty()
        && std::str::from_utf8(data)
            .map(|s| !s.chars().any(|c| c.is_control() && !c.is_whitespace()))
            .unwrap_or(false);
    if looks_textual {
        "text/plain; charset=utf-8".to_string()
    } else {
        "application/octet-stream".to_string()
    }
}
