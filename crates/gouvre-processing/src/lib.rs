//! Gouvre Thumbnail Processing Library
//!
//! Pure image transforms: content sniffing against the supported formats, centered-crop and
//! aspect-fit resizing with nearest-neighbor sampling, and JPEG re-encoding.

pub mod compression;
pub mod content_type;
pub mod error;
pub mod image;

// Re-export commonly used types
pub use content_type::ContentType;
pub use error::ThumbnailError;
pub use crate::image::{CropRegion, ImageResize, ThumbnailGenerator, ThumbnailParams};
