//! Image transforms
//!
//! - Crop and fit geometry with nearest-neighbor scaling (resize)
//! - End-to-end thumbnail generation: sniff, decode, transform, encode (thumbnail)

pub mod resize;
pub mod thumbnail;

pub use resize::{CropRegion, ImageResize};
pub use thumbnail::{ThumbnailGenerator, ThumbnailParams};
