//! Test fixtures: small images encoded with the `image` crate.

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// Solid-colour PNG of the given size.
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

pub fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Jpeg)
}

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 90]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format)
        .expect("Failed to encode fixture");
    out.into_inner()
}

/// Width and height of an encoded image.
pub fn dimensions(data: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(data).expect("Failed to decode image");
    (img.width(), img.height())
}
