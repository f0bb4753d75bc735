use image::{imageops::FilterType, DynamicImage, GenericImageView};

/// Source region kept by square mode before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

impl CropRegion {
    /// Largest square centered on the longer axis of a `width × height` source.
    pub fn centered_square(width: u32, height: u32) -> Self {
        let size = width.min(height);
        Self {
            x: (width - size) / 2,
            y: (height - size) / 2,
            size,
        }
    }
}

/// Geometry for the two thumbnail modes. All scaling is nearest-neighbor.
pub struct ImageResize;

impl ImageResize {
    /// Target size for fit mode: the longer side becomes `resolution`, the shorter side is
    /// scaled by the aspect ratio and truncated. Never returns a zero dimension.
    pub fn fit_dimensions(width: u32, height: u32, resolution: u32) -> (u32, u32) {
        let smallest = width.min(height) as f64;
        let largest = width.max(height) as f64;
        if largest == 0.0 {
            return (resolution, resolution);
        }

        let ratio = smallest / largest;
        let scaled = ((resolution as f64 * ratio) as u32).max(1);
        if width >= height {
            (resolution, scaled)
        } else {
            (scaled, resolution)
        }
    }

    /// Crop the centered square and scale it to exactly `resolution × resolution`.
    pub fn crop_square(img: &DynamicImage, resolution: u32) -> DynamicImage {
        let (width, height) = img.dimensions();
        let region = CropRegion::centered_square(width, height);

        tracing::debug!(
            source_width = width,
            source_height = height,
            crop_x = region.x,
            crop_y = region.y,
            crop_size = region.size,
            resolution = resolution,
            "Cropping square thumbnail"
        );

        img.crop_imm(region.x, region.y, region.size, region.size)
            .resize_exact(resolution, resolution, FilterType::Nearest)
    }

    /// Scale the whole image so its longer side is `resolution`, keeping the aspect ratio.
    pub fn fit(img: &DynamicImage, resolution: u32) -> DynamicImage {
        let (width, height) = img.dimensions();
        let (target_width, target_height) = Self::fit_dimensions(width, height, resolution);

        tracing::debug!(
            source_width = width,
            source_height = height,
            target_width = target_width,
            target_height = target_height,
            "Fitting thumbnail"
        );

        img.resize_exact(target_width, target_height, FilterType::Nearest)
    }
}
