use image::{DynamicImage, GrayImage};
use imageproc::contrast::{ThresholdType, threshold};
use imageproc::distance_transform::Norm;
use imageproc::morphology::close;

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Keep only pixels brighter than `level` (tag backgrounds)
pub fn bright_mask(gray: &GrayImage, level: u8) -> GrayImage {
    threshold(gray, level, ThresholdType::Binary)
}

/// Morphological closing with a square `kernel` and `iterations` passes.
///
/// As with OpenCV's `iterations`, the mask is dilated `iterations` times and
/// then eroded as often. Successive dilations by a square add up to one
/// dilation by a larger square (likewise for erosion), so both phases run
/// once with the combined radius.
pub fn close_mask(mask: &GrayImage, kernel: u32, iterations: u32) -> GrayImage {
    let radius = (kernel / 2).saturating_mul(iterations).min(u8::MAX as u32) as u8;
    if radius == 0 {
        return mask.clone();
    }
    close(mask, Norm::LInf, radius)
}

/// Fraction of pixels inside the inclusive rectangle darker than `level`
pub fn dark_ratio(
    gray: &GrayImage,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    level: u8,
) -> f32 {
    let max_x = max_x.min(gray.width().saturating_sub(1));
    let max_y = max_y.min(gray.height().saturating_sub(1));
    if gray.width() == 0 || gray.height() == 0 || min_x > max_x || min_y > max_y {
        return 0.0;
    }

    let mut dark: u64 = 0;
    let mut total: u64 = 0;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            if gray.get_pixel(x, y)[0] < level {
                dark += 1;
            }
            total += 1;
        }
    }

    dark as f32 / total as f32
}
