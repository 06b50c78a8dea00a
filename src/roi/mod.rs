//! Region-of-interest cropping and enhancement for text recognition

pub mod clahe;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use tracing::warn;

use crate::config::PreprocessConfig;
use crate::error::RegionError;
use crate::models::BoundingBox;

/// Crop `bbox` grown by `padding` pixels, clamped to the frame.
/// Returns the padded box together with the pixels.
pub fn crop_region(
    frame: &DynamicImage,
    bbox: &BoundingBox,
    padding: u32,
) -> Result<(BoundingBox, DynamicImage), RegionError> {
    let (width, height) = frame.dimensions();
    let padded = bbox.padded(padding, width, height).ok_or(RegionError::OutsideFrame)?;
    let region = frame.crop_imm(padded.x1, padded.y1, padded.width(), padded.height());
    Ok((padded, region))
}

/// Enhance a cropped region before recognition.
///
/// Steps run in order: upscale small regions, CLAHE on luminance, optional
/// sharpening, optional Otsu binarization. A step that cannot run on its
/// input leaves that input unchanged.
pub fn prepare_for_recognition(region: &DynamicImage, config: &PreprocessConfig) -> DynamicImage {
    let mut current = region.to_rgb8();

    current = apply_step("upscale", current, |img| upscale(img, config.min_side));
    current = apply_step("contrast equalization", current, |img| {
        equalize_luminance(img, config.clahe_clip_limit, config.clahe_tiles)
    });
    if config.sharpen {
        current = apply_step("sharpen", current, sharpen);
    }
    if config.binarize {
        current = apply_step("binarize", current, binarize);
    }

    DynamicImage::ImageRgb8(current)
}

fn apply_step<F>(name: &str, image: RgbImage, step: F) -> RgbImage
where
    F: FnOnce(&RgbImage) -> Result<RgbImage, RegionError>,
{
    match step(&image) {
        Ok(out) => out,
        Err(e) => {
            warn!("ROI {} skipped: {}", name, e);
            image
        }
    }
}

/// Upscale so the shorter side reaches `min_side`, keeping the aspect ratio.
/// Regions already large enough are returned as they are.
pub fn upscale(image: &RgbImage, min_side: u32) -> Result<RgbImage, RegionError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(RegionError::Empty);
    }

    let shorter = width.min(height);
    if shorter >= min_side {
        return Ok(image.clone());
    }

    let scale = min_side as f32 / shorter as f32;
    let scaled_w = ((width as f32 * scale).round() as u32).max(min_side);
    let scaled_h = ((height as f32 * scale).round() as u32).max(min_side);

    Ok(image::imageops::resize(image, scaled_w, scaled_h, FilterType::CatmullRom))
}

/// Run CLAHE on the luminance and shift every channel by the same amount,
/// leaving chroma untouched.
pub fn equalize_luminance(
    image: &RgbImage,
    clip_limit: f32,
    tiles: u32,
) -> Result<RgbImage, RegionError> {
    let luma = DynamicImage::ImageRgb8(image.clone()).to_luma8();
    let equalized = clahe::clahe(&luma, clip_limit, tiles)?;

    Ok(RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let delta = equalized.get_pixel(x, y)[0] as i16 - luma.get_pixel(x, y)[0] as i16;
        let Rgb(c) = *image.get_pixel(x, y);
        Rgb(c.map(|v| (v as i16 + delta).clamp(0, 255) as u8))
    }))
}

/// 3x3 sharpening kernel `[0 -1 0; -1 5 -1; 0 -1 0]` per channel; the
/// one-pixel border is copied unchanged.
pub fn sharpen(image: &RgbImage) -> Result<RgbImage, RegionError> {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return Err(RegionError::TooSmall { width, height });
    }

    let mut sharpened = image.clone();
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = image.get_pixel(x, y);
            let top = image.get_pixel(x, y - 1);
            let bottom = image.get_pixel(x, y + 1);
            let left = image.get_pixel(x - 1, y);
            let right = image.get_pixel(x + 1, y);

            let mut out = [0u8; 3];
            for (c, value) in out.iter_mut().enumerate() {
                let v = center[c] as f32 * 5.0
                    - (top[c] as f32 + bottom[c] as f32 + left[c] as f32 + right[c] as f32);
                *value = v.clamp(0.0, 255.0) as u8;
            }
            sharpened.put_pixel(x, y, Rgb(out));
        }
    }

    Ok(sharpened)
}

/// Global Otsu threshold on luminance, expanded back to three channels
pub fn binarize(image: &RgbImage) -> Result<RgbImage, RegionError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(RegionError::Empty);
    }

    let gray = DynamicImage::ImageRgb8(image.clone()).to_luma8();
    let level = otsu_level(&gray);
    let binary = threshold(&gray, level, ThresholdType::Binary);
    Ok(DynamicImage::ImageLuma8(binary).to_rgb8())
}
