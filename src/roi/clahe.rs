//! Contrast-limited adaptive histogram equalization on 8-bit grayscale.
//!
//! The image is split into a grid of tiles; each tile gets a clipped,
//! redistributed histogram and its own lookup table. Output pixels blend the
//! four nearest tile tables bilinearly.

use image::{GrayImage, Luma};

use crate::error::RegionError;

const BINS: usize = 256;

/// Equalize `gray` with at most `tiles` x `tiles` tiles.
///
/// `clip_limit` is relative to a flat histogram: a bin may hold at most
/// `clip_limit * tile_pixels / 256` samples (and never fewer than one).
pub fn clahe(gray: &GrayImage, clip_limit: f32, tiles: u32) -> Result<GrayImage, RegionError> {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Err(RegionError::Empty);
    }

    let tile_w = width.div_ceil(tiles.clamp(1, width));
    let tile_h = height.div_ceil(tiles.clamp(1, height));
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            luts.push(tile_lut(gray, x0, y0, x1, y1, clip_limit));
        }
    }

    let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];

    Ok(GrayImage::from_fn(width, height, |x, y| {
        let (tx0, tx1, ax) = neighbours(x, tile_w, tiles_x);
        let (ty0, ty1, ay) = neighbours(y, tile_h, tiles_y);
        let v = gray.get_pixel(x, y)[0] as usize;

        let top = lut_at(tx0, ty0)[v] * (1.0 - ax) + lut_at(tx1, ty0)[v] * ax;
        let bottom = lut_at(tx0, ty1)[v] * (1.0 - ax) + lut_at(tx1, ty1)[v] * ax;
        let value = top * (1.0 - ay) + bottom * ay;

        Luma([value.round().clamp(0.0, 255.0) as u8])
    }))
}

/// Lookup table of one tile after clipping and redistribution
fn tile_lut(gray: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [f32; BINS] {
    let mut hist = [0u32; BINS];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[gray.get_pixel(x, y)[0] as usize] += 1;
        }
    }
    let pixels = (x1 - x0) * (y1 - y0);

    let clip = ((clip_limit * pixels as f32 / BINS as f32) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }

    let batch = excess / BINS as u32;
    let residual = excess as usize % BINS;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (BINS / residual).max(1);
        for bin in hist.iter_mut().step_by(step).take(residual) {
            *bin += 1;
        }
    }

    let scale = 255.0 / pixels as f32;
    let mut lut = [0f32; BINS];
    let mut cdf = 0u32;
    for (i, &count) in hist.iter().enumerate() {
        cdf += count;
        lut[i] = cdf as f32 * scale;
    }
    lut
}

/// Indices of the two tiles whose centres bracket `pos`, and the blend weight
fn neighbours(pos: u32, tile: u32, count: u32) -> (u32, u32, f32) {
    let f = (pos as f32 + 0.5) / tile as f32 - 0.5;
    if f <= 0.0 {
        return (0, 0, 0.0);
    }
    let i0 = (f.floor() as u32).min(count - 1);
    let i1 = (i0 + 1).min(count - 1);
    (i0, i1, (f - i0 as f32).clamp(0.0, 1.0))
}
