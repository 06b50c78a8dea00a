use image::GrayImage;
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::point::Point;

use crate::detection::preprocessing;
use crate::models::TagCandidate;

/// Trace the outermost contours of a binary mask and measure each one.
///
/// Only top-level outer borders are kept; holes and anything nested inside
/// a hole are ignored. Ink statistics are read from `gray`.
pub fn find_tag_candidates(
    mask: &GrayImage,
    gray: &GrayImage,
    dark_threshold: u8,
) -> Vec<TagCandidate> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| measure(&c, gray, dark_threshold))
        .collect()
}

fn measure(contour: &Contour<i32>, gray: &GrayImage, dark_threshold: u8) -> Option<TagCandidate> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    if min_x < 0 || min_y < 0 {
        return None;
    }

    let (min_x, min_y, max_x, max_y) = (min_x as u32, min_y as u32, max_x as u32, max_y as u32);
    Some(TagCandidate {
        min_x,
        min_y,
        max_x,
        max_y,
        area: polygon_area(&contour.points),
        dark_ratio: preprocessing::dark_ratio(gray, min_x, min_y, max_x, max_y, dark_threshold),
    })
}

/// Shoelace area of a closed polygon
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice: i64 = 0;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        twice += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    twice.unsigned_abs() as f64 / 2.0
}
