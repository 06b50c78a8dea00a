use crate::models::{BoundingBox, Detection};

/// Collapse overlapping detections and keep the `max_results` largest.
///
/// Candidates are visited in emission order. A candidate whose overlap with an
/// already kept box exceeds `overlap_ratio` of its own area is a duplicate:
/// the kept entry takes the candidate's box and confidence only when the
/// candidate is strictly more confident. Boxes are clamped to the frame first;
/// boxes left empty by clamping are dropped.
pub fn merge_detections(
    detections: Vec<Detection>,
    frame_height: u32,
    frame_width: u32,
    overlap_ratio: f32,
    max_results: usize,
) -> Vec<Detection> {
    let mut merged: Vec<Detection> = Vec::with_capacity(detections.len());

    for mut det in detections {
        let b = det.bbox;
        let Some(bbox) = BoundingBox::clamped(
            b.x1 as i64,
            b.y1 as i64,
            b.x2 as i64,
            b.y2 as i64,
            frame_width,
            frame_height,
        ) else {
            continue;
        };
        det.bbox = bbox;

        let limit = bbox.area() as f64 * overlap_ratio as f64;
        let duplicate_of = merged
            .iter()
            .position(|existing| existing.bbox.intersection_area(&bbox) as f64 > limit);

        match duplicate_of {
            Some(i) => {
                let existing = &mut merged[i];
                if det.confidence > existing.confidence {
                    existing.bbox = det.bbox;
                    existing.confidence = det.confidence;
                }
            }
            None => merged.push(det),
        }
    }

    // Stable sort: equal areas keep their emission order
    merged.sort_by(|a, b| b.bbox.area().cmp(&a.bbox.area()));
    merged.truncate(max_results);
    merged
}
