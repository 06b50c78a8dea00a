pub mod contours;
pub mod merge;
pub mod preprocessing;

use image::DynamicImage;
use tracing::debug;

use crate::config::DetectorConfig;
use crate::models::{BoundingBox, Detection, TagCandidate};

pub use merge::merge_detections;

/// Finds candidate tag regions in a frame.
///
/// Implementations return raw candidates in their own emission order;
/// duplicates are resolved afterwards by [`merge_detections`].
pub trait TagDetector: Send + Sync {
    fn detect(&self, frame: &DynamicImage) -> Vec<Detection>;
}

/// Heuristic detector for light rectangular tags carrying dark print
pub struct ContourTagDetector {
    config: DetectorConfig,
}

impl ContourTagDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Every external contour of the bright-region mask, measured but unfiltered
    pub fn candidates(&self, frame: &DynamicImage) -> Vec<TagCandidate> {
        let gray = preprocessing::to_grayscale(frame);
        let mask = preprocessing::bright_mask(&gray, self.config.brightness_threshold);
        let mask = preprocessing::close_mask(
            &mask,
            self.config.closing_kernel,
            self.config.closing_iterations,
        );
        contours::find_tag_candidates(&mask, &gray, self.config.dark_threshold)
    }

    /// Whether a candidate has the shape and ink coverage of a printed tag
    pub fn accepts(&self, candidate: &TagCandidate, frame_area: f64) -> bool {
        let c = &self.config;
        let max_area = frame_area * c.max_area_fraction;
        if candidate.area < c.min_area || candidate.area > max_area {
            return false;
        }
        if candidate.width() < c.min_width || candidate.height() < c.min_height {
            return false;
        }

        let aspect = candidate.aspect_ratio();
        if !(aspect > c.min_aspect && aspect < c.max_aspect) {
            return false;
        }

        candidate.dark_ratio > c.min_dark_ratio && candidate.dark_ratio < c.max_dark_ratio
    }

    /// Detect and merge in one call
    pub fn detect_merged(&self, frame: &DynamicImage) -> Vec<Detection> {
        merge_detections(
            self.detect(frame),
            frame.height(),
            frame.width(),
            self.config.overlap_ratio,
            self.config.max_results,
        )
    }
}

impl Default for ContourTagDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl TagDetector for ContourTagDetector {
    fn detect(&self, frame: &DynamicImage) -> Vec<Detection> {
        if frame.width() == 0 || frame.height() == 0 {
            debug!("Empty frame, skipping tag detection");
            return Vec::new();
        }

        let frame_area = frame.width() as f64 * frame.height() as f64;
        let candidates = self.candidates(frame);

        let detections: Vec<Detection> = candidates
            .iter()
            .filter(|c| {
                let accepted = self.accepts(c, frame_area);
                if !accepted {
                    debug!(
                        "Rejected contour at ({}, {}): {}x{}, area={:.0}, aspect={:.2}, dark={:.2}",
                        c.min_x,
                        c.min_y,
                        c.width(),
                        c.height(),
                        c.area,
                        c.aspect_ratio(),
                        c.dark_ratio
                    );
                }
                accepted
            })
            .filter_map(|c| {
                let b = c.bbox();
                BoundingBox::clamped(
                    b.x1 as i64,
                    b.y1 as i64,
                    b.x2 as i64,
                    b.y2 as i64,
                    frame.width(),
                    frame.height(),
                )
            })
            .map(|bbox| Detection {
                bbox,
                confidence: self.config.confidence,
                label: self.config.label.clone(),
            })
            .collect();

        debug!(
            "Found {} tag candidates (from {} contours)",
            detections.len(),
            candidates.len()
        );
        detections
    }
}
