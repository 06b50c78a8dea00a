mod common;

use common::*;
use image::RgbImage;
use numtag::detection::{ContourTagDetector, TagDetector};

#[test]
fn test_single_tag_is_detected() {
    let detector = ContourTagDetector::default();
    let frame = tag_frame();

    let detections = detector.detect_merged(&frame);
    assert_eq!(detections.len(), 1);

    let det = &detections[0];
    assert_eq!(det.confidence, 0.85);
    assert_eq!(det.label, "number_tag");
    assert!(det.bbox.x2 <= frame.width());
    assert!(det.bbox.y2 <= frame.height());

    let (x, y, w, h) = TAG;
    assert_eq!(det.bbox, BoundingBox { x1: x, y1: y, x2: x + w, y2: y + h });
}

#[test]
fn test_blank_frame_has_no_tags() {
    let detector = ContourTagDetector::default();
    assert!(detector.detect(&blank_frame()).is_empty());
}

#[test]
fn test_wrong_shapes_are_rejected() {
    let detector = ContourTagDetector::default();

    // Tall instead of wide
    let mut img = RgbImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, image::Rgb([40, 40, 40]));
    draw_tag(&mut img, 50, 50, 40, 120);
    assert!(detector.detect(&image::DynamicImage::ImageRgb8(img)).is_empty());

    // Right shape but nothing printed on it
    assert!(detector.detect(&plain_patch_frame(150, 60)).is_empty());
}

#[test]
fn test_largest_tag_comes_first() {
    let detector = ContourTagDetector::default();

    let mut img = RgbImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, image::Rgb([40, 40, 40]));
    draw_tag(&mut img, 20, 220, 120, 48);
    let (x, y, w, h) = TAG;
    draw_tag(&mut img, x, y, w, h);

    let detections = detector.detect_merged(&image::DynamicImage::ImageRgb8(img));
    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0].bbox.x1, x);
    assert_eq!(detections[1].bbox.x1, 20);
    assert!(detections[0].bbox.area() > detections[1].bbox.area());
}
