mod common;

use common::*;
use image::DynamicImage;
use numtag::error::RecognizeError;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct FailingRecognizer;

impl TextRecognizer for FailingRecognizer {
    fn recognize(&self, _region: &DynamicImage) -> Result<Vec<TextSpan>, RecognizeError> {
        Err(RecognizeError::Engine(anyhow::anyhow!("engine unavailable")))
    }
}

struct SlowRecognizer;

impl TextRecognizer for SlowRecognizer {
    fn recognize(&self, _region: &DynamicImage) -> Result<Vec<TextSpan>, RecognizeError> {
        std::thread::sleep(Duration::from_millis(500));
        Ok(vec![TextSpan::new("123", 0.9)])
    }
}

fn pipeline_reading(text: &str, confidence: f32) -> Pipeline {
    Pipeline::new(&AppConfig::default())
        .unwrap()
        .with_recognizer(Arc::new(StaticRecognizer::text(text, confidence)))
}

#[test]
fn test_recognized_code_without_voting() {
    let mut pipeline = pipeline_reading("No. 7", 0.8);

    let result = pipeline.process(&tag_frame(), FrameOptions::default());
    assert_eq!(result.status, FrameStatus::RecognizedUnconfirmed);
    assert_eq!(result.code.as_deref(), Some("007"));
    assert!((result.confidence - 0.8).abs() < 1e-6);
    assert_eq!(result.votes, None);

    // Crop is the detection grown by the padding
    let (x, y, w, h) = TAG;
    assert_eq!(
        result.bbox,
        Some(BoundingBox { x1: x - 5, y1: y - 5, x2: x + w + 5, y2: y + h + 5 })
    );
}

#[test]
fn test_raw_crop_is_recognized_too() {
    let mut pipeline = pipeline_reading("042", 0.7);
    let options = FrameOptions { use_preprocessing: false, use_voting: false };

    let result = pipeline.process(&tag_frame(), options);
    assert_eq!(result.code.as_deref(), Some("042"));
}

#[test]
fn test_missing_recognizer_reads_nothing() {
    let mut pipeline = Pipeline::new(&AppConfig::default()).unwrap();
    assert!(!pipeline.has_recognizer());

    let result = pipeline.process(&tag_frame(), FrameOptions::default());
    assert_eq!(result.status, FrameStatus::NoCodeRecognized);
    assert_eq!(result.code, None);
    assert_eq!(result.confidence, 0.0);
    assert!(result.bbox.is_some());
}

#[test]
fn test_no_tag_and_undecodable_frames() {
    let mut pipeline = pipeline_reading("001", 0.9);

    let result = pipeline.process(&blank_frame(), FrameOptions::default());
    assert_eq!(result.status, FrameStatus::NoTagFound);
    assert_eq!(result.bbox, None);

    let result = pipeline.process_bytes(b"not an image", FrameOptions::default());
    assert_eq!(result.status, FrameStatus::NoTagFound);

    let result = pipeline.process_bytes(&encode_png(&tag_frame()), FrameOptions::default());
    assert_eq!(result.status, FrameStatus::RecognizedUnconfirmed);
    assert_eq!(result.code.as_deref(), Some("001"));
}

#[test]
fn test_voting_confirms_after_full_window() {
    let mut pipeline = pipeline_reading("001", 0.9);
    let options = FrameOptions { use_preprocessing: true, use_voting: true };
    let frame = tag_frame();
    let start = Instant::now();

    for i in 0..4 {
        let result = pipeline.process_at(&frame, options, start + Duration::from_millis(100 * i));
        assert_eq!(result.status, FrameStatus::PendingVote);
        assert_eq!(result.code, None);
    }

    let result = pipeline.process_at(&frame, options, start + Duration::from_millis(400));
    assert_eq!(result.status, FrameStatus::Confirmed);
    assert_eq!(result.code.as_deref(), Some("001"));
    assert_eq!(result.votes, Some(5));

    // Same tag still in view: debounced
    let result = pipeline.process_at(&frame, options, start + Duration::from_millis(500));
    assert_eq!(result.status, FrameStatus::PendingVote);

    let stats = pipeline.vote_stats();
    assert_eq!(stats.occupancy, 5);
    assert_eq!(stats.last_confirmed.as_deref(), Some("001"));

    pipeline.reset_votes();
    let stats = pipeline.vote_stats();
    assert_eq!(stats.occupancy, 0);
    assert_eq!(stats.last_confirmed, None);
}

#[test]
fn test_frames_without_tag_do_not_vote() {
    let mut pipeline = pipeline_reading("001", 0.9);
    let options = FrameOptions { use_preprocessing: true, use_voting: true };

    pipeline.process(&blank_frame(), options);
    assert_eq!(pipeline.vote_stats().occupancy, 0);

    // A tag with an unreadable code still takes a slot
    let mut unreadable = Pipeline::new(&AppConfig::default()).unwrap();
    unreadable.process(&tag_frame(), options);
    let stats = unreadable.vote_stats();
    assert_eq!(stats.occupancy, 1);
    assert!(stats.tally.is_empty());
}

#[test]
fn test_batch_summary() {
    let mut pipeline = pipeline_reading("12", 0.6);
    let frames = vec![tag_frame(), blank_frame(), tag_frame()];

    let summary = pipeline.recognize_batch(&frames);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.results[0].code.as_deref(), Some("012"));
    assert_eq!(summary.results[1].status, FrameStatus::NoTagFound);

    // Batches never vote
    assert_eq!(pipeline.vote_stats().occupancy, 0);
}

#[test]
fn test_recognizer_failures_degrade_to_no_code() {
    let mut failing = Pipeline::new(&AppConfig::default())
        .unwrap()
        .with_recognizer(Arc::new(FailingRecognizer));
    let result = failing.process(&tag_frame(), FrameOptions::default());
    assert_eq!(result.status, FrameStatus::NoCodeRecognized);

    let mut config = AppConfig::default();
    config.recognizer.timeout_ms = 50;
    let mut slow = Pipeline::new(&config).unwrap().with_recognizer(Arc::new(SlowRecognizer));

    let start = Instant::now();
    let result = slow.process(&tag_frame(), FrameOptions::default());
    assert_eq!(result.status, FrameStatus::NoCodeRecognized);
    assert_eq!(result.confidence, 0.0);
    assert!(start.elapsed() < Duration::from_millis(450));
}

#[test]
fn test_invalid_config_fails_construction() {
    let mut config = AppConfig::default();
    config.vote.window_size = 0;
    assert!(Pipeline::new(&config).is_err());

    let mut config = AppConfig::default();
    config.vote.threshold = 1.5;
    assert!(Pipeline::new(&config).is_err());

    let mut config = AppConfig::default();
    config.vote.debounce_secs = 1e20;
    assert!(Pipeline::new(&config).is_err());

    let mut config = AppConfig::default();
    config.vote.window_size = usize::MAX;
    assert!(Pipeline::new(&config).is_err());
}

#[test]
fn test_debug_output() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let out = dir.path().join("debug");

    let mut pipeline = pipeline_reading("001", 0.9).with_debug(out.clone())?;
    pipeline.process(&tag_frame(), FrameOptions::default());

    assert!(out.join("001_frame.png").exists());
    assert!(out.join("001_roi.png").exists());

    // Refuses a directory that already holds files
    assert!(pipeline_reading("001", 0.9).with_debug(out).is_err());
    Ok(())
}

#[test]
fn test_detect_frame_writes_annotated_frame() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let out = dir.path().join("debug");

    let mut pipeline = Pipeline::new(&AppConfig::default())?.with_debug(out.clone())?;
    let detections = pipeline.detect_frame(&tag_frame());
    assert_eq!(detections.len(), 1);
    pipeline.detect_frame(&blank_frame());

    assert!(out.join("001_frame.png").exists());
    assert!(out.join("002_frame.png").exists());
    assert!(!out.join("001_roi.png").exists());
    Ok(())
}

#[test]
fn test_status_serializes_snake_case() {
    let mut pipeline = Pipeline::new(&AppConfig::default()).unwrap();
    let result = pipeline.process(&blank_frame(), FrameOptions::default());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "no_tag_found");
    assert!(json["bbox"].is_null());
    assert_eq!(FrameStatus::NoTagFound.message(), "no number tag detected");
}

#[test]
fn test_bbox_serializes_as_four_ints() {
    let mut pipeline = pipeline_reading("001", 0.9);
    let result = pipeline.process(&tag_frame(), FrameOptions::default());

    let (x, y, w, h) = TAG;
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["bbox"], serde_json::json!([x - 5, y - 5, x + w + 5, y + h + 5]));
    assert_eq!(json["code"], "001");
}
