use image::{DynamicImage, Rgb};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::{AppConfig, DetectorConfig, PreprocessConfig};
use crate::decode::{FrameDecoder, ImageFrameDecoder};
use crate::detection::{ContourTagDetector, TagDetector, merge_detections};
use crate::error::ConfigError;
use crate::models::{BoundingBox, Detection};
use crate::recognition::{ExtractedNumber, TextRecognizer, TimeoutRecognizer, extract_number};
use crate::roi;
use crate::vote::{VoteConfirmer, VoteDecision, VoteStats};

/// Per-frame switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameOptions {
    /// Enhance the region before recognition
    pub use_preprocessing: bool,
    /// Feed the reading into the stream's vote window
    pub use_voting: bool,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            use_preprocessing: true,
            use_voting: false,
        }
    }
}

/// What happened to one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    NoTagFound,
    NoCodeRecognized,
    RecognizedUnconfirmed,
    Confirmed,
    PendingVote,
}

impl FrameStatus {
    pub fn message(&self) -> &'static str {
        match self {
            FrameStatus::NoTagFound => "no number tag detected",
            FrameStatus::NoCodeRecognized => "tag found but no code recognized",
            FrameStatus::RecognizedUnconfirmed => "code recognized",
            FrameStatus::Confirmed => "code confirmed by vote",
            FrameStatus::PendingVote => "vote pending, keep sending frames",
        }
    }
}

/// Result record for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameResult {
    pub code: Option<String>,
    pub confidence: f32,
    /// Padded crop as `[x1, y1, x2, y2]`
    #[serde(serialize_with = "serialize_box")]
    pub bbox: Option<BoundingBox>,
    pub status: FrameStatus,
    /// Winning vote count, set only for confirmed results
    pub votes: Option<usize>,
}

impl FrameResult {
    fn no_tag() -> Self {
        Self {
            code: None,
            confidence: 0.0,
            bbox: None,
            status: FrameStatus::NoTagFound,
            votes: None,
        }
    }
}

fn serialize_box<S>(bbox: &Option<BoundingBox>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    bbox.map(|b| b.to_array()).serialize(serializer)
}

/// Results of independent frames processed without voting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub results: Vec<FrameResult>,
    pub total: usize,
    /// Frames that produced a code
    pub successful: usize,
}

/// Where per-frame debug images go
#[derive(Clone, Debug)]
pub struct DebugConfig {
    pub output_dir: PathBuf,
}

/// Tag recognition for one logical stream of frames.
///
/// Detection, cropping, enhancement and recognition keep no state between
/// frames; only the vote confirmer does. Give every camera or session its own
/// pipeline.
pub struct Pipeline {
    detector: Box<dyn TagDetector>,
    detector_config: DetectorConfig,
    preprocess: PreprocessConfig,
    recognizer: Option<Arc<dyn TextRecognizer>>,
    recognizer_timeout: std::time::Duration,
    decoder: Box<dyn FrameDecoder>,
    confirmer: VoteConfirmer,
    debug: Option<DebugConfig>,
    frame_index: usize,
}

impl Pipeline {
    /// Build a pipeline with the contour detector and no recognizer.
    /// Fails on invalid configuration.
    pub fn new(config: &AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            detector: Box::new(ContourTagDetector::new(config.detector.clone())),
            detector_config: config.detector.clone(),
            preprocess: config.preprocess.clone(),
            recognizer: None,
            recognizer_timeout: config.recognizer.timeout(),
            decoder: Box::new(ImageFrameDecoder),
            confirmer: VoteConfirmer::new(&config.vote)?,
            debug: None,
            frame_index: 0,
        })
    }

    /// Replace the tag detector
    pub fn with_detector(mut self, detector: Box<dyn TagDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Install a recognizer; every call is bounded by the configured timeout
    pub fn with_recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        let bounded = TimeoutRecognizer::new(recognizer, self.recognizer_timeout);
        self.recognizer = Some(Arc::new(bounded));
        self
    }

    /// Replace the frame decoder used by [`Pipeline::process_bytes`]
    pub fn with_decoder(mut self, decoder: Box<dyn FrameDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> anyhow::Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    pub fn has_recognizer(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Process one frame observed now
    pub fn process(&mut self, frame: &DynamicImage, options: FrameOptions) -> FrameResult {
        self.process_at(frame, options, Instant::now())
    }

    /// Decode and process one encoded frame. Undecodable input reports no tag.
    pub fn process_bytes(&mut self, bytes: &[u8], options: FrameOptions) -> FrameResult {
        match self.decoder.decode(bytes) {
            Ok(frame) => self.process(&frame, options),
            Err(e) => {
                warn!("Frame skipped: {}", e);
                FrameResult::no_tag()
            }
        }
    }

    /// Process one frame observed at `now`.
    ///
    /// Only the largest merged detection is read. Frames without a tag leave
    /// the vote window untouched; frames with a tag but no code add an empty
    /// marker.
    pub fn process_at(
        &mut self,
        frame: &DynamicImage,
        options: FrameOptions,
        now: Instant,
    ) -> FrameResult {
        let detections = self.detect_frame(frame);

        let Some(best) = detections.first() else {
            debug!("No tag in frame {}", self.frame_index);
            return FrameResult::no_tag();
        };

        let padding = self.detector_config.padding;
        let (bbox, region) = match roi::crop_region(frame, &best.bbox, padding) {
            Ok(cropped) => cropped,
            Err(e) => {
                warn!("Could not crop detection {:?}: {}", best.bbox, e);
                return FrameResult::no_tag();
            }
        };

        let region = if options.use_preprocessing {
            roi::prepare_for_recognition(&region, &self.preprocess)
        } else {
            region
        };
        self.save_region(&region);

        let reading = self.read_region(&region);

        if options.use_voting {
            return match self.confirmer.observe(reading.code.as_deref(), reading.confidence, now) {
                VoteDecision::Confirmed(confirmed) => FrameResult {
                    code: Some(confirmed.code),
                    confidence: confirmed.confidence,
                    bbox: Some(bbox),
                    status: FrameStatus::Confirmed,
                    votes: Some(confirmed.votes),
                },
                VoteDecision::Pending(reason) => {
                    debug!("Vote pending: {:?}", reason);
                    FrameResult {
                        code: None,
                        confidence: reading.confidence,
                        bbox: Some(bbox),
                        status: FrameStatus::PendingVote,
                        votes: None,
                    }
                }
            };
        }

        let status = if reading.code.is_some() {
            FrameStatus::RecognizedUnconfirmed
        } else {
            FrameStatus::NoCodeRecognized
        };
        FrameResult {
            code: reading.code,
            confidence: reading.confidence,
            bbox: Some(bbox),
            status,
            votes: None,
        }
    }

    /// Detected and merged tag regions, largest first
    pub fn detect_only(&self, frame: &DynamicImage) -> Vec<Detection> {
        let raw = self.detector.detect(frame);
        let raw_count = raw.len();
        let merged = merge_detections(
            raw,
            frame.height(),
            frame.width(),
            self.detector_config.overlap_ratio,
            self.detector_config.max_results,
        );
        debug!("Merged {} candidates into {} detections", raw_count, merged.len());
        merged
    }

    /// Like [`Pipeline::detect_only`], but counts the frame and writes the
    /// annotated copy when debug output is enabled
    pub fn detect_frame(&mut self, frame: &DynamicImage) -> Vec<Detection> {
        self.frame_index += 1;
        let detections = self.detect_only(frame);
        self.save_annotated(frame, &detections);
        detections
    }

    /// Read independent frames without touching the vote window
    pub fn recognize_batch(&mut self, frames: &[DynamicImage]) -> BatchSummary {
        let options = FrameOptions {
            use_preprocessing: true,
            use_voting: false,
        };
        let results: Vec<FrameResult> = frames
            .iter()
            .map(|frame| self.process(frame, options))
            .collect();
        let successful = results.iter().filter(|r| r.code.is_some()).count();

        BatchSummary {
            total: results.len(),
            successful,
            results,
        }
    }

    pub fn vote_stats(&self) -> VoteStats {
        self.confirmer.stats()
    }

    pub fn reset_votes(&mut self) {
        self.confirmer.reset();
    }

    fn read_region(&self, region: &DynamicImage) -> ExtractedNumber {
        let Some(recognizer) = &self.recognizer else {
            return ExtractedNumber::none();
        };

        match recognizer.recognize(region) {
            Ok(spans) => {
                let number = extract_number(&spans);
                debug!("Recognized {} spans -> {:?}", spans.len(), number.code);
                number
            }
            Err(e) => {
                warn!("Recognition failed: {}", e);
                ExtractedNumber::none()
            }
        }
    }

    fn save_annotated(&self, frame: &DynamicImage, detections: &[Detection]) {
        let Some(debug_config) = &self.debug else {
            return;
        };

        let mut canvas = frame.to_rgb8();
        for det in detections {
            let rect = Rect::at(det.bbox.x1 as i32, det.bbox.y1 as i32)
                .of_size(det.bbox.width(), det.bbox.height());
            draw_hollow_rect_mut(&mut canvas, rect, Rgb([0, 255, 0]));
        }

        let path = debug_config.output_dir.join(format!("{:03}_frame.png", self.frame_index));
        if let Err(e) = canvas.save(&path) {
            warn!("Failed to save debug image {}: {}", path.display(), e);
        }
    }

    fn save_region(&self, region: &DynamicImage) {
        let Some(debug_config) = &self.debug else {
            return;
        };
        if region.width() == 0 || region.height() == 0 {
            return;
        }

        let path = debug_config.output_dir.join(format!("{:03}_roi.png", self.frame_index));
        if let Err(e) = region.save(&path) {
            warn!("Failed to save debug image {}: {}", path.display(), e);
        }
    }
}
