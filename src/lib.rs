pub mod config;
pub mod decode;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod recognition;
pub mod roi;
pub mod vote;

pub use config::AppConfig;
pub use decode::{FrameDecoder, ImageFrameDecoder};
pub use detection::{ContourTagDetector, TagDetector};
pub use models::{BoundingBox, Detection, TagCandidate};
pub use pipeline::{BatchSummary, FrameOptions, FrameResult, FrameStatus, Pipeline};
pub use recognition::{OcrsRecognizer, StaticRecognizer, TextRecognizer, TextSpan};
pub use vote::{ConfirmerHandle, VoteConfirmer, VoteDecision, VoteStats};
