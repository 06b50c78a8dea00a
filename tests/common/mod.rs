mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from numtag for tests
pub use numtag::{
    AppConfig, BoundingBox, FrameOptions, FrameResult, FrameStatus, Pipeline, StaticRecognizer,
    TextRecognizer, TextSpan,
};
