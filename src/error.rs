use std::time::Duration;

/// Invalid tuning values. Raised while building a pipeline or confirmer, never per frame.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error(
        "vote window size must be between 1 and {max} (got {0})",
        max = crate::config::MAX_WINDOW_SIZE
    )]
    WindowSize(usize),
    #[error("confirmation threshold must be in (0, 1] (got {0})")]
    Threshold(f32),
    #[error("debounce interval must be a representable, non-negative number of seconds (got {0})")]
    Debounce(f64),
    #[error("{name} band is empty: min {min} must be below max {max}")]
    EmptyBand {
        name: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{name} must be positive")]
    NotPositive { name: &'static str },
}

/// A frame that could not be turned into pixels.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("frame is empty")]
    Empty,
    #[error("failed to decode frame: {0}")]
    Image(#[from] image::ImageError),
}

/// Failure of the text recognition capability for one region.
#[derive(thiserror::Error, Debug)]
pub enum RecognizeError {
    #[error("recognition engine failed: {0}")]
    Engine(#[from] anyhow::Error),
    #[error("recognition timed out after {0:?}")]
    Timeout(Duration),
    #[error("recognition worker exited without a result")]
    WorkerLost,
    #[error("recognition engine is still busy with an earlier region")]
    Busy,
}

/// A region that cannot be cropped or enhanced.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegionError {
    #[error("region is empty")]
    Empty,
    #[error("region {width}x{height} is too small")]
    TooSmall { width: u32, height: u32 },
    #[error("box lies outside the frame")]
    OutsideFrame,
}

/// The task owning a shared confirmer has stopped.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("vote confirmer task is no longer running")]
pub struct ConfirmerClosed;
