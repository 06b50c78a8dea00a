//! Pipeline configuration
//!
//! Every tuning constant of the detector, the ROI preprocessor and the vote
//! confirmer lives here. Stored as TOML; missing keys fall back to defaults.

use crate::error::ConfigError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Tag detection and merging
    pub detector: DetectorConfig,
    /// ROI enhancement before recognition
    pub preprocess: PreprocessConfig,
    /// Multi-frame confirmation
    pub vote: VoteConfig,
    /// Text recognition engine
    pub recognizer: RecognizerConfig,
}

impl AppConfig {
    /// Check every section, failing on the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detector.validate()?;
        self.preprocess.validate()?;
        self.vote.validate()?;
        self.recognizer.validate()
    }
}

/// Geometric and photometric bounds of a printed tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Pixels brighter than this belong to a tag background
    pub brightness_threshold: u8,
    /// Pixels darker than this count as printed ink
    pub dark_threshold: u8,
    /// Side of the square closing kernel
    pub closing_kernel: u32,
    /// Number of closing passes
    pub closing_iterations: u32,
    /// Minimum contour area in pixels
    pub min_area: f64,
    /// Maximum contour area as a fraction of the frame area
    pub max_area_fraction: f64,
    /// Minimum bounding-rectangle width
    pub min_width: u32,
    /// Minimum bounding-rectangle height
    pub min_height: u32,
    /// Exclusive lower bound on width / height
    pub min_aspect: f32,
    /// Exclusive upper bound on width / height
    pub max_aspect: f32,
    /// Exclusive lower bound on the dark-pixel fraction
    pub min_dark_ratio: f32,
    /// Exclusive upper bound on the dark-pixel fraction
    pub max_dark_ratio: f32,
    /// Confidence assigned to every accepted candidate
    pub confidence: f32,
    /// Label assigned to every accepted candidate
    pub label: String,
    /// Number of detections kept after merging
    pub max_results: usize,
    /// Overlap (relative to the incoming box) above which two boxes are duplicates
    pub overlap_ratio: f32,
    /// Padding added around a detection before cropping
    pub padding: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            brightness_threshold: 200,
            dark_threshold: 120,
            closing_kernel: 5,
            closing_iterations: 2,
            min_area: 1000.0,
            max_area_fraction: 0.5,
            min_width: 50,
            min_height: 30,
            min_aspect: 1.5,
            max_aspect: 4.5,
            min_dark_ratio: 0.1,
            max_dark_ratio: 0.6,
            confidence: 0.85,
            label: "number_tag".to_string(),
            max_results: 3,
            overlap_ratio: 0.5,
            padding: 5,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        band("aspect ratio", self.min_aspect as f64, self.max_aspect as f64)?;
        band("dark ratio", self.min_dark_ratio as f64, self.max_dark_ratio as f64)?;
        if self.max_results == 0 {
            return Err(ConfigError::NotPositive { name: "max_results" });
        }
        if !(self.max_area_fraction > 0.0) {
            return Err(ConfigError::NotPositive {
                name: "max_area_fraction",
            });
        }
        Ok(())
    }
}

/// ROI enhancement settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Regions whose shorter side is below this are upscaled to it
    pub min_side: u32,
    /// CLAHE clip limit (relative to a uniform histogram)
    pub clahe_clip_limit: f32,
    /// CLAHE tile grid size per axis
    pub clahe_tiles: u32,
    /// Apply the 3x3 sharpening kernel
    pub sharpen: bool,
    /// Binarize with an Otsu threshold
    pub binarize: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            min_side: 100,
            clahe_clip_limit: 2.0,
            clahe_tiles: 8,
            sharpen: true,
            binarize: true,
        }
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clahe_tiles == 0 {
            return Err(ConfigError::NotPositive { name: "clahe_tiles" });
        }
        if !(self.clahe_clip_limit > 0.0) {
            return Err(ConfigError::NotPositive {
                name: "clahe_clip_limit",
            });
        }
        Ok(())
    }
}

/// Largest accepted vote window
pub const MAX_WINDOW_SIZE: usize = 1024;

/// Multi-frame vote settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteConfig {
    /// Number of frames in the vote window
    pub window_size: usize,
    /// Fraction of the window the winning code must fill
    pub threshold: f32,
    /// Seconds during which the same code is not confirmed again
    pub debounce_secs: f64,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            threshold: 0.6,
            debounce_secs: 1.0,
        }
    }
}

impl VoteConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 || self.window_size > MAX_WINDOW_SIZE {
            return Err(ConfigError::WindowSize(self.window_size));
        }
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(ConfigError::Threshold(self.threshold));
        }
        if Duration::try_from_secs_f64(self.debounce_secs).is_err() {
            return Err(ConfigError::Debounce(self.debounce_secs));
        }
        Ok(())
    }

    /// Debounce interval. Only meaningful after `validate` succeeded.
    pub fn debounce(&self) -> Duration {
        Duration::try_from_secs_f64(self.debounce_secs).unwrap_or_default()
    }
}

/// Recognition engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Upper bound on one recognition call
    pub timeout_ms: u64,
    /// Directory holding the OCR models (defaults to ~/.cache/ocrs)
    pub model_dir: Option<PathBuf>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2000,
            model_dir: None,
        }
    }
}

impl RecognizerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::NotPositive { name: "timeout_ms" });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn band(name: &'static str, min: f64, max: f64) -> Result<(), ConfigError> {
    if min < max {
        Ok(())
    } else {
        Err(ConfigError::EmptyBand { name, min, max })
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
