use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{TextRecognizer, TextSpan};
use crate::error::RecognizeError;

/// Confidence reported for every line; the engine's text API carries no score
pub const LINE_CONFIDENCE: f32 = 0.9;

const DETECTION_MODEL: &str = "text-detection.rten";
const RECOGNITION_MODEL: &str = "text-recognition.rten";

/// Standard model cache location (`~/.cache/ocrs`)
pub fn default_model_dir() -> anyhow::Result<PathBuf> {
    let home_dir = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
    Ok(Path::new(&home_dir).join(".cache/ocrs"))
}

/// Recognizer backed by the `ocrs` engine
pub struct OcrsRecognizer {
    engine: OcrEngine,
}

impl OcrsRecognizer {
    /// Load the detection and recognition models from `model_dir`
    pub fn from_dir(model_dir: &Path) -> anyhow::Result<Self> {
        let detection_model_path = model_dir.join(DETECTION_MODEL);
        let recognition_model_path = model_dir.join(RECOGNITION_MODEL);

        if !detection_model_path.exists() || !recognition_model_path.exists() {
            anyhow::bail!(
                "OCR models not found. Please run: ocrs-cli --help (or download models manually)\n\
                 Expected locations:\n  - {}\n  - {}",
                detection_model_path.display(),
                recognition_model_path.display()
            );
        }

        let detection_model = Model::load_file(&detection_model_path)?;
        let recognition_model = Model::load_file(&recognition_model_path)?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })?;

        info!("OCR engine loaded from {}", model_dir.display());
        Ok(Self { engine })
    }

    /// Load models from `model_dir`, or from the standard cache location
    pub fn load(model_dir: Option<&Path>) -> anyhow::Result<Self> {
        match model_dir {
            Some(dir) => Self::from_dir(dir),
            None => Self::from_dir(&default_model_dir()?),
        }
    }
}

impl TextRecognizer for OcrsRecognizer {
    fn recognize(&self, region: &DynamicImage) -> Result<Vec<TextSpan>, RecognizeError> {
        let img = region.to_rgb8();

        let img_source = ImageSource::from_bytes(img.as_raw(), img.dimensions())
            .map_err(|e| anyhow::anyhow!("invalid region buffer: {}", e))?;
        let ocr_input = self.engine.prepare_input(img_source)?;
        let text = self.engine.get_text(&ocr_input)?;

        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| TextSpan::new(line, LINE_CONFIDENCE))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_models_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = OcrsRecognizer::from_dir(dir.path()).err().unwrap();
        assert!(err.to_string().contains("OCR models not found"));
    }
}
