//! Pure-Rust neural OCR through the `ocrs` crate.
//!
//! Detection and recognition models are loaded once per engine; loading is
//! the expensive step, recognition itself is cheap by comparison.

use super::TextExtractor;
use crate::{config, error::ConversionError};
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

pub struct OcrsEngine {
    engine: OcrEngine,
}

impl OcrsEngine {
    pub fn new(cfg: &config::Ocrs) -> Result<Self, ConversionError> {
        let dir = if cfg.model_dir.trim().is_empty() {
            default_model_dir()
        } else {
            PathBuf::from(cfg.model_dir.trim())
        };

        let detection_model = load_model(&dir.join(DETECTION_MODEL_FILENAME))?;
        let recognition_model = load_model(&dir.join(RECOGNITION_MODEL_FILENAME))?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|e| ConversionError::EngineInitialization(format!("ocrs: {e}")))?;

        info!(model_dir = %dir.display(), "ocrs engine ready");
        Ok(Self { engine })
    }
}

impl TextExtractor for OcrsEngine {
    fn name(&self) -> &str {
        "ocrs"
    }

    fn extract(&self, image: &DynamicImage) -> Result<String, ConversionError> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|e| {
            ConversionError::Recognition(format!("ocrs image source ({width}x{height}): {e}"))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|e| ConversionError::Recognition(format!("ocrs preprocessing: {e}")))?;
        let text = self
            .engine
            .get_text(&input)
            .map_err(|e| ConversionError::Recognition(format!("ocrs recognition: {e}")))?;
        debug!(lines = text.lines().count(), "ocrs recognition complete");
        Ok(text)
    }
}

fn load_model(path: &Path) -> Result<Model, ConversionError> {
    if !path.exists() {
        return Err(ConversionError::EngineInitialization(format!(
            "ocrs model not found: {}",
            path.display()
        )));
    }
    Model::load_file(path).map_err(|e| {
        ConversionError::EngineInitialization(format!("loading {}: {e}", path.display()))
    })
}

/// `$XDG_CACHE_HOME/ocrs`, else `~/.cache/ocrs`, which is where `ocrs-cli`
/// downloads its models.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}
