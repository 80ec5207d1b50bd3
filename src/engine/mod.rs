#[cfg(feature = "ocrs")]
pub mod neural;
pub mod tesseract;
pub mod types;

use crate::{config::Config, error::ConversionError};
use clap::ValueEnum;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

pub use types::{RecognizedText, Token};

/// Plain text recognition. Every back-end implements this.
pub trait TextExtractor {
    /// Identifier recorded as `extraction_method` for image inputs.
    fn name(&self) -> &str;

    fn extract(&self, image: &DynamicImage) -> Result<String, ConversionError>;

    /// Capability query: back-ends that report per-token scores return
    /// themselves here.
    fn confidence(&self) -> Option<&dyn ConfidenceTextExtractor> {
        None
    }
}

/// Recognition that also reports a score per token.
pub trait ConfidenceTextExtractor: TextExtractor {
    fn extract_with_confidence(
        &self,
        image: &DynamicImage,
    ) -> Result<RecognizedText, ConversionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Tesseract,
    #[serde(alias = "easyocr")]
    #[value(alias = "easyocr")]
    Ocrs,
}

impl EngineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tesseract => "tesseract",
            Self::Ocrs => "ocrs",
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the configured back-end. Any one-time setup (model loading,
/// language discovery) happens here and nowhere else.
pub fn build_engine(cfg: &Config) -> Result<Box<dyn TextExtractor>, ConversionError> {
    match cfg.engine.kind {
        EngineKind::Tesseract => Ok(Box::new(tesseract::TesseractEngine::new(&cfg.tesseract)?)),
        EngineKind::Ocrs => build_ocrs(cfg),
    }
}

#[cfg(feature = "ocrs")]
fn build_ocrs(cfg: &Config) -> Result<Box<dyn TextExtractor>, ConversionError> {
    Ok(Box::new(neural::OcrsEngine::new(&cfg.ocrs)?))
}

#[cfg(not(feature = "ocrs"))]
fn build_ocrs(_cfg: &Config) -> Result<Box<dyn TextExtractor>, ConversionError> {
    Err(ConversionError::EngineInitialization(
        "the ocrs engine is not compiled in; rebuild with `--features ocrs`".into(),
    ))
}
