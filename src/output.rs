use crate::{
    error::ConversionError,
    report::{BatchSummary, ConversionResult},
    request::ConversionRequest,
    util::ensure_dir,
};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Raw extracted text.
    Txt,
    /// The full result record.
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Json => "json",
        }
    }
}

/// Persists one conversion result in the encoding its request asked for.
/// Failures here never change the result.
pub trait ArtifactWriter {
    fn write(
        &self,
        req: &ConversionRequest,
        result: &ConversionResult,
    ) -> Result<PathBuf, ConversionError>;
}

/// Writes `<dir>/<stem>.<ext>`.
#[derive(Debug, Clone)]
pub struct FsArtifactWriter {
    dir: PathBuf,
}

impl FsArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, req: &ConversionRequest) -> PathBuf {
        let ext = req.output_format().extension();
        self.dir.join(format!("{}.{ext}", req.stem()))
    }
}

impl ArtifactWriter for FsArtifactWriter {
    fn write(
        &self,
        req: &ConversionRequest,
        result: &ConversionResult,
    ) -> Result<PathBuf, ConversionError> {
        let path = self.path_for(req);
        let persist_err = |reason: String| ConversionError::Persistence {
            path: path.clone(),
            reason,
        };

        ensure_dir(&self.dir).map_err(|e| persist_err(format!("{e:#}")))?;
        let bytes = match req.output_format() {
            OutputFormat::Txt => result.text.as_bytes().to_vec(),
            OutputFormat::Json => {
                serde_json::to_vec_pretty(result).map_err(|e| persist_err(e.to_string()))?
            }
        };
        std::fs::write(&path, bytes).map_err(|e| persist_err(e.to_string()))?;

        info!("saved {}", path.display());
        Ok(path)
    }
}

pub fn write_summary(path: &Path, summary: &BatchSummary) -> Result<(), ConversionError> {
    let persist_err = |reason: String| ConversionError::Persistence {
        path: path.to_path_buf(),
        reason,
    };
    if let Some(parent) = path.parent() {
        ensure_dir(parent).map_err(|e| persist_err(format!("{e:#}")))?;
    }
    let raw = serde_json::to_string_pretty(summary).map_err(|e| persist_err(e.to_string()))?;
    std::fs::write(path, raw).map_err(|e| persist_err(e.to_string()))
}

/// Parses a structured-record artifact back into a result.
pub fn read_record(path: &Path) -> Result<ConversionResult, ConversionError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| ConversionError::Persistence {
        path: path.to_path_buf(),
        reason: format!("not a conversion record: {e}"),
    })
}
