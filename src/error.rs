use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while converting a document.
///
/// Only [`ConversionError::EngineInitialization`] and
/// [`ConversionError::InvalidConfig`] escape a converter, and
/// [`ConversionError::EmptyUpload`] rejects a whole upload. Every other
/// variant is folded into a failed [`crate::report::ConversionResult`].
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("unsupported file type: {0}")]
    UnsupportedKind(String),

    #[error("direct PDF text extraction failed: {0}")]
    DirectExtraction(String),

    #[error("recognition failed: {0}")]
    Recognition(String),

    #[error("engine initialization failed: {0}")]
    EngineInitialization(String),

    #[error("failed to persist {}: {reason}", .path.display())]
    Persistence { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("request targets engine {requested} but converter runs {active}")]
    EngineMismatch { requested: String, active: String },

    #[error("no files were uploaded")]
    EmptyUpload,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serializable tag for [`ConversionError`], stored on failed results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputNotFound,
    UnsupportedKind,
    DirectExtraction,
    Recognition,
    EngineInitialization,
    Persistence,
    InvalidConfig,
    EngineMismatch,
    EmptyUpload,
    Io,
}

impl ConversionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InputNotFound(_) => ErrorKind::InputNotFound,
            Self::UnsupportedKind(_) => ErrorKind::UnsupportedKind,
            Self::DirectExtraction(_) => ErrorKind::DirectExtraction,
            Self::Recognition(_) => ErrorKind::Recognition,
            Self::EngineInitialization(_) => ErrorKind::EngineInitialization,
            Self::Persistence { .. } => ErrorKind::Persistence,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::EngineMismatch { .. } => ErrorKind::EngineMismatch,
            Self::EmptyUpload => ErrorKind::EmptyUpload,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}
