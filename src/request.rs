use crate::{engine::EngineKind, kind::FileKind, output::OutputFormat};
use std::path::{Path, PathBuf};

/// Where the document bytes come from.
#[derive(Debug, Clone)]
pub enum InputSource {
    Path(PathBuf),
    /// In-memory content, e.g. an upload. Materialized to a scoped
    /// temporary file only for the duration of one conversion.
    Bytes { filename: String, data: Vec<u8> },
}

/// One unit of work for [`crate::pipeline::Converter`].
///
/// Built once and read-only afterwards.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    source: InputSource,
    kind: Option<FileKind>,
    output_format: OutputFormat,
    engine: Option<EngineKind>,
    include_metadata: bool,
}

impl ConversionRequest {
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self::new(InputSource::Path(path.into()))
    }

    pub fn for_bytes(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self::new(InputSource::Bytes {
            filename: filename.into(),
            data,
        })
    }

    fn new(source: InputSource) -> Self {
        Self {
            source,
            kind: None,
            output_format: OutputFormat::Txt,
            engine: None,
            include_metadata: true,
        }
    }

    /// Declares the kind instead of sniffing it from the extension.
    pub fn with_kind(mut self, kind: FileKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_engine(mut self, engine: EngineKind) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    pub fn source(&self) -> &InputSource {
        &self.source
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn engine(&self) -> Option<EngineKind> {
        self.engine
    }

    pub fn include_metadata(&self) -> bool {
        self.include_metadata
    }

    /// Display name used for the result's `filename`.
    pub fn filename(&self) -> String {
        match &self.source {
            InputSource::Path(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string()),
            InputSource::Bytes { filename, .. } => filename.clone(),
        }
    }

    /// Stem used to name persisted artifacts.
    pub fn stem(&self) -> String {
        let name = self.filename();
        Path::new(&name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(name)
    }

    /// Declared kind, else the kind implied by the file name.
    pub fn resolved_kind(&self) -> Option<FileKind> {
        self.kind
            .or_else(|| FileKind::from_path(Path::new(&self.filename())))
    }
}
