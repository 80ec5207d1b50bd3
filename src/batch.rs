use crate::{
    error::ConversionError,
    kind::{file_type_tag, FileKind},
    output::ArtifactWriter,
    pipeline::Converter,
    report::{BatchSummary, ConversionResult},
    request::ConversionRequest,
};
use tracing::{info, info_span, warn};

/// Runs a list of requests through one converter, in order.
///
/// A failing file never stops the batch, and a failed write never turns a
/// successful conversion into a failed one.
pub struct BatchOrchestrator<'a> {
    converter: &'a Converter,
    writer: Option<&'a dyn ArtifactWriter>,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(converter: &'a Converter) -> Self {
        Self {
            converter,
            writer: None,
        }
    }

    /// Persist each successful result through `writer`.
    pub fn with_writer(mut self, writer: &'a dyn ArtifactWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn run(&self, requests: &[ConversionRequest]) -> BatchSummary {
        let span = info_span!("batch", files = requests.len());
        let _enter = span.enter();

        let mut summary = BatchSummary::default();
        for (i, req) in requests.iter().enumerate() {
            info!("[{}/{}] {}", i + 1, requests.len(), req.filename());
            let result = self.converter.convert(req);

            match self.writer {
                Some(writer) if result.success => {
                    if let Err(err) = writer.write(req, &result) {
                        warn!("could not persist {}: {err}", result.filename);
                        summary.record_persistence_failure(result.filename.clone(), &err);
                    }
                }
                _ => {}
            }
            summary.record(result);
        }

        info!(
            total = summary.total_files,
            successful = summary.successful,
            failed = summary.failed,
            "batch finished"
        );
        summary
    }
}

/// A file received over an upload boundary.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    /// Declared media type, if the client sent one.
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Converts uploaded files with the same per-file isolation as a batch run.
///
/// The kind comes from the declared media type when present, else from the
/// file name. An unrecognized media type yields a failed record for that file.
pub fn convert_uploads(
    converter: &Converter,
    files: Vec<UploadedFile>,
    include_metadata: bool,
) -> Result<BatchSummary, ConversionError> {
    if files.is_empty() {
        return Err(ConversionError::EmptyUpload);
    }

    let span = info_span!("uploads", files = files.len());
    let _enter = span.enter();

    let mut summary = BatchSummary::default();
    for file in files {
        let declared = match file.content_type.as_deref() {
            Some(media) => match FileKind::from_media_type(media) {
                Some(kind) => Some(kind),
                None => {
                    let err = ConversionError::UnsupportedKind(media.to_string());
                    warn!("rejecting {}: {err}", file.filename);
                    let tag = file_type_tag(&file.filename);
                    summary.record(ConversionResult::failed(file.filename, tag, &err));
                    continue;
                }
            },
            None => None,
        };

        let mut req =
            ConversionRequest::for_bytes(file.filename, file.data).with_metadata(include_metadata);
        if let Some(kind) = declared {
            req = req.with_kind(kind);
        }
        summary.record(converter.convert(&req));
    }
    Ok(summary)
}
