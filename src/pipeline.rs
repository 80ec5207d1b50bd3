use crate::{
    config::Config,
    confidence::{self, ConfidencePolicy},
    engine::{self, ConfidenceTextExtractor, RecognizedText, TextExtractor, Token},
    error::ConversionError,
    kind::{file_type_tag, FileKind},
    policy::{self, ExtractionStrategy},
    postprocess,
    preprocess::ImagePreprocessor,
    probe,
    render::{PageRenderer, PdfiumRenderer},
    report::{ConfidenceStats, ConversionResult, ExtractionMetadata},
    request::{ConversionRequest, InputSource},
};
use image::DynamicImage;
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, info_span, warn};

/// Converts one document at a time. Built once; the engine inside is reused
/// for every file.
pub struct Converter {
    cfg: Config,
    engine: Box<dyn TextExtractor>,
    renderer: Box<dyn PageRenderer>,
    preprocessor: ImagePreprocessor,
    confidence: ConfidencePolicy,
}

/// Recognizer output for one image or page, before aggregation.
enum PageText {
    Plain(String),
    Annotated(RecognizedText),
}

enum Layout {
    Single,
    Paged,
}

struct Extraction {
    pages: Vec<PageText>,
    layout: Layout,
    method: String,
    page_count: Option<usize>,
    confidence_mode: bool,
    warnings: Vec<String>,
}

struct Aggregated {
    text: String,
    stats: Option<ConfidenceStats>,
}

/// The file the decoders read. Byte inputs live in a temporary file that is
/// removed when this drops.
struct StagedInput {
    path: PathBuf,
    _temp: Option<NamedTempFile>,
}

impl Converter {
    /// Builds the configured engine and the PDFium renderer. Fails only on
    /// invalid configuration or engine initialization.
    pub fn new(cfg: &Config) -> Result<Self, ConversionError> {
        cfg.validate()?;
        let engine = engine::build_engine(cfg)?;
        let library = cfg.render.pdfium_library.trim();
        let renderer = PdfiumRenderer::new((!library.is_empty()).then(|| PathBuf::from(library)));
        Self::with_components(cfg, engine, Box::new(renderer))
    }

    pub fn with_components(
        cfg: &Config,
        engine: Box<dyn TextExtractor>,
        renderer: Box<dyn PageRenderer>,
    ) -> Result<Self, ConversionError> {
        cfg.validate()?;
        Ok(Self {
            cfg: cfg.clone(),
            preprocessor: ImagePreprocessor::new(&cfg.preprocess)?,
            confidence: ConfidencePolicy::from(&cfg.confidence),
            engine,
            renderer,
        })
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Always yields exactly one result; faults become failed results.
    pub fn convert(&self, req: &ConversionRequest) -> ConversionResult {
        let filename = req.filename();
        let file_type = file_type_tag(&filename);
        let span = info_span!("convert", file = %filename, engine = self.engine.name());
        let _enter = span.enter();

        // Decoders are third-party code; a panic in one must not take the batch down.
        let outcome = catch_unwind(AssertUnwindSafe(|| self.run(req))).unwrap_or_else(|payload| {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ConversionError::Recognition(format!("internal fault: {msg}")))
        });

        match outcome {
            Ok((text, metadata)) => {
                info!(
                    method = metadata.extraction_method.as_deref().unwrap_or_default(),
                    chars = text.chars().count(),
                    "converted"
                );
                ConversionResult::succeeded(filename, file_type, text, metadata)
            }
            Err(err) => {
                error!("failed to convert {filename}: {err}");
                ConversionResult::failed(filename, file_type, &err)
            }
        }
    }

    fn run(&self, req: &ConversionRequest) -> Result<(String, ExtractionMetadata), ConversionError> {
        // Start -> Classified
        if let InputSource::Path(path) = req.source() {
            if !path.exists() {
                return Err(ConversionError::InputNotFound(path.clone()));
            }
        }
        if let Some(requested) = req.engine() {
            if requested.as_str() != self.engine.name() {
                return Err(ConversionError::EngineMismatch {
                    requested: requested.to_string(),
                    active: self.engine.name().to_string(),
                });
            }
        }
        let kind = req.resolved_kind().ok_or_else(|| {
            let tag = file_type_tag(&req.filename());
            ConversionError::UnsupportedKind(if tag.is_empty() { "(none)".into() } else { tag })
        })?;
        let staged = stage_input(req.source(), kind)?;
        debug!(?kind, path = %staged.path.display(), "classified");

        // Classified -> Extracted
        let mut extraction = match kind {
            FileKind::Pdf => self.extract_pdf(&staged.path, req.include_metadata())?,
            _ => self.extract_image(&staged.path, req.include_metadata())?,
        };

        // Extracted -> Aggregated
        let method = std::mem::take(&mut extraction.method);
        let warnings = std::mem::take(&mut extraction.warnings);
        let page_count = extraction.page_count;
        let aggregated = self.aggregate(extraction);

        // Aggregated -> Finalized
        let text = postprocess::clean_text(&self.cfg.postprocess, &aggregated.text);
        let metadata = ExtractionMetadata {
            extraction_method: Some(method),
            page_count,
            confidence: aggregated.stats,
            warnings,
            ..Default::default()
        };
        Ok((text, metadata))
    }

    fn extract_pdf(&self, path: &Path, include_metadata: bool) -> Result<Extraction, ConversionError> {
        let embedded = probe::read_embedded_text(path);
        let strategy = policy::decide(&self.cfg, &embedded.text);
        info!(
            strategy = strategy.as_str(),
            embedded_chars = embedded.text.trim().chars().count(),
            threshold = self.cfg.strategy.direct_text_min_chars,
            "pdf strategy"
        );

        if strategy == ExtractionStrategy::Direct {
            return Ok(Extraction {
                pages: vec![PageText::Plain(embedded.text)],
                layout: Layout::Single,
                method: strategy.as_str().to_string(),
                page_count: embedded.page_count,
                confidence_mode: false,
                warnings: Vec::new(),
            });
        }

        let mut warnings = Vec::new();
        let confidence = self.confidence_capability(include_metadata, &mut warnings);
        let mut pages = Vec::new();

        if embedded.page_count == Some(0) {
            debug!("document has no pages; nothing to render");
        } else {
            let dpi = self.cfg.strategy.render_dpi;
            let rendered = self.renderer.render_pages(path, dpi, &mut |index, image| {
                info!("processing page {}", index + 1);
                pages.push(self.recognize(&image, confidence)?);
                Ok(())
            })?;
            debug!(rendered, "pdf pages recognized");
        }

        Ok(Extraction {
            page_count: Some(pages.len()),
            pages,
            layout: Layout::Paged,
            method: strategy.as_str().to_string(),
            confidence_mode: confidence.is_some(),
            warnings,
        })
    }

    fn extract_image(&self, path: &Path, include_metadata: bool) -> Result<Extraction, ConversionError> {
        let bytes = std::fs::read(path)?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| ConversionError::Recognition(format!("cannot decode image: {e}")))?;

        let mut warnings = Vec::new();
        let confidence = self.confidence_capability(include_metadata, &mut warnings);
        let page = self.recognize(&image, confidence)?;

        Ok(Extraction {
            pages: vec![page],
            layout: Layout::Single,
            method: self.engine.name().to_string(),
            page_count: None,
            confidence_mode: confidence.is_some(),
            warnings,
        })
    }

    /// The confidence-capable view of the engine when metadata is wanted.
    /// An engine without the capability degrades to plain text with a warning.
    fn confidence_capability(
        &self,
        include_metadata: bool,
        warnings: &mut Vec<String>,
    ) -> Option<&dyn ConfidenceTextExtractor> {
        if !include_metadata {
            return None;
        }
        let capability = self.engine.confidence();
        if capability.is_none() {
            let msg = format!(
                "confidence scores are not available with the {} engine",
                self.engine.name()
            );
            warn!("{msg}");
            warnings.push(msg);
        }
        capability
    }

    fn recognize(
        &self,
        image: &DynamicImage,
        confidence: Option<&dyn ConfidenceTextExtractor>,
    ) -> Result<PageText, ConversionError> {
        let prepared = DynamicImage::ImageLuma8(self.preprocessor.apply(image));
        match confidence {
            Some(engine) => Ok(PageText::Annotated(engine.extract_with_confidence(&prepared)?)),
            None => Ok(PageText::Plain(self.engine.extract(&prepared)?)),
        }
    }

    fn aggregate(&self, extraction: Extraction) -> Aggregated {
        let mut all_tokens: Vec<Token> = Vec::new();
        let texts: Vec<String> = extraction
            .pages
            .into_iter()
            .map(|page| match page {
                PageText::Plain(text) => text,
                PageText::Annotated(recognized) => {
                    let page = confidence::aggregate(self.confidence, &recognized.tokens);
                    all_tokens.extend(recognized.tokens);
                    page.text
                }
            })
            .collect();

        let text = match extraction.layout {
            Layout::Single => texts.into_iter().next().unwrap_or_default(),
            Layout::Paged => join_pages(&texts),
        };
        let stats = extraction
            .confidence_mode
            .then(|| confidence::aggregate(self.confidence, &all_tokens).stats);

        Aggregated { text, stats }
    }
}

/// `--- Page n ---` headers between recognized pages, 1-based.
fn join_pages(pages: &[String]) -> String {
    let mut out = String::new();
    for (i, page) in pages.iter().enumerate() {
        out.push_str(&format!("\n--- Page {} ---\n{}\n", i + 1, page));
    }
    out.trim().to_string()
}

fn stage_input(source: &InputSource, kind: FileKind) -> Result<StagedInput, ConversionError> {
    match source {
        InputSource::Path(path) => Ok(StagedInput {
            path: path.clone(),
            _temp: None,
        }),
        InputSource::Bytes { data, .. } => {
            let mut temp = tempfile::Builder::new()
                .prefix("docsift-")
                .suffix(&format!(".{}", kind.extension()))
                .tempfile()?;
            temp.write_all(data)?;
            temp.flush()?;
            Ok(StagedInput {
                path: temp.path().to_path_buf(),
                _temp: Some(temp),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_numbered_from_one() {
        let joined = join_pages(&["alpha".into(), "beta".into()]);
        assert_eq!(joined, "--- Page 1 ---\nalpha\n\n--- Page 2 ---\nbeta");
    }

    #[test]
    fn no_pages_join_to_empty() {
        assert_eq!(join_pages(&[]), "");
    }
}
