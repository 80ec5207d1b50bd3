use crate::error::ConversionError;
use lopdf::Document;
use std::path::Path;
use tracing::{debug, warn};

/// What the PDF's own text layer yields.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedText {
    /// Page texts in page order, newline-joined and trimmed. Empty when the
    /// document could not be read.
    pub text: String,
    /// Known only when the document structure could be parsed.
    pub page_count: Option<usize>,
}

/// Reads the embedded text of every page. Never fails: a document that can't
/// be read yields empty text, which sends it down the OCR path.
pub fn read_embedded_text(path: &Path) -> EmbeddedText {
    let doc = match Document::load(path) {
        Ok(doc) => doc,
        Err(e) => {
            let err = ConversionError::DirectExtraction(e.to_string());
            warn!("{err}; falling back to OCR");
            return EmbeddedText::default();
        }
    };

    let page_count = doc.get_pages().len();
    match extract_pages(&doc) {
        Ok(text) => {
            debug!(page_count, chars = text.chars().count(), "embedded text read");
            EmbeddedText {
                text,
                page_count: Some(page_count),
            }
        }
        Err(err) => {
            warn!("{err}; falling back to OCR");
            EmbeddedText {
                text: String::new(),
                page_count: Some(page_count),
            }
        }
    }
}

fn extract_pages(doc: &Document) -> Result<String, ConversionError> {
    let mut text = String::new();
    for page_number in doc.get_pages().keys() {
        let page_text = doc
            .extract_text(&[*page_number])
            .map_err(|e| ConversionError::DirectExtraction(format!("page {page_number}: {e}")))?;
        text.push_str(&page_text);
        text.push('\n');
    }
    Ok(text.trim().to_string())
}
