use crate::error::{ConversionError, ErrorKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub filename: String,
    pub file_type: String,
    pub success: bool,
    pub text: String,
    pub metadata: ExtractionMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ConversionResult {
    /// Successful result; counts are derived from `text`.
    pub fn succeeded(
        filename: String,
        file_type: String,
        text: String,
        mut metadata: ExtractionMetadata,
    ) -> Self {
        metadata.character_count = Some(text.chars().count());
        metadata.word_count = Some(text.split_whitespace().count());
        Self {
            filename,
            file_type,
            success: true,
            text,
            metadata,
            error: None,
            error_kind: None,
        }
    }

    pub fn failed(filename: String, file_type: String, err: &ConversionError) -> Self {
        Self {
            filename,
            file_type,
            success: false,
            text: String::new(),
            metadata: ExtractionMetadata::default(),
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    #[serde(flatten)]
    pub confidence: Option<ConfidenceStats>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceStats {
    /// Mean score over tokens counted as detections; 0 when there are none.
    #[serde(rename = "confidence")]
    pub average_confidence: f64,
    pub included_words: usize,
    pub total_detections: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceFailure {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<ConversionResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub persistence_failures: Vec<PersistenceFailure>,
}

impl BatchSummary {
    pub fn record(&mut self, result: ConversionResult) {
        if result.success {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.total_files += 1;
        self.results.push(result);
    }

    pub fn record_persistence_failure(&mut self, filename: String, err: &ConversionError) {
        self.persistence_failures.push(PersistenceFailure {
            filename,
            error: err.to_string(),
        });
    }
}
