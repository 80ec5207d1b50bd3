use crate::config::Config;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStrategy {
    /// Keep the PDF's embedded text.
    Direct,
    /// Render pages and recognize them.
    Ocr,
}

impl ExtractionStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Ocr => "ocr",
        }
    }
}

/// Embedded text is trusted only when its trimmed length exceeds the
/// configured minimum; anything shorter is treated as a scan.
pub fn decide(cfg: &Config, embedded_text: &str) -> ExtractionStrategy {
    if embedded_text.trim().chars().count() > cfg.strategy.direct_text_min_chars {
        ExtractionStrategy::Direct
    } else {
        ExtractionStrategy::Ocr
    }
}
