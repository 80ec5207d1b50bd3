use serde::{Deserialize, Serialize};

/// One recognized word and the engine's score for it (0–100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub confidence: f32,
}

impl Token {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Output of a confidence-annotated recognition call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecognizedText {
    /// Raw engine text, unfiltered.
    pub text: String,
    pub tokens: Vec<Token>,
}
