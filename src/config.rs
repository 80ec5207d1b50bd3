use crate::{engine::EngineKind, error::ConversionError, output::OutputFormat};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: Engine,
    #[serde(default)]
    pub tesseract: Tesseract,
    #[serde(default)]
    pub ocrs: Ocrs,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub render: Render,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub preprocess: Preprocess,
    #[serde(default)]
    pub postprocess: Postprocess,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// Rejects values the pipeline cannot run with. Called once when a
    /// converter is built, never per file.
    pub fn validate(&self) -> Result<(), ConversionError> {
        let p = &self.preprocess;
        if p.block_size < 3 || p.block_size % 2 == 0 {
            return Err(ConversionError::InvalidConfig(format!(
                "preprocess.block_size must be odd and >= 3, got {}",
                p.block_size
            )));
        }
        if p.denoise_radius == 0 {
            return Err(ConversionError::InvalidConfig(
                "preprocess.denoise_radius must be >= 1".into(),
            ));
        }
        if self.strategy.render_dpi == 0 {
            return Err(ConversionError::InvalidConfig(
                "strategy.render_dpi must be > 0".into(),
            ));
        }
        if self.confidence.count_above > self.confidence.include_above {
            return Err(ConversionError::InvalidConfig(format!(
                "confidence.count_above ({}) must not exceed confidence.include_above ({})",
                self.confidence.count_above, self.confidence.include_above
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Engine {
    pub kind: EngineKind,
    pub include_metadata: bool,
}
impl Default for Engine {
    fn default() -> Self {
        Self {
            kind: EngineKind::Tesseract,
            include_metadata: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tesseract {
    pub exe: String,
    pub languages: Vec<String>,
    pub psm: u32,
    pub timeout_seconds: u64,
    #[serde(default)]
    pub extra_args: Vec<String>,
}
impl Default for Tesseract {
    fn default() -> Self {
        Self {
            exe: "tesseract".into(),
            languages: vec!["eng".into(), "fra".into(), "deu".into(), "spa".into()],
            psm: 6,
            timeout_seconds: 120,
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Ocrs {
    /// Directory holding `text-detection.rten` and `text-recognition.rten`.
    /// Empty means the platform cache directory.
    pub model_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Strategy {
    /// Embedded PDF text is accepted only when its trimmed length exceeds this.
    pub direct_text_min_chars: usize,
    pub render_dpi: u32,
}
impl Default for Strategy {
    fn default() -> Self {
        Self {
            direct_text_min_chars: 50,
            render_dpi: 300,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Render {
    /// Explicit path to the PDFium shared library. Empty means system lookup.
    pub pdfium_library: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Confidence {
    /// Tokens strictly above this score make it into the text.
    pub include_above: f32,
    /// Tokens strictly above this score count toward the statistics.
    pub count_above: f32,
}
impl Default for Confidence {
    fn default() -> Self {
        Self {
            include_above: 30.0,
            count_above: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Preprocess {
    pub block_size: u32,
    pub offset: f32,
    pub denoise_radius: u32,
}
impl Default for Preprocess {
    fn default() -> Self {
        Self {
            block_size: 11,
            offset: 2.0,
            denoise_radius: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Postprocess {
    pub normalize_unicode: bool,
    pub normalize_newlines: bool,
    pub trim_trailing_whitespace: bool,
    #[serde(default = "default_control_chars")]
    pub control_chars_to_sanitize: Vec<u8>,
}
impl Default for Postprocess {
    fn default() -> Self {
        Self {
            normalize_unicode: true,
            normalize_newlines: true,
            trim_trailing_whitespace: true,
            control_chars_to_sanitize: default_control_chars(),
        }
    }
}

fn default_control_chars() -> Vec<u8> {
    (0u8..32).chain(std::iter::once(127)).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub dir: String,
    pub format: OutputFormat,
    pub summary_filename: String,
    pub print_summary: bool,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            dir: "./output".into(),
            format: OutputFormat::Txt,
            summary_filename: "conversion_summary.json".into(),
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub dump_effective_config: bool,
}
