use super::{types::*, ConfidenceTextExtractor, TextExtractor};
use crate::{config, error::ConversionError};
use image::{DynamicImage, ImageFormat};
use std::io::{Cursor, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Drives the `tesseract` command-line program, one child process per image.
///
/// The binary and its language data are checked once in [`TesseractEngine::new`].
pub struct TesseractEngine {
    exe: PathBuf,
    languages: String,
    psm: u32,
    timeout: Option<Duration>,
    extra_args: Vec<String>,
}

impl TesseractEngine {
    pub fn new(cfg: &config::Tesseract) -> Result<Self, ConversionError> {
        let exe = expand_tilde(cfg.exe.trim());
        let init_err = |msg: String| ConversionError::EngineInitialization(msg);

        let version = Command::new(&exe)
            .arg("--version")
            .output()
            .map_err(|e| init_err(format!("cannot run {}: {e}", exe.display())))?;
        if !version.status.success() {
            return Err(init_err(format!(
                "{} --version exited with {}",
                exe.display(),
                version.status
            )));
        }
        let version_line = first_line(&version.stdout)
            .or_else(|| first_line(&version.stderr))
            .unwrap_or_else(|| "unknown".to_string());

        let listing = Command::new(&exe)
            .arg("--list-langs")
            .output()
            .map_err(|e| init_err(format!("cannot list tesseract languages: {e}")))?;
        let mut installed = parse_language_list(&String::from_utf8_lossy(&listing.stdout));
        if installed.is_empty() {
            // Tesseract 3.x prints the listing on stderr.
            installed = parse_language_list(&String::from_utf8_lossy(&listing.stderr));
        }
        let languages = resolve_languages(&cfg.languages, &installed).map_err(init_err)?;

        info!(version = %version_line, languages = %languages, "tesseract engine ready");

        Ok(Self {
            exe,
            languages,
            psm: cfg.psm,
            timeout: (cfg.timeout_seconds > 0).then(|| Duration::from_secs(cfg.timeout_seconds)),
            extra_args: cfg.extra_args.clone(),
        })
    }

    fn run(&self, image: &DynamicImage, output_config: Option<&str>) -> Result<Vec<u8>, ConversionError> {
        let png = encode_png(image)?;
        let psm = self.psm.to_string();

        let mut cmd = Command::new(&self.exe);
        cmd.args(["stdin", "stdout", "-l", self.languages.as_str(), "--psm", psm.as_str()]);
        cmd.args(&self.extra_args);
        if let Some(config) = output_config {
            cmd.arg(config);
        }
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        debug!(
            "tesseract run psm={} output={:?} png_bytes={} timeout={:?}",
            self.psm,
            output_config,
            png.len(),
            self.timeout
        );

        let mut child = cmd
            .spawn()
            .map_err(|e| ConversionError::Recognition(format!("spawning tesseract: {e}")))?;

        // stdin is closed before waiting; the child is reaped even if it
        // stopped reading early.
        let fed = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&png).and_then(|_| stdin.flush()),
            None => Err(std::io::Error::other("tesseract has no stdin")),
        };

        let output = match self.timeout {
            Some(timeout) => wait_with_timeout(&mut child, timeout)?,
            None => child.wait_with_output()?,
        };

        if let Err(e) = fed {
            return Err(ConversionError::Recognition(format!(
                "feeding image to tesseract failed ({e}); exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConversionError::Recognition(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        if !output.stderr.is_empty() {
            debug!("tesseract stderr: {}", String::from_utf8_lossy(&output.stderr).trim());
        }

        Ok(output.stdout)
    }
}

impl TextExtractor for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn extract(&self, image: &DynamicImage) -> Result<String, ConversionError> {
        let stdout = self.run(image, None)?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    fn confidence(&self) -> Option<&dyn ConfidenceTextExtractor> {
        Some(self)
    }
}

impl ConfidenceTextExtractor for TesseractEngine {
    fn extract_with_confidence(
        &self,
        image: &DynamicImage,
    ) -> Result<RecognizedText, ConversionError> {
        let stdout = self.run(image, Some("tsv"))?;
        let tokens = parse_tsv_tokens(&String::from_utf8_lossy(&stdout));
        let text = tokens
            .iter()
            .map(|t| t.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(RecognizedText { text, tokens })
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ConversionError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| ConversionError::Recognition(format!("PNG encoding failed: {e}")))?;
    Ok(buf.into_inner())
}

/// Word rows (level 5) of Tesseract's TSV output.
/// Columns: level page block par line word left top width height conf text.
fn parse_tsv_tokens(tsv: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 11 {
            continue;
        }
        if fields[0].trim() != "5" {
            continue;
        }
        let confidence: f32 = match fields[10].trim().parse() {
            Ok(c) => c,
            Err(_) => continue,
        };
        let text = fields.get(11).map(|t| t.trim()).unwrap_or_default();
        tokens.push(Token::new(text, confidence));
    }
    tokens
}

fn parse_language_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("List of available languages"))
        .filter(|l| !l.contains(char::is_whitespace))
        .map(str::to_string)
        .collect()
}

fn resolve_languages(requested: &[String], installed: &[String]) -> Result<String, String> {
    if requested.is_empty() {
        return Err("tesseract.languages is empty".into());
    }
    if installed.is_empty() {
        warn!("could not read installed tesseract languages; using configured list as-is");
        return Ok(requested.join("+"));
    }
    let mut usable = Vec::new();
    for lang in requested {
        if installed.iter().any(|l| l == lang) {
            usable.push(lang.as_str());
        } else {
            warn!("tesseract language data not installed, skipping: {lang}");
        }
    }
    if usable.is_empty() {
        return Err(format!(
            "none of the configured languages {requested:?} are installed (have {installed:?})"
        ));
    }
    Ok(usable.join("+"))
}

fn first_line(bytes: &[u8]) -> Option<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Output, ConversionError> {
    // Drain pipes while waiting so a chatty child can't block on a full buffer.
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            out.read_to_end(&mut buf)?;
        }
        Ok(buf)
    });
    let stderr_thread = std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            err.read_to_end(&mut buf)?;
        }
        Ok(buf)
    });

    let join = |handle: std::thread::JoinHandle<std::io::Result<Vec<u8>>>| {
        handle
            .join()
            .map_err(|_| ConversionError::Recognition("pipe reader thread panicked".into()))?
            .map_err(ConversionError::from)
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            let stdout = join(stdout_thread)?;
            let stderr = join(stderr_thread)?;
            return Ok(Output {
                status,
                stdout,
                stderr,
            });
        }

        if start.elapsed() > timeout {
            warn!("tesseract timed out after {:?}", timeout);
            let _ = child.kill();
            child.wait()?;
            let stderr = join(stderr_thread)?;
            let _ = join(stdout_thread);
            return Err(ConversionError::Recognition(format!(
                "tesseract exceeded timeout ({:?}); stderr: {}",
                timeout,
                String::from_utf8_lossy(&stderr).trim()
            )));
        }

        std::thread::sleep(Duration::from_millis(20));
    }
}
