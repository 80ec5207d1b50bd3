use crate::{
    batch::BatchOrchestrator,
    config::Config,
    engine::EngineKind,
    output::{self, ArtifactWriter, FsArtifactWriter, OutputFormat},
    pipeline::Converter,
    request::ConversionRequest,
    util::{ensure_dir, supported_files},
};
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "docsift")]
#[command(about = "Extract text from PDFs and images (embedded text first, OCR as fallback)")]
pub struct Args {
    /// A file, or a directory whose supported files are converted in name order.
    pub input: PathBuf,

    /// Output directory. Defaults to output.dir from the config (./output).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Artifact encoding.
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Recognition engine.
    #[arg(short, long, value_enum)]
    pub engine: Option<EngineKind>,

    /// Skip confidence statistics and other extraction metadata.
    #[arg(long)]
    pub no_metadata: bool,

    /// Path to config TOML. If omitted, uses ./docsift.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match load_config(&args) {
        Ok(cfg) => cfg,
        Err(err) => {
            // Still report the failure through the usual sink.
            let _ = init_logging(&args, &Config::default(), None);
            return Err(err);
        }
    };

    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    if !args.input.exists() {
        return Err(anyhow!("input does not exist: {}", args.input.display()));
    }

    let converter = Converter::new(&cfg).context("building converter")?;
    info!(engine = converter.engine_name(), out = %cfg.output.dir, "converter ready");

    run_input(&converter, &args.input)
}

/// Converts a file, or every supported file directly inside a directory,
/// writing artifacts under the converter's `output.dir`.
///
/// Per-file failures end up in the artifacts and the summary; only problems
/// with the input path or the output directory are returned as errors.
pub fn run_input(converter: &Converter, input: &Path) -> Result<()> {
    let cfg = converter.config();
    if !input.exists() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }

    let out_dir = PathBuf::from(&cfg.output.dir);
    ensure_dir(&out_dir)?;

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).context("serializing effective config")?;
        let path = out_dir.join("effective-config.toml");
        std::fs::write(&path, raw).with_context(|| format!("writing {}", path.display()))?;
    }

    let writer = FsArtifactWriter::new(&out_dir);
    let include_metadata = cfg.engine.include_metadata;

    if input.is_dir() {
        convert_directory(cfg, converter, &writer, input, &out_dir, include_metadata)
    } else {
        convert_file(cfg, converter, &writer, input, include_metadata)
    }
}

/// Config file first, then command-line overrides on top.
fn load_config(args: &Args) -> Result<Config> {
    let mut cfg = match resolve_config_path(args.config.as_deref())? {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    if let Some(dir) = &args.output {
        cfg.output.dir = dir.display().to_string();
    }
    if let Some(format) = args.format {
        cfg.output.format = format;
    }
    if let Some(engine) = args.engine {
        cfg.engine.kind = engine;
    }
    if args.no_metadata {
        cfg.engine.include_metadata = false;
    }
    Ok(cfg)
}

fn resolve_config_path(user: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(p) = user {
        if !p.exists() {
            return Err(anyhow!("config file does not exist: {}", p.display()));
        }
        return Ok(Some(p.to_path_buf()));
    }
    let default = PathBuf::from("docsift.toml");
    Ok(default.exists().then_some(default))
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(&cfg.output.dir).join("docsift.log"))
}

fn convert_file(
    cfg: &Config,
    converter: &Converter,
    writer: &FsArtifactWriter,
    input: &Path,
    include_metadata: bool,
) -> Result<()> {
    let req = ConversionRequest::for_path(input)
        .with_output_format(cfg.output.format)
        .with_metadata(include_metadata);
    let result = converter.convert(&req);

    // The artifact is written whether or not the conversion succeeded.
    let saved = writer.write(&req, &result)?;

    if !result.success {
        warn!(
            "conversion failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    if cfg.output.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "input": input,
                "output": saved,
                "success": result.success,
                "metadata": result.metadata,
                "error": result.error,
            }))?
        );
    }
    Ok(())
}

fn convert_directory(
    cfg: &Config,
    converter: &Converter,
    writer: &dyn ArtifactWriter,
    input: &Path,
    out_dir: &Path,
    include_metadata: bool,
) -> Result<()> {
    let files = supported_files(input)?;
    if files.is_empty() {
        warn!("no supported files in {}", input.display());
    }

    let requests: Vec<ConversionRequest> = files
        .into_iter()
        .map(|path| {
            ConversionRequest::for_path(path)
                .with_output_format(cfg.output.format)
                .with_metadata(include_metadata)
        })
        .collect();

    let summary = BatchOrchestrator::new(converter)
        .with_writer(writer)
        .run(&requests);

    let summary_path = out_dir.join(&cfg.output.summary_filename);
    output::write_summary(&summary_path, &summary)?;
    info!("summary saved to {}", summary_path.display());

    if cfg.output.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "total_files": summary.total_files,
                "successful": summary.successful,
                "failed": summary.failed,
                "persistence_failures": summary.persistence_failures.len(),
                "summary": summary_path,
            }))?
        );
    }
    Ok(())
}
