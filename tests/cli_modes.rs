mod common;

use common::{write_png, FakeEngine, FakeRenderer};
use docsift::{
    cli::run_input,
    config::Config,
    error::ErrorKind,
    output::{read_record, OutputFormat},
    pipeline::Converter,
    report::BatchSummary,
};
use std::path::Path;

fn converter_writing_to(out: &Path, format: OutputFormat) -> Converter {
    let mut cfg = Config::default();
    cfg.output.dir = out.display().to_string();
    cfg.output.format = format;
    cfg.output.print_summary = false;
    Converter::with_components(
        &cfg,
        Box::new(FakeEngine::new("scanned words")),
        Box::new(FakeRenderer::new(0)),
    )
    .expect("default config is valid")
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn directory_mode_writes_successes_and_a_summary() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_png(&input.path().join("good.png"));
    std::fs::write(input.path().join("bad.png"), b"not an image").unwrap();
    std::fs::write(input.path().join("letter.docx"), b"PK\x03\x04").unwrap();
    std::fs::create_dir(input.path().join("nested")).unwrap();
    write_png(&input.path().join("nested").join("deep.png"));

    let conv = converter_writing_to(out.path(), OutputFormat::Txt);
    run_input(&conv, input.path()).expect("per-file failures are not fatal");

    assert_eq!(
        file_names(out.path()),
        vec!["conversion_summary.json", "good.txt"]
    );
    assert_eq!(
        std::fs::read_to_string(out.path().join("good.txt")).unwrap(),
        "scanned words"
    );

    let raw = std::fs::read_to_string(out.path().join("conversion_summary.json")).unwrap();
    let summary: BatchSummary = serde_json::from_str(&raw).unwrap();
    assert_eq!(summary.total_files, 2);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.failed, 1);
    let names: Vec<_> = summary.results.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(names, ["bad.png", "good.png"]);
    assert_eq!(summary.results[0].error_kind, Some(ErrorKind::Recognition));
}

#[test]
fn single_file_failure_still_writes_its_record() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let broken = input.path().join("broken.png");
    std::fs::write(&broken, b"garbage").unwrap();

    let conv = converter_writing_to(out.path(), OutputFormat::Json);
    run_input(&conv, &broken).expect("a failed conversion is not a top-level error");

    let record = read_record(&out.path().join("broken.json")).unwrap();
    assert!(!record.success);
    assert_eq!(record.text, "");
    assert_eq!(record.error_kind, Some(ErrorKind::Recognition));
}

#[test]
fn single_file_success_writes_text() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let png = input.path().join("page.png");
    write_png(&png);

    let conv = converter_writing_to(out.path(), OutputFormat::Txt);
    run_input(&conv, &png).unwrap();

    assert_eq!(
        std::fs::read_to_string(out.path().join("page.txt")).unwrap(),
        "scanned words"
    );
}

#[test]
fn missing_input_is_a_top_level_error() {
    let out = tempfile::tempdir().unwrap();
    let conv = converter_writing_to(out.path(), OutputFormat::Txt);
    assert!(run_input(&conv, &out.path().join("nope.pdf")).is_err());
}

#[test]
fn effective_config_is_dumped_on_request() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let png = input.path().join("page.png");
    write_png(&png);

    let mut cfg = Config::default();
    cfg.output.dir = out.path().display().to_string();
    cfg.output.print_summary = false;
    cfg.debug.dump_effective_config = true;
    let conv = Converter::with_components(
        &cfg,
        Box::new(FakeEngine::new("x")),
        Box::new(FakeRenderer::new(0)),
    )
    .unwrap();
    run_input(&conv, &png).unwrap();

    let raw = std::fs::read_to_string(out.path().join("effective-config.toml")).unwrap();
    let dumped: Config = toml::from_str(&raw).unwrap();
    assert!(dumped.debug.dump_effective_config);
    assert_eq!(dumped.output.dir, cfg.output.dir);
}
