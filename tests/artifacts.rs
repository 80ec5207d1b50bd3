mod common;

use common::{converter, write_png, FakeConfidenceEngine, FakeEngine, FakeRenderer};
use docsift::{
    output::{read_record, write_summary, ArtifactWriter, FsArtifactWriter, OutputFormat},
    report::BatchSummary,
    request::ConversionRequest,
};

#[test]
fn json_record_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("receipt.png");
    write_png(&input);

    let conv = converter(
        FakeConfidenceEngine::new(&[("Total", 88.5), ("due", 41.0), ("~", 3.0)]),
        FakeRenderer::new(0),
    );
    let req = ConversionRequest::for_path(&input).with_output_format(OutputFormat::Json);
    let result = conv.convert(&req);
    assert!(result.success);

    let writer = FsArtifactWriter::new(dir.path().join("out"));
    let path = writer.write(&req, &result).unwrap();
    assert_eq!(path, dir.path().join("out").join("receipt.json"));

    assert_eq!(read_record(&path).unwrap(), result);
}

#[test]
fn failed_record_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let conv = converter(FakeEngine::new("x"), FakeRenderer::new(0));
    let req = ConversionRequest::for_path(dir.path().join("gone.jpg"))
        .with_output_format(OutputFormat::Json);
    let result = conv.convert(&req);
    assert!(!result.success);

    let writer = FsArtifactWriter::new(dir.path());
    let path = writer.write(&req, &result).unwrap();
    assert_eq!(read_record(&path).unwrap(), result);
}

#[test]
fn averages_survive_a_json_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("receipt.png");
    write_png(&input);
    let writer = FsArtifactWriter::new(dir.path().join("out"));

    let mut checked = 0;
    for a in 1..40 {
        for b in 1..40 {
            let scores = [1.37 * a as f32, 2.11 * b as f32, 97.3];
            let conv = converter(
                FakeConfidenceEngine::new(&[("alpha", scores[0]), ("beta", scores[1]), ("gamma", scores[2])]),
                FakeRenderer::new(0),
            );
            let req = ConversionRequest::for_path(&input).with_output_format(OutputFormat::Json);
            let result = conv.convert(&req);
            let path = writer.write(&req, &result).unwrap();

            let back = read_record(&path).unwrap();
            assert_eq!(back, result, "scores {scores:?}");
            checked += 1;
        }
    }
    assert_eq!(checked, 39 * 39);
}

#[test]
fn txt_artifact_holds_only_the_text() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("note.png");
    write_png(&input);

    let conv = converter(FakeEngine::new("just text"), FakeRenderer::new(0));
    let req = ConversionRequest::for_path(&input);
    let result = conv.convert(&req);

    let path = FsArtifactWriter::new(dir.path().join("out"))
        .write(&req, &result)
        .unwrap();
    assert_eq!(path.file_name().unwrap(), "note.txt");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "just text");
}

#[test]
fn confidence_fields_are_flattened() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("receipt.png");
    write_png(&input);

    let conv = converter(
        FakeConfidenceEngine::new(&[("Paid", 70.0)]),
        FakeRenderer::new(0),
    );
    let result = conv.convert(&ConversionRequest::for_path(&input));
    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(value["metadata"]["confidence"], 70.0);
    assert_eq!(value["metadata"]["included_words"], 1);
    assert_eq!(value["metadata"]["total_detections"], 1);
    assert!(value.get("error").is_none());
}

#[test]
fn summary_is_written_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("conversion_summary.json");

    write_summary(&path, &BatchSummary::default()).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let parsed: BatchSummary = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed, BatchSummary::default());
}
